use crate::error::{PipelineError, PipelineResult};
use std::collections::HashSet;

/// One `[name]` block of an INI document
#[derive(Debug, Clone, PartialEq)]
pub struct IniSection {
    /// Section name, case preserved
    pub name: String,
    /// Entries in file order; keys lowercased, values trimmed
    pub entries: Vec<(String, String)>,
}

/// Parse INI text.
///
/// Lines are `[section]` headers, `key = value` or `key: value` entries,
/// blank lines, or full-line comments starting with `#` or `;`. Duplicate
/// sections and duplicate keys within a section are errors.
pub fn parse(text: &str) -> PipelineResult<Vec<IniSection>> {
    let mut sections: Vec<IniSection> = Vec::new();
    let mut seen_sections = HashSet::new();
    let mut seen_keys = HashSet::new();

    for (number, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(rest) = line.strip_prefix('[') {
            let name = rest
                .strip_suffix(']')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .ok_or_else(|| syntax_error(number, "malformed section header"))?;
            if !seen_sections.insert(name.to_string()) {
                return Err(syntax_error(number, &format!("duplicate section '{}'", name)));
            }
            seen_keys.clear();
            sections.push(IniSection {
                name: name.to_string(),
                entries: Vec::new(),
            });
            continue;
        }

        let split = line
            .find(|c: char| c == '=' || c == ':')
            .ok_or_else(|| syntax_error(number, "expected 'key = value'"))?;
        let key = line[..split].trim().to_lowercase();
        let value = line[split + 1..].trim().to_string();
        if key.is_empty() {
            return Err(syntax_error(number, "empty key"));
        }

        let section = sections
            .last_mut()
            .ok_or_else(|| syntax_error(number, "entry before the first section header"))?;
        if !seen_keys.insert(key.clone()) {
            return Err(syntax_error(
                number,
                &format!("duplicate key '{}' in section '{}'", key, section.name),
            ));
        }
        section.entries.push((key, value));
    }

    Ok(sections)
}

/// Render sections back to INI text
pub fn write(sections: &[IniSection]) -> String {
    let mut out = String::new();
    for section in sections {
        out.push_str(&format!("[{}]\n", section.name));
        for (key, value) in &section.entries {
            out.push_str(&format!("{} = {}\n", key, value));
        }
        out.push('\n');
    }
    out
}

fn syntax_error(line: usize, msg: &str) -> PipelineError {
    PipelineError::config(format!("recipe line {}: {}", line + 1, msg))
}
