//! Built-in stage catalog
//!
//! | name | kind | input | output |
//! |------|------|-------|--------|
//! | `decode` (alias `ingest`) | atomic, progress | file path | Signal |
//! | `amplify` | atomic, progress | Signal | Signal |
//! | `normalize` | atomic | Signal | Signal |
//! | `pre_emph` | iterative | Signal | Signal |
//! | `frame` | iterative | Signal | Matrix |
//! | `energy_track` | iterative, explicit indices | Matrix | Track |

pub mod amplify;
pub mod decode;
pub mod energy_track;
pub mod frame;
pub mod normalize;
pub mod pre_emph;

use crate::error::PipelineResult;
use crate::stage::{StageRegistry, StageType};

/// Name under which recipes usually refer to the decoding stage
pub const INGEST_ALIAS: &str = "ingest";

/// Every built-in stage type
pub fn builtin_stages() -> Vec<StageType> {
    vec![
        decode::stage_type(),
        amplify::stage_type(),
        normalize::stage_type(),
        pre_emph::stage_type(),
        frame::stage_type(),
        energy_track::stage_type(),
    ]
}

/// Register the built-in stages plus the `ingest` alias
pub fn register_builtins(registry: &mut StageRegistry) -> PipelineResult<()> {
    for stage in builtin_stages() {
        registry.register(stage)?;
    }
    registry.alias(INGEST_ALIAS, "decode")
}

/// A registry holding only the built-in stages
pub fn builtin_registry() -> PipelineResult<StageRegistry> {
    let mut registry = StageRegistry::new();
    register_builtins(&mut registry)?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Value, ValueType};
    use crate::engine::{Runner, RunnerConfig};
    use crate::pipeline::PipelineRunner;
    use crate::recipe::{Recipe, RecipeManager};
    use hound::{SampleFormat, WavSpec, WavWriter};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn tone(dir: &TempDir) -> String {
        let path = dir.path().join("tone.wav");
        let spec = WavSpec {
            channels: 2,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for i in 0..16000 {
            let s = ((i as f32 * 0.05).sin() * 8000.0) as i16;
            writer.write_sample(s).unwrap();
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
        path.to_string_lossy().into_owned()
    }

    fn runner() -> PipelineRunner {
        PipelineRunner::new(Runner::new(
            RunnerConfig::default().with_poll_interval(Duration::from_millis(5)),
        ))
    }

    #[test]
    fn test_builtins_register() {
        let registry = builtin_registry().unwrap();
        assert_eq!(registry.len(), 7);
        assert_eq!(registry.get("ingest").unwrap().name(), "decode");
        for (_, stage) in registry.iter() {
            assert!(stage.default_options().is_ok(), "{}", stage.name());
        }
    }

    #[test]
    fn test_ingest_then_normalize() {
        let dir = TempDir::new().unwrap();
        let input = tone(&dir);

        let mut manager = RecipeManager::new(Arc::new(builtin_registry().unwrap()));
        manager.add_recipe(
            Recipe::parse(
                "simple",
                "[process]\n0 = ingest\n1 = normalize\n\n[ingest]\noutRate = 8000\n\n[normalize]\n",
            )
            .unwrap(),
        );

        let pipeline = manager.compile("simple").unwrap();
        assert_eq!(pipeline.len(), 2);

        let outputs = runner().run(&pipeline, Some(Value::from(input))).unwrap();
        assert_eq!(outputs.len(), 2);

        let decoded = outputs[0].as_signal().unwrap();
        assert_eq!(decoded.sample_rate(), 8000);
        assert_eq!(decoded.len(), 8000);
        let normalized = outputs[1].as_signal().unwrap();
        assert!((normalized.peak() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_feature_chain() {
        let dir = TempDir::new().unwrap();
        let input = tone(&dir);

        let mut manager = RecipeManager::new(Arc::new(builtin_registry().unwrap()));
        manager.add_recipe(
            Recipe::new("front_end")
                .with_section("ingest", &[])
                .with_section("pre_emph", &[]),
        );
        manager.add_recipe(
            Recipe::new("activity")
                .with_section("front_end", &[])
                .with_section("frame", &[("log_n", "7")])
                .with_section("energy_track", &[("hop", "2"), ("threshold", "0.0001")]),
        );

        let pipeline = manager.compile("activity").unwrap();
        assert_eq!(pipeline.output_type(), Some(ValueType::Track));

        let outputs = runner().run(&pipeline, Some(Value::from(input))).unwrap();
        assert_eq!(outputs.len(), 4);

        let frames = outputs[2].as_matrix().unwrap();
        assert_eq!(frames.cols(), 128);
        assert_eq!(frames.rows(), 1 + (8000 - 128) / 64);

        let track = outputs[3].as_track().unwrap();
        assert_eq!(track.len(), 1);
        assert!(track.labels()[0].start < 0.05);
    }
}
