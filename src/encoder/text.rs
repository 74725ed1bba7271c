use crate::core::{Matrix, Track};
use crate::error::PipelineResult;
use std::io::Write;

/// Write a matrix as CSV, one frame per line
pub fn write_matrix<W: Write>(out: &mut W, matrix: &Matrix) -> PipelineResult<()> {
    for index in 0..matrix.rows() {
        let line: Vec<String> = matrix.row(index).iter().map(|v| v.to_string()).collect();
        writeln!(out, "{}", line.join(","))?;
    }
    Ok(())
}

/// Write labels as `start<TAB>end<TAB>text` lines
pub fn write_track<W: Write>(out: &mut W, track: &Track) -> PipelineResult<()> {
    for label in track.labels() {
        writeln!(out, "{:.6}\t{:.6}\t{}", label.start, label.end, label.text)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_csv() {
        let matrix = Matrix::new(vec![1.0, 2.5, -3.0, 0.0], 2, 100.0).unwrap();
        let mut out = Vec::new();
        write_matrix(&mut out, &matrix).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "1,2.5\n-3,0\n");
    }

    #[test]
    fn test_track_labels() {
        let mut track = Track::new();
        track.push(0.5, 2.25, "speech");
        let mut out = Vec::new();
        write_track(&mut out, &track).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "0.500000\t2.250000\tspeech\n");
    }
}
