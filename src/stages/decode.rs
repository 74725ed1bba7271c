use crate::core::{Value, ValueType};
use crate::decoder::{self, decode_all};
use crate::error::PipelineResult;
use crate::filter::{Filter, Resample};
use crate::param::{Options, ParamSpec};
use crate::stage::{AtomicStage, ProgressCell, Stage, StageKind, StageType};
use log::debug;
use std::path::PathBuf;

/// Stage type: read an audio file into a mono signal at `outRate`
pub fn stage_type() -> StageType {
    StageType::new("decode", StageKind::Atomic, |options| {
        Ok(Stage::atomic(Decode::from_options(options)?))
    })
    .summary("decode an audio file into a mono signal")
    .param(ParamSpec::input("path", ValueType::Str).name("Audio file"))
    .param(ParamSpec::output(ValueType::Signal).name("Signal"))
    .param(
        ParamSpec::scalar("outRate", ValueType::Int)
            .name("Sample Rate")
            .default(8000i64)
            .min(6000.0)
            .max(44100.0)
            .suffix("Hz")
            .help("Output sample rate. Channels are averaged into one."),
    )
}

/// Decodes, downmixes and resamples one file
pub struct Decode {
    path: PathBuf,
    out_rate: u32,
    progress: ProgressCell,
}

impl Decode {
    /// Build from resolved options
    pub fn from_options(options: Options) -> PipelineResult<Self> {
        Ok(Decode {
            path: PathBuf::from(options.str("path")?),
            out_rate: options.int("outRate")? as u32,
            progress: ProgressCell::new(),
        })
    }
}

impl AtomicStage for Decode {
    fn run(&mut self) -> PipelineResult<Value> {
        let mut source = decoder::from_file(&self.path)?;
        let progress = self.progress.clone();
        let signal = decode_all(source.as_mut(), |fraction| {
            progress.set(fraction * 0.9, "decoding")
        })?;

        debug!(
            "decoded {} samples at {} Hz from {}",
            signal.len(),
            signal.sample_rate(),
            self.path.display()
        );

        self.progress.set(0.9, "resampling");
        let signal = Resample::new(self.out_rate)?.process(&signal)?;
        self.progress.set(1.0, "done");
        Ok(Value::Signal(signal))
    }

    fn progress(&self) -> Option<ProgressCell> {
        Some(self.progress.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Runner, RunnerConfig};
    use hound::{SampleFormat, WavSpec, WavWriter};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::Builder;

    fn mono_wav(rate: u32, samples: usize) -> tempfile::NamedTempFile {
        let file = Builder::new().suffix(".wav").tempfile().unwrap();
        let spec = WavSpec {
            channels: 1,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(file.path(), spec).unwrap();
        for i in 0..samples {
            writer.write_sample(if i % 2 == 0 { 8192i16 } else { -8192 }).unwrap();
        }
        writer.finalize().unwrap();
        file
    }

    #[test]
    fn test_decode_resamples() {
        let file = mono_wav(16000, 1600);
        let options = stage_type()
            .default_options()
            .unwrap()
            .with("path", file.path().to_str().unwrap());

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let mut runner = Runner::new(RunnerConfig::default().with_poll_interval(Duration::from_millis(5)))
            .with_sink(move |p: f64, _: &str| sink.lock().unwrap().push(p));

        let value = runner.run(stage_type().instantiate(options).unwrap()).unwrap();
        let signal = value.as_signal().unwrap();

        assert_eq!(signal.sample_rate(), 8000);
        assert_eq!(signal.len(), 800);
        assert_eq!(events.lock().unwrap().last().copied(), Some(1.0));
    }

    #[test]
    fn test_out_of_range_rate_rejected() {
        for rate in [-1i64, 100, 96000] {
            let options = Options::new()
                .with("path", "input.wav")
                .with("outRate", rate);
            let err = stage_type().instantiate(options).err().unwrap();
            assert!(err.is_validation(), "{}", rate);
        }
    }

    #[test]
    fn test_missing_file_fails_at_run() {
        let options = Options::new().with("path", "/nonexistent/input.wav");
        let stage = stage_type().instantiate(options).unwrap();

        assert!(Runner::default().run(stage).is_err());
    }
}
