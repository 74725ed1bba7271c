use crate::error::{PipelineError, PipelineResult};
use crate::filter::downmix;
use log::{debug, warn};
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Symphonia-based audio decoder
pub struct SymphoniaDecoder {
    /// Container reader for the audio source
    reader: Box<dyn FormatReader>,
    /// Codec state for the selected track
    decoder: Box<dyn symphonia::core::codecs::Decoder>,
    /// Track being decoded
    track_id: u32,
    sample_rate: u32,
    /// Total frames, if the container declares it
    total_frames: Option<u64>,
    decoded_frames: u64,
    finished: bool,
}

impl SymphoniaDecoder {
    /// Create decoder from file path
    pub fn from_file<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let path = path.as_ref();
        let file = Box::new(File::open(path)?);
        let mss = MediaSourceStream::new(file, Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| PipelineError::Decode(format!("{}: {}", path.display(), e)))?;
        let reader = probed.format;

        let track = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| PipelineError::Decode("No audio track found".to_string()))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();
        let sample_rate = codec_params
            .sample_rate
            .ok_or_else(|| PipelineError::Decode("Unknown sample rate".to_string()))?;

        let decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())?;

        debug!(
            "decoding {} at {} Hz ({:?} frames)",
            path.display(),
            sample_rate,
            codec_params.n_frames
        );

        Ok(SymphoniaDecoder {
            reader,
            decoder,
            track_id,
            sample_rate,
            total_frames: codec_params.n_frames,
            decoded_frames: 0,
            finished: false,
        })
    }

    /// Frames decoded so far
    pub fn decoded_frames(&self) -> u64 {
        self.decoded_frames
    }
}

impl super::Decoder for SymphoniaDecoder {
    fn decode_block(&mut self) -> PipelineResult<Option<Vec<f32>>> {
        if self.finished {
            return Ok(None);
        }

        loop {
            let packet = match self.reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    self.finished = true;
                    return Ok(None);
                }
                Err(SymphoniaError::ResetRequired) => {
                    warn!("stream changed mid-file, stopping at frame {}", self.decoded_frames);
                    self.finished = true;
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!("skipping corrupt packet: {}", e);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let spec = *decoded.spec();
            let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            buffer.copy_interleaved_ref(decoded);

            let mono = downmix(buffer.samples(), spec.channels.count())?;
            if mono.is_empty() {
                continue;
            }

            self.decoded_frames += mono.len() as u64;
            return Ok(Some(mono));
        }
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn fraction_decoded(&self) -> Option<f64> {
        match self.total_frames {
            Some(total) if total > 0 => Some(self.decoded_frames as f64 / total as f64),
            _ => None,
        }
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}
