use std::io::Cursor;

use tracing::debug;

use super::backend::AudioFrame;
use crate::error::CaptureError;

/// Content type of blobs produced by [`WavEncoder`]
pub const WAV_CONTENT_TYPE: &str = "audio/wav";
/// File name attached to the uploaded blob
pub const WAV_FILE_NAME: &str = "recording.wav";

/// An opaque, immutable encoded audio payload ready for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioBlob {
    data: Vec<u8>,
    content_type: &'static str,
    file_name: &'static str,
    sample_count: usize,
}

impl AudioBlob {
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    pub fn file_name(&self) -> &'static str {
        self.file_name
    }

    /// Number of interleaved PCM samples encoded in the blob
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Assembles captured frames into a single 16-bit PCM WAV blob
#[derive(Debug, Clone)]
pub struct WavEncoder {
    sample_rate: u32,
    channels: u16,
}

impl WavEncoder {
    /// Format used when no frame was captured; otherwise the first frame's format wins
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    pub fn encode(&self, frames: &[AudioFrame]) -> Result<AudioBlob, CaptureError> {
        let (sample_rate, channels) = frames
            .first()
            .map(|f| (f.sample_rate, f.channels))
            .unwrap_or((self.sample_rate, self.channels));

        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        let mut sample_count = 0;

        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)
                .map_err(|e| CaptureError::Runtime(format!("Failed to start WAV encoder: {}", e)))?;

            for frame in frames {
                if frame.sample_rate != sample_rate || frame.channels != channels {
                    return Err(CaptureError::Runtime(format!(
                        "Frame format changed mid-recording: {}Hz/{}ch -> {}Hz/{}ch",
                        sample_rate, channels, frame.sample_rate, frame.channels
                    )));
                }
                for &sample in &frame.samples {
                    writer
                        .write_sample(sample)
                        .map_err(|e| CaptureError::Runtime(format!("Failed to encode sample: {}", e)))?;
                }
                sample_count += frame.samples.len();
            }

            writer
                .finalize()
                .map_err(|e| CaptureError::Runtime(format!("Failed to finalize WAV: {}", e)))?;
        }

        let data = cursor.into_inner();
        debug!(
            "Encoded {} frames ({} samples) into {} bytes",
            frames.len(),
            sample_count,
            data.len()
        );

        Ok(AudioBlob {
            data,
            content_type: WAV_CONTENT_TYPE,
            file_name: WAV_FILE_NAME,
            sample_count,
        })
    }
}
