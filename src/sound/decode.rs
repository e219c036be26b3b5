//! Decoding of sound resources into mono f32 clips

use std::io::{Cursor, Read};
use std::path::Path;

use crate::{Error, Result};

/// Decoded mono audio
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    /// Samples in `[-1, 1]`
    pub samples: Vec<f32>,
    /// Native sample rate of `samples`
    pub sample_rate: u32,
}

impl Clip {
    /// Linearly interpolated sample at a fractional frame position
    ///
    /// Positions past the end wrap when `looping`, otherwise read as silence.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn sample_at(&self, position: f64, looping: bool) -> f32 {
        let len = self.samples.len();
        if len == 0 || position < 0.0 {
            return 0.0;
        }
        let index = position.floor() as usize;
        if index >= len && !looping {
            return 0.0;
        }
        let frac = (position - position.floor()) as f32;
        let current = self.samples[index % len];
        let next = if index + 1 < len {
            self.samples[index + 1]
        } else if looping {
            self.samples[(index + 1) % len]
        } else {
            0.0
        };
        (next - current).mul_add(frac, current)
    }

    /// Number of frames
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the clip has no frames
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Decode a WAV or MP3 file, chosen by extension
///
/// # Errors
///
/// Returns error if the file cannot be read, has an unknown extension, or
/// fails to decode
pub fn decode_file(path: &Path) -> Result<Clip> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let mut data = Vec::new();
    std::fs::File::open(path)?.read_to_end(&mut data)?;

    let clip = match extension.as_deref() {
        Some("wav") => decode_wav(&data)?,
        Some("mp3") => decode_mp3(&data)?,
        other => {
            return Err(Error::Decode(format!(
                "unsupported sound format {other:?} for {}",
                path.display()
            )));
        }
    };

    if clip.is_empty() {
        return Err(Error::Decode(format!("{} contains no audio", path.display())));
    }

    tracing::debug!(
        path = %path.display(),
        frames = clip.len(),
        sample_rate = clip.sample_rate,
        "decoded sound"
    );

    Ok(clip)
}

/// Decode WAV bytes, averaging channels down to mono
///
/// # Errors
///
/// Returns error if the data is not valid WAV
#[allow(clippy::cast_precision_loss)]
pub fn decode_wav(data: &[u8]) -> Result<Clip> {
    let mut reader =
        hound::WavReader::new(Cursor::new(data)).map_err(|e| Error::Decode(e.to_string()))?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::Decode(e.to_string()))?,
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| Error::Decode(e.to_string()))?
        }
    };

    Ok(Clip {
        samples: downmix(&interleaved, channels),
        sample_rate: spec.sample_rate,
    })
}

/// Decode MP3 bytes, averaging channels down to mono
///
/// # Errors
///
/// Returns error if a frame fails to decode
#[allow(clippy::cast_sign_loss)]
pub fn decode_mp3(data: &[u8]) -> Result<Clip> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(data));
    let mut samples = Vec::new();
    let mut sample_rate = 0;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                sample_rate = frame.sample_rate.max(0) as u32;
                let interleaved: Vec<f32> =
                    frame.data.iter().map(|&s| f32::from(s) / 32768.0).collect();
                samples.extend(downmix(&interleaved, frame.channels.max(1)));
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Decode(format!("MP3 decode error: {e}"))),
        }
    }

    Ok(Clip {
        samples,
        sample_rate,
    })
}

#[allow(clippy::cast_precision_loss)]
fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels == 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}
