//! Audio file loading using Symphonia.
//!
//! Supports WAV, MP3, FLAC, and AAC formats. Analysis runs on mono audio at a
//! fixed rate, so [`load_mono`] downmixes and resamples after decoding.

use std::fs::File;
use std::path::Path;

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use thiserror::Error;

/// Sample rate used for analysis unless the caller asks for another one.
pub const DEFAULT_SAMPLE_RATE: u32 = 22050;

const RESAMPLE_CHUNK: usize = 1024;

/// Errors that can occur during audio loading.
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Failed to open audio file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to probe audio format: {0}")]
    ProbeError(#[from] symphonia::core::errors::Error),

    #[error("No audio track found in file")]
    NoAudioTrack,

    #[error("Unknown sample rate")]
    UnknownSampleRate,

    #[error("Resampling from {from} Hz to {to} Hz failed: {reason}")]
    Resample { from: u32, to: u32, reason: String },
}

/// Audio data loaded from a file.
#[derive(Debug, Clone)]
pub struct AudioData {
    /// Interleaved audio samples (f32, normalized to -1.0..1.0)
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: usize,
}

impl AudioData {
    /// Duration of the audio in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / (self.sample_rate as f64 * self.channels as f64)
    }

    /// Number of frames (samples per channel).
    pub fn num_frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels
    }

    /// Downmix to mono by averaging channels.
    pub fn to_mono(&self) -> Vec<f32> {
        if self.channels <= 1 {
            return self.samples.clone();
        }

        self.samples
            .chunks(self.channels)
            .map(|frame| frame.iter().sum::<f32>() / self.channels as f32)
            .collect()
    }
}

/// Load audio from a file path.
///
/// The first audio track is decoded to interleaved f32 samples normalized to
/// the range -1.0..1.0. Packets that fail to decode are skipped.
///
/// # Example
///
/// ```no_run
/// use phobz_keypoints::audio::loader::load_audio;
/// use std::path::Path;
///
/// let audio = load_audio(Path::new("song.mp3")).unwrap();
/// println!("Duration: {:.2}s", audio.duration());
/// ```
pub fn load_audio(path: &Path) -> Result<AudioData, AudioError> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(AudioError::NoAudioTrack)?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or(AudioError::UnknownSampleRate)?;
    let channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(2);

    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut samples = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(symphonia::core::errors::Error::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(msg)) => {
                log::debug!("Skipping undecodable packet: {}", msg);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if sample_buf.is_none() {
            let spec = *decoded.spec();
            let capacity = decoded.capacity() as u64;
            sample_buf = Some(SampleBuffer::new(capacity, spec));
        }

        if let Some(buf) = &mut sample_buf {
            buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(buf.samples());
        }
    }

    log::info!(
        "Decoded {}: {} Hz, {} channel(s), {} samples",
        path.display(),
        sample_rate,
        channels,
        samples.len()
    );

    Ok(AudioData {
        samples,
        sample_rate,
        channels,
    })
}

/// Resample a mono signal with a windowed-sinc interpolator.
///
/// Returns the input unchanged when the rates match. The output is trimmed to
/// `round(len * to / from)` samples.
pub fn resample(samples: &[f32], from: u32, to: u32) -> Result<Vec<f32>, AudioError> {
    if from == to || samples.is_empty() {
        return Ok(samples.to_vec());
    }
    if from == 0 || to == 0 {
        return Err(AudioError::Resample {
            from,
            to,
            reason: "sample rates must be non-zero".to_string(),
        });
    }

    let ratio = to as f64 / from as f64;
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, RESAMPLE_CHUNK, 1).map_err(
        |e| AudioError::Resample {
            from,
            to,
            reason: e.to_string(),
        },
    )?;

    let expected = (samples.len() as f64 * ratio).round() as usize;
    let mut output = Vec::with_capacity(expected + RESAMPLE_CHUNK);
    let mut chunk = vec![vec![0.0f32; RESAMPLE_CHUNK]];

    // SincFixedIn output is already aligned with the input; zero chunks past
    // the end flush the tail of the filter.
    let mut offset = 0usize;
    while output.len() < expected {
        chunk[0].fill(0.0);
        if offset < samples.len() {
            let end = (offset + RESAMPLE_CHUNK).min(samples.len());
            chunk[0][..end - offset].copy_from_slice(&samples[offset..end]);
        }
        offset += RESAMPLE_CHUNK;

        let processed = resampler
            .process(&chunk, None)
            .map_err(|e| AudioError::Resample {
                from,
                to,
                reason: e.to_string(),
            })?;
        output.extend_from_slice(&processed[0]);
    }

    output.truncate(expected);
    Ok(output)
}

/// Load an audio file as mono samples at `target_rate`.
///
/// `None` keeps the file's native sample rate. Returns the samples and the
/// rate they are sampled at.
pub fn load_mono(path: &Path, target_rate: Option<u32>) -> Result<(Vec<f32>, u32), AudioError> {
    let audio = load_audio(path)?;
    let mono = audio.to_mono();

    match target_rate {
        Some(rate) if rate != audio.sample_rate => {
            log::info!("Resampling {} Hz -> {} Hz", audio.sample_rate, rate);
            let resampled = resample(&mono, audio.sample_rate, rate)?;
            Ok((resampled, rate))
        }
        _ => Ok((mono, audio.sample_rate)),
    }
}
