//! Symphonia-backed file decoder.

use log::warn;
use std::path::{Path, PathBuf};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::audio::format::AudioFormat;
use crate::error::EngineError;

use super::AudioDecoder;

/// Decoder reading the first decodable track of an audio file.
pub struct FileDecoder {
    path: PathBuf,
    format: AudioFormat,
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_buffer: Option<SampleBuffer<f32>>,
    sample_buffer_frames: usize,
    pending: Vec<f32>,
    pending_offset: usize,
    finished: bool,
}

impl FileDecoder {
    /// Open `path` and select its first decodable track.
    ///
    /// # Errors
    /// Returns [`EngineError::DecodeOpen`] if the file is missing, is not a
    /// recognized container, or has no track with a supported codec.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let reader = get_reader(path)?;

        let track = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| EngineError::decode_open(path, "no supported audio tracks"))?;
        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let sample_rate = codec_params
            .sample_rate
            .ok_or_else(|| EngineError::decode_open(path, "missing sample rate"))?;
        let channels = codec_params
            .channels
            .map(|channels| channels.count())
            .ok_or_else(|| EngineError::decode_open(path, "missing channel layout"))?;

        let decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|err| EngineError::decode_open(path, err))?;

        Ok(Self {
            path: path.to_path_buf(),
            format: AudioFormat::new(sample_rate, channels as u16),
            reader,
            decoder,
            track_id,
            sample_buffer: None,
            sample_buffer_frames: 0,
            pending: Vec::new(),
            pending_offset: 0,
            finished: false,
        })
    }

    /// Decode the next packet of our track into `pending`.
    ///
    /// Returns `false` once the stream has ended.
    fn decode_next_packet(&mut self) -> Result<bool, EngineError> {
        loop {
            let packet = match self.reader.next_packet() {
                Ok(packet) => packet,
                Err(Error::IoError(err)) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                    self.finished = true;
                    return Ok(false);
                }
                Err(Error::ResetRequired) => {
                    self.finished = true;
                    return Err(EngineError::Decode(
                        "decoder reset required mid-stream".to_string(),
                    ));
                }
                Err(err) => {
                    self.finished = true;
                    return Err(EngineError::Decode(err.to_string()));
                }
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    if decoded.frames() == 0 {
                        continue;
                    }
                    let spec = *decoded.spec();
                    let frames = decoded.capacity();
                    if self.sample_buffer.is_none() || self.sample_buffer_frames < frames {
                        self.sample_buffer = Some(SampleBuffer::<f32>::new(frames as u64, spec));
                        self.sample_buffer_frames = frames;
                    }
                    if let Some(buffer) = self.sample_buffer.as_mut() {
                        buffer.copy_interleaved_ref(decoded);
                        self.pending.clear();
                        self.pending.extend_from_slice(buffer.samples());
                        self.pending_offset = 0;
                    }
                    return Ok(true);
                }
                Err(Error::DecodeError(err)) => {
                    warn!("decode error in {}: {}", self.path.display(), err);
                }
                Err(err) => {
                    self.finished = true;
                    return Err(EngineError::Decode(err.to_string()));
                }
            }
        }
    }
}

impl AudioDecoder for FileDecoder {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn read(&mut self, buffer: &mut [f32]) -> Result<usize, EngineError> {
        let mut written = 0;
        while written < buffer.len() {
            if self.pending_offset >= self.pending.len() {
                if self.finished || !self.decode_next_packet()? {
                    break;
                }
                continue;
            }

            let available = &self.pending[self.pending_offset..];
            let take = available.len().min(buffer.len() - written);
            buffer[written..written + take].copy_from_slice(&available[..take]);
            self.pending_offset += take;
            written += take;
        }
        Ok(written)
    }

    fn release(&mut self) {
        self.finished = true;
        self.pending = Vec::new();
        self.pending_offset = 0;
        self.sample_buffer = None;
    }
}

/// Build a Symphonia `FormatReader` for the given file path.
fn get_reader(path: &Path) -> Result<Box<dyn FormatReader>, EngineError> {
    let src = std::fs::File::open(path).map_err(|err| EngineError::decode_open(path, err))?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();

    let detected = symphonia::default::get_probe()
        .format(&hint, mss, &fmt_opts, &meta_opts)
        .map_err(|err| EngineError::decode_open(path, err))?;

    Ok(detected.format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_a_decode_open_failure() {
        let err = FileDecoder::open("does/not/exist.wav").err().expect("open should fail");
        assert!(matches!(err, EngineError::DecodeOpen { .. }));
    }

    #[test]
    fn garbage_file_is_a_decode_open_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.wav");
        std::fs::write(&path, b"definitely not a riff header").unwrap();

        let err = FileDecoder::open(&path).err().expect("garbage header should fail");
        assert!(matches!(err, EngineError::DecodeOpen { .. }));
    }

    #[test]
    fn reads_interleaved_samples_from_a_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..100 {
            writer.write_sample(i16::MAX / 2).unwrap();
            writer.write_sample(i16::MIN / 2).unwrap();
        }
        writer.finalize().unwrap();

        let mut decoder = FileDecoder::open(&path).unwrap();
        assert_eq!(decoder.format(), AudioFormat::new(8_000, 2));

        let mut buffer = vec![0.0_f32; 64];
        let mut total = 0;
        let mut first_frame = None;
        loop {
            let read = decoder.read(&mut buffer).unwrap();
            if read == 0 {
                break;
            }
            if first_frame.is_none() {
                first_frame = Some((buffer[0], buffer[1]));
            }
            total += read;
        }
        assert_eq!(total, 200);

        let (left, right) = first_frame.unwrap();
        assert!((left - 0.5).abs() < 1e-3);
        assert!((right + 0.5).abs() < 1e-3);
        assert_eq!(decoder.read(&mut buffer).unwrap(), 0);
    }
}
