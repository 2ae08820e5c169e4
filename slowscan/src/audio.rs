//! Buffered mono audio, and reading and writing it as WAV.

use crate::GetSampleRate;

/// Normalized mono samples in `[-1, 1]`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Audio {
    pub samples: Vec<f32>,
    pub sample_rate: f32,
}

impl Audio {
    #[inline]
    pub fn new(samples: Vec<f32>, sample_rate: f32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Length in seconds.
    #[inline]
    pub fn duration(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate
    }
}

impl GetSampleRate for Audio {
    #[inline]
    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }
}

#[cfg(feature = "wav")]
pub use self::wav::{
    Error,
    read_wav,
    read_wav_from,
    write_wav,
    write_wav_to,
};

#[cfg(feature = "wav")]
mod wav {
    use std::{
        io::{
            Read,
            Seek,
            Write,
        },
        path::Path,
    };

    use super::Audio;

    #[derive(Debug, thiserror::Error)]
    pub enum Error {
        #[error("wav error")]
        Hound(#[from] hound::Error),
        #[error("unsupported bit depth: {bits_per_sample}. only 8 and 16 bit WAV files are supported")]
        UnsupportedBitsPerSample { bits_per_sample: u16 },
        #[error("unsupported sample format: {sample_format:?}. only integer PCM is supported")]
        UnsupportedSampleFormat { sample_format: hound::SampleFormat },
    }

    /// Reads a WAV file and mixes it down to mono.
    pub fn read_wav(path: impl AsRef<Path>) -> Result<Audio, Error> {
        from_wav_reader(hound::WavReader::open(path)?)
    }

    pub fn read_wav_from<R>(reader: R) -> Result<Audio, Error>
    where
        R: Read,
    {
        from_wav_reader(hound::WavReader::new(reader)?)
    }

    fn from_wav_reader<R>(mut reader: hound::WavReader<R>) -> Result<Audio, Error>
    where
        R: Read,
    {
        let spec = reader.spec();
        tracing::debug!(?spec, "reading wav");

        if spec.sample_format != hound::SampleFormat::Int {
            return Err(Error::UnsupportedSampleFormat {
                sample_format: spec.sample_format,
            });
        }

        // hound hands out 8 bit samples already shifted to be signed
        let interleaved = match spec.bits_per_sample {
            8 => {
                reader
                    .samples::<i8>()
                    .map(|sample| Ok(f32::from(sample?) / 128.0))
                    .collect::<Result<Vec<f32>, Error>>()?
            }
            16 => {
                reader
                    .samples::<i16>()
                    .map(|sample| Ok(f32::from(sample?) / 32768.0))
                    .collect::<Result<Vec<f32>, Error>>()?
            }
            bits_per_sample => return Err(Error::UnsupportedBitsPerSample { bits_per_sample }),
        };

        let channels = usize::from(spec.channels.max(1));
        let samples = interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();

        Ok(Audio::new(samples, spec.sample_rate as f32))
    }

    fn wav_spec(audio: &Audio) -> hound::WavSpec {
        hound::WavSpec {
            channels: 1,
            sample_rate: audio.sample_rate.round() as u32,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }

    #[inline]
    fn to_i16(sample: f32) -> i16 {
        let sample = sample.clamp(-1.0, 1.0);
        let scaled = if sample < 0.0 {
            sample * 32768.0
        }
        else {
            sample * 32767.0
        };
        scaled.round() as i16
    }

    /// Writes mono 16 bit PCM.
    pub fn write_wav(path: impl AsRef<Path>, audio: &Audio) -> Result<(), Error> {
        let mut writer = hound::WavWriter::create(path, wav_spec(audio))?;
        for sample in &audio.samples {
            writer.write_sample(to_i16(*sample))?;
        }
        writer.finalize()?;
        Ok(())
    }

    pub fn write_wav_to<W>(writer: W, audio: &Audio) -> Result<(), Error>
    where
        W: Write + Seek,
    {
        let mut writer = hound::WavWriter::new(writer, wav_spec(audio))?;
        for sample in &audio.samples {
            writer.write_sample(to_i16(*sample))?;
        }
        writer.finalize()?;
        Ok(())
    }

}
