use std::time::Duration;

use crate::{BufferFormat, Error, Result, Sample, SampleFormat};

/// Decoded PCM frames ready to be loaded into a buffer
///
/// Produced by an external decoder, or built directly from samples.
#[derive(Debug, Clone)]
pub struct Wave {
    format: BufferFormat,
    data: Vec<u8>,
}

impl Wave {
    /// Wrap interleaved frames encoded according to `format`
    pub fn new(format: BufferFormat, data: Vec<u8>) -> Result<Self> {
        let bpf = format.bytes_per_frame();
        if bpf == 0 || format.sample_rate == 0 {
            return Err(Error::InvalidArgument("wave format has no frames"));
        }
        if data.len() % bpf != 0 {
            return Err(Error::InvalidArgument("wave data is not a whole number of frames"));
        }
        Ok(Self { format, data })
    }

    /// Build a 32-bit float wave from interleaved `samples`
    pub fn from_samples(sample_rate: u32, channels: u16, samples: &[Sample]) -> Self {
        let format = BufferFormat::new(SampleFormat::F32, channels, sample_rate);
        Self {
            format,
            data: encode(format.sample_format, samples),
        }
    }

    /// Encode interleaved `samples` into `format`, clipping to [-1, 1] for integer formats
    pub fn encode(format: BufferFormat, samples: &[Sample]) -> Result<Self> {
        if format.channels == 0 || samples.len() % usize::from(format.channels) != 0 {
            return Err(Error::InvalidArgument("sample count is not a whole number of frames"));
        }
        Self::new(format, encode(format.sample_format, samples))
    }

    /// Layout of the frames
    pub fn format(&self) -> BufferFormat {
        self.format
    }

    /// Number of whole frames
    pub fn frame_count(&self) -> usize {
        match self.format.bytes_per_frame() {
            0 => 0,
            bpf => self.data.len() / bpf,
        }
    }

    /// Raw interleaved frames
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Playback time at the wave's own rate
    pub fn duration(&self) -> Duration {
        match self.format.sample_rate {
            0 => Duration::ZERO,
            rate => Duration::from_secs_f64(self.frame_count() as f64 / f64::from(rate)),
        }
    }
}

fn encode(sample_format: SampleFormat, samples: &[Sample]) -> Vec<u8> {
    let width = sample_format.bytes_per_sample();
    let mut data = vec![0; samples.len() * width];
    for (&x, out) in samples.iter().zip(data.chunks_exact_mut(width)) {
        sample_format.encode(x, out);
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_frame_size() {
        let format = BufferFormat::new(SampleFormat::S16, 2, 8);
        assert!(Wave::new(format, vec![0; 6]).is_err());
        let wave = Wave::new(format, vec![0; 16]).unwrap();
        assert_eq!(wave.frame_count(), 4);
        assert_eq!(wave.duration(), Duration::from_millis(500));
    }

    #[test]
    fn from_samples() {
        let wave = Wave::from_samples(10, 2, &[0.0, 1.0, 0.5, -0.5]);
        assert_eq!(wave.frame_count(), 2);
        assert_eq!(wave.format().sample_format, SampleFormat::F32);
        assert_eq!(&wave.data()[4..8], &1.0f32.to_le_bytes());
    }

    #[test]
    fn encode_integer_formats() {
        let format = BufferFormat::new(SampleFormat::U8, 2, 8);
        let wave = Wave::encode(format, &[0.0, 2.0, -1.0, 0.5]).unwrap();
        assert_eq!(wave.data(), [128, 255, 1, 191]);
        assert!(Wave::encode(format, &[0.0; 3]).is_err());
    }
}
