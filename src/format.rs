use crate::Sample;

/// Encoding of a single PCM sample
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SampleFormat {
    /// Unsigned 8-bit, centred at 128
    U8,
    /// Signed 16-bit little-endian
    S16,
    /// 32-bit float little-endian
    F32,
}

impl SampleFormat {
    /// Look up the format used for samples `bits` wide
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            8 => Some(SampleFormat::U8),
            16 => Some(SampleFormat::S16),
            32 => Some(SampleFormat::F32),
            _ => None,
        }
    }

    /// Size of one sample in bytes
    #[inline]
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::U8 => 1,
            SampleFormat::S16 => 2,
            SampleFormat::F32 => 4,
        }
    }

    /// Decode one sample from the start of `bytes`
    #[inline]
    pub(crate) fn decode(self, bytes: &[u8]) -> Sample {
        match self {
            SampleFormat::U8 => (f32::from(bytes[0]) - 128.0) / 128.0,
            SampleFormat::S16 => f32::from(i16::from_le_bytes([bytes[0], bytes[1]])) / 32768.0,
            SampleFormat::F32 => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        }
    }

    /// Encode `x` into the start of `out`
    #[inline]
    pub(crate) fn encode(self, x: Sample, out: &mut [u8]) {
        match self {
            SampleFormat::U8 => out[0] = (x.clamp(-1.0, 1.0) * 127.0 + 128.0) as u8,
            SampleFormat::S16 => {
                let s = (x.clamp(-1.0, 1.0) * 32767.0) as i16;
                out[..2].copy_from_slice(&s.to_le_bytes());
            }
            SampleFormat::F32 => out[..4].copy_from_slice(&x.to_le_bytes()),
        }
    }
}

/// Layout of the interleaved PCM frames held by a buffer
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BufferFormat {
    /// Encoding of each sample
    pub sample_format: SampleFormat,
    /// Samples per frame
    pub channels: u16,
    /// Frames per second
    pub sample_rate: u32,
}

impl BufferFormat {
    /// Describe frames of `channels` samples of `sample_format` at `sample_rate`
    pub const fn new(sample_format: SampleFormat, channels: u16, sample_rate: u32) -> Self {
        Self {
            sample_format,
            channels,
            sample_rate,
        }
    }

    /// Size of one frame in bytes
    #[inline]
    pub const fn bytes_per_frame(&self) -> usize {
        self.sample_format.bytes_per_sample() * self.channels as usize
    }

    /// Pack into one word that can be shared through an atomic
    pub(crate) const fn pack(self) -> u64 {
        (self.sample_format.bytes_per_sample() as u64) << 48
            | (self.channels as u64) << 32
            | self.sample_rate as u64
    }

    /// Inverse of [`pack`](Self::pack)
    pub(crate) fn unpack(word: u64) -> Self {
        let sample_format = match word >> 48 {
            1 => SampleFormat::U8,
            2 => SampleFormat::S16,
            _ => SampleFormat::F32,
        };
        Self::new(sample_format, (word >> 32) as u16, word as u32)
    }
}
