//! Sample format, channel and rate conversion

use crate::{BufferFormat, Error, Result, Sample};

/// A source of raw frames for a [`SampleConverter`] to pull from
pub trait PullFrames {
    /// Write up to `frame_count` frames in the source's native format to the start of `out`
    ///
    /// Returns the number of frames written. A short count means the source has nothing more to
    /// offer right now.
    fn pull_frames(&mut self, frame_count: usize, out: &mut [u8]) -> usize;
}

/// Parameters a [`SampleConverter`] is initialized with
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ConverterConfig {
    /// Layout of the frames pulled from the source
    pub input: BufferFormat,
    /// Channels per output frame
    pub output_channels: u16,
    /// Initial output sample rate
    pub output_rate: u32,
}

/// Converts frames pulled from a buffer into interleaved device samples
///
/// `read` runs on the real-time thread. It should not perform any operation that may wait,
/// including memory allocation or freeing.
pub trait SampleConverter: Send {
    /// Produce up to `frame_count` output frames into `out`, pulling input from `source` on demand
    ///
    /// Returns the number of frames produced; fewer than requested only when `source` ran short.
    fn read(&mut self, source: &mut dyn PullFrames, frame_count: usize, out: &mut [Sample])
        -> usize;

    /// Change the rate output frames are produced at
    ///
    /// Lowering the output rate relative to the input rate plays the source faster.
    fn set_output_rate(&mut self, rate: u32);

    /// Current output rate
    fn output_rate(&self) -> u32;

    /// Discard any input frames retained for interpolation
    fn reset(&mut self);
}

/// Constructs a [`SampleConverter`] for each new buffer
pub trait ConverterFactory: Send + Sync {
    /// Build a converter, or fail if `config` is not supported
    fn init(&self, config: &ConverterConfig) -> Result<Box<dyn SampleConverter>>;
}

/// Builds [`LinearConverter`]s
#[derive(Debug, Default, Copy, Clone)]
pub struct LinearConverterFactory;

impl ConverterFactory for LinearConverterFactory {
    fn init(&self, config: &ConverterConfig) -> Result<Box<dyn SampleConverter>> {
        Ok(Box::new(LinearConverter::new(config)?))
    }
}

/// Converter that resamples by linear interpolation
///
/// When input and output rates match, frames are passed through exactly and short reads are
/// reported unchanged.
pub struct LinearConverter {
    input: BufferFormat,
    output_channels: usize,
    output_rate: u32,
    /// Raw frames as pulled from the source
    raw: Box<[u8]>,
    /// Decoded input frames awaiting interpolation
    queue: Box<[Sample]>,
    /// Number of frames in `queue`
    queued: usize,
    /// Position of the next output frame within `queue`, in input frames
    position: f64,
}

/// Input frames decoded per pull
const BLOCK_FRAMES: usize = 256;

impl LinearConverter {
    /// Construct a converter for `config`
    pub fn new(config: &ConverterConfig) -> Result<Self> {
        let input = config.input;
        if input.channels == 0 || config.output_channels == 0 {
            return Err(Error::UnsupportedFormat(format!(
                "{} to {} channels",
                input.channels, config.output_channels
            )));
        }
        if input.sample_rate == 0 || config.output_rate == 0 {
            return Err(Error::UnsupportedFormat(format!(
                "{} Hz to {} Hz",
                input.sample_rate, config.output_rate
            )));
        }
        let output_channels = usize::from(config.output_channels);
        Ok(Self {
            input,
            output_channels,
            output_rate: config.output_rate,
            raw: vec![0; BLOCK_FRAMES * input.bytes_per_frame()].into(),
            queue: vec![0.0; BLOCK_FRAMES * output_channels].into(),
            queued: 0,
            position: 0.0,
        })
    }

    /// Input frames consumed per output frame
    fn step(&self) -> f64 {
        f64::from(self.input.sample_rate) / f64::from(self.output_rate)
    }

    fn read_direct(
        &mut self,
        source: &mut dyn PullFrames,
        frame_count: usize,
        out: &mut [Sample],
    ) -> usize {
        let bpf = self.input.bytes_per_frame();
        let ch = self.output_channels;
        let mut produced = 0;
        while produced < frame_count {
            let wanted = (frame_count - produced).min(BLOCK_FRAMES);
            let got = source
                .pull_frames(wanted, &mut self.raw[..wanted * bpf])
                .min(wanted);
            let dst = &mut out[produced * ch..(produced + got) * ch];
            for (frame, o) in self.raw[..got * bpf]
                .chunks_exact(bpf)
                .zip(dst.chunks_exact_mut(ch))
            {
                decode_frame(self.input, frame, o);
            }
            produced += got;
            if got < wanted {
                break;
            }
        }
        produced
    }

    fn read_resampled(
        &mut self,
        source: &mut dyn PullFrames,
        frame_count: usize,
        out: &mut [Sample],
    ) -> usize {
        let ch = self.output_channels;
        let step = self.step();
        let mut produced = 0;
        while produced < frame_count {
            let i0 = self.position as usize;
            if i0 + 1 >= self.queued {
                if self.fill_queue(source) {
                    continue;
                }
                let i0 = self.position as usize;
                if i0 >= self.queued {
                    break;
                }
                // Nothing follows the last queued frame; hold it
                out[produced * ch..(produced + 1) * ch]
                    .copy_from_slice(&self.queue[i0 * ch..(i0 + 1) * ch]);
                self.position += step;
                produced += 1;
                continue;
            }
            let t = (self.position - i0 as f64) as f32;
            let a = &self.queue[i0 * ch..(i0 + 1) * ch];
            let b = &self.queue[(i0 + 1) * ch..(i0 + 2) * ch];
            for ((o, &x0), &x1) in out[produced * ch..(produced + 1) * ch]
                .iter_mut()
                .zip(a)
                .zip(b)
            {
                *o = x0 + t * (x1 - x0);
            }
            self.position += step;
            produced += 1;
        }
        produced
    }

    /// Discard consumed frames and pull more. Returns whether anything new arrived.
    fn fill_queue(&mut self, source: &mut dyn PullFrames) -> bool {
        let ch = self.output_channels;
        let bpf = self.input.bytes_per_frame();
        let consumed = (self.position as usize).min(self.queued);
        self.queue.copy_within(consumed * ch..self.queued * ch, 0);
        self.queued -= consumed;
        self.position -= consumed as f64;

        let room = BLOCK_FRAMES - self.queued;
        let got = source
            .pull_frames(room, &mut self.raw[..room * bpf])
            .min(room);
        let dst = &mut self.queue[self.queued * ch..(self.queued + got) * ch];
        for (frame, o) in self.raw[..got * bpf]
            .chunks_exact(bpf)
            .zip(dst.chunks_exact_mut(ch))
        {
            decode_frame(self.input, frame, o);
        }
        self.queued += got;
        got > 0
    }
}

impl SampleConverter for LinearConverter {
    fn read(
        &mut self,
        source: &mut dyn PullFrames,
        frame_count: usize,
        out: &mut [Sample],
    ) -> usize {
        let frame_count = frame_count.min(out.len() / self.output_channels);
        if self.output_rate == self.input.sample_rate
            && self.position.fract() == 0.0
            && self.position as usize >= self.queued
        {
            // Nothing left over from resampling
            self.queued = 0;
            self.position = 0.0;
            return self.read_direct(source, frame_count, out);
        }
        self.read_resampled(source, frame_count, out)
    }

    fn set_output_rate(&mut self, rate: u32) {
        self.output_rate = rate.max(1);
    }

    fn output_rate(&self) -> u32 {
        self.output_rate
    }

    fn reset(&mut self) {
        self.queued = 0;
        self.position = 0.0;
    }
}

/// Decode one interleaved input frame into `out`, mapping channels as needed
fn decode_frame(input: BufferFormat, frame: &[u8], out: &mut [Sample]) {
    let width = input.sample_format.bytes_per_sample();
    let channels = usize::from(input.channels);
    let sample = |c: usize| input.sample_format.decode(&frame[c * width..]);
    if out.len() == channels {
        for (c, o) in out.iter_mut().enumerate() {
            *o = sample(c);
        }
    } else if out.len() == 1 {
        out[0] = (0..channels).map(sample).sum::<Sample>() / channels as Sample;
    } else {
        for (c, o) in out.iter_mut().enumerate() {
            *o = sample(c % channels);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SampleFormat;

    /// Plays back `frames` once, optionally refusing to give more than `limit` frames in total
    struct Frames {
        data: Vec<u8>,
        bpf: usize,
        cursor: usize,
        limit: usize,
    }

    impl Frames {
        fn f32(channels: usize, samples: &[f32]) -> Self {
            Self {
                data: samples.iter().flat_map(|x| x.to_le_bytes()).collect(),
                bpf: 4 * channels,
                cursor: 0,
                limit: usize::MAX,
            }
        }
    }

    impl PullFrames for Frames {
        fn pull_frames(&mut self, frame_count: usize, out: &mut [u8]) -> usize {
            let available = (self.data.len() / self.bpf - self.cursor).min(self.limit);
            let n = frame_count.min(available);
            out[..n * self.bpf]
                .copy_from_slice(&self.data[self.cursor * self.bpf..(self.cursor + n) * self.bpf]);
            self.cursor += n;
            self.limit -= n;
            n
        }
    }

    fn converter(
        channels: u16,
        rate: u32,
        output_channels: u16,
        output_rate: u32,
    ) -> LinearConverter {
        LinearConverter::new(&ConverterConfig {
            input: BufferFormat::new(SampleFormat::F32, channels, rate),
            output_channels,
            output_rate,
        })
        .unwrap()
    }

    #[test]
    fn pass_through() {
        let mut conv = converter(1, 10, 2, 10);
        let mut source = Frames::f32(1, &[1.0, 2.0, 3.0]);
        let mut out = [0.0; 8];
        assert_eq!(conv.read(&mut source, 4, &mut out), 3);
        assert_eq!(out, [1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 0.0, 0.0]);
    }

    #[test]
    fn downmix_to_mono() {
        let mut conv = converter(2, 10, 1, 10);
        let mut source = Frames::f32(2, &[1.0, 3.0, -1.0, 1.0]);
        let mut out = [0.0; 2];
        assert_eq!(conv.read(&mut source, 2, &mut out), 2);
        assert_eq!(out, [2.0, 0.0]);
    }

    #[test]
    fn half_output_rate_skips_frames() {
        let mut conv = converter(1, 20, 1, 10);
        let ramp = (0..9).map(|x| x as f32).collect::<Vec<_>>();
        let mut source = Frames::f32(1, &ramp);
        let mut out = [0.0; 4];
        assert_eq!(conv.read(&mut source, 4, &mut out), 4);
        assert_eq!(out, [0.0, 2.0, 4.0, 6.0]);
    }

    #[test]
    fn double_output_rate_interpolates() {
        let mut conv = converter(1, 10, 1, 20);
        let mut source = Frames::f32(1, &[0.0, 1.0, 2.0]);
        let mut out = [0.0; 4];
        assert_eq!(conv.read(&mut source, 4, &mut out), 4);
        assert_eq!(out, [0.0, 0.5, 1.0, 1.5]);
    }

    #[test]
    fn final_frame_is_held() {
        let mut conv = converter(1, 10, 1, 20);
        let mut source = Frames::f32(1, &[0.0, 1.0, 2.0]);
        let mut out = [-1.0; 8];
        assert_eq!(conv.read(&mut source, 8, &mut out), 6);
        assert_eq!(out[..6], [0.0, 0.5, 1.0, 1.5, 2.0, 2.0]);
        assert_eq!(conv.read(&mut source, 8, &mut out), 0);
    }

    #[test]
    fn short_source() {
        let mut conv = converter(1, 10, 1, 10);
        let mut source = Frames::f32(1, &[1.0; 8]);
        source.limit = 5;
        let mut out = [0.0; 8];
        assert_eq!(conv.read(&mut source, 8, &mut out), 5);
        source.limit = 3;
        assert_eq!(conv.read(&mut source, 8, &mut out), 3);
    }

    #[test]
    fn returns_to_pass_through() {
        let mut conv = converter(1, 10, 1, 20);
        let mut source = Frames::f32(1, &(0..600).map(|x| x as f32).collect::<Vec<_>>());
        let mut out = [0.0; 2];
        conv.read(&mut source, 2, &mut out);
        conv.reset();
        conv.set_output_rate(10);
        assert_eq!(conv.read(&mut source, 2, &mut out), 2);
        assert_eq!(out[1], out[0] + 1.0);
    }

    #[test]
    fn rejects_empty_layout() {
        let config = ConverterConfig {
            input: BufferFormat::new(SampleFormat::S16, 0, 44_100),
            output_channels: 2,
            output_rate: 44_100,
        };
        assert!(matches!(
            LinearConverterFactory.init(&config),
            Err(Error::UnsupportedFormat(_))
        ));
    }
}
