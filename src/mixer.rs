use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

use crate::{registry::Registry, Limiter, Sample};

/// Receives periods of output audio from the platform audio device
///
/// The device glue calls [`render`](Self::render) from its real-time callback, e.g. the data
/// callback in cpal's `build_output_stream`.
pub trait AudioSink: Send {
    /// Overwrite the first `frame_count` interleaved frames of `output` with the next period
    fn render(&mut self, output: &mut [Sample], frame_count: usize);
}

/// Mixes every playing buffer of a [`Context`](crate::Context) into device output
///
/// Constructed alongside its context by [`Builder::build`](crate::Builder::build).
pub struct Mixer {
    registry: Arc<Registry>,
    master_volume: Arc<AtomicU32>,
    channels: usize,
    max_render_frames: usize,
    limiter: Limiter,
    /// Converted frames of one buffer awaiting accumulation
    scratch: Box<[Sample]>,
}

/// Samples converted per chunk
const SCRATCH_SAMPLES: usize = 1024;

impl Mixer {
    pub(crate) fn new(
        registry: Arc<Registry>,
        master_volume: Arc<AtomicU32>,
        channels: u16,
        max_render_frames: usize,
        limiter: Limiter,
    ) -> Self {
        let channels = usize::from(channels);
        Self {
            registry,
            master_volume,
            channels,
            max_render_frames,
            limiter,
            // At least one frame per chunk, however wide the device
            scratch: vec![0.0; SCRATCH_SAMPLES.max(channels)].into(),
        }
    }

    /// Channels per output frame
    pub fn channels(&self) -> u16 {
        self.channels as u16
    }

    /// Largest period [`render`](AudioSink::render) is expected to be asked for
    pub fn max_render_frames(&self) -> usize {
        self.max_render_frames
    }

    fn mix(&mut self, output: &mut [Sample]) {
        let ch = self.channels;
        let frame_count = output.len() / ch;
        let chunk_frames = self.scratch.len() / ch;
        let master = f32::from_bits(self.master_volume.load(Ordering::Relaxed));

        let table = self.registry.lock();
        for data in table.iter() {
            if !data.is_audible() {
                continue;
            }
            // Never wait on an application thread; a busy buffer sits this period out
            let Some(mut consumer) = data.try_consumer() else {
                continue;
            };
            let (mut reader, converter) = consumer.split(data);
            data.sync_converter(&mut *converter);
            let gain = data.volume() * master;

            let mut done = 0;
            while done < frame_count {
                let wanted = (frame_count - done).min(chunk_frames);
                let staging = &mut self.scratch[..wanted * ch];
                let got = converter.read(&mut reader, wanted, staging).min(wanted);
                for (o, &s) in output[done * ch..(done + got) * ch]
                    .iter_mut()
                    .zip(&staging[..got * ch])
                {
                    *o += s * gain;
                }
                done += got;
                if got < wanted {
                    // Streams run dry without stopping; the rest of their period is silence
                    if data.is_drained() {
                        data.stop();
                    }
                    break;
                }
            }
        }
        drop(table);

        self.limiter.apply(output);
    }
}

impl AudioSink for Mixer {
    fn render(&mut self, output: &mut [Sample], frame_count: usize) {
        let len = (frame_count * self.channels).min(output.len());
        let output = &mut output[..len - len % self.channels];
        output.fill(0.0);
        self.mix(output);
    }
}
