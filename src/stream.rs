//! Double-buffered streaming
//!
//! A streamed [`AudioBuffer`] is split into two halves. Each half is owned by exactly one side
//! at a time: the producer may [`refill`](AudioBuffer::refill) a half only once the mixer has
//! drained it, and the mixer reads a half only after the producer has handed it over.

use std::sync::{atomic::Ordering, Arc};

use tracing::{debug, error};

use crate::{AudioBuffer, BufferFormat, Error, Result, Usage};

impl AudioBuffer {
    /// Whether either half of a streamed buffer can accept new data
    pub fn is_ready_for_refill(&self) -> bool {
        self.data.processed.iter().any(|x| x.load(Ordering::Acquire))
    }

    /// Hand interleaved frames in the buffer's format to the mixer
    ///
    /// When both halves are free the write goes to the first and playback restarts from the
    /// front. At most one half's worth of frames is taken; the rest of the half is zeroed.
    /// Returns the number of frames copied.
    pub fn refill(&self, data: &[u8]) -> Result<usize> {
        let mut consumer = self.data.consumer();
        if self.data.usage() != Usage::Streamed {
            return Err(Error::InvalidArgument("only streamed buffers can be refilled"));
        }
        let processed = [
            self.data.processed[0].load(Ordering::Acquire),
            self.data.processed[1].load(Ordering::Acquire),
        ];
        let index = match processed {
            [true, true] => {
                self.data.rewind();
                0
            }
            [true, false] => 0,
            [false, true] => 1,
            [false, false] => {
                error!(id = ?self.id(), "refill while both sub-buffers are queued");
                return Err(Error::NotReady);
            }
        };

        let bpf = self.data.format().bytes_per_frame();
        let half = self.data.frames_count() / 2;
        let frames = data.len() / bpf;
        if frames > half {
            debug!(id = ?self.id(), frames, half, "refill truncated to one sub-buffer");
        }
        let frames = frames.min(half);
        let storage = Arc::make_mut(&mut consumer.storage);
        let region = &mut storage[index * half * bpf..(index + 1) * half * bpf];
        region[..frames * bpf].copy_from_slice(&data[..frames * bpf]);
        region[frames * bpf..].fill(0);
        self.data.processed[index].store(false, Ordering::Release);
        Ok(frames)
    }
}

/// A raw PCM stream fed by the application
///
/// Each [`update`](Self::update) supplies one sub-buffer's worth of frames; poll
/// [`is_processed`](Self::is_processed) to learn when the mixer is ready for more.
#[derive(Debug)]
pub struct AudioStream {
    buffer: AudioBuffer,
}

impl AudioStream {
    pub(crate) fn new(buffer: AudioBuffer) -> Self {
        buffer.set_looping(true);
        Self { buffer }
    }

    /// Format of the frames accepted by [`update`](Self::update)
    pub fn format(&self) -> BufferFormat {
        self.buffer.format()
    }

    /// Frames held by one sub-buffer
    pub fn sub_buffer_frames(&self) -> usize {
        self.buffer.frames_count() / 2
    }

    /// Queue `data` for playback, returning the number of frames taken
    pub fn update(&self, data: &[u8]) -> Result<usize> {
        self.buffer.refill(data)
    }

    /// Whether a sub-buffer is free for [`update`](Self::update)
    pub fn is_processed(&self) -> bool {
        self.buffer.is_ready_for_refill()
    }

    /// Start playback from the front of the queued data
    pub fn play(&self) {
        self.buffer.play();
    }

    /// Suspend playback
    pub fn pause(&self) {
        self.buffer.pause();
    }

    /// Continue after [`pause`](Self::pause)
    pub fn resume(&self) {
        self.buffer.resume();
    }

    /// Stop playback and discard queued data
    pub fn stop(&self) {
        self.buffer.stop();
    }

    /// Whether the stream is audible
    pub fn is_playing(&self) -> bool {
        self.buffer.is_playing()
    }

    /// Set the linear amplitude factor
    pub fn set_volume(&self, volume: f32) {
        self.buffer.set_volume(volume);
    }

    /// Shift pitch by resampling
    pub fn set_pitch(&self, pitch: f32) -> Result<()> {
        self.buffer.set_pitch(pitch)
    }

    /// The underlying streamed buffer
    pub fn buffer(&self) -> &AudioBuffer {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;
    use crate::SampleFormat;

    const FORMAT: BufferFormat = BufferFormat::new(SampleFormat::S16, 1, 44_100);

    fn context() -> crate::Context {
        crate::context().pool_voices(0).build().unwrap().0
    }

    fn frames(value: i16, n: usize) -> Vec<u8> {
        (0..n).flat_map(|_| value.to_le_bytes()).collect()
    }

    fn samples(bytes: &[u8]) -> Vec<i16> {
        bytes
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect()
    }

    #[test]
    fn drain_then_underrun() {
        let ctx = context();
        let buffer = ctx.create_buffer(FORMAT, 1024, Usage::Streamed).unwrap();
        assert_eq!(buffer.refill(&frames(7, 512)).unwrap(), 512);
        assert!(!buffer.is_sub_buffer_processed(0));
        buffer.play();

        let mut out = vec![0; 256 * 2];
        assert_eq!(buffer.pull_frames(256, &mut out), 256);
        assert!(samples(&out).iter().all(|&x| x == 7));
        assert!(!buffer.is_sub_buffer_processed(0));
        assert_eq!(buffer.pull_frames(256, &mut out), 256);
        assert!(buffer.is_sub_buffer_processed(0));
        for _ in 0..3 {
            assert_eq!(buffer.pull_frames(256, &mut out), 0);
        }
        assert_eq!(buffer.frames_processed(), 512);
        assert_eq!(buffer.underruns(), 3);
        // Underrun never stops the stream
        assert!(buffer.is_playing());
    }

    #[test]
    fn refill_picks_free_half() {
        let ctx = context();
        let buffer = ctx.create_buffer(FORMAT, 8, Usage::Streamed).unwrap();
        assert!(buffer.is_ready_for_refill());
        buffer.refill(&frames(1, 4)).unwrap();
        buffer.refill(&frames(2, 4)).unwrap();
        assert!(!buffer.is_ready_for_refill());
        assert!(matches!(buffer.refill(&frames(3, 4)), Err(Error::NotReady)));
        buffer.play();

        let mut out = vec![0; 4 * 2];
        assert_eq!(buffer.pull_frames(4, &mut out), 4);
        assert_eq!(samples(&out), [1; 4]);
        assert!(buffer.is_sub_buffer_processed(0));
        assert!(!buffer.is_sub_buffer_processed(1));
        buffer.refill(&frames(3, 4)).unwrap();

        assert_eq!(buffer.pull_frames(4, &mut out), 4);
        assert_eq!(samples(&out), [2; 4]);
        assert_eq!(buffer.pull_frames(4, &mut out), 4);
        assert_eq!(samples(&out), [3; 4]);
    }

    #[test]
    fn short_refill_is_zero_padded() {
        let ctx = context();
        let buffer = ctx.create_buffer(FORMAT, 8, Usage::Streamed).unwrap();
        buffer.refill(&frames(9, 4)).unwrap();
        buffer.play();
        let mut out = vec![0; 4 * 2];
        buffer.pull_frames(4, &mut out);
        buffer.stop();
        assert_eq!(buffer.refill(&frames(5, 2)).unwrap(), 2);
        buffer.play();
        assert_eq!(buffer.pull_frames(4, &mut out), 4);
        assert_eq!(samples(&out), [5, 5, 0, 0]);
    }

    #[test]
    fn oversize_refill_is_truncated() {
        let ctx = context();
        let buffer = ctx.create_buffer(FORMAT, 8, Usage::Streamed).unwrap();
        assert_eq!(buffer.refill(&frames(1, 10)).unwrap(), 4);
        assert!(buffer.is_sub_buffer_processed(1));
    }

    #[test]
    fn both_free_restarts_from_front() {
        let ctx = context();
        let buffer = ctx.create_buffer(FORMAT, 8, Usage::Streamed).unwrap();
        buffer.refill(&frames(1, 4)).unwrap();
        buffer.play();
        let mut out = vec![0; 3 * 2];
        buffer.pull_frames(3, &mut out);
        assert_eq!(buffer.frame_cursor(), 3);
        buffer.pull_frames(3, &mut out);
        assert_eq!(buffer.frame_cursor(), 4);
        // Both halves free again
        buffer.refill(&frames(2, 4)).unwrap();
        assert_eq!(buffer.frame_cursor(), 0);
        assert_eq!(buffer.pull_frames(3, &mut out), 3);
        assert_eq!(samples(&out), [2; 3]);
    }

    #[test]
    fn static_buffers_cannot_be_refilled() {
        let ctx = context();
        let buffer = ctx.create_buffer(FORMAT, 8, Usage::Static).unwrap();
        assert!(matches!(
            buffer.refill(&frames(1, 4)),
            Err(Error::InvalidArgument(_))
        ));
    }

    /// Randomly interleave producer and consumer steps, checking that each half only moves
    /// processed -> queued by refill and queued -> processed by a read that finished it, and that
    /// frames come out in the order they went in.
    #[test]
    fn randomized_handoff() {
        const HALF: usize = 16;
        let ctx = context();
        let buffer = ctx
            .create_buffer(FORMAT, 2 * HALF, Usage::Streamed)
            .unwrap();
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut next_written = 0i16;
        let mut next_read = 0i16;
        let mut started = false;
        let mut out = vec![0; 2 * HALF * 2];

        for _ in 0..10_000 {
            let before = [
                buffer.is_sub_buffer_processed(0),
                buffer.is_sub_buffer_processed(1),
            ];
            if rng.random_bool(0.5) {
                if !buffer.is_ready_for_refill() {
                    continue;
                }
                if before == [true, true] {
                    // Restart: anything still unread was already consumed
                    assert_eq!(next_read, next_written);
                }
                let data = (0..HALF as i16)
                    .flat_map(|i| (next_written + i).to_le_bytes())
                    .collect::<Vec<_>>();
                buffer.refill(&data).unwrap();
                next_written += HALF as i16;
                if !started {
                    buffer.play();
                    started = true;
                }
                let after = [
                    buffer.is_sub_buffer_processed(0),
                    buffer.is_sub_buffer_processed(1),
                ];
                let flipped = (0..2).filter(|&i| before[i] != after[i]).collect::<Vec<_>>();
                assert_eq!(flipped.len(), 1);
                assert!(before[flipped[0]] && !after[flipped[0]]);
            } else {
                let n = rng.random_range(1..=2 * HALF);
                let read = buffer.pull_frames(n, &mut out);
                for x in samples(&out[..read * 2]) {
                    assert_eq!(x, next_read);
                    next_read += 1;
                }
                let after = [
                    buffer.is_sub_buffer_processed(0),
                    buffer.is_sub_buffer_processed(1),
                ];
                for i in 0..2 {
                    // Reads only ever release halves
                    assert!(!before[i] || after[i]);
                }
            }
            if next_written > 16_000 {
                break;
            }
        }
        assert!(next_read > 0);
    }
}
