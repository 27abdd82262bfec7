use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard, PoisonError, TryLockError,
    },
    time::Duration,
};

use tracing::{debug, error, trace};

use crate::{
    convert::{ConverterConfig, ConverterFactory, PullFrames, SampleConverter},
    registry::{BufferId, Registry},
    BufferFormat, Error, Result,
};

/// How a buffer's storage is consumed during playback
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Usage {
    /// Fully resident; loops by wrapping the cursor
    Static,
    /// Split into two halves which are alternately refilled by the application and drained by
    /// the mixer
    Streamed,
}

/// A playable unit of PCM data, registered with the context that created it
///
/// Dropping the buffer unregisters it before its storage is released.
pub struct AudioBuffer {
    id: BufferId,
    pub(crate) data: Arc<BufferData>,
    registry: Arc<Registry>,
}

impl AudioBuffer {
    /// Allocate zeroed storage and register the buffer
    pub(crate) fn new(
        registry: &Arc<Registry>,
        config: ConverterConfig,
        frames_count: usize,
        usage: Usage,
        factory: &dyn ConverterFactory,
    ) -> Result<Self> {
        let data = match BufferData::new(config, frames_count, usage, factory) {
            Ok(data) => Arc::new(data),
            Err(e) => {
                error!(error = %e, format = ?config.input, frames_count, "failed to create audio buffer");
                return Err(e);
            }
        };
        let id = registry.register(data.clone());
        trace!(?id, frames_count, ?usage, "audio buffer created");
        Ok(Self {
            id,
            data,
            registry: registry.clone(),
        })
    }

    /// Handle identifying this buffer within its context
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Unregister the buffer and release its storage
    ///
    /// Equivalent to dropping it.
    pub fn destroy(self) {}

    /// Start playback from the first frame
    pub fn play(&self) {
        let _consumer = self.data.consumer();
        self.data.play();
    }

    /// Start playback without moving the cursor
    pub(crate) fn start(&self) {
        let _consumer = self.data.consumer();
        self.data.playing.store(true, Ordering::Relaxed);
        self.data.paused.store(false, Ordering::Relaxed);
    }

    /// Stop playback, rewind, and hand both sub-buffers back to the producer
    ///
    /// Has no effect unless the buffer is audible.
    pub fn stop(&self) {
        let _consumer = self.data.consumer();
        self.data.stop();
    }

    /// Suspend playback, keeping the cursor where it is
    pub fn pause(&self) {
        self.data.paused.store(true, Ordering::Relaxed);
    }

    /// Continue playback after [`pause`](Self::pause)
    pub fn resume(&self) {
        self.data.paused.store(false, Ordering::Relaxed);
    }

    /// Whether the buffer is playing and not paused
    pub fn is_playing(&self) -> bool {
        self.data.is_audible()
    }

    /// Whether the buffer is paused
    pub fn is_paused(&self) -> bool {
        self.data.paused.load(Ordering::Relaxed)
    }

    /// Whether static playback wraps to the start at the end of the data
    pub fn is_looping(&self) -> bool {
        self.data.is_looping()
    }

    /// Control wrapping at the end of static data
    pub fn set_looping(&self, looping: bool) {
        self.data.looping.store(looping, Ordering::Relaxed);
    }

    /// Linear amplitude factor applied while mixing
    pub fn volume(&self) -> f32 {
        self.data.volume()
    }

    /// Set the linear amplitude factor applied while mixing
    pub fn set_volume(&self, volume: f32) {
        self.data.volume.store(volume.to_bits(), Ordering::Relaxed);
    }

    /// Current pitch factor
    pub fn pitch(&self) -> f32 {
        f32::from_bits(self.data.pitch.load(Ordering::Relaxed))
    }

    /// Shift pitch by resampling
    ///
    /// The output rate requested from the converter is scaled by `previous_pitch / pitch`, so
    /// raising the pitch also shortens playback.
    pub fn set_pitch(&self, pitch: f32) -> Result<()> {
        if !pitch.is_finite() || pitch <= 0.0 {
            return Err(Error::InvalidArgument("pitch must be finite and positive"));
        }
        let previous_pitch = self.pitch();
        let previous_rate = self.output_rate();
        let rate = previous_rate * (previous_pitch / pitch);
        self.data.output_rate.store(rate.to_bits(), Ordering::Relaxed);
        self.data.pitch.store(pitch.to_bits(), Ordering::Relaxed);
        Ok(())
    }

    /// Output rate currently requested from the converter
    pub fn output_rate(&self) -> f32 {
        self.data.output_rate()
    }

    /// Index of the next frame to be read
    pub fn frame_cursor(&self) -> usize {
        self.data.cursor.load(Ordering::Relaxed)
    }

    /// Frames delivered since the buffer was last stopped
    pub fn frames_processed(&self) -> u64 {
        self.data.frames_processed.load(Ordering::Relaxed)
    }

    /// Reads of a streamed buffer that came up short because the next half was not refilled
    pub fn underruns(&self) -> u64 {
        self.data.underruns.load(Ordering::Relaxed)
    }

    /// Whether sub-buffer `index` (0 or 1) is available to the producer
    ///
    /// # Panics
    ///
    /// Panics if `index` is greater than 1.
    pub fn is_sub_buffer_processed(&self, index: usize) -> bool {
        self.data.processed[index].load(Ordering::Acquire)
    }

    /// Total frame capacity
    pub fn frames_count(&self) -> usize {
        self.data.frames_count()
    }

    /// How storage is consumed
    pub fn usage(&self) -> Usage {
        self.data.usage()
    }

    /// Layout of the stored frames
    pub fn format(&self) -> BufferFormat {
        self.data.format()
    }

    /// Playback time implied by [`frames_processed`](Self::frames_processed)
    pub fn time_played(&self) -> Duration {
        let rate = self.format().sample_rate;
        Duration::from_secs_f64(self.frames_processed() as f64 / f64::from(rate))
    }

    /// Copy up to `frame_count` frames in the buffer's own format into `out`
    ///
    /// Static buffers wrap at the end of the data when looping and otherwise stop there.
    /// Streamed buffers read only sub-buffers the producer has handed over, so a short count
    /// signals underrun.
    pub fn pull_frames(&self, frame_count: usize, out: &mut [u8]) -> usize {
        let consumer = self.data.consumer();
        let read = self
            .data
            .reader(&consumer.storage)
            .pull_frames(frame_count, out);
        if self.data.is_drained() {
            self.data.stop();
        }
        read
    }

    /// Overwrite static storage from the front with `data`, stopping playback first
    ///
    /// Returns the number of frames written. Voices already sharing the old data keep it.
    pub(crate) fn write_static(&self, data: &[u8]) -> usize {
        let mut consumer = self.data.consumer();
        self.data.stop();
        let bpf = self.data.format().bytes_per_frame();
        let frames = (data.len() / bpf).min(self.data.frames_count());
        let storage = Arc::make_mut(&mut consumer.storage);
        storage[..frames * bpf].copy_from_slice(&data[..frames * bpf]);
        frames
    }

    /// Make this buffer play `source`'s data with `source`'s playback parameters
    ///
    /// Storage is shared rather than copied. The converter is rebuilt only when the source's
    /// format differs from the current one.
    pub(crate) fn assign(
        &self,
        source: &AudioBuffer,
        factory: &dyn ConverterFactory,
        output_channels: u16,
        output_rate: u32,
    ) -> Result<()> {
        let storage = source.data.consumer().storage.clone();
        let format = source.data.format();
        let mut consumer = self.data.consumer();
        if self.data.format() != format {
            consumer.converter = factory.init(&ConverterConfig {
                input: format,
                output_channels,
                output_rate,
            })?;
        } else {
            consumer.converter.reset();
        }
        consumer.storage = storage;
        self.data
            .set_layout(format, source.data.frames_count(), source.data.usage());

        let params = &source.data;
        for (to, from) in [
            (&self.data.volume, &params.volume),
            (&self.data.pitch, &params.pitch),
            (&self.data.output_rate, &params.output_rate),
        ] {
            to.store(from.load(Ordering::Relaxed), Ordering::Relaxed);
        }
        self.data
            .looping
            .store(params.is_looping(), Ordering::Relaxed);
        self.data.cursor.store(0, Ordering::Relaxed);
        self.data.drained.store(false, Ordering::Relaxed);
        self.data.processed[0].store(false, Ordering::Release);
        self.data.processed[1].store(false, Ordering::Release);
        Ok(())
    }
}

impl Drop for AudioBuffer {
    fn drop(&mut self) {
        match self.registry.unregister(self.id) {
            Some(_) => trace!(id = ?self.id, "audio buffer destroyed"),
            None => debug!(id = ?self.id, "destroyed audio buffer was not registered"),
        }
    }
}

impl fmt::Debug for AudioBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioBuffer")
            .field("id", &self.id)
            .field("playing", &self.data.playing.load(Ordering::Relaxed))
            .field("paused", &self.is_paused())
            .field("cursor", &self.frame_cursor())
            .finish_non_exhaustive()
    }
}

/// State shared between an [`AudioBuffer`], the registry and the mixer
///
/// Fields read by the mixing thread and written elsewhere are atomics. Storage, the converter
/// and cursor movement sit behind `consumer`; the mixer only ever `try_lock`s it, so queries must
/// not take it.
pub(crate) struct BufferData {
    /// [`BufferFormat::pack`]ed layout of `storage`
    format: AtomicU64,
    frames_count: AtomicUsize,
    streamed: AtomicBool,
    playing: AtomicBool,
    paused: AtomicBool,
    looping: AtomicBool,
    volume: AtomicU32,
    pitch: AtomicU32,
    /// Requested converter output rate, as `f32` bits
    output_rate: AtomicU32,
    pub(crate) processed: [AtomicBool; 2],
    cursor: AtomicUsize,
    frames_processed: AtomicU64,
    underruns: AtomicU64,
    /// Set when the cursor was reset, so stale converter history gets dropped
    rewound: AtomicBool,
    /// Set when a non-looping static read reached the end of the data
    drained: AtomicBool,
    consumer: Mutex<Consumer>,
}

pub(crate) struct Consumer {
    pub(crate) storage: Arc<Vec<u8>>,
    pub(crate) converter: Box<dyn SampleConverter>,
}

impl Consumer {
    /// Borrow a reader over the stored frames alongside the converter that consumes them
    pub(crate) fn split<'a>(
        &'a mut self,
        data: &'a BufferData,
    ) -> (Reader<'a>, &'a mut dyn SampleConverter) {
        (data.reader(&self.storage), &mut *self.converter)
    }
}

impl BufferData {
    fn new(
        config: ConverterConfig,
        frames_count: usize,
        usage: Usage,
        factory: &dyn ConverterFactory,
    ) -> Result<Self> {
        let storage = allocate(frames_count, config.input.bytes_per_frame())?;
        let converter = factory.init(&config)?;
        Ok(Self {
            format: AtomicU64::new(config.input.pack()),
            frames_count: AtomicUsize::new(frames_count),
            streamed: AtomicBool::new(usage == Usage::Streamed),
            playing: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            looping: AtomicBool::new(false),
            volume: AtomicU32::new(1.0f32.to_bits()),
            pitch: AtomicU32::new(1.0f32.to_bits()),
            output_rate: AtomicU32::new((config.output_rate as f32).to_bits()),
            processed: [AtomicBool::new(true), AtomicBool::new(true)],
            cursor: AtomicUsize::new(0),
            frames_processed: AtomicU64::new(0),
            underruns: AtomicU64::new(0),
            rewound: AtomicBool::new(false),
            drained: AtomicBool::new(false),
            consumer: Mutex::new(Consumer {
                storage: Arc::new(storage),
                converter,
            }),
        })
    }

    pub(crate) fn format(&self) -> BufferFormat {
        BufferFormat::unpack(self.format.load(Ordering::Relaxed))
    }

    pub(crate) fn frames_count(&self) -> usize {
        self.frames_count.load(Ordering::Relaxed)
    }

    pub(crate) fn usage(&self) -> Usage {
        match self.streamed.load(Ordering::Relaxed) {
            true => Usage::Streamed,
            false => Usage::Static,
        }
    }

    /// Caller must hold the consumer lock
    fn set_layout(&self, format: BufferFormat, frames_count: usize, usage: Usage) {
        self.format.store(format.pack(), Ordering::Relaxed);
        self.frames_count.store(frames_count, Ordering::Relaxed);
        self.streamed
            .store(usage == Usage::Streamed, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn is_audible(&self) -> bool {
        self.playing.load(Ordering::Relaxed) && !self.paused.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn is_looping(&self) -> bool {
        self.looping.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn volume(&self) -> f32 {
        f32::from_bits(self.volume.load(Ordering::Relaxed))
    }

    #[inline]
    pub(crate) fn output_rate(&self) -> f32 {
        f32::from_bits(self.output_rate.load(Ordering::Relaxed))
    }

    /// Caller must hold the consumer lock
    pub(crate) fn play(&self) {
        self.playing.store(true, Ordering::Relaxed);
        self.paused.store(false, Ordering::Relaxed);
        self.cursor.store(0, Ordering::Relaxed);
        self.rewound.store(true, Ordering::Relaxed);
        self.drained.store(false, Ordering::Relaxed);
    }

    /// Caller must hold the consumer lock
    pub(crate) fn stop(&self) {
        if !self.is_audible() {
            return;
        }
        self.playing.store(false, Ordering::Relaxed);
        self.paused.store(false, Ordering::Relaxed);
        self.cursor.store(0, Ordering::Relaxed);
        self.frames_processed.store(0, Ordering::Relaxed);
        self.processed[0].store(true, Ordering::Release);
        self.processed[1].store(true, Ordering::Release);
        self.rewound.store(true, Ordering::Relaxed);
        self.drained.store(false, Ordering::Relaxed);
    }

    /// Whether static data ran out with nothing left to read
    #[inline]
    pub(crate) fn is_drained(&self) -> bool {
        self.drained.load(Ordering::Relaxed)
    }

    #[inline]
    fn advance(&self, frames: usize) {
        self.frames_processed
            .fetch_add(frames as u64, Ordering::Relaxed);
    }

    /// Move the cursor back to the first frame. Caller must hold the consumer lock.
    pub(crate) fn rewind(&self) {
        self.cursor.store(0, Ordering::Relaxed);
    }

    pub(crate) fn consumer(&self) -> MutexGuard<'_, Consumer> {
        self.consumer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the consumer state without waiting
    pub(crate) fn try_consumer(&self) -> Option<MutexGuard<'_, Consumer>> {
        match self.consumer.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(e)) => Some(e.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    /// Bring the converter in line with pitch changes and rewinds made since the last read
    pub(crate) fn sync_converter(&self, converter: &mut dyn SampleConverter) {
        if self.rewound.swap(false, Ordering::Relaxed) {
            converter.reset();
        }
        let rate = self.output_rate().round().max(1.0) as u32;
        if converter.output_rate() != rate {
            converter.set_output_rate(rate);
        }
    }

    /// Caller must hold the consumer lock that guards `storage`
    pub(crate) fn reader<'a>(&'a self, storage: &'a [u8]) -> Reader<'a> {
        Reader {
            data: self,
            storage,
            frames_count: self.frames_count(),
            usage: self.usage(),
            bytes_per_frame: self.format().bytes_per_frame(),
        }
    }
}

fn allocate(frames_count: usize, bytes_per_frame: usize) -> Result<Vec<u8>> {
    let bytes = frames_count
        .checked_mul(bytes_per_frame)
        .ok_or(Error::Alloc { bytes: usize::MAX })?;
    let mut storage = Vec::new();
    storage
        .try_reserve_exact(bytes)
        .map_err(|_| Error::Alloc { bytes })?;
    storage.resize(bytes, 0);
    Ok(storage)
}

/// Read access to a buffer's frames, valid while its consumer lock is held
pub(crate) struct Reader<'a> {
    data: &'a BufferData,
    storage: &'a [u8],
    frames_count: usize,
    usage: Usage,
    bytes_per_frame: usize,
}

impl Reader<'_> {
    fn pull_static(&mut self, frame_count: usize, out: &mut [u8]) -> usize {
        let bpf = self.bytes_per_frame;
        let total = self.frames_count;
        if self.data.is_drained() {
            return 0;
        }
        let mut cursor = self.data.cursor.load(Ordering::Relaxed) % total;
        let mut read = 0;
        while read < frame_count {
            let n = (frame_count - read).min(total - cursor);
            out[read * bpf..(read + n) * bpf]
                .copy_from_slice(&self.storage[cursor * bpf..(cursor + n) * bpf]);
            read += n;
            self.data.advance(n);
            cursor = (cursor + n) % total;
            if cursor == 0 && !self.data.is_looping() {
                // End of data. Playback stops once the consumer of these frames runs dry.
                self.data.drained.store(true, Ordering::Relaxed);
                break;
            }
        }
        self.data.cursor.store(cursor, Ordering::Relaxed);
        read
    }

    fn pull_streamed(&mut self, frame_count: usize, out: &mut [u8]) -> usize {
        let bpf = self.bytes_per_frame;
        let total = self.frames_count;
        let half = total / 2;
        let mut cursor = self.data.cursor.load(Ordering::Relaxed) % total;
        let mut read = 0;
        while read < frame_count {
            let index = cursor / half;
            if self.data.processed[index].load(Ordering::Acquire) {
                // The producer has not handed this half over yet
                self.data.underruns.fetch_add(1, Ordering::Relaxed);
                break;
            }
            let end = (index + 1) * half;
            let n = (frame_count - read).min(end - cursor);
            out[read * bpf..(read + n) * bpf]
                .copy_from_slice(&self.storage[cursor * bpf..(cursor + n) * bpf]);
            read += n;
            self.data.advance(n);
            cursor = (cursor + n) % total;
            if cursor % half == 0 {
                self.data.processed[index].store(true, Ordering::Release);
            }
        }
        self.data.cursor.store(cursor, Ordering::Relaxed);
        read
    }
}

impl PullFrames for Reader<'_> {
    fn pull_frames(&mut self, frame_count: usize, out: &mut [u8]) -> usize {
        let frame_count = frame_count.min(out.len() / self.bytes_per_frame);
        if frame_count == 0 || self.frames_count == 0 {
            return 0;
        }
        match self.usage {
            Usage::Static => self.pull_static(frame_count, out),
            Usage::Streamed if self.frames_count < 2 => 0,
            Usage::Streamed => self.pull_streamed(frame_count, out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SampleFormat, Wave};

    const RATE: u32 = 10;

    fn context() -> crate::Context {
        crate::context()
            .sample_rate(RATE)
            .channels(1)
            .pool_voices(0)
            .build()
            .unwrap()
            .0
    }

    fn decode(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect()
    }

    #[test]
    fn new_buffer_is_idle() {
        let ctx = context();
        let format = BufferFormat::new(SampleFormat::S16, 2, RATE);
        let buffer = ctx.create_buffer(format, 8, Usage::Streamed).unwrap();
        assert!(!buffer.is_playing());
        assert!(buffer.is_sub_buffer_processed(0));
        assert!(buffer.is_sub_buffer_processed(1));
        assert_eq!(buffer.frame_cursor(), 0);
        assert_eq!(buffer.volume(), 1.0);
        assert_eq!(buffer.pitch(), 1.0);
    }

    #[test]
    fn stop_is_idempotent() {
        let ctx = context();
        let sound = ctx
            .load_sound(&Wave::from_samples(RATE, 1, &[1.0; 8]))
            .unwrap();
        let buffer = sound.buffer();
        buffer.play();
        let mut out = [0; 12];
        assert_eq!(buffer.pull_frames(3, &mut out), 3);
        buffer.stop();
        buffer.stop();
        assert!(!buffer.is_playing());
        assert!(!buffer.is_paused());
        assert_eq!(buffer.frame_cursor(), 0);
        assert_eq!(buffer.frames_processed(), 0);
        assert!(buffer.is_sub_buffer_processed(0));
        assert!(buffer.is_sub_buffer_processed(1));
    }

    #[test]
    fn pause_resume_keeps_position() {
        let ctx = context();
        let sound = ctx
            .load_sound(&Wave::from_samples(RATE, 1, &[1.0; 8]))
            .unwrap();
        let buffer = sound.buffer();
        buffer.play();
        let mut out = [0; 20];
        buffer.pull_frames(5, &mut out);
        let (cursor, processed) = (buffer.frame_cursor(), buffer.frames_processed());
        buffer.pause();
        assert!(!buffer.is_playing());
        buffer.resume();
        assert!(buffer.is_playing());
        assert_eq!(buffer.frame_cursor(), cursor);
        assert_eq!(buffer.frames_processed(), processed);
    }

    #[test]
    fn pitch_composes() {
        let ctx = context();
        let format = BufferFormat::new(SampleFormat::F32, 1, RATE);
        let buffer = ctx.create_buffer(format, 4, Usage::Static).unwrap();
        buffer.set_pitch(2.0).unwrap();
        assert_eq!(buffer.output_rate(), RATE as f32 / 2.0);
        buffer.set_pitch(0.8).unwrap();
        assert!((buffer.output_rate() - RATE as f32 / 0.8).abs() < 1e-4);
        assert_eq!(buffer.pitch(), 0.8);
        assert!(buffer.set_pitch(0.0).is_err());
        assert!(buffer.set_pitch(f32::NAN).is_err());
        assert_eq!(buffer.pitch(), 0.8);
    }

    #[test]
    fn static_pull_stops_at_end() {
        let ctx = context();
        let sound = ctx
            .load_sound(&Wave::from_samples(RATE, 1, &[1.0, 2.0, 3.0, 4.0]))
            .unwrap();
        let buffer = sound.buffer();
        buffer.play();
        let mut out = [0; 24];
        assert_eq!(buffer.pull_frames(3, &mut out), 3);
        assert_eq!(buffer.pull_frames(3, &mut out), 1);
        assert_eq!(decode(&out[..4]), [4.0]);
        assert!(!buffer.is_playing());
        assert_eq!(buffer.frame_cursor(), 0);
    }

    #[test]
    fn paused_pull_past_end_rewinds() {
        let ctx = context();
        let sound = ctx
            .load_sound(&Wave::from_samples(RATE, 1, &[1.0, 2.0, 3.0, 4.0]))
            .unwrap();
        let buffer = sound.buffer();
        buffer.play();
        let mut out = [0; 16];
        assert_eq!(buffer.pull_frames(2, &mut out), 2);
        buffer.pause();
        assert_eq!(buffer.pull_frames(4, &mut out), 2);
        assert_eq!(decode(&out[..8]), [3.0, 4.0]);
        assert_eq!(buffer.frame_cursor(), 0);
        // The end was reached; nothing is replayed
        assert_eq!(buffer.pull_frames(4, &mut out), 0);
        buffer.resume();
        assert_eq!(buffer.pull_frames(4, &mut out), 0);
        assert!(!buffer.is_playing());
        buffer.play();
        assert_eq!(buffer.pull_frames(4, &mut out), 4);
        assert_eq!(decode(&out), [1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn static_pull_wraps_when_looping() {
        let ctx = context();
        let sound = ctx
            .load_sound(&Wave::from_samples(RATE, 1, &[1.0, 2.0, 3.0]))
            .unwrap();
        let buffer = sound.buffer();
        buffer.set_looping(true);
        buffer.play();
        let mut out = [0; 28];
        assert_eq!(buffer.pull_frames(7, &mut out), 7);
        assert_eq!(decode(&out), [1.0, 2.0, 3.0, 1.0, 2.0, 3.0, 1.0]);
        assert_eq!(buffer.frame_cursor(), 1);
        assert!(buffer.is_playing());
    }

    #[test]
    fn destroy_unregisters() {
        let ctx = context();
        let format = BufferFormat::new(SampleFormat::U8, 1, RATE);
        let buffer = ctx.create_buffer(format, 16, Usage::Static).unwrap();
        assert_eq!(ctx.buffer_count(), 1);
        buffer.destroy();
        assert_eq!(ctx.buffer_count(), 0);
    }

    #[test]
    fn rejects_bad_capacity() {
        let ctx = context();
        let format = BufferFormat::new(SampleFormat::F32, 1, RATE);
        assert!(matches!(
            ctx.create_buffer(format, 0, Usage::Static),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            ctx.create_buffer(format, 7, Usage::Streamed),
            Err(Error::InvalidArgument(_))
        ));
        let unsupported = BufferFormat::new(SampleFormat::F32, 0, RATE);
        assert!(matches!(
            ctx.create_buffer(unsupported, 4, Usage::Static),
            Err(Error::UnsupportedFormat(_))
        ));
        assert_eq!(ctx.buffer_count(), 0);
    }
}
