use tracing::debug;

use crate::{AudioStream, BufferFormat, Result, Wave};

/// Decoded PCM produced incrementally, e.g. by a file decoder
pub trait PcmSource: Send {
    /// Layout of the frames produced
    fn format(&self) -> BufferFormat;

    /// Total frames in one pass over the source
    fn frame_count(&self) -> usize;

    /// Write as many whole frames as fit into `out`, returning the number written
    ///
    /// Returns fewer than fit only once the end of the source is reached.
    fn read_frames(&mut self, out: &mut [u8]) -> usize;

    /// Move back to the first frame
    fn seek_start(&mut self);
}

/// [`PcmSource`] over a [`Wave`] already in memory
#[derive(Debug, Clone)]
pub struct WaveSource {
    wave: Wave,
    cursor: usize,
}

impl WaveSource {
    /// Read `wave` from the start
    pub fn new(wave: Wave) -> Self {
        Self { wave, cursor: 0 }
    }
}

impl PcmSource for WaveSource {
    fn format(&self) -> BufferFormat {
        self.wave.format()
    }

    fn frame_count(&self) -> usize {
        self.wave.frame_count()
    }

    fn read_frames(&mut self, out: &mut [u8]) -> usize {
        let bpf = self.wave.format().bytes_per_frame();
        let n = (out.len() / bpf).min(self.wave.frame_count() - self.cursor);
        let start = self.cursor * bpf;
        out[..n * bpf].copy_from_slice(&self.wave.data()[start..start + n * bpf]);
        self.cursor += n;
        n
    }

    fn seek_start(&mut self) {
        self.cursor = 0;
    }
}

/// Long-form audio streamed from a [`PcmSource`]
///
/// Call [`update`](Self::update) regularly, e.g. once per game frame, to keep the stream fed.
pub struct Music<S> {
    stream: AudioStream,
    source: S,
    /// One sub-buffer's worth of bytes
    staging: Vec<u8>,
    /// Passes left to play; 0 repeats forever
    loop_count: u32,
    /// The source has been read to its end in the current pass
    exhausted: bool,
}

impl<S: PcmSource> Music<S> {
    pub(crate) fn new(stream: AudioStream, source: S) -> Self {
        let staging = vec![0; stream.sub_buffer_frames() * stream.format().bytes_per_frame()];
        Self {
            stream,
            source,
            staging,
            loop_count: 0,
            exhausted: false,
        }
    }

    /// Start or continue playback from the current position
    pub fn play(&mut self) -> Result<()> {
        self.stream.buffer().start();
        self.update()
    }

    /// Suspend playback
    pub fn pause(&self) {
        self.stream.pause();
    }

    /// Continue after [`pause`](Self::pause)
    pub fn resume(&self) {
        self.stream.resume();
    }

    /// Stop playback and rewind to the start of the source
    pub fn stop(&mut self) {
        let buffer = self.stream.buffer();
        // A paused buffer would ignore the stop
        buffer.resume();
        buffer.stop();
        self.source.seek_start();
        self.exhausted = false;
    }

    /// Whether the music is audible
    pub fn is_playing(&self) -> bool {
        self.stream.is_playing()
    }

    /// Refill every drained sub-buffer, and finish the pass once the source is used up
    pub fn update(&mut self) -> Result<()> {
        if !self.stream.is_playing() {
            return Ok(());
        }
        let bpf = self.stream.format().bytes_per_frame();
        while self.stream.is_processed() {
            if self.exhausted {
                let buffer = self.stream.buffer();
                if buffer.is_sub_buffer_processed(0) && buffer.is_sub_buffer_processed(1) {
                    self.finish_pass()?;
                }
                break;
            }
            let frames = self.source.read_frames(&mut self.staging);
            if frames < self.stream.sub_buffer_frames() {
                self.exhausted = true;
            }
            if frames == 0 {
                continue;
            }
            self.stream.update(&self.staging[..frames * bpf])?;
        }
        Ok(())
    }

    fn finish_pass(&mut self) -> Result<()> {
        self.stop();
        match self.loop_count {
            0 => {}
            1 => return Ok(()),
            _ => self.loop_count -= 1,
        }
        debug!(remaining = self.loop_count, "restarting music");
        self.play()
    }

    /// Number of passes to play; 0 repeats forever
    pub fn set_loop_count(&mut self, count: u32) {
        self.loop_count = count;
    }

    /// Set the linear amplitude factor
    pub fn set_volume(&self, volume: f32) {
        self.stream.set_volume(volume);
    }

    /// Shift pitch by resampling
    pub fn set_pitch(&self, pitch: f32) -> Result<()> {
        self.stream.set_pitch(pitch)
    }

    /// Length of one pass in seconds
    pub fn time_length(&self) -> f32 {
        self.source.frame_count() as f32 / self.source.format().sample_rate as f32
    }

    /// Seconds played in the current pass
    pub fn time_played(&self) -> f32 {
        self.stream.buffer().time_played().as_secs_f32()
    }

    /// The underlying stream
    pub fn stream(&self) -> &AudioStream {
        &self.stream
    }

    /// The source being streamed
    pub fn source(&self) -> &S {
        &self.source
    }
}
