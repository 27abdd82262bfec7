use std::{
    fmt,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use tracing::{error, info};

use crate::{
    convert::{ConverterConfig, ConverterFactory, LinearConverterFactory},
    pool::VoicePool,
    registry::Registry,
    AudioBuffer, AudioStream, BufferFormat, Error, Limiter, Mixer, Music, PcmSource, Result,
    SampleFormat, Sound, Usage, Wave,
};

/// Begin building an audio context
pub fn context() -> Builder {
    Builder::default()
}

/// Settings a [`Context`] and its [`Mixer`] are built from
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct Config {
    /// Device output rate
    pub sample_rate: u32,
    /// Device output channels; output is interleaved
    pub channels: u16,
    /// Largest period the device will ask the mixer to render
    pub max_render_frames: usize,
    /// Frames per sub-buffer of streams, raised to `max_render_frames` if smaller
    pub stream_buffer_frames: usize,
    /// Voices available for [`Context::play_multi`]
    pub pool_voices: usize,
    /// Initial master volume, clamped to [0, 1]
    pub master_volume: f32,
    /// Treatment of the finished mix
    pub limiter: Limiter,
    /// Buffers the registry has room for before it grows
    pub buffer_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 2,
            max_render_frames: 4096,
            stream_buffer_frames: 4096,
            pool_voices: 16,
            master_volume: 1.0,
            limiter: Limiter::default(),
            buffer_capacity: 64,
        }
    }
}

/// Configuration that audio contexts are built from
#[must_use]
#[derive(Clone, Default)]
pub struct Builder {
    config: Config,
    converter: Option<Arc<dyn ConverterFactory>>,
}

impl Builder {
    /// Replace every setting with `config`
    pub fn config(&mut self, config: Config) -> &mut Self {
        self.config = config;
        self
    }

    /// Rate the device consumes frames at
    pub fn sample_rate(&mut self, rate: u32) -> &mut Self {
        self.config.sample_rate = rate;
        self
    }

    /// Samples per output frame
    pub fn channels(&mut self, channels: u16) -> &mut Self {
        self.config.channels = channels;
        self
    }

    /// Largest `frame_count` the device will pass to [`render`](crate::AudioSink::render)
    ///
    /// Stream sub-buffers are never smaller than this, so that one period can't outrun a
    /// refill.
    pub fn max_render_frames(&mut self, frames: usize) -> &mut Self {
        self.config.max_render_frames = frames;
        self
    }

    /// Frames held by each half of a stream
    pub fn stream_buffer_frames(&mut self, frames: usize) -> &mut Self {
        self.config.stream_buffer_frames = frames;
        self
    }

    /// Number of voices for overlapping sound playback
    pub fn pool_voices(&mut self, voices: usize) -> &mut Self {
        self.config.pool_voices = voices;
        self
    }

    /// Initial master volume
    pub fn master_volume(&mut self, volume: f32) -> &mut Self {
        self.config.master_volume = volume;
        self
    }

    /// How the finished mix is kept in range
    pub fn limiter(&mut self, limiter: Limiter) -> &mut Self {
        self.config.limiter = limiter;
        self
    }

    /// Buffers the registry holds before it must grow
    pub fn buffer_capacity(&mut self, capacity: usize) -> &mut Self {
        self.config.buffer_capacity = capacity;
        self
    }

    /// Converter used by every buffer of the context
    ///
    /// Defaults to [`LinearConverterFactory`].
    pub fn converter(&mut self, factory: Arc<dyn ConverterFactory>) -> &mut Self {
        self.converter = Some(factory);
        self
    }

    /// Construct a context and the mixer that renders it
    pub fn build(&self) -> Result<(Context, Mixer)> {
        let config = self.config.clone();
        if config.sample_rate == 0 {
            return Err(Error::InvalidArgument("sample rate must be nonzero"));
        }
        if config.channels == 0 {
            return Err(Error::InvalidArgument("channel count must be nonzero"));
        }
        if config.max_render_frames == 0 {
            return Err(Error::InvalidArgument("max render frames must be nonzero"));
        }
        let converter: Arc<dyn ConverterFactory> = match &self.converter {
            Some(factory) => factory.clone(),
            None => Arc::new(LinearConverterFactory),
        };
        let registry = Arc::new(Registry::with_capacity(
            config.buffer_capacity.max(config.pool_voices),
        ));
        let master_volume = Arc::new(AtomicU32::new(
            clamp_volume(config.master_volume).to_bits(),
        ));

        let device = ConverterConfig {
            input: BufferFormat::new(SampleFormat::F32, config.channels, config.sample_rate),
            output_channels: config.channels,
            output_rate: config.sample_rate,
        };
        let voices = (0..config.pool_voices)
            .map(|_| AudioBuffer::new(&registry, device, 0, Usage::Static, &*converter))
            .collect::<Result<Vec<_>>>()?;
        let pool = VoicePool::new(voices, converter.clone(), config.channels, config.sample_rate);

        let mixer = Mixer::new(
            registry.clone(),
            master_volume.clone(),
            config.channels,
            config.max_render_frames,
            config.limiter,
        );
        info!(
            sample_rate = config.sample_rate,
            channels = config.channels,
            voices = config.pool_voices,
            "audio context ready"
        );
        let context = Context {
            registry,
            master_volume,
            converter,
            pool: Mutex::new(pool),
            config,
        };
        Ok((context, mixer))
    }
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("config", &self.config)
            .field("custom_converter", &self.converter.is_some())
            .finish()
    }
}

fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

/// Creates and controls the buffers rendered by a [`Mixer`]
///
/// Shareable between application threads. Buffers may outlive the context that created them.
pub struct Context {
    registry: Arc<Registry>,
    master_volume: Arc<AtomicU32>,
    converter: Arc<dyn ConverterFactory>,
    pool: Mutex<VoicePool>,
    config: Config,
}

impl Context {
    /// Allocate a zeroed buffer holding `frames_count` frames of `format`
    ///
    /// Streamed buffers need an even capacity of at least two frames so that they split into two
    /// halves.
    pub fn create_buffer(
        &self,
        format: BufferFormat,
        frames_count: usize,
        usage: Usage,
    ) -> Result<AudioBuffer> {
        let invalid = if frames_count == 0 {
            Some("buffer must hold at least one frame")
        } else if usage == Usage::Streamed && (frames_count < 2 || frames_count % 2 != 0) {
            Some("streamed buffer capacity must split into two equal halves")
        } else {
            None
        };
        if let Some(reason) = invalid {
            error!(reason, frames_count, ?usage, "failed to create audio buffer");
            return Err(Error::InvalidArgument(reason));
        }
        let config = ConverterConfig {
            input: format,
            output_channels: self.config.channels,
            output_rate: self.config.sample_rate,
        };
        AudioBuffer::new(&self.registry, config, frames_count, usage, &*self.converter)
    }

    /// Set the gain applied to every buffer, clamped to [0, 1]
    pub fn set_master_volume(&self, volume: f32) {
        self.master_volume
            .store(clamp_volume(volume).to_bits(), Ordering::Relaxed);
    }

    /// Gain applied to every buffer
    pub fn master_volume(&self) -> f32 {
        f32::from_bits(self.master_volume.load(Ordering::Relaxed))
    }

    /// Number of live buffers, including pool voices
    pub fn buffer_count(&self) -> usize {
        self.registry.len()
    }

    /// Load `wave` into a new static buffer
    pub fn load_sound(&self, wave: &Wave) -> Result<Sound> {
        let buffer = self.create_buffer(wave.format(), wave.frame_count(), Usage::Static)?;
        buffer.write_static(wave.data());
        Ok(Sound::new(buffer))
    }

    /// Create an empty stream accepting frames of `format`
    pub fn create_stream(&self, format: BufferFormat) -> Result<AudioStream> {
        let half = self
            .config
            .stream_buffer_frames
            .max(self.config.max_render_frames);
        let buffer = self.create_buffer(format, half * 2, Usage::Streamed)?;
        info!(
            sample_rate = format.sample_rate,
            channels = format.channels,
            sub_buffer_frames = half,
            "audio stream created"
        );
        Ok(AudioStream::new(buffer))
    }

    /// Stream `source` through a new [`AudioStream`]
    pub fn load_music<S: PcmSource>(&self, source: S) -> Result<Music<S>> {
        if source.frame_count() == 0 {
            return Err(Error::InvalidArgument("music source has no frames"));
        }
        let stream = self.create_stream(source.format())?;
        Ok(Music::new(stream, source))
    }

    /// Play `sound` on a pooled voice, cutting off the oldest voice if all are busy
    ///
    /// Returns the index of the voice used.
    pub fn play_multi(&self, sound: &Sound) -> Result<usize> {
        self.pool().play(sound.buffer())
    }

    /// Stop every pooled voice
    pub fn stop_multi(&self) {
        self.pool().stop_all();
    }

    /// Number of audible pooled voices
    pub fn playing_multi(&self) -> usize {
        self.pool().playing_count()
    }

    /// Number of pooled voices
    pub fn pool_voices(&self) -> usize {
        self.pool().capacity()
    }

    /// Settings the context was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn pool(&self) -> MutexGuard<'_, VoicePool> {
        self.pool.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    pub(crate) fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.config)
            .field("buffers", &self.buffer_count())
            .field("master_volume", &self.master_volume())
            .finish_non_exhaustive()
    }
}
