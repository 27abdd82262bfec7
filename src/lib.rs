//! Buffer-oriented audio mixing
//!
//! ```no_run
//! use mixdeck::{AudioSink, Wave};
//!
//! let (ctx, mut mixer) = mixdeck::context().sample_rate(48_000).build()?;
//!
//! // In audio callback:
//! # let data = &mut [][..];
//! let frames = data.len() / 2;
//! mixer.render(data, frames);
//!
//! // In game logic:
//! # let samples = [0.0; 480];
//! let sound = ctx.load_sound(&Wave::from_samples(48_000, 1, &samples))?;
//! sound.play();
//!
//! // Overlapping copies of the same sound:
//! ctx.play_multi(&sound)?;
//! # Ok::<(), mixdeck::Error>(())
//! ```
//!
//! Long-form audio is fed through an [`AudioStream`], or a [`Music`] wrapping any
//! [`PcmSource`].

#![warn(missing_docs)]

mod buffer;
mod context;
mod error;
mod format;
mod limit;
mod mixer;
mod music;
mod pool;
mod registry;
mod sound;
mod stream;
mod wave;
pub mod convert;

pub use buffer::{AudioBuffer, Usage};
pub use context::{context, Builder, Config, Context};
pub use error::{Error, Result};
pub use format::{BufferFormat, SampleFormat};
pub use limit::Limiter;
pub use mixer::{AudioSink, Mixer};
pub use music::{Music, PcmSource, WaveSource};
pub use registry::BufferId;
pub use sound::Sound;
pub use stream::AudioStream;
pub use wave::Wave;

/// Unitless instantaneous sound wave amplitude measurement
pub type Sample = f32;
