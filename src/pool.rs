use std::sync::Arc;

use tracing::warn;

use crate::{convert::ConverterFactory, AudioBuffer, Error, Result};

/// Fixed set of voices for overlapping playback of short sounds
///
/// Every voice is registered once when the pool is built and reused for the pool's lifetime.
/// Starting a voice shares the source's frames instead of copying them.
pub(crate) struct VoicePool {
    voices: Box<[AudioBuffer]>,
    /// Value of `generation` when each voice was last started
    stamps: Box<[u64]>,
    generation: u64,
    factory: Arc<dyn ConverterFactory>,
    output_channels: u16,
    output_rate: u32,
}

impl VoicePool {
    pub(crate) fn new(
        voices: Vec<AudioBuffer>,
        factory: Arc<dyn ConverterFactory>,
        output_channels: u16,
        output_rate: u32,
    ) -> Self {
        let stamps = vec![0; voices.len()].into();
        Self {
            voices: voices.into(),
            stamps,
            generation: 0,
            factory,
            output_channels,
            output_rate,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.voices.len()
    }

    /// Number of starts since `index` was last started
    pub(crate) fn age(&self, index: usize) -> u64 {
        self.generation - self.stamps[index]
    }

    /// Start a voice playing `source`, returning its index
    ///
    /// An idle voice is preferred. When every voice is audible, the one started longest ago is
    /// cut off.
    pub(crate) fn play(&mut self, source: &AudioBuffer) -> Result<usize> {
        if self.voices.is_empty() {
            return Err(Error::InvalidArgument("voice pool has no voices"));
        }
        let index = match self.voices.iter().position(|v| !v.is_playing()) {
            Some(index) => index,
            None => {
                let index = (0..self.voices.len())
                    .max_by_key(|&i| self.age(i))
                    .unwrap_or(0);
                warn!(index, age = self.age(index), "all voices busy; evicting oldest");
                self.voices[index].stop();
                index
            }
        };
        let voice = &self.voices[index];
        voice.assign(
            source,
            &*self.factory,
            self.output_channels,
            self.output_rate,
        )?;
        self.generation += 1;
        self.stamps[index] = self.generation;
        voice.play();
        Ok(index)
    }

    pub(crate) fn stop_all(&self) {
        for voice in self.voices.iter() {
            voice.stop();
        }
    }

    pub(crate) fn playing_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_playing()).count()
    }

    #[cfg(test)]
    pub(crate) fn voice(&self, index: usize) -> &AudioBuffer {
        &self.voices[index]
    }
}
