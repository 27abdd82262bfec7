use crate::{AudioBuffer, Result};

/// A short sound held entirely in memory
///
/// Loaded with [`Context::load_sound`](crate::Context::load_sound). For overlapping playback of
/// the same sound, use [`Context::play_multi`](crate::Context::play_multi).
#[derive(Debug)]
pub struct Sound {
    buffer: AudioBuffer,
}

impl Sound {
    pub(crate) fn new(buffer: AudioBuffer) -> Self {
        Self { buffer }
    }

    /// Start playback from the beginning
    pub fn play(&self) {
        self.buffer.play();
    }

    /// Stop and rewind
    pub fn stop(&self) {
        self.buffer.stop();
    }

    /// Suspend playback
    pub fn pause(&self) {
        self.buffer.pause();
    }

    /// Continue after [`pause`](Self::pause)
    pub fn resume(&self) {
        self.buffer.resume();
    }

    /// Whether the sound is audible
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

    /// Control whether playback wraps at the end
    pub fn set_looping(&self, looping: bool) {
        self.buffer.set_looping(looping);
    }

    /// Stop the sound, then overwrite its frames from the front with `data`
    ///
    /// `data` must be in the sound's format. Returns the number of frames written; frames past
    /// the end of the sound are ignored. Pooled voices already playing this sound keep the old
    /// frames.
    pub fn update(&self, data: &[u8]) -> usize {
        self.buffer.write_static(data)
    }

    /// The underlying static buffer
    pub fn buffer(&self) -> &AudioBuffer {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use crate::{AudioSink, Wave};

    #[test]
    fn update_stops_and_overwrites() {
        let (ctx, mut mixer) = crate::context()
            .sample_rate(10)
            .channels(1)
            .pool_voices(1)
            .build()
            .unwrap();
        let sound = ctx
            .load_sound(&Wave::from_samples(10, 1, &[0.25; 4]))
            .unwrap();
        sound.play();
        ctx.play_multi(&sound).unwrap();
        let mut out = [0.0; 1];
        mixer.render(&mut out, 1);
        assert_eq!(out, [0.5]);

        let data = [0.5f32, 0.5]
            .iter()
            .flat_map(|x| x.to_le_bytes())
            .collect::<Vec<_>>();
        assert_eq!(sound.update(&data), 2);
        assert!(!sound.is_playing());
        sound.play();
        let mut out = [0.0; 3];
        mixer.render(&mut out, 3);
        // The pooled voice keeps the old frames
        assert_eq!(out, [0.75, 0.75, 0.5]);
    }
}
