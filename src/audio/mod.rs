/// Audio output using cpal
///
/// Triggers are turned into voices in a shared [`Mixer`] and started at the
/// sample matching their scheduled clock time; the stream callback renders
/// the mix. Without an output device the sink is silent and every trigger is
/// dropped.
use crate::error::{Result, SequencerError};
use crate::instrument::{
    midi_note_to_frequency, pitch_for_row, DrumKit, KitConfig, Percussion, Timbre, ToneConfig,
};
use crate::sequencer::playback::TriggerSink;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex};
use std::time::Instant;

pub mod voice;

use voice::{Voice, VoiceKind};

/// Oldest voices are dropped past this many.
pub const MAX_VOICES: usize = 64;

pub struct Mixer {
    sample_rate: f32,
    /// Clock time in seconds of sample 0
    origin: f64,
    clock: u64,
    voices: Vec<Voice>,
    tone: ToneConfig,
    kit: KitConfig,
    rng: SmallRng,
}

impl Mixer {
    pub fn new(sample_rate: f32, origin: f64) -> Self {
        Self {
            sample_rate,
            origin,
            clock: 0,
            voices: Vec::new(),
            tone: Timbre::default().config(),
            kit: DrumKit::default().config(),
            rng: SmallRng::seed_from_u64(0x5eed),
        }
    }

    pub fn set_timbre(&mut self, timbre: Timbre) {
        self.tone = timbre.config();
    }

    pub fn set_kit(&mut self, kit: DrumKit) {
        self.kit = kit.config();
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Sample index for a clock time; times already past start immediately.
    pub fn sample_at(&self, time: f64) -> u64 {
        let offset = ((time - self.origin) * self.sample_rate as f64).max(0.0).round() as u64;
        offset.max(self.clock)
    }

    pub fn schedule_tone(&mut self, pitch_index: usize, time: f64, duration: f64) {
        let kind = VoiceKind::Tone {
            frequency: midi_note_to_frequency(pitch_for_row(pitch_index)),
            duration: duration as f32,
            config: self.tone,
        };
        self.push(kind, time);
    }

    pub fn schedule_percussion(&mut self, kind: Percussion, time: f64) {
        let kind = match kind {
            Percussion::Kick => VoiceKind::Kick(self.kit.kick),
            Percussion::Snare => VoiceKind::Snare(self.kit.snare),
            Percussion::Hat => VoiceKind::Hat(self.kit.hat),
        };
        self.push(kind, time);
    }

    fn push(&mut self, kind: VoiceKind, time: f64) {
        if self.voices.len() >= MAX_VOICES {
            self.voices.remove(0);
        }
        let start = self.sample_at(time);
        self.voices.push(Voice::new(kind, start));
    }

    pub fn clear(&mut self) {
        self.voices.clear();
    }

    pub fn next_sample(&mut self) -> f32 {
        let clock = self.clock;
        let sample_rate = self.sample_rate;
        let rng = &mut self.rng;

        let mut mix = 0.0f32;
        for voice in self.voices.iter_mut().filter(|v| v.is_started(clock)) {
            mix += voice.render(sample_rate, rng);
        }
        self.voices
            .retain(|v| !v.is_started(clock) || !v.is_finished(sample_rate));
        self.clock += 1;

        mix.tanh()
    }

    /// Fill an interleaved buffer, same signal on every channel.
    pub fn render(&mut self, data: &mut [f32], channels: usize) {
        for frame in data.chunks_mut(channels.max(1)) {
            let sample = self.next_sample();
            for out in frame.iter_mut() {
                *out = sample;
            }
        }
    }
}

pub struct AudioOutput {
    _stream: Option<cpal::Stream>,
    mixer: Option<Arc<Mutex<Mixer>>>,
}

impl AudioOutput {
    /// Open the default output device. Trigger times are seconds since `clock_origin`.
    pub fn new(clock_origin: Instant) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| SequencerError::Audio("no output device".to_string()))?;
        let config = device
            .default_output_config()
            .map_err(|e| SequencerError::Audio(e.to_string()))?;

        if config.sample_format() != cpal::SampleFormat::F32 {
            return Err(SequencerError::Audio(format!(
                "unsupported sample format {:?}",
                config.sample_format()
            )));
        }

        let sample_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;
        let mixer = Arc::new(Mutex::new(Mixer::new(
            sample_rate,
            clock_origin.elapsed().as_secs_f64(),
        )));
        let mixer_clone = Arc::clone(&mixer);

        let stream = device
            .build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| match mixer_clone.lock() {
                    Ok(mut mixer) => mixer.render(data, channels),
                    Err(_) => data.fill(0.0),
                },
                |err| log::error!("Audio stream error: {}", err),
                None,
            )
            .map_err(|e| SequencerError::Audio(e.to_string()))?;
        stream
            .play()
            .map_err(|e| SequencerError::Audio(e.to_string()))?;

        log::info!(
            "Audio output open: {} Hz, {} channel(s)",
            sample_rate,
            channels
        );

        Ok(Self {
            _stream: Some(stream),
            mixer: Some(mixer),
        })
    }

    /// A sink that drops every trigger.
    pub fn silent() -> Self {
        Self {
            _stream: None,
            mixer: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.mixer.is_some()
    }

    fn with_mixer(&self, f: impl FnOnce(&mut Mixer)) {
        if let Some(mixer) = &self.mixer {
            if let Ok(mut mixer) = mixer.lock() {
                f(&mut *mixer);
            }
        }
    }

    pub fn set_timbre(&mut self, timbre: Timbre) {
        self.with_mixer(|m| m.set_timbre(timbre));
    }

    pub fn set_kit(&mut self, kit: DrumKit) {
        self.with_mixer(|m| m.set_kit(kit));
    }

    /// Cut every sounding and pending voice.
    pub fn stop_all(&mut self) {
        self.with_mixer(Mixer::clear);
    }
}

impl Default for AudioOutput {
    fn default() -> Self {
        Self::new(Instant::now()).unwrap_or_else(|e| {
            log::warn!("{}, audio disabled", e);
            Self::silent()
        })
    }
}

impl TriggerSink for AudioOutput {
    fn trigger_tone(&mut self, pitch_index: usize, time: f64, duration: f64) {
        self.with_mixer(|m| m.schedule_tone(pitch_index, time, duration));
    }

    fn trigger_percussion(&mut self, kind: Percussion, time: f64) {
        self.with_mixer(|m| m.schedule_percussion(kind, time));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 8000.0;

    fn energy(mixer: &mut Mixer, samples: usize) -> f32 {
        (0..samples).map(|_| mixer.next_sample().abs()).sum()
    }

    #[test]
    fn test_voice_waits_for_scheduled_time() {
        let mut mixer = Mixer::new(SR, 10.0);
        mixer.schedule_percussion(Percussion::Kick, 10.5);
        assert_eq!(mixer.voice_count(), 1);
        assert_eq!(energy(&mut mixer, 4000), 0.0);
        assert!(energy(&mut mixer, 400) > 1.0);
    }

    #[test]
    fn test_late_trigger_starts_now() {
        let mut mixer = Mixer::new(SR, 10.0);
        energy(&mut mixer, 100);
        assert_eq!(mixer.sample_at(9.0), 100);
        mixer.schedule_tone(3, 9.0, 0.1);
        assert!(energy(&mut mixer, 200) > 0.0);
    }

    #[test]
    fn test_finished_voices_are_dropped() {
        let mut mixer = Mixer::new(SR, 0.0);
        mixer.schedule_percussion(Percussion::Hat, 0.0);
        energy(&mut mixer, SR as usize);
        assert_eq!(mixer.voice_count(), 0);
    }

    #[test]
    fn test_voice_cap() {
        let mut mixer = Mixer::new(SR, 0.0);
        for i in 0..(MAX_VOICES + 10) {
            mixer.schedule_tone(i % 16, 1.0, 0.5);
        }
        assert_eq!(mixer.voice_count(), MAX_VOICES);
        mixer.clear();
        assert_eq!(mixer.voice_count(), 0);
    }

    #[test]
    fn test_render_fills_every_channel() {
        let mut mixer = Mixer::new(SR, 0.0);
        mixer.schedule_percussion(Percussion::Snare, 0.0);
        let mut data = vec![0.0; 64];
        mixer.render(&mut data, 2);
        assert!(data.chunks(2).all(|frame| frame[0] == frame[1]));
        assert!(data.iter().any(|s| *s != 0.0));
    }

    #[test]
    fn test_silent_output_drops_triggers() {
        let mut output = AudioOutput::silent();
        assert!(!output.is_available());
        output.trigger_tone(0, 0.0, 0.5);
        output.trigger_percussion(Percussion::Kick, 0.0);
        output.stop_all();
    }
}
