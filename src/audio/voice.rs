/// Synthesis voices - one per dispatched trigger
use crate::instrument::{HatConfig, KickConfig, SnareConfig, ToneConfig};
use rand::Rng;
use std::f32::consts::TAU;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VoiceKind {
    Tone {
        frequency: f32,
        /// Seconds held before release
        duration: f32,
        config: ToneConfig,
    },
    Kick(KickConfig),
    Snare(SnareConfig),
    Hat(HatConfig),
}

/// -60 dB after `decay` seconds.
fn decay_envelope(t: f32, decay: f32) -> f32 {
    (-t * 6.9 / decay.max(1e-4)).exp()
}

#[derive(Debug, Clone)]
pub struct Voice {
    kind: VoiceKind,
    /// Mixer sample index at which the voice becomes audible
    start: u64,
    /// Samples rendered so far
    age: u64,
    phase: f32,
    hp_in: f32,
    hp_out: f32,
}

impl Voice {
    pub fn new(kind: VoiceKind, start: u64) -> Self {
        Self {
            kind,
            start,
            age: 0,
            phase: 0.0,
            hp_in: 0.0,
            hp_out: 0.0,
        }
    }

    pub fn kind(&self) -> &VoiceKind {
        &self.kind
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn is_started(&self, clock: u64) -> bool {
        clock >= self.start
    }

    /// Audible length in seconds.
    pub fn length(&self) -> f32 {
        match self.kind {
            VoiceKind::Tone {
                duration, config, ..
            } => duration + config.release,
            VoiceKind::Kick(kick) => kick.decay,
            VoiceKind::Snare(snare) => snare.decay,
            VoiceKind::Hat(hat) => hat.decay,
        }
    }

    pub fn is_finished(&self, sample_rate: f32) -> bool {
        self.age as f32 / sample_rate >= self.length()
    }

    pub fn render<R: Rng>(&mut self, sample_rate: f32, rng: &mut R) -> f32 {
        let t = self.age as f32 / sample_rate;
        self.age += 1;

        match self.kind {
            VoiceKind::Tone {
                frequency,
                duration,
                config,
            } => {
                let envelope = if t < config.attack {
                    t / config.attack
                } else if t < duration {
                    1.0
                } else {
                    (1.0 - (t - duration) / config.release).max(0.0)
                };
                let sample = config.waveform.sample(self.phase);
                self.advance_phase(frequency / sample_rate);
                sample * envelope * config.gain
            }
            VoiceKind::Kick(kick) => {
                let frequency = kick.end_hz + (kick.start_hz - kick.end_hz) * (-t * 35.0).exp();
                let sample = (self.phase * TAU).sin();
                self.advance_phase(frequency / sample_rate);
                sample * decay_envelope(t, kick.decay) * kick.gain
            }
            VoiceKind::Snare(snare) => {
                let tone = (t * snare.tone_hz * TAU).sin();
                let noise: f32 = rng.gen_range(-1.0..1.0);
                let mixed = tone * (1.0 - snare.noise_mix) + noise * snare.noise_mix;
                mixed * decay_envelope(t, snare.decay) * snare.gain
            }
            VoiceKind::Hat(hat) => {
                let noise: f32 = rng.gen_range(-1.0..1.0);
                let filtered = hat.brightness * (self.hp_out + noise - self.hp_in);
                self.hp_in = noise;
                self.hp_out = filtered;
                filtered * decay_envelope(t, hat.decay) * hat.gain
            }
        }
    }

    fn advance_phase(&mut self, increment: f32) {
        self.phase += increment;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
    }
}
