/// Instrument tables - pitch ladder, tone timbres and drum kits
///
/// Timbres and kits are tagged variants that resolve to a fixed parameter
/// block once, when selected. The audio and MIDI sinks only ever see the
/// resolved config.
use serde::{Deserialize, Serialize};

/// Pitch ladder indexed by grid row, highest first (C major pentatonic, C6 down to C3).
pub const PITCH_TABLE: [u8; 16] = [
    84, 81, 79, 76, 74, 72, 69, 67, 64, 62, 60, 57, 55, 52, 50, 48,
];

/// Used for any row outside the pitch table.
pub const DEFAULT_PITCH: u8 = 60;

/// MIDI note for a grid row; rows past the table fall back to `DEFAULT_PITCH`.
pub fn pitch_for_row(row: usize) -> u8 {
    PITCH_TABLE.get(row).copied().unwrap_or(DEFAULT_PITCH)
}

pub fn midi_note_to_frequency(note: u8) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}

pub fn midi_note_name(note: u8) -> String {
    let note_names = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];
    let octave = (note / 12) as i32 - 1;
    let note_index = (note % 12) as usize;
    format!("{}{}", note_names[note_index], octave)
}

/// One of the three percussion pieces a cell letter can fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Percussion {
    Kick,
    Snare,
    Hat,
}

impl Percussion {
    pub const ALL: [Percussion; 3] = [Percussion::Kick, Percussion::Snare, Percussion::Hat];

    /// `K`, `S` and `H` are reserved; every other letter is a tone.
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'K' => Some(Percussion::Kick),
            'S' => Some(Percussion::Snare),
            'H' => Some(Percussion::Hat),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Percussion::Kick => 'K',
            Percussion::Snare => 'S',
            Percussion::Hat => 'H',
        }
    }

    /// General MIDI drum note (channel 10).
    pub fn gm_note(self) -> u8 {
        match self {
            Percussion::Kick => 36,
            Percussion::Snare => 38,
            Percussion::Hat => 42,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Percussion::Kick => "kick",
            Percussion::Snare => "snare",
            Percussion::Hat => "hat",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Triangle,
    Sawtooth,
}

impl Waveform {
    /// Sample the waveform at `phase` in [0, 1).
    pub fn sample(self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => (phase * std::f32::consts::TAU).sin(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
            Waveform::Sawtooth => 2.0 * phase - 1.0,
        }
    }
}

/// Resolved parameters for pitched voices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneConfig {
    pub waveform: Waveform,
    /// Seconds
    pub attack: f32,
    /// Seconds
    pub release: f32,
    pub gain: f32,
}

/// Tone timbre selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timbre {
    #[default]
    Sine,
    Square,
    Triangle,
    Sawtooth,
}

impl Timbre {
    pub const ALL: [Timbre; 4] = [Timbre::Sine, Timbre::Square, Timbre::Triangle, Timbre::Sawtooth];

    pub fn config(self) -> ToneConfig {
        match self {
            Timbre::Sine => ToneConfig {
                waveform: Waveform::Sine,
                attack: 0.005,
                release: 0.12,
                gain: 0.25,
            },
            Timbre::Square => ToneConfig {
                waveform: Waveform::Square,
                attack: 0.002,
                release: 0.08,
                gain: 0.08,
            },
            Timbre::Triangle => ToneConfig {
                waveform: Waveform::Triangle,
                attack: 0.004,
                release: 0.15,
                gain: 0.22,
            },
            Timbre::Sawtooth => ToneConfig {
                waveform: Waveform::Sawtooth,
                attack: 0.002,
                release: 0.1,
                gain: 0.1,
            },
        }
    }

    pub fn code(self) -> char {
        match self {
            Timbre::Sine => 's',
            Timbre::Square => 'q',
            Timbre::Triangle => 't',
            Timbre::Sawtooth => 'w',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    pub fn label(self) -> &'static str {
        match self {
            Timbre::Sine => "sine",
            Timbre::Square => "square",
            Timbre::Triangle => "triangle",
            Timbre::Sawtooth => "sawtooth",
        }
    }
}

/// Pitch-swept sine kick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KickConfig {
    pub start_hz: f32,
    pub end_hz: f32,
    pub decay: f32,
    pub gain: f32,
}

/// Body tone plus noise burst.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnareConfig {
    pub tone_hz: f32,
    /// 0.0 = all tone, 1.0 = all noise
    pub noise_mix: f32,
    pub decay: f32,
    pub gain: f32,
}

/// Short high-passed noise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HatConfig {
    pub decay: f32,
    /// One-pole high-pass coefficient
    pub brightness: f32,
    pub gain: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KitConfig {
    pub kick: KickConfig,
    pub snare: SnareConfig,
    pub hat: HatConfig,
}

/// Percussion kit selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrumKit {
    #[default]
    Acoustic,
    Electronic,
}

impl DrumKit {
    pub const ALL: [DrumKit; 2] = [DrumKit::Acoustic, DrumKit::Electronic];

    pub fn config(self) -> KitConfig {
        match self {
            DrumKit::Acoustic => KitConfig {
                kick: KickConfig {
                    start_hz: 120.0,
                    end_hz: 50.0,
                    decay: 0.35,
                    gain: 0.9,
                },
                snare: SnareConfig {
                    tone_hz: 190.0,
                    noise_mix: 0.7,
                    decay: 0.18,
                    gain: 0.5,
                },
                hat: HatConfig {
                    decay: 0.05,
                    brightness: 0.85,
                    gain: 0.3,
                },
            },
            DrumKit::Electronic => KitConfig {
                kick: KickConfig {
                    start_hz: 160.0,
                    end_hz: 40.0,
                    decay: 0.5,
                    gain: 1.0,
                },
                snare: SnareConfig {
                    tone_hz: 240.0,
                    noise_mix: 0.85,
                    decay: 0.12,
                    gain: 0.45,
                },
                hat: HatConfig {
                    decay: 0.03,
                    brightness: 0.95,
                    gain: 0.25,
                },
            },
        }
    }

    pub fn code(self) -> char {
        match self {
            DrumKit::Acoustic => 'a',
            DrumKit::Electronic => 'e',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.code() == code)
    }

    pub fn label(self) -> &'static str {
        match self {
            DrumKit::Acoustic => "acoustic",
            DrumKit::Electronic => "electronic",
        }
    }
}
