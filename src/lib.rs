/// drumfill - a crossword-grid step sequencer library
///
/// This library provides the core components for the drum fill toy:
/// - Square grid with symmetric blocking, letters and crossword numbering
/// - Word segmentation of open cells
/// - Cooperative playback scheduler with grid and word topologies
/// - Share-link codec, user config, audio (cpal) and MIDI (midir) sinks

pub mod audio;
pub mod codec;
pub mod config;
pub mod error;
pub mod instrument;
pub mod midi;
pub mod sequencer;
pub mod session;

// Re-export commonly used types
pub use audio::AudioOutput;
pub use codec::{decode, encode, CodecError, Snapshot};
pub use config::{default_config_path, load_config, save_config, DrumfillConfig};
pub use error::{Result, SequencerError};
pub use instrument::{midi_note_name, pitch_for_row, DrumKit, Percussion, Timbre};
pub use midi::MidiOutputDevice;
pub use sequencer::playback::{
    step_duration, NullSink, PlayMode, PlaybackScheduler, PlaybackState, StepReport, Trigger,
    TriggerSink, MAX_BPM, MIN_BPM,
};
pub use sequencer::words::{segment_words, Word};
pub use sequencer::{Cell, Grid, MAX_SIZE, MIN_SIZE};
pub use session::{Command, EntryMode, SequencerSession};
