/// MIDI output using midir
///
/// Tones go out on channel 1 at the row's pitch, percussion on channel 10 as
/// General MIDI drum notes. MIDI has no timestamps here, so note-ons are sent
/// on dispatch and note-offs are queued until [`MidiOutputDevice::release_due`]
/// sees their time pass.
use crate::error::{Result, SequencerError};
use crate::instrument::{pitch_for_row, Percussion};
use crate::sequencer::playback::TriggerSink;
use midir::{MidiOutput, MidiOutputConnection};

const CLIENT_NAME: &str = "drumfill MIDI Output";
const TONE_CHANNEL: u8 = 0;
const DRUM_CHANNEL: u8 = 9;
const VELOCITY: u8 = 100;
/// Seconds a drum note is held
const DRUM_GATE: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingOff {
    channel: u8,
    note: u8,
    at: f64,
}

pub struct MidiOutputDevice {
    connection: Option<MidiOutputConnection>,
    pending: Vec<PendingOff>,
}

impl MidiOutputDevice {
    pub fn new() -> Self {
        Self {
            connection: None,
            pending: Vec::new(),
        }
    }

    pub fn available_ports() -> Vec<String> {
        if let Ok(midi_out) = MidiOutput::new(CLIENT_NAME) {
            midi_out
                .ports()
                .iter()
                .filter_map(|p| midi_out.port_name(p).ok())
                .collect()
        } else {
            vec![]
        }
    }

    pub fn connect(&mut self, port_index: usize) -> Result<()> {
        let midi_out = MidiOutput::new(CLIENT_NAME)
            .map_err(|e| SequencerError::Midi(format!("Failed to create MIDI output: {}", e)))?;

        let ports = midi_out.ports();
        let port = ports
            .get(port_index)
            .ok_or_else(|| SequencerError::Midi(format!("Invalid port index {}", port_index)))?;
        let name = midi_out.port_name(port).unwrap_or_default();

        let connection = midi_out
            .connect(port, "drumfill")
            .map_err(|e| SequencerError::Midi(format!("Failed to connect: {}", e)))?;

        log::info!("MIDI output connected to {:?}", name);
        self.all_notes_off();
        self.connection = Some(connection);
        Ok(())
    }

    /// Connect to the first port whose name contains `pattern`, case-insensitively.
    pub fn connect_matching(&mut self, pattern: &str) -> Result<()> {
        let pattern = pattern.to_lowercase();
        let index = Self::available_ports()
            .iter()
            .position(|name| name.to_lowercase().contains(&pattern))
            .ok_or_else(|| SequencerError::Midi(format!("No MIDI port matching {:?}", pattern)))?;
        self.connect(index)
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn send_note_on(&mut self, channel: u8, note: u8, velocity: u8) -> Result<()> {
        self.send(&[0x90 | (channel & 0x0f), note, velocity])
    }

    pub fn send_note_off(&mut self, channel: u8, note: u8) -> Result<()> {
        self.send(&[0x80 | (channel & 0x0f), note, 0])
    }

    fn send(&mut self, message: &[u8]) -> Result<()> {
        if let Some(ref mut conn) = self.connection {
            conn.send(message).map_err(|e| {
                SequencerError::Midi(format!("Failed to send {:02x?}: {}", message, e))
            })?;
        }
        Ok(())
    }

    fn note_on(&mut self, channel: u8, note: u8, off_at: f64) {
        if !self.is_connected() {
            return;
        }
        if let Err(e) = self.send_note_on(channel, note, VELOCITY) {
            log::warn!("{}", e);
            return;
        }
        self.pending.push(PendingOff {
            channel,
            note,
            at: off_at,
        });
    }

    /// Send note-offs whose time is at or before `now`.
    pub fn release_due(&mut self, now: f64) {
        let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|p| p.at <= now);
        self.pending = waiting;
        for off in due {
            if let Err(e) = self.send_note_off(off.channel, off.note) {
                log::warn!("{}", e);
            }
        }
    }

    /// Release every queued note immediately.
    pub fn all_notes_off(&mut self) {
        self.release_due(f64::INFINITY);
    }

    pub fn pending_note_offs(&self) -> usize {
        self.pending.len()
    }

    pub fn disconnect(&mut self) {
        self.all_notes_off();
        self.connection = None;
    }
}

impl Default for MidiOutputDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl TriggerSink for MidiOutputDevice {
    fn trigger_tone(&mut self, pitch_index: usize, time: f64, duration: f64) {
        self.note_on(TONE_CHANNEL, pitch_for_row(pitch_index), time + duration);
    }

    fn trigger_percussion(&mut self, kind: Percussion, time: f64) {
        self.note_on(DRUM_CHANNEL, kind.gm_note(), time + DRUM_GATE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnected_device_drops_triggers() {
        let mut device = MidiOutputDevice::new();
        assert!(!device.is_connected());
        device.trigger_tone(0, 0.0, 0.5);
        device.trigger_percussion(Percussion::Snare, 0.0);
        assert_eq!(device.pending_note_offs(), 0);
        assert!(device.send_note_on(0, 60, 100).is_ok());
    }

    #[test]
    fn test_release_due_partitions_pending() {
        let mut device = MidiOutputDevice::new();
        device.pending = vec![
            PendingOff {
                channel: 0,
                note: 60,
                at: 1.0,
            },
            PendingOff {
                channel: 9,
                note: 36,
                at: 2.0,
            },
        ];
        device.release_due(1.5);
        assert_eq!(device.pending_note_offs(), 1);
        device.all_notes_off();
        assert_eq!(device.pending_note_offs(), 0);
    }
}
