/// Playback engine - step timing, per-step cell resolution and trigger dispatch
///
/// The scheduler is cooperative: the host calls [`PlaybackScheduler::poll`]
/// with the current clock reading and at most one step fires per call. There
/// is exactly one pending deadline while running and none while stopped.
use super::words::Word;
use super::{Cell, Grid};
use crate::instrument::Percussion;
use serde::{Deserialize, Serialize};

pub const MIN_BPM: u32 = 40;
pub const MAX_BPM: u32 = 240;
pub const DEFAULT_BPM: u32 = 120;

/// Added to each successive trigger time within one step.
pub const TRIGGER_OFFSET: f64 = 0.0001;

/// Seconds per step. One step per beat.
pub fn step_duration(bpm: u32) -> f64 {
    60.0 / bpm.max(1) as f64
}

/// Wrap a raw step counter onto a sequence of `len` positions.
pub fn wrap_step(step: u64, len: usize) -> Option<usize> {
    if len == 0 {
        None
    } else {
        Some((step % len as u64) as usize)
    }
}

/// Playback topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayMode {
    /// One column per step, all rows
    #[default]
    Grid,
    /// Every word advances one cell per step on its own length
    Word,
}

impl PlayMode {
    pub fn code(self) -> char {
        match self {
            PlayMode::Grid => 'g',
            PlayMode::Word => 'w',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'g' => Some(PlayMode::Grid),
            'w' => Some(PlayMode::Word),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trigger {
    /// `pitch_index` is the grid row; see [`crate::instrument::pitch_for_row`]
    Tone {
        pitch_index: usize,
        time: f64,
        duration: f64,
    },
    Percussion {
        kind: Percussion,
        time: f64,
    },
}

impl Trigger {
    pub fn time(&self) -> f64 {
        match self {
            Trigger::Tone { time, .. } | Trigger::Percussion { time, .. } => *time,
        }
    }
}

/// Receives triggers from the scheduler.
///
/// Implementations must not fail back into the scheduler: an unavailable
/// backend simply drops the trigger.
pub trait TriggerSink {
    fn trigger_tone(&mut self, pitch_index: usize, time: f64, duration: f64);
    fn trigger_percussion(&mut self, kind: Percussion, time: f64);

    fn dispatch(&mut self, trigger: &Trigger) {
        match *trigger {
            Trigger::Tone {
                pitch_index,
                time,
                duration,
            } => self.trigger_tone(pitch_index, time, duration),
            Trigger::Percussion { kind, time } => self.trigger_percussion(kind, time),
        }
    }
}

/// Drops every trigger.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl TriggerSink for NullSink {
    fn trigger_tone(&mut self, _pitch_index: usize, _time: f64, _duration: f64) {}
    fn trigger_percussion(&mut self, _kind: Percussion, _time: f64) {}
}

/// Records triggers in dispatch order.
impl TriggerSink for Vec<Trigger> {
    fn trigger_tone(&mut self, pitch_index: usize, time: f64, duration: f64) {
        self.push(Trigger::Tone {
            pitch_index,
            time,
            duration,
        });
    }

    fn trigger_percussion(&mut self, kind: Percussion, time: f64) {
        self.push(Trigger::Percussion { kind, time });
    }
}

impl<T: TriggerSink + ?Sized> TriggerSink for &mut T {
    fn trigger_tone(&mut self, pitch_index: usize, time: f64, duration: f64) {
        (**self).trigger_tone(pitch_index, time, duration);
    }

    fn trigger_percussion(&mut self, kind: Percussion, time: f64) {
        (**self).trigger_percussion(kind, time);
    }
}

/// Fan out to two sinks.
impl<A: TriggerSink, B: TriggerSink> TriggerSink for (A, B) {
    fn trigger_tone(&mut self, pitch_index: usize, time: f64, duration: f64) {
        self.0.trigger_tone(pitch_index, time, duration);
        self.1.trigger_tone(pitch_index, time, duration);
    }

    fn trigger_percussion(&mut self, kind: Percussion, time: f64) {
        self.0.trigger_percussion(kind, time);
        self.1.trigger_percussion(kind, time);
    }
}

/// Percussion pieces already fired in the current step.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PercussionFlags {
    pub kick: bool,
    pub snare: bool,
    pub hat: bool,
}

impl PercussionFlags {
    /// Mark `kind` as fired. Returns false if it already was.
    pub fn claim(&mut self, kind: Percussion) -> bool {
        let flag = match kind {
            Percussion::Kick => &mut self.kick,
            Percussion::Snare => &mut self.snare,
            Percussion::Hat => &mut self.hat,
        };
        !std::mem::replace(flag, true)
    }
}

/// What an active cell should sound, if anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellSound {
    Tone { pitch_index: usize },
    Percussion(Percussion),
}

/// Decide what an active cell fires. Percussion is deduplicated through `fired`.
pub fn resolve_cell(
    mode: PlayMode,
    row: usize,
    cell: Cell,
    fired: &mut PercussionFlags,
) -> Option<CellSound> {
    match cell {
        Cell::Blocked if mode == PlayMode::Grid => Some(CellSound::Tone { pitch_index: row }),
        Cell::Letter(letter) => match Percussion::from_letter(letter) {
            Some(kind) => fired.claim(kind).then_some(CellSound::Percussion(kind)),
            None if mode == PlayMode::Word => Some(CellSound::Tone { pitch_index: row }),
            None => None,
        },
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackState {
    pub mode: PlayMode,
    /// Raw counter, never wrapped; each mode wraps it when reading
    pub current_step: u64,
    pub bpm: u32,
    pub running: bool,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            mode: PlayMode::Grid,
            current_step: 0,
            bpm: DEFAULT_BPM,
            running: false,
        }
    }
}

/// Outcome of one step, for highlighting.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    /// Raw counter value the step was resolved with
    pub step: u64,
    pub scheduled_time: f64,
    /// Cells addressed this step, in scan order
    pub active: Vec<(usize, usize)>,
    /// Subset of `active` that fired a trigger
    pub playing: Vec<(usize, usize)>,
    pub triggers: Vec<Trigger>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Deadline {
    /// Fire on the next poll, scheduled at that poll's clock reading
    Immediate,
    At(f64),
}

#[derive(Debug, Clone)]
pub struct PlaybackScheduler {
    state: PlaybackState,
    next_tick: Option<Deadline>,
    /// Tick interval in seconds, refreshed from `bpm` at the end of each step
    interval: f64,
    active: Vec<(usize, usize)>,
    playing: Vec<(usize, usize)>,
}

impl PlaybackScheduler {
    pub fn new(bpm: u32, mode: PlayMode) -> Self {
        let bpm = bpm.clamp(MIN_BPM, MAX_BPM);
        Self {
            state: PlaybackState {
                mode,
                bpm,
                ..PlaybackState::default()
            },
            next_tick: None,
            interval: step_duration(bpm),
            active: Vec::new(),
            playing: Vec::new(),
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    pub fn mode(&self) -> PlayMode {
        self.state.mode
    }

    /// Takes effect on the next step; the raw counter is kept.
    pub fn set_mode(&mut self, mode: PlayMode) {
        self.state.mode = mode;
    }

    pub fn bpm(&self) -> u32 {
        self.state.bpm
    }

    /// Stored immediately, applied to the tick rate at the end of the next step.
    pub fn change_tempo(&mut self, bpm: u32) {
        self.state.bpm = bpm.clamp(MIN_BPM, MAX_BPM);
    }

    pub fn current_step(&self) -> u64 {
        self.state.current_step
    }

    /// Current tick interval in seconds.
    pub fn interval(&self) -> f64 {
        self.interval
    }

    pub fn active_cells(&self) -> &[(usize, usize)] {
        &self.active
    }

    pub fn playing_cells(&self) -> &[(usize, usize)] {
        &self.playing
    }

    pub fn is_active(&self, row: usize, col: usize) -> bool {
        self.active.contains(&(row, col))
    }

    pub fn is_playing(&self, row: usize, col: usize) -> bool {
        self.playing.contains(&(row, col))
    }

    /// Arm the first step for the next poll. No-op while running.
    pub fn start(&mut self) {
        if self.state.running {
            return;
        }
        self.state.running = true;
        self.interval = step_duration(self.state.bpm);
        self.next_tick = Some(Deadline::Immediate);
        log::info!(
            "Playback started at step {} ({} bpm, {:?} mode)",
            self.state.current_step,
            self.state.bpm,
            self.state.mode
        );
    }

    /// Disarm the pending step and clear highlights. The step counter is kept,
    /// so a later start resumes in place. No-op while stopped.
    pub fn stop(&mut self) {
        if !self.state.running {
            return;
        }
        self.state.running = false;
        self.next_tick = None;
        self.active.clear();
        self.playing.clear();
        log::info!("Playback stopped at step {}", self.state.current_step);
    }

    pub fn toggle_play(&mut self) {
        if self.state.running {
            self.stop();
        } else {
            self.start();
        }
    }

    /// Seconds of clock time until the pending step, if one is armed.
    pub fn time_until_next(&self, now: f64) -> Option<f64> {
        match self.next_tick? {
            Deadline::Immediate => Some(0.0),
            Deadline::At(at) => Some((at - now).max(0.0)),
        }
    }

    /// Fire the pending step if it is due and re-arm the next one.
    ///
    /// When the host has fallen a full step or more behind, the schedule is
    /// re-anchored on `now` instead of firing the missed steps in a burst.
    pub fn poll<S: TriggerSink + ?Sized>(
        &mut self,
        now: f64,
        grid: &Grid,
        words: &[Word],
        sink: &mut S,
    ) -> Option<StepReport> {
        let scheduled = match self.next_tick? {
            Deadline::Immediate => now,
            Deadline::At(at) if now >= at => at,
            Deadline::At(_) => return None,
        };

        let report = self.on_tick(scheduled, grid, words, sink);

        let mut next = scheduled + self.interval;
        if next <= now {
            log::debug!(
                "Scheduler fell behind by {:.3}s, re-anchoring",
                now - scheduled
            );
            next = now + self.interval;
        }
        self.next_tick = Some(Deadline::At(next));

        Some(report)
    }

    /// Resolve and dispatch one step at `scheduled_time`, then advance the
    /// raw step counter.
    pub fn on_tick<S: TriggerSink + ?Sized>(
        &mut self,
        scheduled_time: f64,
        grid: &Grid,
        words: &[Word],
        sink: &mut S,
    ) -> StepReport {
        self.active.clear();
        self.playing.clear();

        let mut fired = PercussionFlags::default();
        let mut offset = 0.0;
        let mut triggers = Vec::new();
        let step = self.state.current_step;
        let mode = self.state.mode;
        let tone_duration = self.interval / 2.0;

        let cells: Vec<(usize, usize)> = match mode {
            PlayMode::Grid => match wrap_step(step, grid.size()) {
                Some(col) => (0..grid.size()).map(|row| (row, col)).collect(),
                None => Vec::new(),
            },
            PlayMode::Word => words.iter().filter_map(|w| w.cell_at_step(step)).collect(),
        };

        for (row, col) in cells {
            let Some(cell) = grid.get(row, col) else {
                continue;
            };
            self.active.push((row, col));

            let Some(sound) = resolve_cell(mode, row, cell, &mut fired) else {
                continue;
            };
            let time = scheduled_time + offset;
            let trigger = match sound {
                CellSound::Tone { pitch_index } => Trigger::Tone {
                    pitch_index,
                    time,
                    duration: tone_duration,
                },
                CellSound::Percussion(kind) => Trigger::Percussion { kind, time },
            };
            sink.dispatch(&trigger);
            triggers.push(trigger);
            self.playing.push((row, col));
            offset += TRIGGER_OFFSET;
        }

        log::trace!(
            "Step {} fired {} of {} active cells",
            step,
            triggers.len(),
            self.active.len()
        );

        self.interval = step_duration(self.state.bpm);
        self.state.current_step += 1;

        StepReport {
            step,
            scheduled_time,
            active: self.active.clone(),
            playing: self.playing.clone(),
            triggers,
        }
    }
}

impl Default for PlaybackScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_BPM, PlayMode::Grid)
    }
}
