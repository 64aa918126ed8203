/// Sequencer session - the single owner of grid, words and playback state
///
/// Every UI event becomes a [`Command`] handed to [`SequencerSession::handle`].
/// Derived data (numbering, words) is refreshed before `handle` returns, so
/// the next poll always sees the live grid.
use crate::codec::{self, Snapshot};
use crate::config::DrumfillConfig;
use crate::error::Result;
use crate::instrument::{DrumKit, Timbre};
use crate::sequencer::playback::{PlayMode, PlaybackScheduler, StepReport, TriggerSink};
use crate::sequencer::words::{segment_words, Word};
use crate::sequencer::Grid;
use serde::{Deserialize, Serialize};

/// What a cell click does in the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryMode {
    /// Clicks toggle blocks
    #[default]
    Block,
    /// Clicks select a cell for typing
    Letter,
}

impl EntryMode {
    pub fn code(self) -> char {
        match self {
            EntryMode::Block => 'b',
            EntryMode::Letter => 'l',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'b' => Some(EntryMode::Block),
            'l' => Some(EntryMode::Letter),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ToggleCell {
        row: usize,
        col: usize,
        break_symmetry: bool,
    },
    /// `None` clears the letter
    EnterLetter {
        row: usize,
        col: usize,
        letter: Option<char>,
    },
    Resize(usize),
    ChangeTempo(u32),
    ChangeMode(PlayMode),
    TogglePlay,
    Start,
    Stop,
    ClearBlocks,
    ClearLetters,
    SetEntryMode(EntryMode),
    SetTimbre(Timbre),
    SetKit(DrumKit),
    Load(Snapshot),
}

#[derive(Debug, Clone)]
pub struct SequencerSession {
    grid: Grid,
    words: Vec<Word>,
    scheduler: PlaybackScheduler,
    entry_mode: EntryMode,
    timbre: Timbre,
    kit: DrumKit,
}

impl SequencerSession {
    pub fn new() -> Self {
        Self::from_config(&DrumfillConfig::default())
    }

    pub fn from_config(config: &DrumfillConfig) -> Self {
        let grid = Grid::new(config.grid.size);
        let words = segment_words(&grid);
        Self {
            grid,
            words,
            scheduler: PlaybackScheduler::new(config.playback.bpm, config.playback.mode),
            entry_mode: config.entry_mode,
            timbre: config.sound.timbre,
            kit: config.sound.kit,
        }
    }

    /// Start from a share string, falling back to `config` when it does not decode.
    pub fn from_link(link: &str, config: &DrumfillConfig) -> Self {
        let mut session = Self::from_config(config);
        if let Some(snapshot) = codec::decode(link) {
            session.load(snapshot);
        }
        session
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn scheduler(&self) -> &PlaybackScheduler {
        &self.scheduler
    }

    pub fn entry_mode(&self) -> EntryMode {
        self.entry_mode
    }

    pub fn timbre(&self) -> Timbre {
        self.timbre
    }

    pub fn kit(&self) -> DrumKit {
        self.kit
    }

    pub fn play_mode(&self) -> PlayMode {
        self.scheduler.mode()
    }

    pub fn bpm(&self) -> u32 {
        self.scheduler.bpm()
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn handle(&mut self, command: Command) {
        log::debug!("Command: {:?}", command);
        match command {
            Command::ToggleCell {
                row,
                col,
                break_symmetry,
            } => {
                self.grid.toggle(row, col, break_symmetry);
                self.refresh_words();
            }
            Command::EnterLetter { row, col, letter } => {
                self.grid.set_letter(row, col, letter);
                self.refresh_words();
            }
            Command::Resize(size) => {
                self.grid.resize(size);
                self.refresh_words();
            }
            Command::ChangeTempo(bpm) => self.scheduler.change_tempo(bpm),
            Command::ChangeMode(mode) => self.scheduler.set_mode(mode),
            Command::TogglePlay => self.scheduler.toggle_play(),
            Command::Start => self.scheduler.start(),
            Command::Stop => self.scheduler.stop(),
            Command::ClearBlocks => {
                self.grid.clear_blocks();
                self.refresh_words();
            }
            Command::ClearLetters => {
                self.grid.clear_letters();
                self.refresh_words();
            }
            Command::SetEntryMode(mode) => self.entry_mode = mode,
            Command::SetTimbre(timbre) => self.timbre = timbre,
            Command::SetKit(kit) => self.kit = kit,
            Command::Load(snapshot) => self.load(snapshot),
        }
    }

    /// Decode and load a share string. On error nothing changes.
    pub fn load_link(&mut self, link: &str) -> Result<()> {
        let snapshot = codec::try_decode(link)?;
        self.load(snapshot);
        Ok(())
    }

    /// Replace grid and settings with `snapshot`. A snapshot whose cells do
    /// not form a valid grid leaves the current grid in place.
    pub fn load(&mut self, snapshot: Snapshot) {
        match snapshot.grid() {
            Some(grid) => {
                self.grid = grid;
                self.refresh_words();
            }
            None => log::warn!(
                "Snapshot grid is not a valid {}x{} grid, keeping current grid",
                snapshot.grid_size,
                snapshot.grid_size
            ),
        }
        self.scheduler.change_tempo(snapshot.bpm);
        self.scheduler.set_mode(snapshot.play_mode);
        self.entry_mode = snapshot.entry_mode;
        self.timbre = snapshot.timbre;
        self.kit = snapshot.kit;
        log::info!(
            "Loaded {}x{} grid at {} bpm",
            self.grid.size(),
            self.grid.size(),
            self.scheduler.bpm()
        );
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            grid_size: self.grid.size(),
            cells: self.grid.cells().to_vec(),
            bpm: self.scheduler.bpm(),
            entry_mode: self.entry_mode,
            play_mode: self.scheduler.mode(),
            timbre: self.timbre,
            kit: self.kit,
        }
    }

    pub fn share_link(&self) -> String {
        codec::encode(&self.snapshot())
    }

    /// Advance playback to clock time `now` (seconds), dispatching into `sink`.
    pub fn poll<S: TriggerSink + ?Sized>(&mut self, now: f64, sink: &mut S) -> Option<StepReport> {
        self.scheduler.poll(now, &self.grid, &self.words, sink)
    }

    fn refresh_words(&mut self) {
        self.words = segment_words(&self.grid);
    }
}

impl Default for SequencerSession {
    fn default() -> Self {
        Self::new()
    }
}
