/// Share-link codec - packs a session snapshot into one URL-safe string
///
/// Layout: `1|<size>|<bpm>|<entry><play><timbre><kit>|<cells>` where the
/// last field has one symbol per cell, row-major (`.` block, `-` empty,
/// anything else a letter). `_` and `~` are accepted as block and empty
/// when decoding.
use crate::instrument::{DrumKit, Timbre};
use crate::sequencer::playback::PlayMode;
use crate::sequencer::{Cell, Grid};
use crate::session::EntryMode;
use thiserror::Error;

const VERSION: &str = "1";
const SEPARATOR: char = '|';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("empty input")]
    Empty,

    #[error("unsupported format version {0:?}")]
    UnsupportedVersion(String),

    #[error("missing {0} field")]
    MissingField(&'static str),

    #[error("invalid {field}: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("invalid {field} code {code:?}")]
    InvalidCode { field: &'static str, code: char },

    #[error("grid size {0} out of range")]
    SizeOutOfRange(usize),

    #[error("expected {expected} cells, found {found}")]
    CellCount { expected: usize, found: usize },
}

/// Everything a share link carries.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub grid_size: usize,
    /// Row-major, `grid_size` rows of `grid_size` cells
    pub cells: Vec<Vec<Cell>>,
    pub bpm: u32,
    pub entry_mode: EntryMode,
    pub play_mode: PlayMode,
    pub timbre: Timbre,
    pub kit: DrumKit,
}

impl Snapshot {
    pub fn grid(&self) -> Option<Grid> {
        Grid::from_cells(self.cells.clone())
    }
}

pub fn encode(snapshot: &Snapshot) -> String {
    let cells: String = snapshot
        .cells
        .iter()
        .flatten()
        .map(|cell| cell.symbol())
        .collect();

    format!(
        "{VERSION}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{}{}{}{}{SEPARATOR}{}",
        snapshot.grid_size,
        snapshot.bpm,
        snapshot.entry_mode.code(),
        snapshot.play_mode.code(),
        snapshot.timbre.code(),
        snapshot.kit.code(),
        cells
    )
}

/// Decode a share string. Malformed input is logged and yields `None`.
pub fn decode(input: &str) -> Option<Snapshot> {
    match try_decode(input) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            log::warn!("Ignoring shared state: {}", e);
            None
        }
    }
}

pub fn try_decode(input: &str) -> Result<Snapshot, CodecError> {
    // Trailing spaces can be letters; only a pasted line ending is dropped
    let input = input
        .trim_start()
        .trim_end_matches(|c: char| c == '\r' || c == '\n');
    if input.is_empty() {
        return Err(CodecError::Empty);
    }

    // The cell field is last and may itself contain the separator as a letter
    let mut fields = input.splitn(5, SEPARATOR);
    let version = fields.next().ok_or(CodecError::MissingField("version"))?;
    if version != VERSION {
        return Err(CodecError::UnsupportedVersion(version.to_string()));
    }

    let grid_size: usize = parse_number("size", fields.next())?;
    if !(crate::sequencer::MIN_SIZE..=crate::sequencer::MAX_SIZE).contains(&grid_size) {
        return Err(CodecError::SizeOutOfRange(grid_size));
    }
    let bpm: u32 = parse_number("bpm", fields.next())?;

    let modes: Vec<char> = fields
        .next()
        .ok_or(CodecError::MissingField("modes"))?
        .chars()
        .collect();
    let &[entry, play, timbre, kit] = modes.as_slice() else {
        return Err(CodecError::MissingField("modes"));
    };
    let entry_mode = EntryMode::from_code(entry).ok_or(CodecError::InvalidCode {
        field: "entry mode",
        code: entry,
    })?;
    let play_mode = PlayMode::from_code(play).ok_or(CodecError::InvalidCode {
        field: "play mode",
        code: play,
    })?;
    let timbre = Timbre::from_code(timbre).ok_or(CodecError::InvalidCode {
        field: "timbre",
        code: timbre,
    })?;
    let kit = DrumKit::from_code(kit).ok_or(CodecError::InvalidCode {
        field: "kit",
        code: kit,
    })?;

    let symbols: Vec<Cell> = fields
        .next()
        .ok_or(CodecError::MissingField("grid"))?
        .chars()
        .map(Cell::from_symbol)
        .collect();
    let expected = grid_size * grid_size;
    if symbols.len() != expected {
        return Err(CodecError::CellCount {
            expected,
            found: symbols.len(),
        });
    }
    let cells = symbols
        .chunks(grid_size)
        .map(|row| row.to_vec())
        .collect();

    Ok(Snapshot {
        grid_size,
        cells,
        bpm,
        entry_mode,
        play_mode,
        timbre,
        kit,
    })
}

fn parse_number<T: std::str::FromStr>(
    field: &'static str,
    value: Option<&str>,
) -> Result<T, CodecError> {
    let value = value.ok_or(CodecError::MissingField(field))?;
    value.parse().map_err(|_| CodecError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Snapshot {
        let grid = Grid::from_rows(&[
            "K-.-----", "--------", "--------", "---HS---", "--------", "--------",
            "--------", "-----.-A",
        ])
        .unwrap();
        Snapshot {
            grid_size: 8,
            cells: grid.cells().to_vec(),
            bpm: 97,
            entry_mode: EntryMode::Letter,
            play_mode: PlayMode::Word,
            timbre: Timbre::Triangle,
            kit: DrumKit::Electronic,
        }
    }

    #[test]
    fn test_encode_layout() {
        let encoded = encode(&sample());
        assert!(encoded.starts_with("1|8|97|lwte|K-.-----"));
        assert_eq!(encoded.len(), "1|8|97|lwte|".len() + 64);
    }

    #[test]
    fn test_round_trip() {
        let snapshot = sample();
        assert_eq!(decode(&encode(&snapshot)), Some(snapshot));
    }

    #[test]
    fn test_alternate_symbols_decode() {
        let cells = format!("_~{}", "-".repeat(62));
        let snapshot = try_decode(&format!("1|8|120|bgsa|{}", cells)).unwrap();
        assert_eq!(snapshot.cells[0][0], Cell::Blocked);
        assert_eq!(snapshot.cells[0][1], Cell::Empty);
        assert_eq!(snapshot.play_mode, PlayMode::Grid);
    }

    #[test]
    fn test_separator_letter_in_cells() {
        let cells = format!("|{}", "-".repeat(63));
        let snapshot = try_decode(&format!("1|8|120|bgsa|{}", cells)).unwrap();
        assert_eq!(snapshot.cells[0][0], Cell::Letter('|'));
    }

    #[test]
    fn test_lowercase_letter_is_kept_literally() {
        let link = format!("1|8|120|bgsa|a{}", "-".repeat(63));
        let snapshot = try_decode(&link).unwrap();
        assert_eq!(snapshot.cells[0][0], Cell::Letter('a'));
        assert_eq!(encode(&snapshot), link);
    }

    #[test]
    fn test_trailing_space_letter_survives() {
        let link = format!("1|8|120|bgsa|{} ", "-".repeat(63));
        let snapshot = try_decode(&link).unwrap();
        assert_eq!(snapshot.cells[7][7], Cell::Letter(' '));
        assert_eq!(encode(&snapshot), link);

        let pasted = format!("  {}\r\n", link);
        assert_eq!(try_decode(&pasted), Ok(snapshot));
    }

    #[test]
    fn test_malformed_inputs() {
        assert_eq!(try_decode(""), Err(CodecError::Empty));
        assert!(matches!(
            try_decode("2|8|120|bgsa|"),
            Err(CodecError::UnsupportedVersion(_))
        ));
        assert_eq!(
            try_decode("1|8|120|bgsa"),
            Err(CodecError::MissingField("grid"))
        );
        assert_eq!(try_decode("1|4|120|bgsa|----"), Err(CodecError::SizeOutOfRange(4)));
        assert!(matches!(
            try_decode("1|8|fast|bgsa|"),
            Err(CodecError::InvalidNumber { field: "bpm", .. })
        ));
        assert_eq!(
            try_decode("1|8|120|bxsa|"),
            Err(CodecError::InvalidCode {
                field: "play mode",
                code: 'x'
            })
        );
        assert_eq!(
            try_decode("1|8|120|bgsa|---"),
            Err(CodecError::CellCount {
                expected: 64,
                found: 3
            })
        );
        assert_eq!(decode("not a link"), None);
    }
}
