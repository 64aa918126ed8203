/// Core sequencer logic - grid state, symmetry toggling and numbering
///
/// The grid is always square. Cells are blocked, open and empty, or open
/// with a letter. Blocked cells are silent rests in word mode and pitched
/// hits in grid mode; letters `K`, `S` and `H` fire percussion.
use std::collections::HashMap;

pub mod playback;
pub mod words;

pub const MIN_SIZE: usize = 8;
pub const MAX_SIZE: usize = 16;

/// Symbols used when a grid is written out row by row.
pub const BLOCK_SYMBOL: char = '.';
pub const EMPTY_SYMBOL: char = '-';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Letter(char),
    Blocked,
}

impl Cell {
    pub fn is_blocked(self) -> bool {
        matches!(self, Cell::Blocked)
    }

    pub fn is_open(self) -> bool {
        !self.is_blocked()
    }

    pub fn letter(self) -> Option<char> {
        match self {
            Cell::Letter(ch) => Some(ch),
            _ => None,
        }
    }

    /// `.`/`_` block, `-`/`~` empty, anything else is the letter itself,
    /// case and all.
    pub fn from_symbol(symbol: char) -> Self {
        match symbol {
            '.' | '_' => Cell::Blocked,
            '-' | '~' => Cell::Empty,
            other => Cell::Letter(other),
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Cell::Blocked => BLOCK_SYMBOL,
            Cell::Empty => EMPTY_SYMBOL,
            Cell::Letter(ch) => ch,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Grid {
    cells: Vec<Vec<Cell>>,
    size: usize,
    /// Last known state of coordinates removed by a shrink, restored on grow
    removed: HashMap<(usize, usize), Cell>,
    numbers: Vec<Vec<Option<u32>>>,
}

impl Grid {
    /// `size` is clamped to `MIN_SIZE..=MAX_SIZE`.
    pub fn new(size: usize) -> Self {
        let size = size.clamp(MIN_SIZE, MAX_SIZE);
        let mut grid = Self {
            cells: vec![vec![Cell::Empty; size]; size],
            size,
            removed: HashMap::new(),
            numbers: Vec::new(),
        };
        grid.recompute_numbering();
        grid
    }

    /// Build a grid from its row-major cell matrix. Returns `None` unless the
    /// matrix is square with a size in range.
    pub fn from_cells(cells: Vec<Vec<Cell>>) -> Option<Self> {
        let size = cells.len();
        if !(MIN_SIZE..=MAX_SIZE).contains(&size) || cells.iter().any(|row| row.len() != size) {
            return None;
        }
        let mut grid = Self {
            cells,
            size,
            removed: HashMap::new(),
            numbers: Vec::new(),
        };
        grid.recompute_numbering();
        Some(grid)
    }

    /// Build a grid from one symbol string per row (see [`Cell::from_symbol`]).
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Option<Self> {
        let cells = rows
            .iter()
            .map(|row| row.as_ref().chars().map(Cell::from_symbol).collect())
            .collect();
        Self::from_cells(cells)
    }

    pub fn to_rows(&self) -> Vec<String> {
        self.cells
            .iter()
            .map(|row| row.iter().map(|cell| cell.symbol()).collect())
            .collect()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn cells(&self) -> &[Vec<Cell>] {
        &self.cells
    }

    pub fn get(&self, row: usize, col: usize) -> Option<Cell> {
        self.cells.get(row).and_then(|r| r.get(col)).copied()
    }

    /// Out-of-range coordinates read as not blocked.
    pub fn is_blocked(&self, row: usize, col: usize) -> bool {
        self.get(row, col).is_some_and(Cell::is_blocked)
    }

    pub fn mirror(&self, row: usize, col: usize) -> (usize, usize) {
        (self.size - 1 - row, self.size - 1 - col)
    }

    pub fn open_cell_count(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|cell| cell.is_open())
            .count()
    }

    /// Cached state for a coordinate currently outside the grid.
    pub fn removed_cell(&self, row: usize, col: usize) -> Option<Cell> {
        self.removed.get(&(row, col)).copied()
    }

    fn set(&mut self, row: usize, col: usize, cell: Cell) {
        if let Some(slot) = self.cells.get_mut(row).and_then(|r| r.get_mut(col)) {
            *slot = cell;
        }
    }

    /// Flip the block state of `(row, col)`.
    ///
    /// Unless `break_symmetry` is set, the point-mirrored cell is forced to the
    /// same block state as the primary. Blocking a cell drops its letter.
    pub fn toggle(&mut self, row: usize, col: usize, break_symmetry: bool) {
        let Some(current) = self.get(row, col) else {
            return;
        };

        let blocked = !current.is_blocked();
        self.set(row, col, if blocked { Cell::Blocked } else { Cell::Empty });

        if !break_symmetry {
            let (mr, mc) = self.mirror(row, col);
            match self.get(mr, mc) {
                Some(_) if blocked => self.set(mr, mc, Cell::Blocked),
                Some(Cell::Blocked) => self.set(mr, mc, Cell::Empty),
                _ => {}
            }
        }

        self.recompute_numbering();
    }

    /// Write a letter into `(row, col)`, unblocking it (and its mirror) first.
    ///
    /// `None` or whitespace clears the letter. Anything that is not an ASCII
    /// letter is ignored.
    pub fn set_letter(&mut self, row: usize, col: usize, letter: Option<char>) {
        let Some(current) = self.get(row, col) else {
            return;
        };

        let cell = match letter {
            None => Cell::Empty,
            Some(ch) if ch.is_whitespace() => Cell::Empty,
            Some(ch) if ch.is_ascii_alphabetic() => Cell::Letter(ch.to_ascii_uppercase()),
            Some(ch) => {
                log::debug!("Ignoring non-letter input {:?} at ({}, {})", ch, row, col);
                return;
            }
        };

        if current.is_blocked() {
            let (mr, mc) = self.mirror(row, col);
            if self.is_blocked(mr, mc) {
                self.set(mr, mc, Cell::Empty);
            }
        }
        self.set(row, col, cell);
        self.recompute_numbering();
    }

    /// Change the side length, keeping every surviving coordinate.
    ///
    /// Cells cut off by a shrink are remembered and come back on a later grow;
    /// coordinates never seen before start empty.
    pub fn resize(&mut self, new_size: usize) {
        let new_size = new_size.clamp(MIN_SIZE, MAX_SIZE);
        let old_size = self.size;
        if new_size == old_size {
            return;
        }

        if new_size < old_size {
            for (r, row) in self.cells.iter().enumerate() {
                for (c, cell) in row.iter().enumerate() {
                    if r >= new_size || c >= new_size {
                        self.removed.insert((r, c), *cell);
                    }
                }
            }
            self.cells.truncate(new_size);
            for row in &mut self.cells {
                row.truncate(new_size);
            }
        } else {
            for r in 0..new_size {
                if r >= old_size {
                    self.cells.push(Vec::with_capacity(new_size));
                }
                let start = self.cells[r].len();
                for c in start..new_size {
                    let cell = self.removed.get(&(r, c)).copied().unwrap_or_default();
                    self.cells[r].push(cell);
                }
            }
        }

        log::debug!("Grid resized {} -> {}", old_size, new_size);
        self.size = new_size;
        self.recompute_numbering();
    }

    /// Unblock every cell and forget all cells cached by earlier shrinks.
    pub fn clear_blocks(&mut self) {
        for cell in self.cells.iter_mut().flatten() {
            if cell.is_blocked() {
                *cell = Cell::Empty;
            }
        }
        self.removed.clear();
        self.recompute_numbering();
    }

    pub fn clear_letters(&mut self) {
        for cell in self.cells.iter_mut().flatten() {
            if cell.letter().is_some() {
                *cell = Cell::Empty;
            }
        }
        self.recompute_numbering();
    }

    /// Crossword numbering: an open cell gets the next number when it starts
    /// an across run or a down run, i.e. the cell to the left OR the cell
    /// above is blocked or off the grid.
    pub fn recompute_numbering(&mut self) {
        let mut next = 1;
        let mut numbers = vec![vec![None; self.size]; self.size];

        for (r, row) in self.cells.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                if cell.is_blocked() {
                    continue;
                }
                let above_closed = r == 0 || self.cells[r - 1][c].is_blocked();
                let left_closed = c == 0 || row[c - 1].is_blocked();
                if above_closed || left_closed {
                    numbers[r][c] = Some(next);
                    next += 1;
                }
            }
        }

        self.numbers = numbers;
    }

    pub fn number(&self, row: usize, col: usize) -> Option<u32> {
        self.numbers.get(row).and_then(|r| r.get(col)).copied().flatten()
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new(MIN_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_symmetric(grid: &Grid) {
        let n = grid.size();
        for r in 0..n {
            for c in 0..n {
                assert_eq!(
                    grid.is_blocked(r, c),
                    grid.is_blocked(n - 1 - r, n - 1 - c),
                    "asymmetry at ({}, {})",
                    r,
                    c
                );
            }
        }
    }

    #[test]
    fn test_grid_creation() {
        let grid = Grid::new(8);
        assert_eq!(grid.size(), 8);
        assert_eq!(grid.open_cell_count(), 64);
        assert_eq!(Grid::new(3).size(), MIN_SIZE);
        assert_eq!(Grid::new(40).size(), MAX_SIZE);
    }

    #[test]
    fn test_grid_toggle_mirrors() {
        let mut grid = Grid::new(8);
        grid.toggle(0, 1, false);
        assert!(grid.is_blocked(0, 1));
        assert!(grid.is_blocked(7, 6));

        grid.toggle(7, 6, false);
        assert!(!grid.is_blocked(7, 6));
        assert!(!grid.is_blocked(0, 1));
    }

    #[test]
    fn test_toggle_forces_mirror_to_match() {
        let mut grid = Grid::new(8);
        grid.toggle(2, 3, true);
        assert!(grid.is_blocked(2, 3));
        assert!(!grid.is_blocked(5, 4));

        // The mirror is set to match, not flipped

        grid.toggle(5, 4, false);
        assert!(grid.is_blocked(5, 4));
        assert!(grid.is_blocked(2, 3));
    }

    #[test]
    fn test_symmetric_toggles_keep_symmetry() {
        let mut grid = Grid::new(9);
        for (r, c) in [(0, 0), (1, 4), (4, 4), (3, 7), (8, 2), (1, 4), (6, 6)] {
            grid.toggle(r, c, false);
            assert_symmetric(&grid);
        }
    }

    #[test]
    fn test_broken_symmetry_persists() {
        let mut grid = Grid::new(8);
        grid.toggle(1, 1, true);
        grid.toggle(3, 3, false);
        assert!(grid.is_blocked(1, 1));
        assert!(!grid.is_blocked(6, 6));
    }

    #[test]
    fn test_toggle_clears_letters() {
        let mut grid = Grid::new(8);
        grid.set_letter(0, 0, Some('k'));
        grid.set_letter(7, 7, Some('s'));
        grid.toggle(0, 0, false);
        assert_eq!(grid.get(0, 0), Some(Cell::Blocked));
        assert_eq!(grid.get(7, 7), Some(Cell::Blocked));

        grid.toggle(0, 0, false);
        assert_eq!(grid.get(0, 0), Some(Cell::Empty));
        assert_eq!(grid.get(7, 7), Some(Cell::Empty));
    }

    #[test]
    fn test_unblock_keeps_mirror_letter() {
        let mut grid = Grid::new(8);
        grid.toggle(0, 0, true);
        grid.set_letter(7, 7, Some('a'));
        grid.toggle(0, 0, false);
        assert_eq!(grid.get(0, 0), Some(Cell::Empty));
        assert_eq!(grid.get(7, 7), Some(Cell::Letter('A')));
    }

    #[test]
    fn test_toggle_out_of_range_is_noop() {
        let mut grid = Grid::new(8);
        grid.toggle(8, 0, false);
        grid.toggle(0, 99, true);
        assert_eq!(grid.open_cell_count(), 64);
    }

    #[test]
    fn test_set_letter_unblocks_cell_and_mirror() {
        let mut grid = Grid::new(8);
        grid.toggle(1, 2, false);
        grid.set_letter(1, 2, Some('h'));
        assert_eq!(grid.get(1, 2), Some(Cell::Letter('H')));
        assert_eq!(grid.get(6, 5), Some(Cell::Empty));
    }

    #[test]
    fn test_set_letter_clear_and_reject() {
        let mut grid = Grid::new(8);
        grid.set_letter(3, 3, Some('x'));
        grid.set_letter(3, 3, Some('7'));
        assert_eq!(grid.get(3, 3), Some(Cell::Letter('X')));
        grid.set_letter(3, 3, Some(' '));
        assert_eq!(grid.get(3, 3), Some(Cell::Empty));
        grid.set_letter(3, 3, Some('q'));
        grid.set_letter(3, 3, None);
        assert_eq!(grid.get(3, 3), Some(Cell::Empty));
    }

    #[test]
    fn test_resize_round_trip() {
        let mut grid = Grid::new(10);
        grid.toggle(3, 3, true);
        grid.toggle(9, 0, true);
        grid.set_letter(8, 8, Some('k'));
        grid.set_letter(1, 2, Some('e'));

        grid.resize(8);
        assert_eq!(grid.size(), 8);
        assert_eq!(grid.removed_cell(9, 0), Some(Cell::Blocked));
        assert_eq!(grid.removed_cell(8, 8), Some(Cell::Letter('K')));

        grid.resize(10);
        assert!(grid.is_blocked(3, 3));
        assert!(grid.is_blocked(9, 0));
        assert_eq!(grid.get(8, 8), Some(Cell::Letter('K')));
        assert_eq!(grid.get(1, 2), Some(Cell::Letter('E')));
        assert_eq!(grid.get(9, 9), Some(Cell::Empty));
    }

    #[test]
    fn test_resize_remembers_latest_state() {
        let mut grid = Grid::new(10);
        grid.toggle(9, 9, true);
        grid.resize(8);
        grid.resize(10);
        grid.toggle(9, 9, true);
        grid.resize(8);
        grid.resize(10);
        assert_eq!(grid.get(9, 9), Some(Cell::Empty));
    }

    #[test]
    fn test_resize_clamps_and_noops() {
        let mut grid = Grid::new(8);
        grid.resize(2);
        assert_eq!(grid.size(), MIN_SIZE);
        grid.resize(100);
        assert_eq!(grid.size(), MAX_SIZE);
        assert!(grid.cells().iter().all(|row| row.len() == MAX_SIZE));
    }

    #[test]
    fn test_clear_blocks_drops_cache() {
        let mut grid = Grid::new(10);
        grid.toggle(9, 9, true);
        grid.set_letter(0, 1, Some('z'));
        grid.resize(8);
        grid.toggle(2, 2, false);
        grid.clear_blocks();
        assert_eq!(grid.open_cell_count(), 64);
        assert_eq!(grid.get(0, 1), Some(Cell::Letter('Z')));

        grid.resize(10);
        assert_eq!(grid.get(9, 9), Some(Cell::Empty));
    }

    #[test]
    fn test_clear_letters_keeps_blocks() {
        let mut grid = Grid::from_rows(&[
            "K-.-S---",
            "--------",
            "---H-.--",
            "--------",
            "--------",
            "--.-----",
            "--------",
            "----Q.--",
        ])
        .unwrap();
        let numbers: Vec<Option<u32>> = (0..64).map(|i| grid.number(i / 8, i % 8)).collect();

        grid.clear_letters();
        assert_eq!(
            grid.to_rows(),
            [
                "--.-----", "--------", "-----.--", "--------", "--------", "--.-----",
                "--------", "-----.--",
            ]
        );
        let after: Vec<Option<u32>> = (0..64).map(|i| grid.number(i / 8, i % 8)).collect();
        assert_eq!(after, numbers);
    }

    #[test]
    fn test_numbering_open_grid() {
        let grid = Grid::new(8);
        // Top row and left column start runs
        assert_eq!(grid.number(0, 0), Some(1));
        assert_eq!(grid.number(0, 7), Some(8));
        assert_eq!(grid.number(1, 0), Some(9));
        assert_eq!(grid.number(1, 1), None);
    }

    #[test]
    fn test_numbering_after_blocks() {
        let grid = Grid::from_rows(&[
            "--.-----",
            "--------",
            ".-------",
            "--------",
            "--------",
            "--------",
            "--------",
            "-----.--",
        ])
        .unwrap();
        assert_eq!(grid.number(0, 2), None);
        assert_eq!(grid.number(0, 3), Some(3));
        // Below a block
        assert_eq!(grid.number(1, 2), Some(9));
        // Right of a block
        assert_eq!(grid.number(2, 1), Some(10));
        assert_eq!(grid.number(3, 0), Some(11));
        assert_eq!(grid.number(7, 6), Some(16));
    }

    #[test]
    fn test_numbering_is_monotonic() {
        let grid = Grid::from_rows(&[
            "-.-.----",
            "--..----",
            "----.---",
            ".-------",
            "-------.",
            "---.----",
            "----..--",
            "----.-.-",
        ])
        .unwrap();
        let mut last = 0;
        for r in 0..8 {
            for c in 0..8 {
                if let Some(n) = grid.number(r, c) {
                    assert!(!grid.is_blocked(r, c));
                    assert_eq!(n, last + 1);
                    last = n;
                }
            }
        }
        assert!(last > 0);
    }

    #[test]
    fn test_rows_round_trip() {
        let rows = vec![
            "K-.-----", "--------", "--------", "---HS---", "--------", "--------",
            "--------", "-----.-A",
        ];
        let grid = Grid::from_rows(rows.as_slice()).unwrap();
        assert_eq!(grid.to_rows(), rows);
        assert!(Grid::from_rows(&["---"]).is_none());
    }

    #[test]
    fn test_alternate_symbols() {
        assert_eq!(Cell::from_symbol('_'), Cell::Blocked);
        assert_eq!(Cell::from_symbol('~'), Cell::Empty);
        assert_eq!(Cell::from_symbol('k'), Cell::Letter('k'));
        assert_eq!(Cell::from_symbol(' '), Cell::Letter(' '));
    }
}
