/// Word segmentation - contiguous runs of open cells within a row
use super::Grid;

/// A run of open cells in one row, left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    row: usize,
    start_col: usize,
    len: usize,
}

impl Word {
    pub fn row(&self) -> usize {
        self.row
    }

    pub fn start_col(&self) -> usize {
        self.start_col
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (self.start_col..self.start_col + self.len).map(move |col| (self.row, col))
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        row == self.row && (self.start_col..self.start_col + self.len).contains(&col)
    }

    /// Cell addressed by a raw step counter, wrapped on this word's own length.
    pub fn cell_at_step(&self, step: u64) -> Option<(usize, usize)> {
        if self.len == 0 {
            return None;
        }
        let index = (step % self.len as u64) as usize;
        Some((self.row, self.start_col + index))
    }
}

/// Split the grid into words in row-major order.
pub fn segment_words(grid: &Grid) -> Vec<Word> {
    let mut words = Vec::new();

    for (row, cells) in grid.cells().iter().enumerate() {
        let mut current: Option<Word> = None;
        for (col, cell) in cells.iter().enumerate() {
            if cell.is_blocked() {
                words.extend(current.take());
                continue;
            }
            match current.as_mut() {
                Some(word) => word.len += 1,
                None => {
                    current = Some(Word {
                        row,
                        start_col: col,
                        len: 1,
                    })
                }
            }
        }
        words.extend(current);
    }

    words
}
