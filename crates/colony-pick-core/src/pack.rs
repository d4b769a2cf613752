//! Packing picks into culture blocks.
//!
//! The row/column bounds are compared with `==` *after* appending, so a row
//! closes once it holds `block_columns + 1` picks and a block once it holds
//! `block_rows + 1` rows. A 96-well block (8 x 12) is therefore configured as
//! `block_rows = 7`, `block_columns = 11`. Downstream protocols are sized for
//! this; do not "fix" it.

use serde::{Deserialize, Serialize};

use crate::PickEntry;

/// One destination block: picks in row-major order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CultureBlock {
    /// Position in the plan, zero-based.
    pub index: usize,
    /// Row capacity (`block_rows + 1`).
    pub rows: usize,
    /// Column capacity (`block_columns + 1`).
    pub columns: usize,
    /// Filled rows; only the last row may be short, trailing empty rows are omitted.
    pub grid: Vec<Vec<PickEntry>>,
}

impl CultureBlock {
    /// `culture_block_<index>`, used for output file names.
    pub fn name(&self) -> String {
        format!("culture_block_{}", self.index)
    }

    pub fn capacity(&self) -> usize {
        self.rows * self.columns
    }

    pub fn len(&self) -> usize {
        self.grid.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    /// Pick at `(row, col)`, `None` for a cell that was never filled.
    pub fn cell(&self, row: usize, col: usize) -> Option<&PickEntry> {
        self.grid.get(row)?.get(col)
    }

    /// Picks in fill order.
    pub fn entries(&self) -> impl Iterator<Item = &PickEntry> {
        self.grid.iter().flatten()
    }

    /// Plasmid names per row, for block-map tables.
    pub fn plasmid_rows(&self) -> Vec<Vec<&str>> {
        self.grid
            .iter()
            .map(|row| row.iter().map(|e| e.plasmid.as_str()).collect())
            .collect()
    }
}

/// Incremental packer: one `push` per pick, in plan order.
#[derive(Clone, Debug)]
pub struct BlockPacker {
    block_rows: usize,
    block_columns: usize,
    blocks: Vec<Vec<Vec<PickEntry>>>,
    /// Current block (`n`), row (`i`) and column (`j`).
    n: usize,
    i: usize,
    j: usize,
}

impl BlockPacker {
    /// Start with one block holding one empty row.
    pub fn new(block_rows: usize, block_columns: usize) -> Self {
        Self {
            block_rows,
            block_columns,
            blocks: vec![vec![Vec::new()]],
            n: 0,
            i: 0,
            j: 0,
        }
    }

    /// Append `entry` at `(n, i)` and advance the cursor.
    pub fn push(&mut self, entry: PickEntry) {
        self.blocks[self.n][self.i].push(entry);

        if self.j == self.block_columns {
            if self.i == self.block_rows {
                self.n += 1;
                self.i = 0;
                self.blocks.push(Vec::new());
            } else {
                self.i += 1;
            }
            self.j = 0;
            self.blocks[self.n].push(Vec::new());
        } else {
            self.j += 1;
        }
    }

    /// Number of picks pushed so far.
    pub fn len(&self) -> usize {
        self.blocks.iter().flatten().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close the stream. The row or block opened after the last pick is not
    /// emitted, so `m` picks give `ceil(m / capacity)` blocks.
    pub fn finish(self) -> Vec<CultureBlock> {
        let rows = self.block_rows + 1;
        let columns = self.block_columns + 1;
        self.blocks
            .into_iter()
            .map(|mut grid| {
                while grid.last().is_some_and(Vec::is_empty) {
                    grid.pop();
                }
                grid
            })
            .filter(|grid| !grid.is_empty())
            .enumerate()
            .map(|(index, grid)| CultureBlock {
                index,
                rows,
                columns,
                grid,
            })
            .collect()
    }
}

/// Pack a whole stream at once.
pub fn pack<I>(entries: I, block_rows: usize, block_columns: usize) -> Vec<CultureBlock>
where
    I: IntoIterator<Item = PickEntry>,
{
    let mut packer = BlockPacker::new(block_rows, block_columns);
    for entry in entries {
        packer.push(entry);
    }
    packer.finish()
}
