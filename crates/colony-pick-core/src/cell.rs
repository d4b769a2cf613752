use serde::{Deserialize, Serialize};

/// Zero-based `(row, col)` address of a plate-map cell.
///
/// Ordering is row-major, so a `BTreeMap<CellKey, _>` iterates cells in the
/// order the plan is assembled.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CellKey {
    pub row: usize,
    pub col: usize,
}

impl CellKey {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Resolve a mask name such as `"plate_b12"` (or `"masks/plate_b12.png"`)
    /// into a cell.
    ///
    /// The key is the last `_`-separated token of the file stem: a row letter
    /// (`a` = row 0, case-insensitive) followed by a one-based column number.
    /// `"b12"` resolves to row 1, col 11.
    pub fn from_mask_name(name: &str) -> Option<Self> {
        let file = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(name);
        let stem = match file.rfind('.') {
            Some(dot) if dot > 0 => &file[..dot],
            _ => file,
        };
        let token = stem.rsplit('_').next()?;

        let mut chars = token.chars();
        let letter = chars.next()?.to_ascii_lowercase();
        if !letter.is_ascii_lowercase() {
            return None;
        }
        let digits = chars.as_str();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let column: usize = digits.parse().ok()?;
        let col = column.checked_sub(1)?;
        Some(Self {
            row: (letter as u8 - b'a') as usize,
            col,
        })
    }

    /// Spreadsheet-style label (`row 1, col 11` -> `"B12"`), for logs and reports.
    pub fn label(self) -> String {
        let letter = if self.row < 26 {
            char::from(b'A' + self.row as u8).to_string()
        } else {
            format!("R{}", self.row)
        };
        format!("{}{}", letter, self.col + 1)
    }
}

impl std::fmt::Display for CellKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}
