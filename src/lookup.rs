use std::{
    fs, io,
    path::{Path, PathBuf},
    str::FromStr,
};

use crate::N_GUIDES;

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("failed to read the lookup table {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("lookup table line {line}: expected 2 columns, found {found}")]
    Columns { line: usize, found: usize },
    #[error("lookup table line {line}: {value:?} is not a positive integer")]
    NotPositiveInteger { line: usize, value: String },
    #[error("lookup table line {line}: {value} is outside [1, {max}]", max = N_GUIDES)]
    OutOfRange { line: usize, value: usize },
    #[error("lookup table has {0} rows, expected {max}", max = N_GUIDES)]
    Rows(usize),
    #[error("lookup table {column} column is not a permutation, slot {slot} is used twice")]
    NotAPermutation { column: &'static str, slot: usize },
}
type Result<T> = std::result::Result<T, LookupError>;

/// Fibers to holes lookup table
///
/// Each entry is a `(fiber, hole)` pair of guide slots in `[1, N_GUIDES]`,
/// the hole being the slot of the guide in the plPlugMapP field order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup(Vec<(usize, usize)>);
impl Lookup {
    /// Fiber `i` in hole `i`
    pub fn identity() -> Self {
        Self((1..=N_GUIDES).map(|i| (i, i)).collect())
    }
    /// Loads the table from `path` or returns the identity if there is none
    pub fn select<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => Ok(Self::identity()),
        }
    }
    /// Loads a whitespace delimited 2 columns table
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| LookupError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Loading lookup table {:?}", path);
        contents.parse()
    }
    /// The `(fiber, hole)` pairs
    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.0
    }
    /// Fiber `i` in hole `i` for every pair
    pub fn is_identity(&self) -> bool {
        self.0.iter().enumerate().all(|(i, &(f, h))| f == i + 1 && h == i + 1)
    }

    fn check_permutation(&self) -> Result<()> {
        for (column, slots) in [
            ("fiber", self.0.iter().map(|p| p.0).collect::<Vec<_>>()),
            ("hole", self.0.iter().map(|p| p.1).collect::<Vec<_>>()),
        ] {
            let mut seen = [false; N_GUIDES];
            for slot in slots {
                if std::mem::replace(&mut seen[slot - 1], true) {
                    return Err(LookupError::NotAPermutation { column, slot });
                }
            }
        }
        Ok(())
    }
}
impl FromStr for Lookup {
    type Err = LookupError;

    fn from_str(s: &str) -> Result<Self> {
        let parse = |line: usize, value: &str| -> Result<usize> {
            let slot = value
                .parse::<usize>()
                .ok()
                .filter(|&v| v > 0)
                .ok_or_else(|| LookupError::NotPositiveInteger {
                    line,
                    value: value.to_string(),
                })?;
            if slot > N_GUIDES {
                return Err(LookupError::OutOfRange { line, value: slot });
            }
            Ok(slot)
        };
        let mut pairs = vec![];
        for (i, line) in s.lines().enumerate() {
            let line_number = i + 1;
            let content = line.split('#').next().unwrap_or_default().trim();
            if content.is_empty() {
                continue;
            }
            let columns: Vec<&str> = content.split_whitespace().collect();
            if columns.len() != 2 {
                return Err(LookupError::Columns {
                    line: line_number,
                    found: columns.len(),
                });
            }
            pairs.push((parse(line_number, columns[0])?, parse(line_number, columns[1])?));
        }
        if pairs.len() != N_GUIDES {
            return Err(LookupError::Rows(pairs.len()));
        }
        let lookup = Self(pairs);
        lookup.check_permutation()?;
        Ok(lookup)
    }
}
