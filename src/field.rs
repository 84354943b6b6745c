use std::{fmt, ops::RangeInclusive};

use strum_macros::{Display, EnumIter, EnumString};

use crate::{FIELDS_PER_POINTING, N_GUIDES};

#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    #[error(r#"pointing {0:?} is not recognized, expected "A", "B", "C" or "D""#)]
    Pointing(String),
    #[error("field {0} is not recognized, expected 1, 2 or 3")]
    Field(u32),
}
type Result<T> = std::result::Result<T, FieldError>;

/// Plate pointing, each commissioning plate carries up to 4 of them
#[derive(EnumIter, EnumString, Display, Clone, Copy, PartialEq, Eq, Debug)]
#[strum(ascii_case_insensitive)]
pub enum Pointing {
    A,
    B,
    C,
    D,
}
impl Pointing {
    /// Get a new `Pointing` from its letter
    pub fn new(letter: &str) -> Result<Self> {
        letter
            .trim()
            .parse()
            .map_err(|_| FieldError::Pointing(letter.to_string()))
    }
    /// Zero based pointing index
    pub fn index(&self) -> usize {
        *self as usize
    }
    /// Suffix appended to the plate id in file names, empty for the first pointing
    pub fn suffix(&self) -> String {
        match self {
            Pointing::A => String::new(),
            pointing => pointing.to_string(),
        }
    }
}

/// Marking colour of a field
#[derive(EnumIter, Display, Clone, Copy, PartialEq, Eq, Debug)]
#[strum(serialize_all = "UPPERCASE")]
pub enum FieldColour {
    Green,
    Blue,
    Violet,
}

/// Guide star field of a pointing
#[derive(EnumIter, Clone, Copy, PartialEq, Eq, Debug)]
pub enum Field {
    One,
    Two,
    Three,
}
impl Field {
    /// Get a new `Field` chosen from 1, 2 or 3
    pub fn new(field: u32) -> Result<Self> {
        use Field::*;
        match field {
            1 => Ok(One),
            2 => Ok(Two),
            3 => Ok(Three),
            _ => Err(FieldError::Field(field)),
        }
    }
    pub fn number(&self) -> usize {
        *self as usize + 1
    }
    pub fn colour(&self) -> FieldColour {
        match self {
            Field::One => FieldColour::Green,
            Field::Two => FieldColour::Blue,
            Field::Three => FieldColour::Violet,
        }
    }
}
impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Inclusive range of the plate fiber ids of the guide stars of a field
pub fn fiber_range(pointing: Pointing, field: Field) -> RangeInclusive<i64> {
    let pre_index = N_GUIDES * FIELDS_PER_POINTING * pointing.index();
    let start = pre_index + 1 + (field.number() - 1) * N_GUIDES;
    let end = pre_index + field.number() * N_GUIDES;
    start as i64..=end as i64
}
