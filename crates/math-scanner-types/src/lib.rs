//! Shared domain models for the math-scanner workspace.
//!
//! This crate holds the character boxes produced by the detection engine and
//! the line structure rebuilt from them. Keep it engine-agnostic so both the
//! OCR crate and the scanner itself can depend on it without pulling any
//! imaging or process dependencies.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Character placed between two boxes whose gap is wide enough to read as a space.
pub const SPACE: &str = " ";

const COORDINATE_FIELDS: [&str; 4] = [
    "bottom_left_x",
    "bottom_left_y",
    "top_right_x",
    "top_right_y",
];

pub type BoxResult<T> = Result<T, BoxError>;

/// One recognized line, ordered left to right.
pub type Line = Vec<CharacterBox>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BoxError {
    #[error("character box needs 5 fields (character and 4 coordinates), got {fields}")]
    InvalidRecord { fields: usize },

    #[error("{field} '{value}' is not an integer coordinate")]
    MalformedCoordinate { field: &'static str, value: String },
}

/// A recognized character and its bounding box.
///
/// Coordinates use a bottom-left origin with `y` growing upward, which is
/// what character detection engines report. Corners are not validated, so
/// `width` and `height` are absolute differences. Derived geometry is `i64`
/// so any pair of `i32` corners stays in range.
#[derive(Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CharacterBox {
    character: String,
    bottom_left_x: i32,
    bottom_left_y: i32,
    top_right_x: i32,
    top_right_y: i32,
}

impl fmt::Debug for CharacterBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}({},{} {},{})",
            self.character,
            self.bottom_left_x,
            self.bottom_left_y,
            self.top_right_x,
            self.top_right_y
        )
    }
}

impl CharacterBox {
    pub fn new(
        character: impl Into<String>,
        bottom_left_x: i32,
        bottom_left_y: i32,
        top_right_x: i32,
        top_right_y: i32,
    ) -> Self {
        Self {
            character: character.into(),
            bottom_left_x,
            bottom_left_y,
            top_right_x,
            top_right_y,
        }
    }

    /// Builds a box from `[character, blx, bly, trx, try, ..]`; extra fields are ignored.
    pub fn from_fields<S: AsRef<str>>(fields: &[S]) -> BoxResult<Self> {
        if fields.len() < 5 {
            return Err(BoxError::InvalidRecord {
                fields: fields.len(),
            });
        }
        let mut coordinates = [0i32; 4];
        for (slot, (field, raw)) in coordinates
            .iter_mut()
            .zip(COORDINATE_FIELDS.iter().zip(&fields[1..5]))
        {
            let raw = raw.as_ref();
            *slot = raw
                .trim()
                .parse()
                .map_err(|_| BoxError::MalformedCoordinate {
                    field: *field,
                    value: raw.to_string(),
                })?;
        }
        let [bottom_left_x, bottom_left_y, top_right_x, top_right_y] = coordinates;
        Ok(Self::new(
            fields[0].as_ref(),
            bottom_left_x,
            bottom_left_y,
            top_right_x,
            top_right_y,
        ))
    }

    /// Synthetic space spanning the gap between two neighbours on a line.
    pub fn space_between(previous: &CharacterBox, next: &CharacterBox) -> Self {
        Self::new(
            SPACE,
            previous.top_right_x,
            previous.bottom_left_y,
            next.bottom_left_x,
            next.top_right_y,
        )
    }

    pub fn character(&self) -> &str {
        &self.character
    }

    pub fn bottom_left_x(&self) -> i32 {
        self.bottom_left_x
    }

    pub fn bottom_left_y(&self) -> i32 {
        self.bottom_left_y
    }

    pub fn top_right_x(&self) -> i32 {
        self.top_right_x
    }

    pub fn top_right_y(&self) -> i32 {
        self.top_right_y
    }

    pub fn width(&self) -> i64 {
        i64::from(self.top_right_x.abs_diff(self.bottom_left_x))
    }

    pub fn height(&self) -> i64 {
        i64::from(self.top_right_y.abs_diff(self.bottom_left_y))
    }

    pub fn horizontal_midpoint(&self) -> i64 {
        i64::from(self.bottom_left_x) + self.width() / 2
    }

    /// Inclusive on both edges.
    pub fn is_on_line(&self, line_y: i64) -> bool {
        line_y >= i64::from(self.bottom_left_y) && line_y <= i64::from(self.top_right_y)
    }

    /// ASCII letters and digits are the only characters allowed to open a line.
    pub fn is_anchor(&self) -> bool {
        let mut chars = self.character.chars();
        matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii_alphanumeric())
    }

    pub fn is_space(&self) -> bool {
        self.character == SPACE
    }
}

/// Joins characters of each line and the lines with `\n`.
pub fn lines_to_text(lines: &[Line]) -> String {
    lines
        .iter()
        .map(|line| line.iter().map(CharacterBox::character).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}
