use math_scanner_types::{BoxResult, CharacterBox};

/// Fields in a well-formed box record: character, four coordinates, page index.
pub const BOX_RECORD_FIELDS: usize = 6;

/// Raw per-character output of a detection engine, one record per line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoxFeed {
    raw: String,
}

impl BoxFeed {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Records with exactly six fields; anything else the engine printed is skipped.
    pub fn records(&self) -> impl Iterator<Item = Vec<&str>> + '_ {
        self.raw
            .lines()
            .map(|line| line.split_whitespace().collect::<Vec<_>>())
            .filter(|fields| fields.len() == BOX_RECORD_FIELDS)
    }

    /// Parses every accepted record, dropping the page index.
    ///
    /// A six-field record whose coordinates are not integers is an error rather
    /// than being skipped.
    pub fn characters(&self) -> BoxResult<Vec<CharacterBox>> {
        self.records()
            .map(|fields| CharacterBox::from_fields(fields.as_slice()))
            .collect()
    }
}
