//! Border placement and the crop rectangle derived from it.
//!
//! Borders are stored in the detection engine's coordinate system (origin in
//! the bottom-left corner, `y` growing upward). The crop rectangle handed to
//! image code is expressed with the origin in the top-left corner.

use std::fmt;
use std::str::FromStr;

use image::{DynamicImage, GenericImageView};
use math_scanner_types::{CharacterBox, Line};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderSide {
    Left,
    Right,
    Top,
    Bottom,
}

impl BorderSide {
    pub const ALL: [BorderSide; 4] = [
        BorderSide::Left,
        BorderSide::Right,
        BorderSide::Top,
        BorderSide::Bottom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BorderSide::Left => "left",
            BorderSide::Right => "right",
            BorderSide::Top => "top",
            BorderSide::Bottom => "bottom",
        }
    }

    /// Edge of `character` that this side reads.
    fn edge_of(&self, character: &CharacterBox) -> i32 {
        match self {
            BorderSide::Left => character.bottom_left_x(),
            BorderSide::Right => character.top_right_x(),
            BorderSide::Top => character.top_right_y(),
            BorderSide::Bottom => character.bottom_left_y(),
        }
    }

    /// Whether `candidate` pushes this side further out than `current`.
    fn extends(&self, candidate: i32, current: i32) -> bool {
        match self {
            BorderSide::Left | BorderSide::Bottom => candidate < current,
            BorderSide::Right | BorderSide::Top => candidate > current,
        }
    }
}

impl fmt::Display for BorderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BorderSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" | "l" => Ok(BorderSide::Left),
            "right" | "r" => Ok(BorderSide::Right),
            "top" | "t" => Ok(BorderSide::Top),
            "bottom" | "b" => Ok(BorderSide::Bottom),
            other => Err(format!("unknown border '{other}'")),
        }
    }
}

/// Border coordinates; `None` falls back to the image edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Borders {
    pub left: Option<i32>,
    pub right: Option<i32>,
    pub top: Option<i32>,
    pub bottom: Option<i32>,
}

impl Borders {
    pub fn get(&self, side: BorderSide) -> Option<i32> {
        match side {
            BorderSide::Left => self.left,
            BorderSide::Right => self.right,
            BorderSide::Top => self.top,
            BorderSide::Bottom => self.bottom,
        }
    }

    fn slot(&mut self, side: BorderSide) -> &mut Option<i32> {
        match side {
            BorderSide::Left => &mut self.left,
            BorderSide::Right => &mut self.right,
            BorderSide::Top => &mut self.top,
            BorderSide::Bottom => &mut self.bottom,
        }
    }

    pub fn is_empty(&self) -> bool {
        BorderSide::ALL.iter().all(|side| self.get(*side).is_none())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("row {row} out of range, {available} available")]
    RowOutOfRange { row: usize, available: usize },

    #[error("column {column} out of range, {available} available on row {row}")]
    ColumnOutOfRange {
        row: usize,
        column: usize,
        available: usize,
    },
}

/// Pixel rectangle with a top-left origin; `width` and `height` are never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub fn crop(&self, image: &DynamicImage) -> DynamicImage {
        image.crop_imm(self.x, self.y, self.width, self.height)
    }
}

/// Tracks the four borders of the region the user wants recognized.
#[derive(Debug, Clone, Default)]
pub struct RegionSelector {
    borders: Borders,
}

impl RegionSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn borders(&self) -> Borders {
        self.borders
    }

    /// Moves `side` out to the matching edge of the box at `(row, column)`.
    ///
    /// Borders only ever grow the selection; returns `false` when the box lies
    /// inside the current border.
    pub fn place_border(
        &mut self,
        side: BorderSide,
        lines: &[Line],
        row: usize,
        column: usize,
    ) -> Result<bool, SelectionError> {
        let character = character_at(lines, row, column)?;
        let candidate = side.edge_of(character);
        let slot = self.borders.slot(side);
        let updated = match *slot {
            Some(current) => side.extends(candidate, current),
            None => true,
        };
        if updated {
            *slot = Some(candidate);
            debug!(%side, value = candidate, row, column, "border placed");
        }
        Ok(updated)
    }

    pub fn place_left_border(
        &mut self,
        lines: &[Line],
        row: usize,
        column: usize,
    ) -> Result<bool, SelectionError> {
        self.place_border(BorderSide::Left, lines, row, column)
    }

    pub fn place_right_border(
        &mut self,
        lines: &[Line],
        row: usize,
        column: usize,
    ) -> Result<bool, SelectionError> {
        self.place_border(BorderSide::Right, lines, row, column)
    }

    pub fn place_top_border(
        &mut self,
        lines: &[Line],
        row: usize,
        column: usize,
    ) -> Result<bool, SelectionError> {
        self.place_border(BorderSide::Top, lines, row, column)
    }

    pub fn place_bottom_border(
        &mut self,
        lines: &[Line],
        row: usize,
        column: usize,
    ) -> Result<bool, SelectionError> {
        self.place_border(BorderSide::Bottom, lines, row, column)
    }

    pub fn remove_border(&mut self, side: BorderSide) -> bool {
        self.borders.slot(side).take().is_some()
    }

    pub fn remove_left_border(&mut self) -> bool {
        self.remove_border(BorderSide::Left)
    }

    pub fn remove_right_border(&mut self) -> bool {
        self.remove_border(BorderSide::Right)
    }

    pub fn remove_top_border(&mut self) -> bool {
        self.remove_border(BorderSide::Top)
    }

    pub fn remove_bottom_border(&mut self) -> bool {
        self.remove_border(BorderSide::Bottom)
    }

    pub fn remove_all_borders(&mut self) -> bool {
        let had_any = !self.borders.is_empty();
        self.borders = Borders::default();
        had_any
    }

    pub fn switch_horizontal_borders(&mut self) {
        std::mem::swap(&mut self.borders.left, &mut self.borders.right);
    }

    pub fn switch_vertical_borders(&mut self) {
        std::mem::swap(&mut self.borders.top, &mut self.borders.bottom);
    }

    /// Effective `(left, right)` inside an image `width` pixels wide, both inclusive.
    pub fn horizontal_extent(&self, width: u32) -> (u32, u32) {
        resolve_pair(self.borders.left, self.borders.right, width)
    }

    /// Effective `(bottom, top)` inside an image `height` pixels tall, bottom-left origin.
    pub fn vertical_extent(&self, height: u32) -> (u32, u32) {
        resolve_pair(self.borders.bottom, self.borders.top, height)
    }

    /// Crop rectangle for an image of the given size.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is zero.
    pub fn bordered_region(&self, width: u32, height: u32) -> CropRect {
        assert!(width > 0 && height > 0, "bordered region of an empty image");
        let (left, right) = self.horizontal_extent(width);
        let (bottom, top) = self.vertical_extent(height);
        // flip to a top-left origin
        let top = height - 1 - top;
        let bottom = height - 1 - bottom;
        CropRect {
            x: left,
            y: top,
            width: right + 1 - left,
            height: bottom + 1 - top,
        }
    }

    /// Crops `image` to the current borders.
    pub fn bordered_image(&self, image: &DynamicImage) -> DynamicImage {
        let (width, height) = image.dimensions();
        self.bordered_region(width, height).crop(image)
    }
}

fn character_at(lines: &[Line], row: usize, column: usize) -> Result<&CharacterBox, SelectionError> {
    let line = lines.get(row).ok_or(SelectionError::RowOutOfRange {
        row,
        available: lines.len(),
    })?;
    line.get(column).ok_or(SelectionError::ColumnOutOfRange {
        row,
        column,
        available: line.len(),
    })
}

/// Defaults a missing end to the image edge, orders a complete pair and clamps
/// both ends into `[0, size - 1]`.
fn resolve_pair(low: Option<i32>, high: Option<i32>, size: u32) -> (u32, u32) {
    let max = i64::from(size.saturating_sub(1));
    let (low, high) = match (low, high) {
        (Some(a), Some(b)) => (i64::from(a.min(b)), i64::from(a.max(b))),
        (low, high) => (
            low.map_or(0, i64::from),
            high.map_or(max, i64::from),
        ),
    };
    let clamp = |value: i64| value.clamp(0, max) as u32;
    (clamp(low), clamp(high))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_lines() -> Vec<Line> {
        vec![
            vec![
                CharacterBox::new("a", 10, 50, 18, 60),
                CharacterBox::new("b", 30, 52, 38, 64),
            ],
            vec![CharacterBox::new("c", 4, 10, 12, 22)],
        ]
    }

    #[test]
    fn place_reads_the_matching_edge() {
        let lines = sample_lines();
        let mut selector = RegionSelector::new();
        assert!(selector.place_left_border(&lines, 0, 1).unwrap());
        assert!(selector.place_right_border(&lines, 0, 1).unwrap());
        assert!(selector.place_top_border(&lines, 0, 1).unwrap());
        assert!(selector.place_bottom_border(&lines, 0, 1).unwrap());
        assert_eq!(
            selector.borders(),
            Borders {
                left: Some(30),
                right: Some(38),
                top: Some(64),
                bottom: Some(52),
            }
        );
    }

    #[test]
    fn borders_only_grow_outward() {
        let lines = sample_lines();
        let mut selector = RegionSelector::new();

        assert!(selector.place_left_border(&lines, 0, 1).unwrap());
        assert!(selector.place_left_border(&lines, 0, 0).unwrap());
        assert!(!selector.place_left_border(&lines, 0, 1).unwrap());
        assert_eq!(selector.borders().left, Some(10));

        assert!(selector.place_right_border(&lines, 0, 1).unwrap());
        assert!(!selector.place_right_border(&lines, 0, 0).unwrap());
        assert!(!selector.place_right_border(&lines, 1, 0).unwrap());
        assert_eq!(selector.borders().right, Some(38));

        assert!(selector.place_top_border(&lines, 1, 0).unwrap());
        assert!(selector.place_top_border(&lines, 0, 1).unwrap());
        assert!(!selector.place_top_border(&lines, 0, 0).unwrap());

        assert!(selector.place_bottom_border(&lines, 0, 0).unwrap());
        assert!(selector.place_bottom_border(&lines, 1, 0).unwrap());
        assert!(!selector.place_bottom_border(&lines, 0, 1).unwrap());
        assert_eq!(selector.borders().bottom, Some(10));
    }

    #[test]
    fn out_of_range_names_index_and_bound() {
        let lines = sample_lines();
        let mut selector = RegionSelector::new();
        assert_eq!(
            selector.place_left_border(&lines, 2, 0),
            Err(SelectionError::RowOutOfRange {
                row: 2,
                available: 2
            })
        );
        assert_eq!(
            selector.place_top_border(&lines, 1, 1),
            Err(SelectionError::ColumnOutOfRange {
                row: 1,
                column: 1,
                available: 1
            })
        );
        assert!(selector.borders().is_empty());
    }

    #[test]
    fn remove_reports_changes() {
        let lines = sample_lines();
        let mut selector = RegionSelector::new();
        assert!(!selector.remove_left_border());
        selector.place_left_border(&lines, 0, 0).unwrap();
        assert!(selector.remove_left_border());
        assert!(!selector.remove_left_border());

        assert!(!selector.remove_all_borders());
        selector.place_bottom_border(&lines, 0, 0).unwrap();
        assert!(selector.remove_all_borders());
        assert!(selector.borders().is_empty());
    }

    #[test]
    fn switching_swaps_pairs() {
        let lines = sample_lines();
        let mut selector = RegionSelector::new();
        selector.place_left_border(&lines, 0, 0).unwrap();
        selector.place_top_border(&lines, 0, 0).unwrap();
        selector.switch_horizontal_borders();
        selector.switch_vertical_borders();
        assert_eq!(
            selector.borders(),
            Borders {
                left: None,
                right: Some(10),
                top: None,
                bottom: Some(60),
            }
        );
    }

    #[test]
    fn unset_borders_cover_the_whole_image() {
        let selector = RegionSelector::new();
        assert_eq!(
            selector.bordered_region(100, 80),
            CropRect {
                x: 0,
                y: 0,
                width: 100,
                height: 80,
            }
        );
    }

    #[test]
    fn region_flips_to_top_left_origin() {
        let lines = sample_lines();
        let mut selector = RegionSelector::new();
        selector.place_left_border(&lines, 0, 0).unwrap();
        selector.place_right_border(&lines, 0, 1).unwrap();
        selector.place_top_border(&lines, 0, 1).unwrap();
        selector.place_bottom_border(&lines, 0, 0).unwrap();
        // x 10..=38, y 50..=64 in a 100 tall image
        assert_eq!(
            selector.bordered_region(100, 100),
            CropRect {
                x: 10,
                y: 35,
                width: 29,
                height: 15,
            }
        );
    }

    #[test]
    fn inverted_pairs_are_reordered() {
        let lines = vec![vec![
            CharacterBox::new("p", 40, 5, 44, 9),
            CharacterBox::new("q", 10, 30, 14, 34),
        ]];
        let mut selector = RegionSelector::new();
        // "left" placed right of "right", "bottom" above "top"
        selector.place_left_border(&lines, 0, 0).unwrap();
        selector.place_right_border(&lines, 0, 1).unwrap();
        selector.place_bottom_border(&lines, 0, 1).unwrap();
        selector.place_top_border(&lines, 0, 0).unwrap();
        assert_eq!(selector.horizontal_extent(50), (14, 40));
        assert_eq!(selector.vertical_extent(50), (9, 30));
        assert_eq!(
            selector.bordered_region(50, 50),
            CropRect {
                x: 14,
                y: 19,
                width: 27,
                height: 22,
            }
        );
    }

    #[test]
    fn out_of_image_borders_are_clamped() {
        let lines = vec![
            vec![CharacterBox::new("w", -15, -20, 300, 400)],
        ];
        let mut selector = RegionSelector::new();
        selector.place_left_border(&lines, 0, 0).unwrap();
        selector.place_right_border(&lines, 0, 0).unwrap();
        selector.place_top_border(&lines, 0, 0).unwrap();
        selector.place_bottom_border(&lines, 0, 0).unwrap();
        assert_eq!(
            selector.bordered_region(64, 32),
            CropRect {
                x: 0,
                y: 0,
                width: 64,
                height: 32,
            }
        );
    }

    #[test]
    fn single_pixel_selection_is_not_empty() {
        let lines = vec![vec![CharacterBox::new(".", 7, 3, 7, 3)]];
        let mut selector = RegionSelector::new();
        for side in BorderSide::ALL {
            selector.place_border(side, &lines, 0, 0).unwrap();
        }
        assert_eq!(
            selector.bordered_region(10, 10),
            CropRect {
                x: 7,
                y: 6,
                width: 1,
                height: 1,
            }
        );
    }

    #[test]
    fn lone_border_beyond_the_far_edge_collapses_to_the_edge() {
        let lines = vec![vec![CharacterBox::new("z", 150, 0, 160, 10)]];
        let mut selector = RegionSelector::new();
        selector.place_left_border(&lines, 0, 0).unwrap();
        assert_eq!(selector.horizontal_extent(100), (99, 99));
        let region = selector.bordered_region(100, 20);
        assert_eq!((region.x, region.width), (99, 1));
    }

    #[test]
    fn bordered_image_crops_pixels() {
        let lines = sample_lines();
        let mut selector = RegionSelector::new();
        selector.place_left_border(&lines, 1, 0).unwrap();
        selector.place_top_border(&lines, 1, 0).unwrap();
        let image = DynamicImage::new_rgb8(40, 30);
        let cropped = selector.bordered_image(&image);
        // x 4..=39, y 0..=22 bottom-up -> rows 7..=29 top-down
        assert_eq!(cropped.dimensions(), (36, 23));
    }

    #[test]
    fn border_side_parses_names() {
        assert_eq!("Left".parse::<BorderSide>(), Ok(BorderSide::Left));
        assert_eq!("b".parse::<BorderSide>(), Ok(BorderSide::Bottom));
        assert!("middle".parse::<BorderSide>().is_err());
    }
}
