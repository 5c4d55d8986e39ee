//! Rebuilds reading-order lines from an unordered set of character boxes.
//!
//! Only letters and digits can open a line: the horizontal axis through the
//! middle of such a character collects every other box it crosses. Small
//! marks that no axis crosses (commas, periods, dots of fractions) are then
//! attached to the nearest line, and finally wide horizontal gaps become
//! synthetic spaces.

use std::collections::BTreeMap;
use std::time::Instant;

use image::DynamicImage;
use math_scanner_ocr::{OcrEngine, OcrError, OcrRequest};
use math_scanner_types::{CharacterBox, Line};
use tracing::debug;

/// Minimum gap between neighbouring boxes that reads as a space.
pub const SPACE_WIDTH: i64 = 10;

/// How far a stray mark may sit from a line axis, in multiples of its own height.
pub const FALLBACK_DISTANCE_FACTOR: i64 = 3;

/// Runs character detection on `image` and rebuilds its lines.
pub fn segment_image(
    engine: &dyn OcrEngine,
    image: &DynamicImage,
) -> Result<Vec<Line>, OcrError> {
    let started = Instant::now();
    let feed = engine.detect_boxes(&OcrRequest::new(image))?;
    let characters = feed.characters()?;
    let detected = characters.len();
    let lines = reconstruct_lines(characters);
    debug!(
        engine = engine.name(),
        detected,
        lines = lines.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "segmented image"
    );
    Ok(lines)
}

/// Groups boxes into lines ordered top to bottom, each ordered left to right.
pub fn reconstruct_lines(characters: Vec<CharacterBox>) -> Vec<Line> {
    if characters.is_empty() {
        return Vec::new();
    }

    let (mut lines, leftovers) = seed_lines(characters);
    attach_leftovers(&mut lines, leftovers);

    // keys ascend with y, and y grows upward
    lines
        .into_values()
        .rev()
        .map(|mut line| {
            sort_line(&mut line);
            insert_spaces(&mut line);
            line
        })
        .collect()
}

fn seed_lines(characters: Vec<CharacterBox>) -> (BTreeMap<i64, Line>, Vec<CharacterBox>) {
    let mut lines: BTreeMap<i64, Line> = BTreeMap::new();
    let mut pending = characters;

    while let Some(position) = pending.iter().position(CharacterBox::is_anchor) {
        let seed = pending.remove(position);
        let axis = line_axis(&seed);
        let (members, rest): (Vec<_>, Vec<_>) = pending
            .into_iter()
            .partition(|character| character.is_on_line(axis));
        pending = rest;

        // only an inverted anchor can land on an axis that is already taken
        let line = lines.entry(axis).or_default();
        line.push(seed);
        line.extend(members);
    }

    (lines, pending)
}

fn attach_leftovers(lines: &mut BTreeMap<i64, Line>, leftovers: Vec<CharacterBox>) {
    for character in leftovers {
        let candidate = i64::from(character.top_right_y()) - character.height() / 2;
        let Some((axis, distance)) = nearest_axis(lines, candidate) else {
            continue;
        };
        if distance <= FALLBACK_DISTANCE_FACTOR * character.height() {
            if let Some(line) = lines.get_mut(&axis) {
                line.push(character);
            }
        } else {
            debug!(
                character = character.character(),
                candidate, distance, "dropped box too far from any line"
            );
        }
    }
}

/// Closest line key to `candidate`; on equal distance the higher axis wins.
fn nearest_axis(lines: &BTreeMap<i64, Line>, candidate: i64) -> Option<(i64, i64)> {
    let mut best: Option<(i64, i64)> = None;
    for &axis in lines.keys().rev() {
        let distance = (axis - candidate).abs();
        if best.is_none_or(|(_, current)| distance < current) {
            best = Some((axis, distance));
        }
    }
    best
}

fn line_axis(seed: &CharacterBox) -> i64 {
    i64::from(seed.bottom_left_y()) + seed.height() / 2
}

/// Stable, so boxes sharing a midpoint keep the order they joined the line in.
fn sort_line(line: &mut Line) {
    line.sort_by_key(CharacterBox::horizontal_midpoint);
}

fn insert_spaces(line: &mut Line) {
    let mut index = 0;
    while index + 1 < line.len() {
        let previous = &line[index];
        let next = &line[index + 1];
        let gap = i64::from(next.bottom_left_x()) - i64::from(previous.top_right_x());
        if gap >= SPACE_WIDTH {
            let space = CharacterBox::space_between(previous, next);
            line.insert(index + 1, space);
            index += 1;
        }
        index += 1;
    }
}
