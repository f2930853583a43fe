//! Note envelope geometry.
//!
//! A note's pin sequence is converted into a single closed polygon: the
//! forward walk traces the top boundary, the backward walk the bottom, so
//! the shape tapers wherever the pin sizes do. Chorded notes emit one
//! polygon per pitch, all sharing the same pin envelope.

use serde::{Deserialize, Serialize};

use crate::song::{NotePin, NOTE_SIZE_MAX};

/// A vertex of a drawable path, in timeline pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    pub x: f64,
    pub y: f64,
}

/// Builds the closed envelope polygon for one pitch of a note.
///
/// `radius` is the vertical half-thickness of a full-size pin; each pin
/// contributes `radius * size / NOTE_SIZE_MAX`. `offset_x` is the bar's
/// pixel offset, `offset_y` the channel baseline.
pub fn note_path(
    pitch: u32,
    start: u32,
    pins: &[NotePin],
    radius: f64,
    offset_x: f64,
    offset_y: f64,
    part_width: f64,
    pitch_height: f64,
) -> Vec<PathPoint> {
    let mut points = Vec::with_capacity(pins.len() * 2);

    for pin in pins {
        let (x, y) = pin_center(pitch, start, pin, offset_x, offset_y, part_width, pitch_height);
        points.push(PathPoint { x, y: y - radius * size_fraction(pin) });
    }
    for pin in pins.iter().rev() {
        let (x, y) = pin_center(pitch, start, pin, offset_x, offset_y, part_width, pitch_height);
        points.push(PathPoint { x, y: y + radius * size_fraction(pin) });
    }

    points
}

/// Serialises a polygon into SVG-style path data for the presentation layer.
pub fn path_data(points: &[PathPoint]) -> String {
    let mut data = String::new();
    for (index, point) in points.iter().enumerate() {
        let command = if index == 0 { 'M' } else { 'L' };
        data.push_str(&format!("{} {} {} ", command, point.x, point.y));
    }
    if !points.is_empty() {
        data.push('z');
    }
    data
}

fn size_fraction(pin: &NotePin) -> f64 {
    pin.size as f64 / NOTE_SIZE_MAX as f64
}

fn pin_center(
    pitch: u32,
    start: u32,
    pin: &NotePin,
    offset_x: f64,
    offset_y: f64,
    part_width: f64,
    pitch_height: f64,
) -> (f64, f64) {
    let x = offset_x + part_width * (start + pin.time) as f64;
    let y = offset_y - pitch_height * (pitch as f64 + pin.interval as f64);
    (x, y)
}
