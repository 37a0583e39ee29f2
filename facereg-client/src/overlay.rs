//! Recognition overlay: one labelled rectangle per face

use facereg_common::{BoundingBox, RecognizedFace};
use image::{Rgb, RgbImage};

pub const KNOWN_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const UNKNOWN_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Stroke width in pixels
const LINE_WIDTH: u32 = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayBox {
    pub bounds: BoundingBox,
    pub label: String,
    pub color: Rgb<u8>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlay {
    pub boxes: Vec<OverlayBox>,
}

/// `"<name> (<percent>%)"`
pub fn label_for(face: &RecognizedFace) -> String {
    format!("{} ({}%)", face.name, (face.confidence * 100.0).round() as i64)
}

impl Overlay {
    pub fn from_faces(faces: &[RecognizedFace]) -> Self {
        let boxes = faces
            .iter()
            .map(|face| OverlayBox {
                bounds: face.bounding_box,
                label: label_for(face),
                color: if face.is_unknown() {
                    UNKNOWN_COLOR
                } else {
                    KNOWN_COLOR
                },
            })
            .collect();
        Self { boxes }
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// One-line text rendering: known faces marked `+`, unknown faces `?`
    pub fn caption(&self) -> String {
        if self.boxes.is_empty() {
            return "-".to_string();
        }
        self.boxes
            .iter()
            .map(|overlay_box| {
                let marker = if overlay_box.color == UNKNOWN_COLOR {
                    '?'
                } else {
                    '+'
                };
                format!("{} {}", marker, overlay_box.label)
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Stroke every rectangle onto `frame`, clipped to its bounds
    pub fn draw(&self, frame: &mut RgbImage) {
        for overlay_box in &self.boxes {
            stroke_rect(frame, &overlay_box.bounds, overlay_box.color);
        }
    }
}

fn stroke_rect(frame: &mut RgbImage, bounds: &BoundingBox, color: Rgb<u8>) {
    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 {
        return;
    }
    let clamp_x = |v: f64| v.round().clamp(0.0, (width - 1) as f64) as u32;
    let clamp_y = |v: f64| v.round().clamp(0.0, (height - 1) as f64) as u32;

    let (left, right) = (clamp_x(bounds.left), clamp_x(bounds.right));
    let (top, bottom) = (clamp_y(bounds.top), clamp_y(bounds.bottom));
    if left > right || top > bottom {
        return;
    }

    for x in left..=right {
        for t in 0..LINE_WIDTH {
            frame.put_pixel(x, (top + t).min(bottom), color);
            frame.put_pixel(x, bottom.saturating_sub(t).max(top), color);
        }
    }
    for y in top..=bottom {
        for t in 0..LINE_WIDTH {
            frame.put_pixel((left + t).min(right), y, color);
            frame.put_pixel(right.saturating_sub(t).max(left), y, color);
        }
    }
}
