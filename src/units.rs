//! Millimeter design coordinates to PDF page coordinates.
//!
//! Template specs are authored in millimeters with the origin at the top-left
//! corner of the page. PDF content streams place the origin at the bottom-left,
//! so every vertical position is inverted against the page height.

use crate::types::Pt;

/// Points per millimeter.
pub const POINTS_PER_MM: f32 = 2.83465;

/// Raster resolution used for photo masking (300 DPI).
pub const PIXELS_PER_MM: f32 = 11.811;

pub fn mm_to_points(mm: f32) -> f32 {
    mm * POINTS_PER_MM
}

/// Pixel length of a millimeter span at [`PIXELS_PER_MM`], at least one pixel.
pub fn mm_to_pixels(mm: f32) -> u32 {
    let px = (mm * PIXELS_PER_MM).round();
    if !px.is_finite() || px < 1.0 {
        return 1;
    }
    px as u32
}

/// Page-space y of a text baseline placed `y_mm` from the top edge.
pub fn baseline_y(page_height: Pt, y_mm: f32) -> Pt {
    page_height - Pt::from_mm(y_mm)
}

/// Page-space y of the bottom-left anchor of an element whose top edge sits
/// `y_mm` from the top of the page.
pub fn element_bottom_y(page_height: Pt, y_mm: f32, height_mm: f32) -> Pt {
    baseline_y(page_height, y_mm) - Pt::from_mm(height_mm)
}

/// Left x that horizontally centers a run of `text_width` on the page.
pub fn centered_x(page_width: Pt, text_width: Pt) -> Pt {
    (page_width - text_width) / 2.0
}
