//! Photo rounding on a software raster surface.

use crate::error::PiagamError;
use crate::units::{PIXELS_PER_MM, mm_to_pixels};
use tiny_skia::{FillRule, FilterQuality, Mask, Path, PathBuilder, Pixmap, PixmapPaint, Rect, Transform};

/// Placement box of a photo, in millimeters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhotoBox {
    pub width_mm: f32,
    pub height_mm: f32,
    pub radius_mm: f32,
}

impl PhotoBox {
    /// Output raster size at [`PIXELS_PER_MM`].
    pub fn pixel_size(&self) -> (u32, u32) {
        (mm_to_pixels(self.width_mm), mm_to_pixels(self.height_mm))
    }
}

/// Turns a source image into a PNG sized to the box with rounded corners.
pub trait ImageRasterizer: Send + Sync {
    fn round_image(&self, source: &[u8], photo_box: PhotoBox) -> Result<Vec<u8>, PiagamError>;
}

/// tiny-skia implementation. The source covers the box (scaled to fill,
/// centered, overflow cropped) and is clipped to a rounded rectangle built
/// from four quadratic corners.
#[derive(Debug, Default, Clone, Copy)]
pub struct SkiaRasterizer;

impl ImageRasterizer for SkiaRasterizer {
    fn round_image(&self, source: &[u8], photo_box: PhotoBox) -> Result<Vec<u8>, PiagamError> {
        let image = decode_image_to_pixmap(source)?;
        let (width, height) = photo_box.pixel_size();
        let mut surface = Pixmap::new(width, height)
            .ok_or_else(|| PiagamError::Raster(format!("cannot allocate {width}x{height} surface")))?;

        let w = width as f32;
        let h = height as f32;
        let radius = (photo_box.radius_mm.max(0.0) * PIXELS_PER_MM).min(w.min(h) / 2.0);
        let clip = rounded_rect_path(w, h, radius)
            .ok_or_else(|| PiagamError::Raster("degenerate clip path".to_string()))?;
        let mut mask = Mask::new(width, height)
            .ok_or_else(|| PiagamError::Raster("cannot allocate clip mask".to_string()))?;
        mask.fill_path(&clip, FillRule::Winding, true, Transform::identity());

        let src_w = image.width() as f32;
        let src_h = image.height() as f32;
        let scale = (w / src_w).max(h / src_h);
        let tx = (w - src_w * scale) / 2.0;
        let ty = (h - src_h * scale) / 2.0;
        let mut paint = PixmapPaint::default();
        paint.quality = FilterQuality::Bilinear;
        surface.draw_pixmap(
            0,
            0,
            image.as_ref(),
            &paint,
            Transform::from_row(scale, 0.0, 0.0, scale, tx, ty),
            Some(&mask),
        );
        surface
            .encode_png()
            .map_err(|e| PiagamError::Raster(format!("png encode failed: {e}")))
    }
}

fn rounded_rect_path(w: f32, h: f32, r: f32) -> Option<Path> {
    if r <= 0.0 {
        return Some(PathBuilder::from_rect(Rect::from_xywh(0.0, 0.0, w, h)?));
    }
    let mut pb = PathBuilder::new();
    pb.move_to(r, 0.0);
    pb.line_to(w - r, 0.0);
    pb.quad_to(w, 0.0, w, r);
    pb.line_to(w, h - r);
    pb.quad_to(w, h, w - r, h);
    pb.line_to(r, h);
    pb.quad_to(0.0, h, 0.0, h - r);
    pb.line_to(0.0, r);
    pb.quad_to(0.0, 0.0, r, 0.0);
    pb.close();
    pb.finish()
}

fn decode_image_to_pixmap(data: &[u8]) -> Result<Pixmap, PiagamError> {
    let decoded = image::load_from_memory(data)
        .map_err(|e| PiagamError::Raster(format!("image decode failed: {e}")))?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| PiagamError::Raster("source image has no pixels".to_string()))?;
    for (src_px, dst_px) in rgba
        .as_raw()
        .chunks_exact(4)
        .zip(pixmap.data_mut().chunks_exact_mut(4))
    {
        let a = src_px[3];
        dst_px[0] = premul_u8(src_px[0], a);
        dst_px[1] = premul_u8(src_px[1], a);
        dst_px[2] = premul_u8(src_px[2], a);
        dst_px[3] = a;
    }
    Ok(pixmap)
}

fn premul_u8(channel: u8, alpha: u8) -> u8 {
    let prod = (channel as u16) * (alpha as u16) + 127;
    ((prod + (prod >> 8)) >> 8) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn solid_png(width: u32, height: u32) -> Vec<u8> {
        let src = RgbaImage::from_pixel(width, height, image::Rgba([200, 40, 40, 255]));
        let mut bytes = Vec::new();
        src.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn round(photo_box: PhotoBox) -> RgbaImage {
        let png = SkiaRasterizer.round_image(&solid_png(64, 48), photo_box).unwrap();
        image::load_from_memory(&png).unwrap().to_rgba8()
    }

    #[test]
    fn output_matches_box_at_fixed_resolution() {
        let img = round(PhotoBox {
            width_mm: 20.0,
            height_mm: 25.0,
            radius_mm: 2.0,
        });
        assert_eq!(img.dimensions(), (236, 295));
    }

    #[test]
    fn rounded_corners_are_transparent_and_center_opaque() {
        for radius_mm in [0.5_f32, 2.0, 10.0] {
            let img = round(PhotoBox {
                width_mm: 20.0,
                height_mm: 25.0,
                radius_mm,
            });
            let (w, h) = img.dimensions();
            for (x, y) in [(0, 0), (w - 1, 0), (0, h - 1), (w - 1, h - 1)] {
                assert_eq!(img.get_pixel(x, y).0[3], 0, "corner ({x},{y}) r={radius_mm}");
            }
            assert_eq!(img.get_pixel(w / 2, h / 2).0[3], 255);
        }
    }

    #[test]
    fn zero_radius_keeps_square_corners() {
        let img = round(PhotoBox {
            width_mm: 10.0,
            height_mm: 10.0,
            radius_mm: 0.0,
        });
        assert_eq!(img.get_pixel(0, 0).0[3], 255);
        let (w, h) = img.dimensions();
        assert_eq!(img.get_pixel(w - 1, h - 1).0[3], 255);
    }

    #[test]
    fn oversized_radius_is_clamped_to_half_the_short_side() {
        let img = round(PhotoBox {
            width_mm: 10.0,
            height_mm: 20.0,
            radius_mm: 50.0,
        });
        let (w, h) = img.dimensions();
        assert_eq!(img.get_pixel(w / 2, h / 2).0[3], 255);
        assert_eq!(img.get_pixel(w / 2, 2).0[3], 255);
    }

    #[test]
    fn undecodable_source_is_a_raster_error() {
        let err = SkiaRasterizer
            .round_image(b"not an image", PhotoBox { width_mm: 5.0, height_mm: 5.0, radius_mm: 1.0 })
            .unwrap_err();
        assert!(matches!(err, PiagamError::Raster(_)));
    }
}
