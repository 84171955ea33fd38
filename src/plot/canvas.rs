use image::{Rgb, RgbImage};

use super::glyphs::{GLYPH_ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH, glyph, text_width};

pub(super) const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
pub(super) const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Fill an axis-aligned rectangle, clipped to the image bounds.
pub(super) fn fill_rect(
    image: &mut RgbImage,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    color: Rgb<u8>,
) {
    let x_end = x.saturating_add(width).min(image.width());
    let y_end = y.saturating_add(height).min(image.height());
    for py in y..y_end {
        for px in x..x_end {
            image.put_pixel(px, py, color);
        }
    }
}

/// Draw a one-pixel rectangle outline.
pub(super) fn stroke_rect(
    image: &mut RgbImage,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    color: Rgb<u8>,
) {
    if width == 0 || height == 0 {
        return;
    }
    fill_rect(image, x, y, width, 1, color);
    fill_rect(image, x, y + height - 1, width, 1, color);
    fill_rect(image, x, y, 1, height, color);
    fill_rect(image, x + width - 1, y, 1, height, color);
}

/// Draw `text` with its top-left corner at `(x, y)`.
pub(super) fn draw_text(
    image: &mut RgbImage,
    x: u32,
    y: u32,
    text: &str,
    scale: u32,
    color: Rgb<u8>,
) {
    let mut cursor = x;
    for ch in text.chars() {
        draw_glyph(image, cursor, y, ch, scale, color);
        cursor = cursor.saturating_add(GLYPH_ADVANCE * scale);
    }
}

/// Draw `text` horizontally centered on `center_x`.
pub(super) fn draw_text_centered(
    image: &mut RgbImage,
    center_x: u32,
    y: u32,
    text: &str,
    scale: u32,
    color: Rgb<u8>,
) {
    let x = center_x.saturating_sub(text_width(text, scale) / 2);
    draw_text(image, x, y, text, scale, color);
}

/// Draw `text` top-to-bottom, one character per line, centered on `center_y`.
pub(super) fn draw_text_stacked(
    image: &mut RgbImage,
    x: u32,
    center_y: u32,
    text: &str,
    scale: u32,
    color: Rgb<u8>,
) {
    let line = (GLYPH_HEIGHT + 2) * scale;
    let total = line * text.chars().count() as u32;
    let mut y = center_y.saturating_sub(total / 2);
    for ch in text.chars() {
        draw_glyph(image, x, y, ch, scale, color);
        y = y.saturating_add(line);
    }
}

fn draw_glyph(image: &mut RgbImage, x: u32, y: u32, ch: char, scale: u32, color: Rgb<u8>) {
    let rows = glyph(ch);
    for (row_idx, bits) in rows.iter().enumerate() {
        for col in 0..GLYPH_WIDTH {
            if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                continue;
            }
            fill_rect(
                image,
                x + col * scale,
                y + row_idx as u32 * scale,
                scale,
                scale,
                color,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_rect_clips_to_bounds() {
        let mut image = RgbImage::from_pixel(4, 4, WHITE);
        fill_rect(&mut image, 2, 2, 10, 10, BLACK);
        assert_eq!(*image.get_pixel(3, 3), BLACK);
        assert_eq!(*image.get_pixel(1, 1), WHITE);
    }

    #[test]
    fn draws_glyph_pixels() {
        let mut image = RgbImage::from_pixel(12, 10, WHITE);
        draw_text(&mut image, 0, 0, "-", 1, BLACK);
        // Row 3 of '-' is fully lit.
        for x in 0..5 {
            assert_eq!(*image.get_pixel(x, 3), BLACK);
        }
        assert_eq!(*image.get_pixel(0, 0), WHITE);
    }
}
