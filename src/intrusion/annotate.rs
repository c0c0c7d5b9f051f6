use crate::segmentation::Region;
use image::{Rgb, RgbImage};

pub const CAPTION: &str = "INTRUSION DETECTED";
pub const CAPTION_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const TIMESTAMP_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Height of the status band drawn across the top of display frames
pub const STATUS_BAR_HEIGHT: u32 = 30;
const STATUS_SCALE: u32 = 2;
const STATUS_TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const QUIET_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const BUSY_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;

/// Outline a region, growing the border inwards by `thickness` pixels
///
/// Parts falling outside the frame are clipped.
pub fn draw_region(frame: &mut RgbImage, region: &Region, color: Rgb<u8>, thickness: u32) {
    let (width, height) = frame.dimensions();
    if region.width == 0 || region.height == 0 {
        return;
    }

    let right = region.x.saturating_add(region.width - 1);
    let bottom = region.y.saturating_add(region.height - 1);

    for y in region.y..=bottom.min(height.saturating_sub(1)) {
        for x in region.x..=right.min(width.saturating_sub(1)) {
            let on_border = x - region.x < thickness
                || right - x < thickness
                || y - region.y < thickness
                || bottom - y < thickness;
            if on_border {
                frame.put_pixel(x, y, color);
            }
        }
    }
}

/// Render text with the built-in 5x7 font, top-left corner at (`x`, `y`)
///
/// Characters without a glyph leave a gap.
pub fn draw_text(frame: &mut RgbImage, text: &str, x: u32, y: u32, scale: u32, color: Rgb<u8>) {
    let (width, height) = frame.dimensions();
    let advance = (GLYPH_WIDTH + 1) * scale;

    for (i, ch) in text.chars().enumerate() {
        let Some(rows) = glyph(ch) else {
            continue;
        };
        let origin_x = x + i as u32 * advance;

        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        let px = origin_x + col * scale + dx;
                        let py = y + row as u32 * scale + dy;
                        if px < width && py < height {
                            frame.put_pixel(px, py, color);
                        }
                    }
                }
            }
        }
    }
}

/// Black band along the top edge with status, frame rate and region count
///
/// The count is green while nothing is detected and red otherwise.
pub fn draw_status_bar(frame: &mut RgbImage, status: &str, fps: f64, detections: usize) {
    let (width, height) = frame.dimensions();
    for y in 0..STATUS_BAR_HEIGHT.min(height) {
        for x in 0..width {
            frame.put_pixel(x, y, Rgb([0, 0, 0]));
        }
    }

    let y = (STATUS_BAR_HEIGHT - text_height(STATUS_SCALE)) / 2;
    let gap = text_width("  ", STATUS_SCALE);
    let mut x = 8;

    let status = format!("Status: {}", status);
    draw_text(frame, &status, x, y, STATUS_SCALE, STATUS_TEXT_COLOR);
    x += text_width(&status, STATUS_SCALE) + gap;

    let rate = format!("FPS: {:.1}", fps);
    draw_text(frame, &rate, x, y, STATUS_SCALE, STATUS_TEXT_COLOR);
    x += text_width(&rate, STATUS_SCALE) + gap;

    let count_color = if detections == 0 { QUIET_COLOR } else { BUSY_COLOR };
    draw_text(
        frame,
        &format!("Detections: {}", detections),
        x,
        y,
        STATUS_SCALE,
        count_color,
    );
}

/// Width in pixels of `text` at `scale`, including the trailing spacing column
pub fn text_width(text: &str, scale: u32) -> u32 {
    text.chars().count() as u32 * (GLYPH_WIDTH + 1) * scale
}

/// Height in pixels of a line of text at `scale`
pub fn text_height(scale: u32) -> u32 {
    GLYPH_HEIGHT * scale
}

fn glyph(ch: char) -> Option<[u8; 7]> {
    let rows = match ch.to_ascii_uppercase() {
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1C, 0x12, 0x11, 0x11, 0x11, 0x12, 0x1C],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        _ => return None,
    };
    Some(rows)
}
