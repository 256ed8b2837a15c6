use std::fs;
use std::path::{Path, PathBuf};

use ab_glyph::FontVec;
use anyhow::{anyhow, Context, Result};
use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use log::{info, warn};

const GLYPH_CELL: u32 = 8;

const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
];

/// Font used for box labels and the placeholder banner.
///
/// `Builtin` is an 8x8 bitmap font scaled by whole pixels, used whenever no
/// TrueType file can be loaded.
pub enum LabelFont {
    TrueType(FontVec),
    Builtin,
}

impl std::fmt::Debug for LabelFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LabelFont::TrueType(_) => f.write_str("LabelFont::TrueType"),
            LabelFont::Builtin => f.write_str("LabelFont::Builtin"),
        }
    }
}

impl LabelFont {
    /// Tries `preferred`, then well-known system fonts, then the bitmap font.
    pub fn load(preferred: Option<&Path>) -> Self {
        let candidates = preferred
            .map(Path::to_path_buf)
            .into_iter()
            .chain(SYSTEM_FONT_CANDIDATES.iter().map(PathBuf::from));

        for path in candidates {
            if !path.is_file() {
                continue;
            }
            match Self::from_file(&path) {
                Ok(font) => {
                    info!("Using label font {}", path.display());
                    return font;
                }
                Err(err) => warn!("{err:#}"),
            }
        }

        warn!("No TrueType font found, falling back to the built-in bitmap font");
        LabelFont::Builtin
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("cannot read font {}", path.display()))?;
        Self::from_bytes(bytes).with_context(|| format!("invalid font {}", path.display()))
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        FontVec::try_from_vec(bytes)
            .map(LabelFont::TrueType)
            .map_err(|err| anyhow!("{err}"))
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, LabelFont::Builtin)
    }

    /// Width and height in pixels of `text` at `size` px.
    pub fn text_extent(&self, text: &str, size: f32) -> (u32, u32) {
        match self {
            LabelFont::TrueType(font) => text_size(size, font, text),
            LabelFont::Builtin => {
                let scale = builtin_scale(size);
                let chars = text.chars().count() as u32;
                (chars * GLYPH_CELL * scale, GLYPH_CELL * scale)
            }
        }
    }

    pub fn draw(&self, image: &mut RgbImage, x: i32, y: i32, size: f32, color: Rgb<u8>, text: &str) {
        match self {
            LabelFont::TrueType(font) => draw_text_mut(image, color, x, y, size, font, text),
            LabelFont::Builtin => draw_bitmap_text(image, x, y, builtin_scale(size), color, text),
        }
    }
}

fn builtin_scale(size: f32) -> u32 {
    ((size / GLYPH_CELL as f32).round() as u32).max(1)
}

fn draw_bitmap_text(image: &mut RgbImage, x: i32, y: i32, scale: u32, color: Rgb<u8>, text: &str) {
    let scale = scale.max(1) as i32;
    let cell = GLYPH_CELL as i32 * scale;
    let (width, height) = (image.width() as i32, image.height() as i32);

    for (char_index, ch) in text.chars().enumerate() {
        let Some(glyph) = BASIC_FONTS.get(ch).or_else(|| BASIC_FONTS.get('?')) else {
            continue;
        };
        let origin_x = x + char_index as i32 * cell;
        for (row, bits) in glyph.into_iter().enumerate() {
            for col in 0..GLYPH_CELL as i32 {
                if (bits >> col) & 1 == 0 {
                    continue;
                }
                let px = origin_x + col * scale;
                let py = y + row as i32 * scale;
                for dy in 0..scale {
                    for dx in 0..scale {
                        let (tx, ty) = (px + dx, py + dy);
                        if tx >= 0 && ty >= 0 && tx < width && ty < height {
                            image.put_pixel(tx as u32, ty as u32, color);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_font_falls_back_to_builtin() {
        assert!(LabelFont::from_file(Path::new("/definitely/not/a/font.ttf")).is_err());
        assert!(LabelFont::from_bytes(b"not a font".to_vec()).is_err());
    }

    #[test]
    fn builtin_extent_scales_with_size() {
        let font = LabelFont::Builtin;
        assert_eq!(font.text_extent("ab", 8.0), (16, 8));
        assert_eq!(font.text_extent("abc", 16.0), (48, 16));
        assert_eq!(font.text_extent("", 3.0), (0, 8));
    }

    #[test]
    fn builtin_text_marks_pixels_and_clips() {
        let mut image = RgbImage::new(20, 10);
        let white = Rgb([255, 255, 255]);
        LabelFont::Builtin.draw(&mut image, 0, 0, 8.0, white, "H");
        assert!(image.pixels().any(|pixel| *pixel == white));

        // partially off-canvas text must not panic
        LabelFont::Builtin.draw(&mut image, -5, 6, 16.0, white, "WW");
        LabelFont::Builtin.draw(&mut image, 100, 100, 8.0, white, "x");
    }
}
