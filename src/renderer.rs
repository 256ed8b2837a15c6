use std::path::Path;

use anyhow::{Context, Result};
use eframe::egui::ColorImage;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use log::warn;

use crate::font::LabelFont;
use crate::labels::{display_label, read_label_file, ClassNames, LabelBox};
use crate::palette::ClassColors;

pub const NO_LABELS_TEXT: &str = "NO LABELS FOUND";
pub const PLACEHOLDER_FILL: Rgb<u8> = Rgb([139, 0, 0]);
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const PLACEHOLDER_TOP: i64 = 10;
const PLACEHOLDER_PADDING: i64 = 10;
const LABEL_PAD_X: u32 = 6;
const LABEL_PAD_Y: u32 = 4;

/// Optional post-render size changes: exact resize first, then a bounding
/// thumbnail that keeps the aspect ratio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transform {
    pub resize: Option<(u32, u32)>,
    pub thumbnail: Option<u32>,
}

impl Transform {
    pub fn apply(&self, image: RgbImage) -> RgbImage {
        let mut image = image;
        if let Some((width, height)) = self.resize {
            if width > 0 && height > 0 {
                image = imageops::resize(&image, width, height, FilterType::Lanczos3);
            }
        }
        if let Some(max_dim) = self.thumbnail {
            image = bound_to_thumbnail(image, max_dim);
        }
        image
    }
}

pub fn box_thickness(image_height: u32) -> u32 {
    (image_height / 300).max(1)
}

pub fn label_font_size(image_height: u32) -> f32 {
    (image_height / 40).max(10) as f32
}

pub fn placeholder_font_size(image_height: u32) -> f32 {
    (image_height / 15).max(20) as f32
}

pub fn load_rgb(path: &Path) -> Result<RgbImage> {
    let image = image::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    Ok(image.to_rgb8())
}

pub fn render_plain(image_path: &Path, transform: &Transform) -> Result<RgbImage> {
    Ok(transform.apply(load_rgb(image_path)?))
}

/// Loads `image_path`, overlays the boxes from `label_path` (or the
/// placeholder banner when it is missing) and applies `transform`. The file on
/// disk is never written.
pub fn render_annotated(
    image_path: &Path,
    label_path: &Path,
    names: Option<&ClassNames>,
    colors: &mut ClassColors,
    font: &LabelFont,
    transform: &Transform,
) -> Result<RgbImage> {
    let mut image = load_rgb(image_path)?;
    let labels = match read_label_file(label_path) {
        Ok(labels) => labels,
        Err(err) => {
            warn!("{err:#}");
            Some(Vec::new())
        }
    };
    annotate(&mut image, labels.as_deref(), names, colors, font);
    Ok(transform.apply(image))
}

/// `None` labels means no sidecar file exists.
pub fn annotate(
    image: &mut RgbImage,
    labels: Option<&[LabelBox]>,
    names: Option<&ClassNames>,
    colors: &mut ClassColors,
    font: &LabelFont,
) {
    match labels {
        Some(labels) => {
            for label in labels {
                draw_label(image, label, names, colors, font);
            }
        }
        None => draw_placeholder(image, font),
    }
}

fn draw_label(
    image: &mut RgbImage,
    label: &LabelBox,
    names: Option<&ClassNames>,
    colors: &mut ClassColors,
    font: &LabelFont,
) {
    let (width, height) = image.dimensions();
    let thickness = box_thickness(height);
    let font_size = label_font_size(height);
    let corners = label.to_pixels(width, height);
    let color = Rgb(colors.color_for(label.class_id));

    // Corners may be far off-canvas; anything past the outline width is invisible.
    let margin = i64::from(thickness);
    let clamp_x = |x: i32| i64::from(x).clamp(-margin, i64::from(width) + margin);
    let clamp_y = |y: i32| i64::from(y).clamp(-margin, i64::from(height) + margin);
    let (x1, y1) = (clamp_x(corners.x1), clamp_y(corners.y1));
    let (x2, y2) = (clamp_x(corners.x2), clamp_y(corners.y2));

    draw_outline(image, x1, y1, x2, y2, thickness, color);

    let text = display_label(names, label.class_id);
    let (text_width, text_height) = font.text_extent(&text, font_size);
    fill_inclusive(
        image,
        x1,
        y1,
        x1 + i64::from(text_width) + i64::from(LABEL_PAD_X),
        y1 + i64::from(text_height) + i64::from(LABEL_PAD_Y),
        color,
    );
    font.draw(
        image,
        to_canvas_coord(x1 + i64::from(LABEL_PAD_X / 2)),
        to_canvas_coord(y1 + i64::from(LABEL_PAD_Y / 2)),
        font_size,
        TEXT_COLOR,
        &text,
    );
}

fn to_canvas_coord(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

fn draw_placeholder(image: &mut RgbImage, font: &LabelFont) {
    let (width, height) = image.dimensions();
    let font_size = placeholder_font_size(height);
    let (text_width, text_height) = font.text_extent(NO_LABELS_TEXT, font_size);

    let box_x = (i64::from(width) - i64::from(text_width)).div_euclid(2);
    let box_y = PLACEHOLDER_TOP;
    fill_inclusive(
        image,
        box_x - PLACEHOLDER_PADDING,
        box_y - PLACEHOLDER_PADDING,
        box_x + i64::from(text_width) + PLACEHOLDER_PADDING,
        box_y + i64::from(text_height) + PLACEHOLDER_PADDING,
        PLACEHOLDER_FILL,
    );
    font.draw(
        image,
        to_canvas_coord(box_x),
        to_canvas_coord(box_y),
        font_size,
        TEXT_COLOR,
        NO_LABELS_TEXT,
    );
}

// Outline grows inward from the box edge, corners inclusive.
fn draw_outline(
    image: &mut RgbImage,
    x1: i64,
    y1: i64,
    x2: i64,
    y2: i64,
    thickness: u32,
    color: Rgb<u8>,
) {
    let (left, right) = (x1.min(x2), x1.max(x2));
    let (top, bottom) = (y1.min(y2), y1.max(y2));
    for inset in 0..i64::from(thickness) {
        let (l, t, r, b) = (left + inset, top + inset, right - inset, bottom - inset);
        if l > r || t > b {
            break;
        }
        if let Some(rect) = inclusive_rect(l, t, r, b) {
            draw_hollow_rect_mut(image, rect, color);
        }
    }
}

fn fill_inclusive(image: &mut RgbImage, x1: i64, y1: i64, x2: i64, y2: i64, color: Rgb<u8>) {
    if let Some(rect) = inclusive_rect(x1, y1, x2, y2) {
        draw_filled_rect_mut(image, rect, color);
    }
}

fn inclusive_rect(x1: i64, y1: i64, x2: i64, y2: i64) -> Option<Rect> {
    let width = u32::try_from(x2 - x1 + 1).ok().filter(|w| *w > 0)?;
    let height = u32::try_from(y2 - y1 + 1).ok().filter(|h| *h > 0)?;
    let x = i32::try_from(x1).ok()?;
    let y = i32::try_from(y1).ok()?;
    Some(Rect::at(x, y).of_size(width, height))
}

fn bound_to_thumbnail(image: RgbImage, max_dim: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    if max_dim == 0 || (width <= max_dim && height <= max_dim) {
        return image;
    }
    let (target_width, target_height) = thumbnail_size(width, height, max_dim);
    imageops::thumbnail(&image, target_width, target_height)
}

pub fn thumbnail_size(width: u32, height: u32, max_dim: u32) -> (u32, u32) {
    if width <= max_dim && height <= max_dim {
        return (width, height);
    }
    let scale = f64::from(max_dim) / f64::from(width.max(height));
    let target_width = ((f64::from(width) * scale).round() as u32).clamp(1, max_dim);
    let target_height = ((f64::from(height) * scale).round() as u32).clamp(1, max_dim);
    (target_width, target_height)
}

pub fn to_color_image(image: &RgbImage) -> ColorImage {
    let size = [image.width() as usize, image.height() as usize];
    ColorImage::from_rgb(size, image.as_raw())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::*;

    const BACKGROUND: Rgb<u8> = Rgb([50, 50, 50]);

    fn unique_temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "sharingan-render-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ));
        fs::create_dir_all(&dir).expect("should create temp dir");
        dir
    }

    fn blank(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, BACKGROUND)
    }

    #[test]
    fn sizes_scale_with_height() {
        assert_eq!(box_thickness(200), 1);
        assert_eq!(box_thickness(1000), 3);
        assert_eq!(label_font_size(200), 10.0);
        assert_eq!(label_font_size(1000), 25.0);
        assert_eq!(placeholder_font_size(150), 20.0);
        assert_eq!(placeholder_font_size(1500), 100.0);
    }

    #[test]
    fn label_box_outline_and_tag_use_class_color() {
        let mut image = blank(1000, 1000);
        let mut colors = ClassColors::new();
        let labels = [LabelBox::parse("0 0.5 0.5 0.2 0.2").expect("line should parse")];
        annotate(&mut image, Some(&labels[..]), None, &mut colors, &LabelFont::Builtin);

        let color = Rgb(colors.get(0).expect("class 0 colored"));
        // left, right and bottom edges, three pixels thick
        for offset in 0..3 {
            assert_eq!(*image.get_pixel(400 + offset, 500), color);
            assert_eq!(*image.get_pixel(600 - offset, 500), color);
            assert_eq!(*image.get_pixel(500, 600 - offset), color);
        }
        assert_eq!(*image.get_pixel(403, 500), BACKGROUND);
        assert_eq!(*image.get_pixel(500, 500), BACKGROUND);
        assert_eq!(*image.get_pixel(399, 500), BACKGROUND);

        // "0" at 25px with the bitmap font is 24x24, tag spans x 400..=430, y 400..=428
        assert_eq!(*image.get_pixel(429, 427), color);
        assert_eq!(*image.get_pixel(432, 401), color); // top edge of the outline
        assert_eq!(*image.get_pixel(432, 427), BACKGROUND);
        assert_eq!(*image.get_pixel(429, 431), BACKGROUND);
        assert!(image
            .enumerate_pixels()
            .any(|(x, y, pixel)| (403..427).contains(&x)
                && (402..426).contains(&y)
                && *pixel == TEXT_COLOR));
    }

    #[test]
    fn missing_labels_draw_placeholder_only() {
        let mut image = blank(600, 300);
        let mut colors = ClassColors::new();
        annotate(&mut image, None, None, &mut colors, &LabelFont::Builtin);

        // 15 glyphs at scale 3 are 360 px wide, centered at x = 120
        assert_eq!(*image.get_pixel(115, 2), PLACEHOLDER_FILL);
        assert_eq!(*image.get_pixel(485, 40), PLACEHOLDER_FILL);
        assert_eq!(*image.get_pixel(105, 2), BACKGROUND);
        assert_eq!(*image.get_pixel(300, 60), BACKGROUND);
        assert!(image.pixels().any(|pixel| *pixel == TEXT_COLOR));
        assert!(colors.is_empty());
    }

    #[test]
    fn empty_label_file_draws_nothing() {
        let mut image = blank(64, 64);
        let mut colors = ClassColors::new();
        annotate(&mut image, Some(&[][..]), None, &mut colors, &LabelFont::Builtin);
        assert!(image.pixels().all(|pixel| *pixel == BACKGROUND));
    }

    #[test]
    fn class_names_replace_ids_in_tags() {
        let names = ClassNames::new(vec!["cat".to_string(), "dog".to_string()]);
        let labels = [LabelBox::parse("1 0.5 0.5 0.5 0.5").expect("line should parse")];

        let mut named = blank(400, 400);
        annotate(
            &mut named,
            Some(&labels[..]),
            Some(&names),
            &mut ClassColors::new(),
            &LabelFont::Builtin,
        );
        let mut numbered = blank(400, 400);
        annotate(
            &mut numbered,
            Some(&labels[..]),
            None,
            &mut ClassColors::new(),
            &LabelFont::Builtin,
        );
        // "dog" tag is three glyphs wide, "1" is one
        assert_ne!(named.get_pixel(130, 102), numbered.get_pixel(130, 102));
    }

    #[test]
    fn boxes_past_the_edge_are_clipped() {
        let mut image = blank(100, 100);
        let labels = [LabelBox::parse("3 0.0 0.0 0.5 0.5").expect("line should parse")];
        annotate(
            &mut image,
            Some(&labels[..]),
            None,
            &mut ClassColors::new(),
            &LabelFont::Builtin,
        );
        assert_ne!(*image.get_pixel(25, 10), BACKGROUND);
    }

    #[test]
    fn far_off_canvas_boxes_do_not_overflow() {
        for line in ["0 1e12 0.5 0.1 0.1", "0 3e7 0.5 0.1 0.1", "1 -1e12 -1e12 1e13 1e13"] {
            let mut image = blank(100, 100);
            let labels = [LabelBox::parse(line).expect("line should parse")];
            annotate(
                &mut image,
                Some(&labels[..]),
                None,
                &mut ClassColors::new(),
                &LabelFont::Builtin,
            );
            assert_eq!(image.dimensions(), (100, 100), "{line}");
        }

        // box swallowing the whole image still outlines the canvas edge region
        let mut image = blank(100, 100);
        let labels = [LabelBox::parse("2 0.5 0.5 1e9 1e9").expect("line should parse")];
        annotate(
            &mut image,
            Some(&labels[..]),
            None,
            &mut ClassColors::new(),
            &LabelFont::Builtin,
        );
        assert_eq!(*image.get_pixel(50, 50), BACKGROUND);
    }

    #[test]
    fn render_from_files_skips_bad_lines() {
        let dir = unique_temp_dir("files");
        let image_path = dir.join("frame.png");
        let label_path = dir.join("frame.txt");
        blank(200, 200).save(&image_path).expect("should save image");
        fs::write(&label_path, "1 0.2\n2 0.5 0.5 0.5 0.5\n").expect("should write labels");

        let mut colors = ClassColors::new();
        let rendered = render_annotated(
            &image_path,
            &label_path,
            None,
            &mut colors,
            &LabelFont::Builtin,
            &Transform::default(),
        )
        .expect("render should succeed");

        assert_eq!(colors.len(), 1);
        let color = Rgb(colors.get(2).expect("class 2 colored"));
        assert_eq!(*rendered.get_pixel(50, 100), color);
        assert_eq!(*rendered.get_pixel(100, 100), BACKGROUND);

        // the source image is left untouched
        let reloaded = load_rgb(&image_path).expect("should reload");
        assert!(reloaded.pixels().all(|pixel| *pixel == BACKGROUND));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn render_without_sidecar_shows_placeholder() {
        let dir = unique_temp_dir("no-sidecar");
        let image_path = dir.join("lonely.png");
        blank(600, 300).save(&image_path).expect("should save image");

        let mut colors = ClassColors::new();
        let rendered = render_annotated(
            &image_path,
            &dir.join("lonely.txt"),
            None,
            &mut colors,
            &LabelFont::Builtin,
            &Transform::default(),
        )
        .expect("render should succeed");
        assert_eq!(*rendered.get_pixel(115, 2), PLACEHOLDER_FILL);
        assert!(colors.is_empty());

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn unreadable_image_is_an_error() {
        let dir = unique_temp_dir("broken");
        let image_path = dir.join("broken.png");
        fs::write(&image_path, b"not a png").expect("should write");
        assert!(render_plain(&image_path, &Transform::default()).is_err());
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn resize_then_thumbnail() {
        let transform = Transform {
            resize: Some((400, 100)),
            thumbnail: Some(200),
        };
        let out = transform.apply(blank(50, 50));
        assert_eq!(out.dimensions(), (200, 50));

        let resize_only = Transform {
            resize: Some((30, 60)),
            thumbnail: None,
        };
        assert_eq!(resize_only.apply(blank(50, 50)).dimensions(), (30, 60));
    }

    #[test]
    fn thumbnail_never_enlarges() {
        let transform = Transform {
            resize: None,
            thumbnail: Some(500),
        };
        assert_eq!(transform.apply(blank(120, 80)).dimensions(), (120, 80));
        assert_eq!(thumbnail_size(1000, 500, 100), (100, 50));
        assert_eq!(thumbnail_size(300, 900, 90), (30, 90));
    }

    #[test]
    fn color_image_matches_dimensions() {
        let image = blank(7, 3);
        let color_image = to_color_image(&image);
        assert_eq!(color_image.size, [7, 3]);
        assert_eq!(color_image.pixels.len(), 21);
    }
}
