use std::fs;

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, GenericImageView, ImageEncoder, Rgb, RgbImage};
use rusttype::{point, Font, Scale};
use thiserror::Error;
use tracing::warn;

use crate::card::template::TemplateDescriptor;
use crate::product::ProductRecord;

/// Titles are capped at two rendered lines; overflow is dropped.
const TITLE_MAX_LINES: usize = 2;

static DEFAULT_FONT_DATA: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");
static DEFAULT_BOLD_FONT_DATA: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans-Bold.ttf");

/// Fatal card composition failure. Extraction-side problems never reach
/// this type; an undecodable photo is skipped rather than reported here.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to encode card as PNG: {0}")]
    Encode(#[from] image::ImageError),
}

struct FontSet {
    title: Font<'static>,
    body: Font<'static>,
    price: Font<'static>,
}

fn load_font(path: &str, fallback: &'static [u8]) -> Font<'static> {
    if let Ok(bytes) = fs::read(path) {
        match Font::try_from_vec(bytes) {
            Some(font) => return font,
            None => warn!("Font at {path} could not be parsed; using built-in face"),
        }
    }
    Font::try_from_bytes(fallback).expect("embedded font is valid")
}

impl FontSet {
    fn load(descriptor: &TemplateDescriptor) -> FontSet {
        let bold_path = descriptor.font_path.replace(".ttf", "-Bold.ttf");
        let body = load_font(descriptor.font_path, DEFAULT_FONT_DATA);
        let bold = load_font(&bold_path, DEFAULT_BOLD_FONT_DATA);
        FontSet {
            title: bold.clone(),
            body,
            price: bold,
        }
    }
}

/// Greedy word wrap against a character budget: words accumulate into a
/// line until adding the next one would exceed `max_width`, then the line
/// is flushed. A single word longer than the budget gets its own line.
/// Character counts approximate pixel width; budgets are tuned per
/// template.
pub(crate) fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if current.is_empty() {
            current = word.to_string();
            current_len = word_len;
        } else if current_len + 1 + word_len > max_width {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
            current_len = word_len;
        } else {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn fill_rect(canvas: &mut RgbImage, x0: i32, y0: i32, x1: i32, y1: i32, color: [u8; 3]) {
    let x_start = x0.max(0) as u32;
    let y_start = y0.max(0) as u32;
    let x_end = (x1.max(0) as u32).min(canvas.width());
    let y_end = (y1.max(0) as u32).min(canvas.height());
    for y in y_start..y_end {
        for x in x_start..x_end {
            canvas.put_pixel(x, y, Rgb(color));
        }
    }
}

fn draw_text(canvas: &mut RgbImage, font: &Font, px: f32, x: i32, y: i32, color: [u8; 3], text: &str) {
    let scale = Scale::uniform(px);
    let v_metrics = font.v_metrics(scale);
    let glyphs: Vec<_> = font
        .layout(text, scale, point(x as f32, y as f32 + v_metrics.ascent))
        .collect();

    for glyph in glyphs {
        if let Some(bb) = glyph.pixel_bounding_box() {
            glyph.draw(|gx, gy, coverage| {
                let px_x = gx as i32 + bb.min.x;
                let px_y = gy as i32 + bb.min.y;
                if px_x < 0 || px_y < 0 {
                    return;
                }
                let (px_x, px_y) = (px_x as u32, px_y as u32);
                if px_x >= canvas.width() || px_y >= canvas.height() {
                    return;
                }
                let alpha = coverage.clamp(0.0, 1.0);
                if alpha == 0.0 {
                    return;
                }
                let inv = 1.0 - alpha;
                let dst = canvas.get_pixel_mut(px_x, px_y);
                for channel in 0..3 {
                    dst.0[channel] = (color[channel] as f32 * alpha
                        + dst.0[channel] as f32 * inv)
                        .round() as u8;
                }
            });
        }
    }
}

fn text_width(font: &Font, px: f32, text: &str) -> i32 {
    let scale = Scale::uniform(px);
    let v_metrics = font.v_metrics(scale);
    font.layout(text, scale, point(0.0, v_metrics.ascent))
        .filter_map(|glyph| glyph.pixel_bounding_box())
        .map(|bb| bb.max.x)
        .max()
        .unwrap_or(0)
}

fn place_photo(canvas: &mut RgbImage, descriptor: &TemplateDescriptor, bytes: &[u8]) {
    let photo = match image::load_from_memory(bytes) {
        Ok(photo) => photo,
        Err(err) => {
            warn!("Skipping undecodable product photo: {err}");
            return;
        }
    };

    let (source_width, source_height) = photo.dimensions();
    if source_width == 0 || source_height == 0 {
        return;
    }

    let target_width = descriptor.width - 2 * descriptor.side_margin;
    let target_height = descriptor.photo_region_height;
    // Fit within the photo region preserving aspect ratio; small photos
    // keep their native size instead of being upscaled.
    let scale = (target_width as f32 / source_width as f32)
        .min(target_height as f32 / source_height as f32)
        .min(1.0);
    let new_width = ((source_width as f32 * scale).round() as u32).max(1);
    let new_height = ((source_height as f32 * scale).round() as u32).max(1);

    let resized = photo
        .resize_exact(new_width, new_height, image::imageops::FilterType::Lanczos3)
        .to_rgba8();

    // Flatten transparency onto the template background and center
    // horizontally at the fixed photo offset.
    let x0 = (descriptor.width - new_width) / 2;
    let y0 = descriptor.photo_top;
    for (px, py, pixel) in resized.enumerate_pixels() {
        let x = x0 + px;
        let y = y0 + py;
        if x >= canvas.width() || y >= canvas.height() {
            continue;
        }
        let alpha = pixel.0[3] as f32 / 255.0;
        let inv = 1.0 - alpha;
        let dst = canvas.get_pixel_mut(x, y);
        for channel in 0..3 {
            dst.0[channel] =
                (pixel.0[channel] as f32 * alpha + dst.0[channel] as f32 * inv).round() as u8;
        }
    }
}

/// Composes a product card bitmap: background, optional photo, category
/// label, wrapped title and description, optional size line and the price
/// banner. Pure function of its inputs; fixed inputs produce byte-identical
/// PNG output.
pub fn render_card(
    descriptor: &TemplateDescriptor,
    record: &ProductRecord,
    photo: Option<&[u8]>,
) -> Result<Vec<u8>, RenderError> {
    let fonts = FontSet::load(descriptor);
    let mut canvas = RgbImage::from_pixel(
        descriptor.width,
        descriptor.height,
        Rgb(descriptor.background_color),
    );

    if descriptor.top_accent_stripe {
        fill_rect(
            &mut canvas,
            0,
            0,
            descriptor.width as i32,
            5,
            descriptor.accent_color,
        );
    }

    if let Some(bytes) = photo {
        place_photo(&mut canvas, descriptor, bytes);
    }

    let margin = descriptor.side_margin as i32;
    let banner_top = (descriptor.height - descriptor.price_banner_height) as i32;
    let body_line_height = descriptor.body_font_size as i32 + 10;
    let title_line_height = descriptor.title_font_size as i32 + 6;

    let mut y = (descriptor.photo_top + descriptor.photo_region_height) as i32 + 20;

    let category = record
        .category
        .as_deref()
        .unwrap_or("Общая")
        .to_uppercase();
    if descriptor.category_chip {
        let chip_width = text_width(&fonts.body, descriptor.body_font_size, &category);
        fill_rect(
            &mut canvas,
            margin - 10,
            y - 6,
            margin + chip_width + 10,
            y + body_line_height,
            descriptor.accent_color,
        );
        draw_text(
            &mut canvas,
            &fonts.body,
            descriptor.body_font_size,
            margin,
            y,
            [255, 255, 255],
            &category,
        );
    } else {
        draw_text(
            &mut canvas,
            &fonts.body,
            descriptor.body_font_size,
            margin,
            y,
            descriptor.accent_color,
            &category,
        );
    }
    y += 35;

    let title = record.name.as_deref().unwrap_or("Товар");
    for line in wrap_text(title, descriptor.title_wrap)
        .iter()
        .take(TITLE_MAX_LINES)
    {
        draw_text(
            &mut canvas,
            &fonts.title,
            descriptor.title_font_size,
            margin,
            y,
            descriptor.text_color,
            line,
        );
        y += title_line_height;
    }
    y += 8;

    if let Some(description) = &record.description {
        for line in wrap_text(description, descriptor.body_wrap) {
            // Body text never runs into the price banner.
            if y + body_line_height > banner_top - 10 {
                break;
            }
            draw_text(
                &mut canvas,
                &fonts.body,
                descriptor.body_font_size,
                margin,
                y,
                descriptor.text_color,
                &line,
            );
            y += body_line_height;
        }
    }

    if let Some(size) = &record.size {
        y += 10;
        if y + body_line_height <= banner_top - 10 {
            draw_text(
                &mut canvas,
                &fonts.body,
                descriptor.body_font_size,
                margin,
                y,
                descriptor.text_color,
                &format!("Размер: {size}"),
            );
        }
    }

    fill_rect(
        &mut canvas,
        0,
        banner_top,
        descriptor.width as i32,
        descriptor.height as i32,
        descriptor.accent_color,
    );
    let price_text = record.price.as_deref().unwrap_or("Цена не указана");
    draw_text(
        &mut canvas,
        &fonts.price,
        descriptor.price_font_size,
        margin,
        banner_top + 18,
        [255, 255, 255],
        price_text,
    );

    let mut out = Vec::new();
    PngEncoder::new(&mut out).write_image(
        canvas.as_raw(),
        descriptor.width,
        descriptor.height,
        ExtendedColorType::Rgb8,
    )?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::template::TemplateStyle;

    fn sample_record() -> ProductRecord {
        ProductRecord {
            name: Some("Кеды".to_string()),
            price: Some("3400₽".to_string()),
            description: Some("Лёгкие летние кеды, подходят для прогулок".to_string()),
            category: Some("Обувь".to_string()),
            color: Some("Синий".to_string()),
            size: Some("42".to_string()),
            ..ProductRecord::default()
        }
    }

    #[test]
    fn wrap_respects_character_budget() {
        let lines = wrap_text("слово один два три четыре пять", 10);
        assert!(lines.iter().all(|line| line.chars().count() <= 10));
        assert_eq!(lines.join(" "), "слово один два три четыре пять");
    }

    #[test]
    fn wrap_gives_oversized_word_its_own_line() {
        let lines = wrap_text("сверхдлинноеслово и хвост", 5);
        assert_eq!(lines[0], "сверхдлинноеслово");
    }

    #[test]
    fn long_title_wraps_to_at_most_two_rendered_lines() {
        let long_name = "Очень длинное название товара которое никак не помещается в две строки заголовка карточки";
        let lines = wrap_text(long_name, 40);
        assert!(lines.len() > 2);
        // render_card draws only the first TITLE_MAX_LINES of these.
        assert_eq!(lines.iter().take(TITLE_MAX_LINES).count(), 2);
    }

    #[test]
    fn rendering_is_deterministic_for_fixed_inputs() {
        let record = sample_record();
        let descriptor = TemplateStyle::Minimal.descriptor();
        let first = render_card(descriptor, &record, None).unwrap();
        let second = render_card(descriptor, &record, None).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn renders_valid_png_without_photo_for_every_style() {
        let record = sample_record();
        for style in TemplateStyle::ALL {
            let bytes = render_card(style.descriptor(), &record, None).unwrap();
            assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G']));
            let decoded = image::load_from_memory(&bytes).unwrap();
            assert_eq!(decoded.dimensions(), (800, 800));
        }
    }

    #[test]
    fn undecodable_photo_is_skipped_not_fatal() {
        let record = sample_record();
        let descriptor = TemplateStyle::Dark.descriptor();
        let without_photo = render_card(descriptor, &record, None).unwrap();
        let with_garbage = render_card(descriptor, &record, Some(b"not an image")).unwrap();
        assert_eq!(without_photo, with_garbage);
    }

    #[test]
    fn photo_is_composited_into_the_card() {
        let record = sample_record();
        let descriptor = TemplateStyle::Minimal.descriptor();

        let photo = RgbImage::from_pixel(100, 100, Rgb([200, 30, 30]));
        let mut photo_bytes = Vec::new();
        PngEncoder::new(&mut photo_bytes)
            .write_image(photo.as_raw(), 100, 100, ExtendedColorType::Rgb8)
            .unwrap();

        let with_photo = render_card(descriptor, &record, Some(&photo_bytes)).unwrap();
        let without_photo = render_card(descriptor, &record, None).unwrap();
        assert_ne!(with_photo, without_photo);
    }

    #[test]
    fn missing_price_renders_placeholder_banner() {
        let mut record = sample_record();
        record.price = None;
        let descriptor = TemplateStyle::Minimal.descriptor();
        // Must not raise; the banner carries the placeholder text instead.
        render_card(descriptor, &record, None).unwrap();
    }
}
