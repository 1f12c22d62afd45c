//! Souvenir export: a 1920×1080 PNG "official record" of a travel result.

use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use base64::Engine;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage, imageops};
use imageproc::{
    drawing::{draw_hollow_rect_mut, draw_text_mut, text_size},
    rect::Rect,
};
use std::{
    fs,
    io::Cursor,
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

use crate::{Config, error::SouvenirError, model::TravelResult};

pub const WIDTH: u32 = 1920;
pub const HEIGHT: u32 = 1080;

const BAR_HEIGHT: u32 = 280;
const PAD: i32 = 60;
const LOGO_RESERVE: u32 = 300;

const CYAN: Rgba<u8> = Rgba([6, 182, 212, 255]);
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const SLATE: Rgba<u8> = Rgba([203, 213, 225, 255]);
const PANEL: Rgba<u8> = Rgba([17, 24, 39, 255]);
const PANEL_TEXT: Rgba<u8> = Rgba([55, 65, 81, 255]);

/// Monospace fonts tried when none is configured.
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSansMono-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
    "/usr/share/fonts/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationMono-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Courier New.ttf",
    "/Library/Fonts/Courier New.ttf",
    "C:\\Windows\\Fonts\\cour.ttf",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SouvenirOptions {
    /// Explicit font; when set, no fallback search happens.
    pub font_path: Option<PathBuf>,
    /// Base directory for non-`data:` image URLs such as `/mock_assets/forum.png`.
    pub assets_dir: Option<PathBuf>,
}

impl SouvenirOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            font_path: config.souvenir.font_path.clone(),
            assets_dir: config.mock.assets_dir.clone(),
        }
    }
}

/// `Chronovisor-<name, whitespace runs as _>-<year>.png`
pub fn souvenir_file_name(result: &TravelResult) -> String {
    let mut name = String::with_capacity(result.location_name.len());
    let mut in_space = false;
    for c in result.location_name.chars() {
        if c.is_whitespace() {
            if !in_space {
                name.push('_');
            }
            in_space = true;
        } else {
            name.push(c);
            in_space = false;
        }
    }
    format!("Chronovisor-{}-{}.png", name, result.time.year)
}

/// Render the souvenir as PNG bytes. A missing or unreadable source image
/// yields the "NO VISUAL FEED" panel instead of an error.
pub fn render_souvenir(
    result: &TravelResult,
    options: &SouvenirOptions,
) -> Result<Vec<u8>, SouvenirError> {
    let font = load_font(options.font_path.as_deref())?;
    let source = result
        .image_url
        .as_deref()
        .and_then(|url| load_source(url, options.assets_dir.as_deref()));

    let mut canvas = RgbaImage::from_pixel(WIDTH, HEIGHT, Rgba([0, 0, 0, 255]));
    compose(&mut canvas, source.as_ref(), result, &font);

    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(canvas).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

fn load_font(explicit: Option<&Path>) -> Result<FontVec, SouvenirError> {
    if let Some(path) = explicit {
        return read_font(path);
    }
    let mut tried = Vec::new();
    for candidate in FONT_CANDIDATES {
        let path = PathBuf::from(candidate);
        if path.is_file() {
            match read_font(&path) {
                Ok(font) => return Ok(font),
                Err(e) => debug!(error = %e, "skipping font candidate"),
            }
        }
        tried.push(path);
    }
    Err(SouvenirError::FontUnavailable { tried })
}

fn read_font(path: &Path) -> Result<FontVec, SouvenirError> {
    let data = fs::read(path)
        .map_err(|source| SouvenirError::FontRead { path: path.to_path_buf(), source })?;
    FontVec::try_from_vec(data).map_err(|_| SouvenirError::FontParse { path: path.to_path_buf() })
}

/// Decode a `data:` URL or read a local file. Remote URLs are not fetched.
pub(crate) fn load_source(url: &str, assets_dir: Option<&Path>) -> Option<DynamicImage> {
    if let Some(rest) = url.strip_prefix("data:") {
        let (_, payload) = rest.split_once("base64,")?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .inspect_err(|e| warn!(error = %e, "souvenir image is not valid base64"))
            .ok()?;
        return image::load_from_memory(&bytes)
            .inspect_err(|e| warn!(error = %e, "souvenir image could not be decoded"))
            .ok();
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        debug!(url, "remote souvenir images are not fetched");
        return None;
    }
    let path = match assets_dir {
        Some(dir) => dir.join(url.trim_start_matches('/')),
        None => PathBuf::from(url),
    };
    image::open(&path)
        .inspect_err(|e| warn!(error = %e, path = %path.display(), "souvenir image could not be opened"))
        .ok()
}

fn compose(
    canvas: &mut RgbaImage,
    source: Option<&DynamicImage>,
    result: &TravelResult,
    font: &FontVec,
) {
    let (width, height) = canvas.dimensions();

    match source {
        Some(img) => {
            let scaled = cover(img, width, height);
            imageops::overlay(canvas, &scaled, 0, 0);
        }
        None => {
            for px in canvas.pixels_mut() {
                *px = PANEL;
            }
            let (cx, cy) = (width as i32 / 2, height as i32 / 2);
            draw_centered(canvas, font, 100.0, PANEL_TEXT, cx, cy, "NO VISUAL FEED");
        }
    }

    // Scanlines.
    for y in (0..height).step_by(4) {
        darken_row(canvas, y, 0.1);
    }

    vignette(canvas);

    let bar_top = height - BAR_HEIGHT;
    for y in bar_top..height {
        darken_row(canvas, y, 0.85);
    }
    for y in bar_top..bar_top + 4 {
        for x in 0..width {
            canvas.put_pixel(x, y, CYAN);
        }
    }

    let text_start = bar_top as i32 + PAD;
    let max_text_width = width - 2 * PAD as u32 - LOGO_RESERVE;

    let title = result.location_name.to_uppercase();
    let title_size = fit_font_size(&title, max_text_width, 80.0, 20.0, |size, text| {
        text_size(PxScale::from(size), font, text).0
    });
    draw_baseline(canvas, font, title_size, WHITE, PAD, text_start + 40, &title);

    draw_baseline(canvas, font, 50.0, CYAN, PAD, text_start + 120, &result.time.format_short());

    let lines = wrap_words(&result.description, max_text_width, |text| {
        text_size(PxScale::from(30.0), font, text).0
    });
    for (i, line) in lines.iter().enumerate() {
        draw_baseline(canvas, font, 30.0, SLATE, PAD, text_start + 180 + 40 * i as i32, line);
    }

    let logo_x = width as i32 - PAD - 220;
    let logo_y = bar_top as i32 + (BAR_HEIGHT as i32 - 100) / 2;
    for inset in 0..4 {
        let shrink = 2 * inset as u32;
        let rect = Rect::at(logo_x + inset, logo_y + inset).of_size(200 - shrink, 100 - shrink);
        draw_hollow_rect_mut(canvas, rect, CYAN);
    }
    draw_centered_baseline(canvas, font, 24.0, CYAN, logo_x + 100, logo_y + 45, "CHRONOVISOR");
    draw_centered_baseline(canvas, font, 16.0, WHITE, logo_x + 100, logo_y + 75, "OFFICIAL RECORD");
}

/// Scale `img` to fill `width`×`height`, cropping the overflow evenly.
/// Cropping happens before scaling; the scaled buffer is never larger than the target.
pub(crate) fn cover(img: &DynamicImage, width: u32, height: u32) -> RgbaImage {
    let (x, y, w, h) = cover_crop(img.width(), img.height(), width, height);
    let visible = img.crop_imm(x, y, w, h).to_rgba8();
    imageops::resize(&visible, width, height, imageops::FilterType::Triangle)
}

/// Region `(x, y, w, h)` of a `src_w`×`src_h` source that stays visible when
/// it is scaled to cover `dst_w`×`dst_h` and centered.
pub(crate) fn cover_crop(
    src_w: u32,
    src_h: u32,
    dst_w: u32,
    dst_h: u32,
) -> (u32, u32, u32, u32) {
    if src_w == 0 || src_h == 0 || dst_w == 0 || dst_h == 0 {
        return (0, 0, src_w, src_h);
    }
    let scale = f64::max(f64::from(dst_w) / f64::from(src_w), f64::from(dst_h) / f64::from(src_h));
    let w = ((f64::from(dst_w) / scale).round() as u32).clamp(1, src_w);
    let h = ((f64::from(dst_h) / scale).round() as u32).clamp(1, src_h);
    ((src_w - w) / 2, (src_h - h) / 2, w, h)
}

pub(crate) fn fit_font_size(
    text: &str,
    max_width: u32,
    start: f32,
    min: f32,
    measure: impl Fn(f32, &str) -> u32,
) -> f32 {
    let mut size = start;
    while measure(size, text) > max_width && size > min {
        size -= 2.0;
    }
    size
}

/// Greedy word wrap. The first word of a line is never pushed down, even if too wide.
pub(crate) fn wrap_words(
    text: &str,
    max_width: u32,
    measure: impl Fn(&str) -> u32,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for (n, word) in text.split(' ').enumerate() {
        let candidate = format!("{line}{word} ");
        if measure(&candidate) > max_width && n > 0 {
            lines.push(line.trim_end().to_string());
            line = format!("{word} ");
        } else {
            line = candidate;
        }
    }
    lines.push(line.trim_end().to_string());
    lines
}

fn darken_row(canvas: &mut RgbaImage, y: u32, amount: f32) {
    let keep = 1.0 - amount;
    for x in 0..canvas.width() {
        let px = canvas.get_pixel_mut(x, y);
        for channel in px.0.iter_mut().take(3) {
            *channel = (f32::from(*channel) * keep) as u8;
        }
    }
}

/// Radial darkening from clear at a third of the width to 60% at the full width.
fn vignette(canvas: &mut RgbaImage) {
    let (width, height) = canvas.dimensions();
    let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
    let inner = width as f32 / 3.0;
    let outer = width as f32;
    for (x, y, px) in canvas.enumerate_pixels_mut() {
        let d = ((x as f32 - cx).powi(2) + (y as f32 - cy).powi(2)).sqrt();
        let t = ((d - inner) / (outer - inner)).clamp(0.0, 1.0);
        let keep = 1.0 - 0.6 * t;
        for channel in px.0.iter_mut().take(3) {
            *channel = (f32::from(*channel) * keep) as u8;
        }
    }
}

fn draw_baseline(
    canvas: &mut RgbaImage,
    font: &FontVec,
    size: f32,
    color: Rgba<u8>,
    x: i32,
    baseline: i32,
    text: &str,
) {
    let scale = PxScale::from(size);
    let ascent = font.as_scaled(scale).ascent();
    draw_text_mut(canvas, color, x, baseline - ascent.round() as i32, scale, font, text);
}

fn draw_centered_baseline(
    canvas: &mut RgbaImage,
    font: &FontVec,
    size: f32,
    color: Rgba<u8>,
    cx: i32,
    baseline: i32,
    text: &str,
) {
    let (w, _) = text_size(PxScale::from(size), font, text);
    draw_baseline(canvas, font, size, color, cx - w as i32 / 2, baseline, text);
}

fn draw_centered(
    canvas: &mut RgbaImage,
    font: &FontVec,
    size: f32,
    color: Rgba<u8>,
    cx: i32,
    cy: i32,
    text: &str,
) {
    let scale = PxScale::from(size);
    let (w, h) = text_size(scale, font, text);
    draw_text_mut(canvas, color, cx - w as i32 / 2, cy - h as i32 / 2, scale, font, text);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TimeParams;

    fn result(image_url: Option<String>) -> TravelResult {
        TravelResult {
            location_name: "Forum  Romanum, Rome".into(),
            description: "The sun sets over the marble columns of the Forum.".into(),
            image_url,
            time: TimeParams::new(50, 6, 15, 18, 30, 0),
        }
    }

    fn png_data_url(w: u32, h: u32) -> String {
        let img = RgbaImage::from_pixel(w, h, Rgba([200, 10, 10, 255]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .expect("encode test png");
        format!("data:image/png;base64,{}", base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    #[test]
    fn file_name_collapses_whitespace() {
        assert_eq!(souvenir_file_name(&result(None)), "Chronovisor-Forum_Romanum,_Rome-50.png");
    }

    #[test]
    fn cover_crop_keeps_the_centered_visible_region() {
        assert_eq!(cover_crop(100, 100, 1920, 1080), (0, 22, 100, 56));
        assert_eq!(cover_crop(960, 540, 1920, 1080), (0, 0, 960, 540));
        assert_eq!(cover_crop(4000, 1000, 1920, 1080), (1111, 0, 1778, 1000));
        assert_eq!(cover_crop(1, 10_000, 1920, 1080), (0, 4999, 1, 1));
        assert_eq!(cover_crop(0, 10, 1920, 1080), (0, 0, 0, 10));
    }

    #[test]
    fn extreme_aspect_sources_scale_to_the_canvas_only() {
        let tall =
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 10_000, Rgba([9, 9, 9, 255])));
        let scaled = cover(&tall, WIDTH, HEIGHT);
        assert_eq!(scaled.dimensions(), (WIDTH, HEIGHT));
        assert_eq!(scaled.get_pixel(WIDTH / 2, HEIGHT / 2), &Rgba([9, 9, 9, 255]));
    }

    #[test]
    fn font_size_shrinks_to_fit_with_floor() {
        let measure = |size: f32, text: &str| (size * text.len() as f32) as u32;
        assert_eq!(fit_font_size("abcd", 1000, 80.0, 20.0, measure), 80.0);
        assert_eq!(fit_font_size("abcdefghij", 600, 80.0, 20.0, measure), 60.0);
        assert_eq!(fit_font_size(&"x".repeat(500), 10, 80.0, 20.0, measure), 20.0);
    }

    #[test]
    fn wrap_breaks_on_width() {
        let measure = |text: &str| text.len() as u32;
        let lines = wrap_words("aaa bbb ccc ddd", 8, measure);
        assert_eq!(lines, vec!["aaa bbb", "ccc ddd"]);

        let lines = wrap_words("averyveryverylongword short", 5, measure);
        assert_eq!(lines, vec!["averyveryverylongword", "short"]);
    }

    #[test]
    fn data_url_sources_decode() {
        let img = load_source(&png_data_url(4, 3), None).expect("decodes");
        assert_eq!((img.width(), img.height()), (4, 3));

        assert!(load_source("data:image/png;base64,!!!", None).is_none());
        assert!(load_source("https://example.test/a.png", None).is_none());
        assert!(load_source("/mock_assets/does-not-exist.png", Some(Path::new("/nonexistent"))).is_none());
    }

    #[test]
    fn explicit_missing_font_is_an_error() {
        let options = SouvenirOptions {
            font_path: Some(PathBuf::from("/nonexistent/font.ttf")),
            assets_dir: None,
        };
        let err = render_souvenir(&result(None), &options).unwrap_err();
        assert!(matches!(err, SouvenirError::FontRead { .. }));
    }

    #[test]
    fn renders_full_hd_png_when_a_font_is_available() {
        if load_font(None).is_err() {
            eprintln!("no system font available, skipping render test");
            return;
        }
        for url in [None, Some(png_data_url(16, 16)), Some("/missing.png".to_string())] {
            let bytes = render_souvenir(&result(url), &SouvenirOptions::default()).expect("renders");
            let decoded = image::load_from_memory(&bytes).expect("valid png");
            assert_eq!((decoded.width(), decoded.height()), (WIDTH, HEIGHT));
        }
    }
}
