//! Software rasterizer used to write the scene to an image file.

use blockview_core::{Rect, Vec2};
use blockview_graph::{Canvas, Color, FontMetrics};
use fontdue::layout::{CoordinateSystem, Layout, LayoutSettings, TextStyle};
use image::{Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Largest image edge we are willing to allocate.
pub const MAX_IMAGE_DIMENSION: u32 = 32_768;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Image encoding failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("Export I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid image size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
}

/// How text rows are drawn.
#[derive(Clone)]
pub struct TextRaster {
    pub font: Option<fontdue::Font>,
    pub font_size: f32,
    pub metrics: FontMetrics,
}

impl TextRaster {
    /// Rows become silhouettes.
    pub fn silhouettes(metrics: FontMetrics) -> Self {
        Self {
            font: None,
            font_size: metrics.line_height,
            metrics,
        }
    }
}

/// [`Canvas`] that draws into an RGBA buffer at scale 1.
pub struct RasterCanvas {
    image: RgbaImage,
    /// Scene position of the image's top-left pixel.
    origin: Vec2,
    text: TextRaster,
}

impl RasterCanvas {
    pub fn new(width: u32, height: u32, origin: Vec2, background: Color, text: TextRaster) -> Self {
        let [r, g, b, a] = background.to_array();
        Self {
            image: RgbaImage::from_pixel(width, height, Rgba([r, g, b, a])),
            origin,
            text,
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    fn to_pixel(&self, scene: Vec2) -> Vec2 {
        scene - self.origin
    }

    fn blend_pixel(&mut self, x: i32, y: i32, color: Color, coverage: u8) {
        if x < 0 || y < 0 || x as u32 >= self.image.width() || y as u32 >= self.image.height() {
            return;
        }
        let pixel = self.image.get_pixel_mut(x as u32, y as u32);
        let [r, g, b, a] = pixel.0;
        let src_a = (color.a as f32 / 255.0) * (coverage as f32 / 255.0);
        let inv = 1.0 - src_a;
        let mix = |src: u8, dst: u8| (src as f32 * src_a + dst as f32 * inv).round() as u8;
        let out_a = mix(color.a, a).max(a);
        *pixel = Rgba([mix(color.r, r), mix(color.g, g), mix(color.b, b), out_a]);
    }

    fn fill_pixels(&mut self, min_x: i32, min_y: i32, max_x: i32, max_y: i32, color: Color) {
        for y in min_y..max_y {
            for x in min_x..max_x {
                self.blend_pixel(x, y, color, 255);
            }
        }
    }

    fn draw_thick_point(&mut self, x: i32, y: i32, color: Color, thickness: i32) {
        let radius = (thickness.max(1) - 1) / 2;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                self.blend_pixel(x + dx, y + dy, color, 255);
            }
        }
    }

    fn draw_line(&mut self, from: Vec2, to: Vec2, color: Color, thickness: i32) {
        let (mut x0, mut y0) = (from.x.round() as i32, from.y.round() as i32);
        let (x1, y1) = (to.x.round() as i32, to.y.round() as i32);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.draw_thick_point(x0, y0, color, thickness);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    fn draw_glyphs(&mut self, font: &fontdue::Font, pos: Vec2, text: &str, color: Color) {
        let size = self.text.font_size;
        let center_y = pos.y + self.text.metrics.line_height * 0.5;
        let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
        let mut settings = LayoutSettings {
            x: pos.x,
            ..LayoutSettings::default()
        };
        settings.y = match font.horizontal_line_metrics(size) {
            Some(line) => center_y + (line.ascent + line.descent) * 0.5 - line.ascent,
            None => center_y - size * 0.5,
        };
        layout.reset(&settings);
        layout.append(&[font], &TextStyle::new(text, size, 0));

        for glyph in layout.glyphs() {
            if glyph.width == 0 || glyph.height == 0 {
                continue;
            }
            let (metrics, bitmap) = font.rasterize_indexed(glyph.key.glyph_index, glyph.key.px);
            let start_x = glyph.x.floor() as i32;
            let start_y = glyph.y.floor() as i32;
            for row in 0..metrics.height {
                for col in 0..metrics.width {
                    let coverage = bitmap[row * metrics.width + col];
                    if coverage > 0 {
                        self.blend_pixel(start_x + col as i32, start_y + row as i32, color, coverage);
                    }
                }
            }
        }
    }
}

impl Canvas for RasterCanvas {
    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let min = self.to_pixel(rect.min);
        let max = self.to_pixel(rect.max);
        self.fill_pixels(
            min.x.round() as i32,
            min.y.round() as i32,
            max.x.round() as i32,
            max.y.round() as i32,
            color,
        );
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, width: f32) {
        let min = self.to_pixel(rect.min);
        let max = self.to_pixel(rect.max);
        let (min_x, min_y) = (min.x.round() as i32, min.y.round() as i32);
        let (max_x, max_y) = (max.x.round() as i32, max.y.round() as i32);
        let t = (width.round() as i32).max(1);
        self.fill_pixels(min_x, min_y, max_x, min_y + t, color);
        self.fill_pixels(min_x, max_y - t, max_x, max_y, color);
        self.fill_pixels(min_x, min_y + t, min_x + t, max_y - t, color);
        self.fill_pixels(max_x - t, min_y + t, max_x, max_y - t, color);
    }

    fn draw_text(&mut self, pos: Vec2, text: &str, color: Color) {
        let pos = self.to_pixel(pos);
        match self.text.font.take() {
            Some(font) => {
                self.draw_glyphs(&font, pos, text, color);
                self.text.font = Some(font);
            }
            None => {
                let metrics = self.text.metrics;
                let width = metrics.text_width(text);
                let inset = metrics.line_height * 0.25;
                let faded = Color::rgba(color.r, color.g, color.b, color.a / 2);
                self.fill_pixels(
                    pos.x.round() as i32,
                    (pos.y + inset).round() as i32,
                    (pos.x + width).round() as i32,
                    (pos.y + metrics.line_height - inset).round() as i32,
                    faded,
                );
            }
        }
    }

    fn draw_polyline(&mut self, points: &[Vec2], color: Color, width: f32) {
        let thickness = (width.round() as i32).max(1);
        for pair in points.windows(2) {
            let from = self.to_pixel(pair[0]);
            let to = self.to_pixel(pair[1]);
            self.draw_line(from, to, color, thickness);
        }
    }

    fn fill_polygon(&mut self, points: &[Vec2], color: Color) {
        let pixels: Vec<Vec2> = points.iter().map(|&p| self.to_pixel(p)).collect();
        let Some(bounds) = Rect::bounding(pixels.iter().copied()) else {
            return;
        };
        for y in bounds.min.y.floor() as i32..=bounds.max.y.ceil() as i32 {
            for x in bounds.min.x.floor() as i32..=bounds.max.x.ceil() as i32 {
                if point_in_polygon(Vec2::new(x as f32 + 0.5, y as f32 + 0.5), &pixels) {
                    self.blend_pixel(x, y, color, 255);
                }
            }
        }
    }
}

/// Even-odd rule.
fn point_in_polygon(point: Vec2, polygon: &[Vec2]) -> bool {
    let mut inside = false;
    let mut j = polygon.len().wrapping_sub(1);
    for i in 0..polygon.len() {
        let (a, b) = (polygon[i], polygon[j]);
        if (a.y > point.y) != (b.y > point.y) && point.x < (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

pub fn ensure_png_extension(path: &Path) -> PathBuf {
    if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension("png")
    }
}

/// Canvas covering `bounds` plus `margins` on every side.
///
/// An empty scene yields a margin-only canvas.
pub fn scene_canvas(
    bounds: Option<Rect>,
    margins: f32,
    background: Color,
    text: TextRaster,
) -> Result<RasterCanvas, ExportError> {
    let margins = margins.max(0.0);
    let content = bounds.unwrap_or(Rect::from_pos_size(Vec2::ZERO, Vec2::ZERO));
    let width = (content.width() + margins * 2.0).ceil() as u32;
    let height = (content.height() + margins * 2.0).ceil() as u32;
    if width == 0 || height == 0 || width > MAX_IMAGE_DIMENSION || height > MAX_IMAGE_DIMENSION {
        return Err(ExportError::InvalidSize { width, height });
    }
    let origin = content.min - Vec2::new(margins, margins);
    Ok(RasterCanvas::new(width, height, origin, background, text))
}

/// Write `canvas` to `path`; the format follows the extension.
pub fn write_image(canvas: RasterCanvas, path: &Path) -> Result<PathBuf, ExportError> {
    let path = ensure_png_extension(path);
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let image = canvas.into_image();
    image.save(&path)?;
    tracing::info!("Saved {}x{} image to {:?}", image.width(), image.height(), path);
    Ok(path)
}
