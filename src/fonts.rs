//! # Typeface Resolution & Text Rasterization
//!
//! Field configurations name typefaces ("Arial", bold or not); this module
//! resolves the name to a host TTF file and rasterizes text into an
//! anti-aliased coverage buffer. When no host font can be located the
//! built-in Spleen 12×24 bitmap face is scaled to the requested size
//! instead — typeface resolution never fails a render.

use ab_glyph::{Font, FontArc, ScaleFont};
use spleen_font::{PSF2Font, FONT_12X24};
use std::cell::RefCell;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// TTF file names per named family, normal and bold.
const FONT_FILES: &[(&str, [&str; 2])] = &[
    ("Arial", ["arial.ttf", "arialbd.ttf"]),
    ("Times New Roman", ["times.ttf", "timesbd.ttf"]),
    ("Calibri", ["calibri.ttf", "calibrib.ttf"]),
];

/// Native cell size of the builtin bitmap face.
const BUILTIN_CELL: (usize, usize) = (12, 24);

/// Directories probed for host TTF files, most specific first.
fn host_font_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(windir) = env::var("WINDIR") {
        dirs.push(Path::new(&windir).join("Fonts"));
    }
    dirs.push(PathBuf::from("/usr/share/fonts/truetype/msttcorefonts"));
    dirs.push(PathBuf::from("/usr/share/fonts/truetype"));
    dirs.push(PathBuf::from("/usr/share/fonts"));
    dirs.push(PathBuf::from("/Library/Fonts"));
    dirs
}

/// A concrete typeface chosen for a `(family, bold)` request.
#[derive(Clone)]
pub enum ResolvedFont {
    /// A host TTF, rendered anti-aliased.
    Ttf(FontArc),
    /// The embedded bitmap fallback face.
    Builtin,
}

/// Resolves named typefaces against the host, caching per `(family, bold)`.
pub struct FontCatalog {
    search_dirs: Vec<PathBuf>,
    cache: RefCell<HashMap<(String, bool), Option<FontArc>>>,
}

impl FontCatalog {
    /// Catalog probing the host's standard font directories.
    pub fn new() -> Self {
        Self::with_dirs(host_font_dirs())
    }

    /// Catalog probing only the given directories. An empty list forces the
    /// builtin fallback for every request (useful for deterministic tests).
    pub fn with_dirs(search_dirs: Vec<PathBuf>) -> Self {
        Self {
            search_dirs,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Resolve a named family. Unknown names use the Arial file mapping;
    /// a family whose file cannot be located falls back to the builtin face.
    pub fn resolve(&self, family: &str, bold: bool) -> ResolvedFont {
        let key = (family.to_string(), bold);
        if let Some(cached) = self.cache.borrow().get(&key) {
            return match cached {
                Some(font) => ResolvedFont::Ttf(font.clone()),
                None => ResolvedFont::Builtin,
            };
        }

        let loaded = self.load_ttf(family, bold);
        if loaded.is_none() {
            log::debug!("no host font for {family} (bold: {bold}), using builtin face");
        }
        self.cache.borrow_mut().insert(key, loaded.clone());
        match loaded {
            Some(font) => ResolvedFont::Ttf(font),
            None => ResolvedFont::Builtin,
        }
    }

    fn load_ttf(&self, family: &str, bold: bool) -> Option<FontArc> {
        let files = FONT_FILES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(family))
            .or_else(|| FONT_FILES.first())
            .map(|(_, files)| files)?;
        let file = files[usize::from(bold)];

        for dir in &self.search_dirs {
            let path = dir.join(file);
            if !path.exists() {
                continue;
            }
            match fs::read(&path) {
                Ok(bytes) => match FontArc::try_from_vec(bytes) {
                    Ok(font) => return Some(font),
                    Err(err) => {
                        log::warn!("unusable font file {}: {err}", path.display());
                    }
                },
                Err(err) => {
                    log::warn!("unreadable font file {}: {err}", path.display());
                }
            }
        }
        None
    }
}

impl Default for FontCatalog {
    fn default() -> Self {
        Self::new()
    }
}

/// Rasterized text as a grayscale coverage buffer.
///
/// Intensity values: 0.0 = transparent, 1.0 = full ink, with intermediate
/// values for anti-aliasing (TTF path only).
pub struct TextRaster {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

/// Rasterize a single line of text at the given pixel height.
pub fn raster_text(font: &ResolvedFont, text: &str, pixel_height: f32) -> TextRaster {
    match font {
        ResolvedFont::Ttf(font) => raster_ttf(font, text, pixel_height),
        ResolvedFont::Builtin => raster_builtin(text, pixel_height),
    }
}

fn raster_ttf(font: &FontArc, text: &str, pixel_height: f32) -> TextRaster {
    let scaled = font.as_scaled(pixel_height);

    // Layout: compute glyph positions
    let mut glyphs = Vec::new();
    let mut caret_x = 0.0f32;
    for ch in text.chars() {
        let glyph_id = font.glyph_id(ch);
        glyphs.push((glyph_id, caret_x));
        caret_x += scaled.h_advance(glyph_id);
    }

    let width = (caret_x.ceil() as usize).max(1);
    let ascent = scaled.ascent();
    let descent = scaled.descent();
    let height = ((ascent - descent).ceil() as usize).max(1);
    let baseline_y = ascent;

    let mut data = vec![0.0f32; width * height];

    for &(glyph_id, glyph_x) in &glyphs {
        let glyph =
            glyph_id.with_scale_and_position(pixel_height, ab_glyph::point(glyph_x, baseline_y));

        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|px, py, coverage| {
                let x = px as i32 + bounds.min.x as i32;
                let y = py as i32 + bounds.min.y as i32;
                if x >= 0 && x < width as i32 && y >= 0 && y < height as i32 {
                    let idx = y as usize * width + x as usize;
                    data[idx] = (data[idx] + coverage).min(1.0);
                }
            });
        }
    }

    TextRaster {
        width,
        height,
        data,
    }
}

fn raster_builtin(text: &str, pixel_height: f32) -> TextRaster {
    let (src_w, src_h) = BUILTIN_CELL;
    let cell_h = (pixel_height.round() as usize).max(1);
    let cell_w = ((pixel_height * src_w as f32 / src_h as f32).round() as usize).max(1);

    let chars: Vec<char> = text.chars().collect();
    let width = (cell_w * chars.len()).max(1);
    let height = cell_h;
    let mut data = vec![0.0f32; width * height];

    let mut spleen = PSF2Font::new(FONT_12X24).unwrap();
    for (i, ch) in chars.iter().enumerate() {
        let mut bitmap = vec![0u8; src_w * src_h];
        let utf8 = ch.to_string();
        if let Some(glyph) = spleen.glyph_for_utf8(utf8.as_bytes()) {
            for (row_y, row) in glyph.enumerate() {
                for (col_x, on) in row.enumerate() {
                    if row_y < src_h && col_x < src_w && on {
                        bitmap[row_y * src_w + col_x] = 1;
                    }
                }
            }
        } else {
            draw_box(&mut bitmap, src_w, src_h);
        }

        // Nearest-neighbor scale into the destination cell
        let x_off = i * cell_w;
        for dy in 0..cell_h {
            for dx in 0..cell_w {
                let sx = dx * src_w / cell_w;
                let sy = dy * src_h / cell_h;
                if bitmap[sy * src_w + sx] != 0 {
                    data[dy * width + x_off + dx] = 1.0;
                }
            }
        }
    }

    TextRaster {
        width,
        height,
        data,
    }
}

/// Box outline for characters missing from the builtin face.
fn draw_box(glyph: &mut [u8], width: usize, height: usize) {
    for x in 0..width {
        glyph[x] = 1;
        glyph[(height - 1) * width + x] = 1;
    }
    for y in 0..height {
        glyph[y * width] = 1;
        glyph[y * width + width - 1] = 1;
    }
}
