//! # Composition Engine
//!
//! Draws a record's enabled fields onto the template to produce one
//! finished image. Two invocation contexts share the algorithm:
//!
//! - **final**: native template geometry, used for batch output. Missing
//!   signature assets are simply omitted.
//! - **preview**: geometry pre-scaled through the [`ViewTransform`], drawn
//!   onto a surface-sized canvas with the template centered. Missing
//!   signatures get a dashed placeholder box, and fields overridden for the
//!   current record (individual edit mode) are highlighted red.
//!
//! Fields draw in declared order; later entries draw on top. Rendering
//! reads the resolved configuration only and re-fetches the signature
//! asset on every call.

use crate::dataset::{normalize_value, DataTable};
use crate::field::FieldConfig;
use crate::fonts::{raster_text, FontCatalog, ResolvedFont, TextRaster};
use crate::signature::SignatureResolver;
use crate::store::ResolvedConfig;
use crate::view::{effective_surface, ViewTransform};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use std::collections::HashSet;

/// Preview surface background (the area around the template).
const SURFACE_BG: Rgba<u8> = Rgba([149, 165, 166, 255]);

/// Highlight for fields overridden on the current record.
const OVERRIDE_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// Affordance outline around a placed signature in preview.
const AFFORDANCE_COLOR: Rgba<u8> = Rgba([0, 0, 255, 255]);

/// Marker text for the missing-signature placeholder.
const MISSING_MARKER: &str = "MISSING IMAGE";
const MISSING_MARKER_PX: f32 = 12.0;

/// Map a named field color to a pixel. Unknown names draw black.
pub fn color_by_name(name: &str) -> Rgba<u8> {
    match name.to_lowercase().as_str() {
        "red" => Rgba([255, 0, 0, 255]),
        "blue" => Rgba([0, 0, 255, 255]),
        "green" => Rgba([0, 128, 0, 255]),
        "white" => Rgba([255, 255, 255, 255]),
        "grey" | "gray" => Rgba([128, 128, 128, 255]),
        _ => Rgba([0, 0, 0, 255]),
    }
}

/// An axis-aligned rectangle in surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn centered(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self {
            x: cx - w / 2.0,
            y: cy - h / 2.0,
            w,
            h,
        }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px < self.x + self.w && py >= self.y && py < self.y + self.h
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.x += dx;
        self.y += dy;
    }
}

/// The on-surface extent of one drawn field, for hit-testing drags.
#[derive(Debug, Clone)]
pub struct RenderedField {
    pub name: String,
    pub rect: Rect,
}

/// Composes finished images from a template, a record, and its resolved
/// field configuration.
pub struct Composer<'a> {
    template: &'a RgbaImage,
    fonts: &'a FontCatalog,
    signatures: &'a SignatureResolver,
}

impl<'a> Composer<'a> {
    pub fn new(
        template: &'a RgbaImage,
        fonts: &'a FontCatalog,
        signatures: &'a SignatureResolver,
    ) -> Self {
        Self {
            template,
            fonts,
            signatures,
        }
    }

    /// Render one record at native template resolution.
    pub fn render_final(
        &self,
        table: &dyn DataTable,
        idx: usize,
        config: &ResolvedConfig,
    ) -> RgbaImage {
        let mut out = self.template.clone();

        for (name, field) in config {
            if !field.enabled() {
                continue;
            }
            match field {
                FieldConfig::Image(cfg) => {
                    let asset = self.signatures.resolve(idx, table, cfg.path.as_deref());
                    // Missing assets are omitted from final output
                    if let Some(asset) = asset {
                        let resized =
                            imageops::resize(&asset, cfg.w, cfg.h, FilterType::Lanczos3);
                        let left = cfg.x as i64 - (cfg.w / 2) as i64;
                        let top = cfg.y as i64 - (cfg.h / 2) as i64;
                        imageops::overlay(&mut out, &resized, left, top);
                    }
                }
                FieldConfig::Text(cfg) => {
                    let value = field_value(table, idx, name, cfg.upper);
                    if value.is_empty() {
                        continue;
                    }
                    let font = self.fonts.resolve(&cfg.font, cfg.bold);
                    draw_text_centered(
                        &mut out,
                        &font,
                        &value,
                        cfg.size as f32,
                        cfg.x as f32,
                        cfg.y as f32,
                        color_by_name(&cfg.color),
                    );
                }
            }
        }

        out
    }

    /// Render the interactive preview for one record.
    ///
    /// `overridden` holds the field names customized for this record when
    /// individual edit mode is active (empty set under global mode).
    /// Returns the surface image and the drawn extent of every enabled
    /// field, in draw order, for pointer hit-testing.
    pub fn render_preview(
        &self,
        table: &dyn DataTable,
        idx: usize,
        config: &ResolvedConfig,
        transform: &ViewTransform,
        surface: (u32, u32),
        overridden: &HashSet<String>,
    ) -> (RgbaImage, Vec<RenderedField>) {
        let (cw, ch) = effective_surface(surface);
        let mut out = RgbaImage::from_pixel(cw, ch, SURFACE_BG);

        let (nw, nh) = transform.scaled_size(self.template.dimensions());
        let scaled = imageops::resize(self.template, nw, nh, FilterType::Lanczos3);
        imageops::overlay(
            &mut out,
            &scaled,
            transform.origin_x.round() as i64,
            transform.origin_y.round() as i64,
        );

        let mut extents = Vec::new();
        for (name, field) in config {
            if !field.enabled() {
                continue;
            }
            let (sx, sy) = transform.to_surface((field.x(), field.y()));
            let rect = match field {
                FieldConfig::Image(cfg) => {
                    let w = (transform.scale_len(cfg.w as f32).round() as u32).max(1);
                    let h = (transform.scale_len(cfg.h as f32).round() as u32).max(1);
                    let rect = Rect::centered(sx, sy, w as f32, h as f32);

                    match self.signatures.resolve(idx, table, cfg.path.as_deref()) {
                        Some(asset) => {
                            let resized = imageops::resize(&asset, w, h, FilterType::Lanczos3);
                            imageops::overlay(
                                &mut out,
                                &resized,
                                rect.x.round() as i64,
                                rect.y.round() as i64,
                            );
                            draw_dashed_rect(&mut out, rect, AFFORDANCE_COLOR, 1, 2, 4);
                        }
                        None => {
                            // Placeholder: the final render would skip this
                            // field, but the operator still needs the box.
                            draw_dashed_rect(&mut out, rect, OVERRIDE_COLOR, 2, 5, 2);
                            draw_text_centered(
                                &mut out,
                                &ResolvedFont::Builtin,
                                MISSING_MARKER,
                                MISSING_MARKER_PX,
                                sx,
                                sy,
                                OVERRIDE_COLOR,
                            );
                        }
                    }
                    rect
                }
                FieldConfig::Text(cfg) => {
                    let value = field_value(table, idx, name, cfg.upper);
                    let px = transform.scale_len(cfg.size as f32).max(1.0);
                    let color = if overridden.contains(name) {
                        OVERRIDE_COLOR
                    } else {
                        color_by_name(&cfg.color)
                    };
                    let font = self.fonts.resolve(&cfg.font, cfg.bold);
                    draw_text_centered(&mut out, &font, &value, px, sx, sy, color)
                }
            };
            extents.push(RenderedField {
                name: name.clone(),
                rect,
            });
        }

        (out, extents)
    }
}

/// Read, normalize, and case-transform a record's value for a text field.
fn field_value(table: &dyn DataTable, idx: usize, column: &str, upper: bool) -> String {
    let value = normalize_value(&table.value(idx, column));
    if upper {
        value.to_uppercase()
    } else {
        value
    }
}

/// Draw text centered (both axes) at `(cx, cy)`. Returns the drawn extent.
fn draw_text_centered(
    img: &mut RgbaImage,
    font: &ResolvedFont,
    text: &str,
    pixel_height: f32,
    cx: f32,
    cy: f32,
    color: Rgba<u8>,
) -> Rect {
    let raster = raster_text(font, text, pixel_height);
    let rect = Rect::centered(cx, cy, raster.width as f32, raster.height as f32);
    if !text.is_empty() {
        blend_raster(img, &raster, rect.x.round() as i64, rect.y.round() as i64, color);
    }
    rect
}

/// Alpha-blend a coverage buffer onto the image, clipping at the edges.
fn blend_raster(img: &mut RgbaImage, raster: &TextRaster, left: i64, top: i64, color: Rgba<u8>) {
    let (iw, ih) = img.dimensions();
    for ry in 0..raster.height {
        let y = top + ry as i64;
        if y < 0 || y >= ih as i64 {
            continue;
        }
        for rx in 0..raster.width {
            let coverage = raster.data[ry * raster.width + rx];
            if coverage <= 0.0 {
                continue;
            }
            let x = left + rx as i64;
            if x < 0 || x >= iw as i64 {
                continue;
            }
            let dst = img.get_pixel_mut(x as u32, y as u32);
            for c in 0..3 {
                let base = dst.0[c] as f32;
                let ink = color.0[c] as f32;
                dst.0[c] = (base + (ink - base) * coverage).round() as u8;
            }
            dst.0[3] = 255;
        }
    }
}

/// Dashed rectangle outline with the given stroke thickness and dash pattern.
fn draw_dashed_rect(img: &mut RgbaImage, rect: Rect, color: Rgba<u8>, thickness: u32, on: u32, off: u32) {
    let x0 = rect.x.round() as i64;
    let y0 = rect.y.round() as i64;
    let x1 = (rect.x + rect.w).round() as i64;
    let y1 = (rect.y + rect.h).round() as i64;
    let period = (on + off) as i64;

    for t in 0..thickness as i64 {
        // Horizontal edges
        for x in x0..=x1 {
            if (x - x0) % period < on as i64 {
                put_pixel_checked(img, x, y0 + t, color);
                put_pixel_checked(img, x, y1 - t, color);
            }
        }
        // Vertical edges
        for y in y0..=y1 {
            if (y - y0) % period < on as i64 {
                put_pixel_checked(img, x0 + t, y, color);
                put_pixel_checked(img, x1 - t, y, color);
            }
        }
    }
}

fn put_pixel_checked(img: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>) {
    let (w, h) = img.dimensions();
    if x >= 0 && y >= 0 && x < w as i64 && y < h as i64 {
        img.put_pixel(x as u32, y as u32, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::MemoryTable;
    use crate::field::{FieldProp, SIGNATURE_FIELD};
    use crate::store::{ConfigStore, EditMode, MemorySink};
    use crate::view::Zoom;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    fn white_template(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, WHITE)
    }

    fn builtin_fonts() -> FontCatalog {
        FontCatalog::with_dirs(Vec::new())
    }

    fn store_with_text_field(
        name: &str,
        x: i32,
        y: i32,
        size: u32,
    ) -> ConfigStore<MemorySink> {
        let (mut store, _) = ConfigStore::open(MemorySink::new());
        store.ensure_fields([name]).unwrap();
        store
            .update(name, FieldProp::Enable(true), EditMode::Global, 0)
            .unwrap();
        store
            .update(name, FieldProp::X(x), EditMode::Global, 0)
            .unwrap();
        store
            .update(name, FieldProp::Y(y), EditMode::Global, 0)
            .unwrap();
        store
            .update(name, FieldProp::Size(size), EditMode::Global, 0)
            .unwrap();
        // Signature off for text-only scenarios
        store
            .update(SIGNATURE_FIELD, FieldProp::Enable(false), EditMode::Global, 0)
            .unwrap();
        store
    }

    /// Bounding box of non-white pixels.
    fn ink_bbox(img: &RgbaImage) -> Option<(u32, u32, u32, u32)> {
        let mut bbox: Option<(u32, u32, u32, u32)> = None;
        for (x, y, p) in img.enumerate_pixels() {
            if p != &WHITE && p != &SURFACE_BG {
                bbox = Some(match bbox {
                    None => (x, y, x, y),
                    Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
                });
            }
        }
        bbox
    }

    #[test]
    fn test_final_render_centers_text_at_anchor() {
        let template = white_template(800, 600);
        let fonts = builtin_fonts();
        let signatures = SignatureResolver::new(None);
        let composer = Composer::new(&template, &fonts, &signatures);

        let store = store_with_text_field("name", 100, 100, 20);
        let table = MemoryTable::new(["name"], vec![vec!["An"]]);
        let out = composer.render_final(&table, 0, &store.resolve(0));

        let (x0, y0, x1, y1) = ink_bbox(&out).expect("text should be drawn");
        let cx = (x0 + x1) as f32 / 2.0;
        let cy = (y0 + y1) as f32 / 2.0;
        assert!((cx - 100.0).abs() <= 2.0, "center x was {cx}");
        assert!((cy - 100.0).abs() <= 3.0, "center y was {cy}");
    }

    #[test]
    fn test_disabled_fields_are_not_drawn() {
        let template = white_template(200, 200);
        let fonts = builtin_fonts();
        let signatures = SignatureResolver::new(None);
        let composer = Composer::new(&template, &fonts, &signatures);

        let (mut store, _) = ConfigStore::open(MemorySink::new());
        store.ensure_fields(["name"]).unwrap();
        store
            .update(SIGNATURE_FIELD, FieldProp::Enable(false), EditMode::Global, 0)
            .unwrap();
        let table = MemoryTable::new(["name"], vec![vec!["An"]]);

        let out = composer.render_final(&table, 0, &store.resolve(0));
        assert!(ink_bbox(&out).is_none());
    }

    #[test]
    fn test_missing_signature_skipped_in_final_but_placeholder_in_preview() {
        let template = white_template(800, 600);
        let fonts = builtin_fonts();
        let signatures = SignatureResolver::new(None);
        let composer = Composer::new(&template, &fonts, &signatures);

        let (store, _) = ConfigStore::open(MemorySink::new());
        let table = MemoryTable::new(["name"], vec![vec!["An"]]);
        let config = store.resolve(0);

        // Final: signature enabled by default but asset missing -> untouched
        let final_out = composer.render_final(&table, 0, &config);
        assert!(ink_bbox(&final_out).is_none());

        // Preview: dashed placeholder box is drawn
        let transform = ViewTransform::fit((800, 600), (800, 600), Zoom::default());
        let (preview, extents) =
            composer.render_preview(&table, 0, &config, &transform, (800, 600), &HashSet::new());
        assert_eq!(extents.len(), 1);
        assert_eq!(extents[0].name, SIGNATURE_FIELD);

        let rect = extents[0].rect;
        let edge = preview.get_pixel(rect.x.round() as u32, rect.y.round() as u32);
        assert_eq!(edge, &OVERRIDE_COLOR, "placeholder outline should start red");
    }

    #[test]
    fn test_signature_pasted_with_alpha_mask() {
        let dir = tempfile::tempdir().unwrap();
        // Top half opaque green, bottom half fully transparent
        let mut asset = RgbaImage::from_pixel(10, 10, Rgba([0, 200, 0, 255]));
        for y in 5..10 {
            for x in 0..10 {
                asset.put_pixel(x, y, Rgba([0, 200, 0, 0]));
            }
        }
        asset.save(dir.path().join("1.png")).unwrap();

        let template = white_template(800, 600);
        let fonts = builtin_fonts();
        let signatures = SignatureResolver::new(Some(dir.path().to_path_buf()));
        let composer = Composer::new(&template, &fonts, &signatures);

        let (mut store, _) = ConfigStore::open(MemorySink::new());
        store
            .update(SIGNATURE_FIELD, FieldProp::W(100), EditMode::Global, 0)
            .unwrap();
        store
            .update(SIGNATURE_FIELD, FieldProp::H(100), EditMode::Global, 0)
            .unwrap();
        let table = MemoryTable::new(["name"], vec![vec!["An"]]);

        let out = composer.render_final(&table, 0, &store.resolve(0));
        // Anchor (300,300), box 100x100: opaque half covers rows 250..300
        let pasted = out.get_pixel(300, 260);
        assert!(
            pasted.0[1] > 150 && pasted.0[0] < 100,
            "opaque half should show the asset, got {pasted:?}"
        );
        // Transparent half leaves the template visible
        assert_eq!(out.get_pixel(300, 340), &WHITE);
    }

    #[test]
    fn test_preview_highlights_overridden_field_red() {
        let template = white_template(800, 600);
        let fonts = builtin_fonts();
        let signatures = SignatureResolver::new(None);
        let composer = Composer::new(&template, &fonts, &signatures);

        let store = store_with_text_field("name", 400, 300, 40);
        let table = MemoryTable::new(["name"], vec![vec!["An"]]);
        let transform = ViewTransform::fit((800, 600), (800, 600), Zoom::default());

        let overridden: HashSet<String> = ["name".to_string()].into();
        let (out, _) = composer.render_preview(
            &table,
            0,
            &store.resolve(0),
            &transform,
            (800, 600),
            &overridden,
        );
        let has_red = out
            .pixels()
            .any(|p| p.0[0] > 200 && p.0[1] < 50 && p.0[2] < 50);
        assert!(has_red, "overridden field should draw red");
    }

    #[test]
    fn test_upper_transform_applies() {
        let table = MemoryTable::new(["name"], vec![vec!["an bé"]]);
        assert_eq!(field_value(&table, 0, "name", true), "AN BÉ");
        assert_eq!(field_value(&table, 0, "name", false), "an bé");
    }

    #[test]
    fn test_preview_extents_follow_transform() {
        let template = white_template(800, 600);
        let fonts = builtin_fonts();
        let signatures = SignatureResolver::new(None);
        let composer = Composer::new(&template, &fonts, &signatures);

        let store = store_with_text_field("name", 100, 100, 20);
        let table = MemoryTable::new(["name"], vec![vec!["An"]]);
        let transform = ViewTransform::fit((800, 600), (800, 600), Zoom::new(2.0));

        let (_, extents) = composer.render_preview(
            &table,
            0,
            &store.resolve(0),
            &transform,
            (800, 600),
            &HashSet::new(),
        );
        let (cx, cy) = extents[0].rect.center();
        let (ex, ey) = transform.to_surface((100, 100));
        assert!((cx - ex).abs() <= 1.0);
        assert!((cy - ey).abs() <= 1.0);
    }

    #[test]
    fn test_unknown_color_draws_black() {
        assert_eq!(color_by_name("Chartreuse"), Rgba([0, 0, 0, 255]));
        assert_eq!(color_by_name("Red"), Rgba([255, 0, 0, 255]));
    }
}
