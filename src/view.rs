//! # Preview Coordinate Transform
//!
//! Maps between template-pixel space and the zoomed/panned preview surface.
//! The template is always fit-to-view with a 5% margin and centered; the
//! operator zoom multiplies on top of the fit scale.

/// Lower zoom bound (10%).
pub const ZOOM_MIN: f32 = 0.1;
/// Upper zoom bound (500%).
pub const ZOOM_MAX: f32 = 5.0;
/// Each zoom step multiplies or divides by this factor.
pub const ZOOM_STEP: f32 = 1.1;

/// Margin factor so the template never touches the surface edge.
const FIT_MARGIN: f32 = 0.95;

/// Surfaces narrower than this have not been laid out yet.
const MIN_SURFACE_WIDTH: u32 = 50;
/// Substitute surface size for unlaid-out surfaces.
const FALLBACK_SURFACE: (u32, u32) = (800, 600);

/// User zoom multiplier, clamped to `[ZOOM_MIN, ZOOM_MAX]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Zoom(f32);

impl Zoom {
    pub fn new(value: f32) -> Self {
        Self(value.clamp(ZOOM_MIN, ZOOM_MAX))
    }

    pub fn get(self) -> f32 {
        self.0
    }

    /// One wheel step in (+10%).
    pub fn step_in(self) -> Self {
        Self::new(self.0 * ZOOM_STEP)
    }

    /// One wheel step out (-10%).
    pub fn step_out(self) -> Self {
        Self::new(self.0 / ZOOM_STEP)
    }
}

impl Default for Zoom {
    fn default() -> Self {
        Self(1.0)
    }
}

/// The surface size actually used for layout: a fixed fallback when the
/// surface has not been laid out yet (avoids near-zero division).
pub fn effective_surface(surface: (u32, u32)) -> (u32, u32) {
    if surface.0 < MIN_SURFACE_WIDTH {
        FALLBACK_SURFACE
    } else {
        surface
    }
}

/// A computed template↔surface mapping for one preview render.
#[derive(Debug, Clone, Copy)]
pub struct ViewTransform {
    /// Combined fit-to-view and zoom scale.
    pub scale: f32,
    /// Surface x of the template's left edge.
    pub origin_x: f32,
    /// Surface y of the template's top edge.
    pub origin_y: f32,
}

impl ViewTransform {
    /// Fit a template of native size `(iw, ih)` into a surface of size
    /// `(cw, ch)` under the given zoom, centered.
    pub fn fit(template: (u32, u32), surface: (u32, u32), zoom: Zoom) -> Self {
        let (iw, ih) = (template.0.max(1) as f32, template.1.max(1) as f32);
        let (cw, ch) = effective_surface(surface);
        let (cw, ch) = (cw as f32, ch as f32);

        let base = (cw / iw).min(ch / ih) * FIT_MARGIN;
        let scale = base * zoom.get();

        Self {
            scale,
            origin_x: cw / 2.0 - (iw * scale) / 2.0,
            origin_y: ch / 2.0 - (ih * scale) / 2.0,
        }
    }

    /// Template point to surface point.
    pub fn to_surface(&self, point: (i32, i32)) -> (f32, f32) {
        (
            self.origin_x + point.0 as f32 * self.scale,
            self.origin_y + point.1 as f32 * self.scale,
        )
    }

    /// Surface point back to template pixels, truncated to integers.
    pub fn to_template(&self, point: (f32, f32)) -> (i32, i32) {
        (
            ((point.0 - self.origin_x) / self.scale) as i32,
            ((point.1 - self.origin_y) / self.scale) as i32,
        )
    }

    /// Scale a template-space length to surface space.
    pub fn scale_len(&self, len: f32) -> f32 {
        len * self.scale
    }

    /// Template size after scaling, at least 1x1.
    pub fn scaled_size(&self, template: (u32, u32)) -> (u32, u32) {
        (
            ((template.0 as f32 * self.scale) as u32).max(1),
            ((template.1 as f32 * self.scale) as u32).max(1),
        )
    }
}
