//! # Field Configuration Model
//!
//! A field is one placeable item on the card template: either a text value
//! taken from a dataset column, or an image (the signature). Configurations
//! come in two tiers: a global [`FieldConfig`] per field name, and per-record
//! [`FieldPatch`] overrides holding only the keys a record changes.
//!
//! Unknown keys encountered in persisted documents are kept in a residual
//! map so older/newer documents round-trip without data loss.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// Reserved field name for the signature image.
///
/// Every other field name corresponds to a dataset column.
pub const SIGNATURE_FIELD: &str = "signature_img";

/// Discriminates the two field flavors without carrying their payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Image,
}

/// Configuration for one field, tagged by `"type"` in the persisted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldConfig {
    Text(TextField),
    Image(ImageField),
}

/// A text field: a dataset column drawn at an anchor point.
///
/// The anchor `(x, y)` is the geometric center of the drawn text, in
/// template-pixel coordinates. Coordinates may be negative or exceed the
/// template bounds; the drawing simply falls off-canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextField {
    pub x: i32,
    pub y: i32,
    /// Point size at native template resolution. Always >= 1.
    pub size: u32,
    pub enable: bool,
    /// Named typeface (e.g. "Arial"), resolved by the font catalog.
    pub font: String,
    pub bold: bool,
    /// Force the value to uppercase before drawing.
    pub upper: bool,
    /// Named color (e.g. "Black"), resolved by the composer palette.
    pub color: String,
    /// Unrecognized keys from the persisted document.
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl Default for TextField {
    fn default() -> Self {
        Self {
            x: 50,
            y: 50,
            size: 30,
            enable: false,
            font: "Arial".to_string(),
            bold: false,
            upper: false,
            color: "Black".to_string(),
            extra: IndexMap::new(),
        }
    }
}

/// An image field (the signature): a raster asset pasted at an anchor point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageField {
    pub x: i32,
    pub y: i32,
    /// Box size at native template resolution. Always >= 1.
    pub w: u32,
    pub h: u32,
    pub enable: bool,
    /// Explicit asset override. Takes priority over folder lookup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Unrecognized keys from the persisted document.
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl Default for ImageField {
    fn default() -> Self {
        Self {
            x: 300,
            y: 300,
            w: 150,
            h: 80,
            enable: true,
            path: None,
            extra: IndexMap::new(),
        }
    }
}

impl FieldConfig {
    /// The default configuration a field receives when first encountered.
    ///
    /// The reserved signature field gets an image default; every dataset
    /// column gets the text default.
    pub fn default_for(name: &str) -> Self {
        if name == SIGNATURE_FIELD {
            Self::Image(ImageField::default())
        } else {
            Self::Text(TextField::default())
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Text(_) => FieldKind::Text,
            Self::Image(_) => FieldKind::Image,
        }
    }

    pub fn x(&self) -> i32 {
        match self {
            Self::Text(t) => t.x,
            Self::Image(i) => i.x,
        }
    }

    pub fn y(&self) -> i32 {
        match self {
            Self::Text(t) => t.y,
            Self::Image(i) => i.y,
        }
    }

    pub fn enabled(&self) -> bool {
        match self {
            Self::Text(t) => t.enable,
            Self::Image(i) => i.enable,
        }
    }

    /// Apply one property. Returns `false` if the property does not fit this
    /// field's variant (the update must be dropped by the caller).
    pub fn set(&mut self, prop: &FieldProp) -> bool {
        match (self, prop) {
            (Self::Text(t), FieldProp::X(v)) => t.x = *v,
            (Self::Text(t), FieldProp::Y(v)) => t.y = *v,
            (Self::Text(t), FieldProp::Size(v)) => t.size = *v,
            (Self::Text(t), FieldProp::Enable(v)) => t.enable = *v,
            (Self::Text(t), FieldProp::Font(v)) => t.font = v.clone(),
            (Self::Text(t), FieldProp::Bold(v)) => t.bold = *v,
            (Self::Text(t), FieldProp::Upper(v)) => t.upper = *v,
            (Self::Text(t), FieldProp::Color(v)) => t.color = v.clone(),
            (Self::Image(i), FieldProp::X(v)) => i.x = *v,
            (Self::Image(i), FieldProp::Y(v)) => i.y = *v,
            (Self::Image(i), FieldProp::W(v)) => i.w = *v,
            (Self::Image(i), FieldProp::H(v)) => i.h = *v,
            (Self::Image(i), FieldProp::Enable(v)) => i.enable = *v,
            (Self::Image(i), FieldProp::Path(v)) => i.path = Some(v.clone()),
            _ => return false,
        }
        true
    }
}

/// One typed property update, as issued by style controls or drag commits.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldProp {
    X(i32),
    Y(i32),
    Size(u32),
    Enable(bool),
    Font(String),
    Bold(bool),
    Upper(bool),
    Color(String),
    W(u32),
    H(u32),
    Path(PathBuf),
}

impl FieldProp {
    /// Whether the carried value is acceptable. Zero sizes and dimensions
    /// come from bad interactive input and must be dropped, not clamped.
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Size(v) | Self::W(v) | Self::H(v) => *v >= 1,
            _ => true,
        }
    }

    /// Whether the property applies to the given field variant.
    pub fn fits(&self, kind: FieldKind) -> bool {
        match self {
            Self::X(_) | Self::Y(_) | Self::Enable(_) => true,
            Self::Size(_) | Self::Font(_) | Self::Bold(_) | Self::Upper(_) | Self::Color(_) => {
                kind == FieldKind::Text
            }
            Self::W(_) | Self::H(_) | Self::Path(_) => kind == FieldKind::Image,
        }
    }
}

/// A partial override: only the keys a record changes, everything else `None`.
///
/// Patches are variant-agnostic on disk; applying one to a [`FieldConfig`]
/// only touches the keys its variant recognizes, and parks the rest in the
/// residual map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub w: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub h: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl FieldPatch {
    /// Snapshot every key of a configuration into a patch.
    ///
    /// Used to seed a per-record override from the global entry, so later
    /// global edits do not leak into a record that has been customized.
    pub fn from_config(config: &FieldConfig) -> Self {
        match config {
            FieldConfig::Text(t) => Self {
                x: Some(t.x),
                y: Some(t.y),
                size: Some(t.size),
                enable: Some(t.enable),
                font: Some(t.font.clone()),
                bold: Some(t.bold),
                upper: Some(t.upper),
                color: Some(t.color.clone()),
                extra: t.extra.clone(),
                ..Default::default()
            },
            FieldConfig::Image(i) => Self {
                x: Some(i.x),
                y: Some(i.y),
                w: Some(i.w),
                h: Some(i.h),
                enable: Some(i.enable),
                path: i.path.clone(),
                extra: i.extra.clone(),
                ..Default::default()
            },
        }
    }

    /// Record one property in the patch.
    pub fn set(&mut self, prop: &FieldProp) {
        match prop {
            FieldProp::X(v) => self.x = Some(*v),
            FieldProp::Y(v) => self.y = Some(*v),
            FieldProp::Size(v) => self.size = Some(*v),
            FieldProp::Enable(v) => self.enable = Some(*v),
            FieldProp::Font(v) => self.font = Some(v.clone()),
            FieldProp::Bold(v) => self.bold = Some(*v),
            FieldProp::Upper(v) => self.upper = Some(*v),
            FieldProp::Color(v) => self.color = Some(v.clone()),
            FieldProp::W(v) => self.w = Some(*v),
            FieldProp::H(v) => self.h = Some(*v),
            FieldProp::Path(v) => self.path = Some(v.clone()),
        }
    }

    /// Merge this patch key-by-key onto a configuration.
    ///
    /// Keys the target variant does not recognize land in its residual map.
    pub fn apply_to(&self, config: &mut FieldConfig) {
        match config {
            FieldConfig::Text(t) => {
                if let Some(v) = self.x {
                    t.x = v;
                }
                if let Some(v) = self.y {
                    t.y = v;
                }
                if let Some(v) = self.size {
                    t.size = v;
                }
                if let Some(v) = self.enable {
                    t.enable = v;
                }
                if let Some(v) = &self.font {
                    t.font = v.clone();
                }
                if let Some(v) = self.bold {
                    t.bold = v;
                }
                if let Some(v) = self.upper {
                    t.upper = v;
                }
                if let Some(v) = &self.color {
                    t.color = v.clone();
                }
                if let Some(v) = self.w {
                    t.extra.insert("w".to_string(), Value::from(v));
                }
                if let Some(v) = self.h {
                    t.extra.insert("h".to_string(), Value::from(v));
                }
                if let Some(v) = &self.path {
                    t.extra
                        .insert("path".to_string(), Value::from(v.display().to_string()));
                }
                for (k, val) in &self.extra {
                    t.extra.insert(k.clone(), val.clone());
                }
            }
            FieldConfig::Image(i) => {
                if let Some(v) = self.x {
                    i.x = v;
                }
                if let Some(v) = self.y {
                    i.y = v;
                }
                if let Some(v) = self.w {
                    i.w = v;
                }
                if let Some(v) = self.h {
                    i.h = v;
                }
                if let Some(v) = self.enable {
                    i.enable = v;
                }
                if let Some(v) = &self.path {
                    i.path = Some(v.clone());
                }
                if let Some(v) = self.size {
                    i.extra.insert("size".to_string(), Value::from(v));
                }
                if let Some(v) = &self.font {
                    i.extra.insert("font".to_string(), Value::from(v.clone()));
                }
                if let Some(v) = self.bold {
                    i.extra.insert("bold".to_string(), Value::from(v));
                }
                if let Some(v) = self.upper {
                    i.extra.insert("upper".to_string(), Value::from(v));
                }
                if let Some(v) = &self.color {
                    i.extra.insert("color".to_string(), Value::from(v.clone()));
                }
                for (k, val) in &self.extra {
                    i.extra.insert(k.clone(), val.clone());
                }
            }
        }
    }

    /// Build a full configuration for a field that has no global entry:
    /// the type-appropriate default with this patch applied on top.
    pub fn materialize(&self, name: &str) -> FieldConfig {
        let mut config = FieldConfig::default_for(name);
        self.apply_to(&mut config);
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_default_matches_first_encounter_values() {
        let cfg = FieldConfig::default_for("name");
        let FieldConfig::Text(t) = cfg else {
            panic!("dataset column should default to a text field");
        };
        assert_eq!(t.x, 50);
        assert_eq!(t.y, 50);
        assert_eq!(t.size, 30);
        assert!(!t.enable);
        assert_eq!(t.font, "Arial");
        assert_eq!(t.color, "Black");
    }

    #[test]
    fn test_signature_defaults_to_enabled_image() {
        let cfg = FieldConfig::default_for(SIGNATURE_FIELD);
        let FieldConfig::Image(i) = cfg else {
            panic!("signature field should default to an image field");
        };
        assert_eq!((i.x, i.y), (300, 300));
        assert_eq!((i.w, i.h), (150, 80));
        assert!(i.enable);
        assert!(i.path.is_none());
    }

    #[test]
    fn test_patch_applies_only_overridden_keys() {
        let mut cfg = FieldConfig::default_for("name");
        let patch = FieldPatch {
            x: Some(120),
            bold: Some(true),
            ..Default::default()
        };
        patch.apply_to(&mut cfg);
        let FieldConfig::Text(t) = cfg else {
            unreachable!()
        };
        assert_eq!(t.x, 120);
        assert!(t.bold);
        // Untouched keys keep their values
        assert_eq!(t.y, 50);
        assert_eq!(t.size, 30);
    }

    #[test]
    fn test_snapshot_round_trips_through_apply() {
        let mut original = FieldConfig::default_for("name");
        original.set(&FieldProp::X(77));
        original.set(&FieldProp::Color("Red".to_string()));

        let patch = FieldPatch::from_config(&original);
        let mut rebuilt = FieldConfig::default_for("name");
        patch.apply_to(&mut rebuilt);
        assert_eq!(rebuilt, original);
    }

    #[test]
    fn test_mismatched_prop_is_refused() {
        let mut text = FieldConfig::default_for("name");
        assert!(!text.set(&FieldProp::W(90)));
        let mut image = FieldConfig::default_for(SIGNATURE_FIELD);
        assert!(!image.set(&FieldProp::Font("Calibri".to_string())));
        // Shared geometry props fit both variants
        assert!(text.set(&FieldProp::X(-10)));
        assert!(image.set(&FieldProp::X(-10)));
    }

    #[test]
    fn test_zero_dimensions_are_invalid() {
        assert!(!FieldProp::Size(0).is_valid());
        assert!(!FieldProp::W(0).is_valid());
        assert!(!FieldProp::H(0).is_valid());
        assert!(FieldProp::Size(1).is_valid());
        assert!(FieldProp::X(-500).is_valid());
    }

    #[test]
    fn test_unknown_keys_survive_round_trip() {
        let json = r#"{"type":"text","x":10,"y":20,"glow":true}"#;
        let cfg: FieldConfig = serde_json::from_str(json).unwrap();
        let FieldConfig::Text(ref t) = cfg else {
            unreachable!()
        };
        assert_eq!(t.extra.get("glow"), Some(&Value::Bool(true)));
        let back = serde_json::to_string(&cfg).unwrap();
        assert!(back.contains("\"glow\":true"));
    }

    #[test]
    fn test_materialize_unknown_field_over_default() {
        let patch = FieldPatch {
            enable: Some(true),
            size: Some(48),
            ..Default::default()
        };
        let FieldConfig::Text(t) = patch.materialize("note") else {
            unreachable!()
        };
        assert!(t.enable);
        assert_eq!(t.size, 48);
        assert_eq!(t.x, 50);
    }
}
