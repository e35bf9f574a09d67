//! # Signature Resolver
//!
//! Determines which image asset backs the signature field for a record.
//! Priority: an explicit per-record path override, then a probe of the
//! configured signature folder by constructed file name, else nothing —
//! a missing signature is a normal outcome, not an error.

use crate::dataset::{find_column, DataTable};
use image::RgbaImage;
use std::path::{Path, PathBuf};

/// Probed extensions, in priority order.
pub const SIGNATURE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Default header aliases for the identity-document number column.
const DEFAULT_ID_ALIASES: &[&str] = &["CCCD", "CMND"];

/// Locates and loads signature assets for records.
#[derive(Debug, Clone, Default)]
pub struct SignatureResolver {
    folder: Option<PathBuf>,
    id_aliases: Vec<String>,
}

impl SignatureResolver {
    /// Resolver probing the given folder (or none).
    pub fn new(folder: Option<PathBuf>) -> Self {
        Self {
            folder,
            id_aliases: DEFAULT_ID_ALIASES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Replace the identity-column header aliases.
    pub fn with_id_aliases<I, A>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.id_aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    /// Locate the asset path for a record, without loading it.
    ///
    /// 1. An explicit override that exists on disk wins.
    /// 2. Otherwise the folder is probed: the record's trimmed id number
    ///    (if any), then its 1-based position, across the known extensions.
    /// 3. Otherwise `None`.
    pub fn locate(
        &self,
        idx: usize,
        table: &dyn DataTable,
        override_path: Option<&Path>,
    ) -> Option<PathBuf> {
        if let Some(path) = override_path {
            if path.exists() {
                return Some(path.to_path_buf());
            }
        }

        let folder = self.folder.as_ref()?;
        let aliases: Vec<&str> = self.id_aliases.iter().map(String::as_str).collect();
        let id_number = find_column(table, &aliases)
            .map(|column| table.value(idx, column).trim().to_string())
            .unwrap_or_default();

        let position = (idx + 1).to_string();
        let mut stems = Vec::new();
        if !id_number.is_empty() {
            stems.push(id_number);
        }
        stems.push(position);

        for stem in &stems {
            for ext in SIGNATURE_EXTENSIONS {
                let candidate = folder.join(format!("{stem}.{ext}"));
                if candidate.exists() {
                    return Some(candidate);
                }
            }
        }
        None
    }

    /// Locate and load the asset as RGBA (alpha preserved for transparent
    /// signature cut-outs). Returns `None` for missing or undecodable
    /// assets; the composer substitutes a placeholder.
    pub fn resolve(
        &self,
        idx: usize,
        table: &dyn DataTable,
        override_path: Option<&Path>,
    ) -> Option<RgbaImage> {
        let path = self.locate(idx, table, override_path)?;
        match image::open(&path) {
            Ok(img) => Some(img.to_rgba8()),
            Err(err) => {
                log::warn!("undecodable signature asset {}: {err}", path.display());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::MemoryTable;
    use image::Rgba;

    fn save_probe(dir: &Path, name: &str, color: [u8; 4]) -> PathBuf {
        let path = dir.join(name);
        let img = RgbaImage::from_pixel(4, 4, Rgba(color));
        if path.extension().is_some_and(|ext| ext == "jpg") {
            // JPEG has no alpha channel; the encoder rejects RGBA input.
            image::DynamicImage::ImageRgba8(img).to_rgb8().save(&path).unwrap();
        } else {
            img.save(&path).unwrap();
        }
        path
    }

    fn table() -> MemoryTable {
        MemoryTable::new(
            ["Name", "Số CCCD"],
            vec![vec!["An", "0123"], vec!["Binh", "  "], vec!["Chi", "777"]],
        )
    }

    #[test]
    fn test_override_path_wins_over_folder() {
        let dir = tempfile::tempdir().unwrap();
        let override_file = save_probe(dir.path(), "manual.png", [0, 0, 255, 255]);
        save_probe(dir.path(), "0123.png", [255, 0, 0, 255]);

        let resolver = SignatureResolver::new(Some(dir.path().to_path_buf()));
        let located = resolver
            .locate(0, &table(), Some(override_file.as_path()))
            .unwrap();
        assert_eq!(located, override_file);
    }

    #[test]
    fn test_dangling_override_falls_through_to_folder() {
        let dir = tempfile::tempdir().unwrap();
        let asset = save_probe(dir.path(), "0123.png", [255, 0, 0, 255]);

        let resolver = SignatureResolver::new(Some(dir.path().to_path_buf()));
        let missing = dir.path().join("gone.png");
        let located = resolver
            .locate(0, &table(), Some(missing.as_path()))
            .unwrap();
        assert_eq!(located, asset);
    }

    #[test]
    fn test_id_number_probed_before_position() {
        let dir = tempfile::tempdir().unwrap();
        let by_id = save_probe(dir.path(), "777.png", [1, 2, 3, 255]);
        save_probe(dir.path(), "3.png", [9, 9, 9, 255]);

        let resolver = SignatureResolver::new(Some(dir.path().to_path_buf()));
        assert_eq!(resolver.locate(2, &table(), None).unwrap(), by_id);
    }

    #[test]
    fn test_blank_id_uses_one_based_position() {
        let dir = tempfile::tempdir().unwrap();
        let by_position = save_probe(dir.path(), "2.jpg", [5, 5, 5, 255]);

        let resolver = SignatureResolver::new(Some(dir.path().to_path_buf()));
        // Record 1 has a whitespace-only id number
        assert_eq!(resolver.locate(1, &table(), None).unwrap(), by_position);
    }

    #[test]
    fn test_extension_priority() {
        let dir = tempfile::tempdir().unwrap();
        save_probe(dir.path(), "0123.jpg", [1, 1, 1, 255]);
        let png = save_probe(dir.path(), "0123.png", [2, 2, 2, 255]);

        let resolver = SignatureResolver::new(Some(dir.path().to_path_buf()));
        assert_eq!(resolver.locate(0, &table(), None).unwrap(), png);
    }

    #[test]
    fn test_no_folder_no_override_is_none() {
        let resolver = SignatureResolver::new(None);
        assert!(resolver.locate(0, &table(), None).is_none());
        assert!(resolver.resolve(0, &table(), None).is_none());
    }

    #[test]
    fn test_resolve_loads_rgba() {
        let dir = tempfile::tempdir().unwrap();
        save_probe(dir.path(), "1.png", [10, 20, 30, 128]);

        let resolver = SignatureResolver::new(Some(dir.path().to_path_buf()));
        let table = MemoryTable::new(["Name"], vec![vec!["An"]]);
        let img = resolver.resolve(0, &table, None).unwrap();
        assert_eq!(img.get_pixel(0, 0), &Rgba([10, 20, 30, 128]));
    }
}
