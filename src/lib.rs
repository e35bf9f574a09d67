//! # Placard - Template Card Composition Library
//!
//! Placard composes personalized cards by drawing data-driven fields onto a
//! template image. It provides:
//!
//! - **Field configuration**: global defaults with per-record overrides,
//!   persisted as JSON and autosaved on every mutation
//! - **Composition**: text and signature-image fields drawn in declared
//!   order, at native resolution or through a zoomable preview transform
//! - **Signature resolution**: per-record asset lookup by explicit path or
//!   folder probe
//! - **Batch output**: sequential paced hand-off of finished images to a
//!   print spooler
//!
//! ## Quick Start
//!
//! ```no_run
//! use placard::{
//!     batch::{run_batch, BatchOptions, DirectorySpooler},
//!     compose::Composer,
//!     dataset::MemoryTable,
//!     fonts::FontCatalog,
//!     signature::SignatureResolver,
//!     store::{ConfigStore, FileSink},
//! };
//! use placard::PlacardError;
//! use std::sync::atomic::AtomicBool;
//!
//! // Open (or create) the field configuration
//! let (store, _) = ConfigStore::open(FileSink::new("print_config.json"));
//!
//! // Load the template and the records
//! let template = image::open("template.png")
//!     .map_err(|e| PlacardError::Image(e.to_string()))?
//!     .to_rgba8();
//! let table = MemoryTable::from_json_file("records.json")?;
//!
//! // Compose and spool one image per record
//! let fonts = FontCatalog::new();
//! let signatures = SignatureResolver::new(Some("signatures".into()));
//! let composer = Composer::new(&template, &fonts, &signatures);
//! let mut spooler = DirectorySpooler::new("out")?;
//! let report = run_batch(
//!     &composer,
//!     &store,
//!     &table,
//!     &[0, 1, 2],
//!     &mut spooler,
//!     &BatchOptions::default(),
//!     &AtomicBool::new(false),
//! );
//! println!("{} submitted, {} failed", report.submitted.len(), report.failed.len());
//!
//! # Ok::<(), placard::error::PlacardError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`field`] | Field configuration types and per-record patches |
//! | [`store`] | Persistent two-tier configuration store |
//! | [`dataset`] | Tabular record access and value normalization |
//! | [`view`] | Zoom and template/surface coordinate transform |
//! | [`fonts`] | Typeface resolution and text rasterization |
//! | [`signature`] | Per-record signature asset lookup |
//! | [`compose`] | Final and preview image composition |
//! | [`drag`] | Pointer-drag field placement |
//! | [`batch`] | Paced batch rendering and spooling |
//! | [`error`] | Error types |

pub mod batch;
pub mod compose;
pub mod dataset;
pub mod drag;
pub mod error;
pub mod field;
pub mod fonts;
pub mod signature;
pub mod store;
pub mod view;

// Re-exports for convenience
pub use compose::Composer;
pub use error::PlacardError;
pub use field::{FieldConfig, FieldProp, SIGNATURE_FIELD};
pub use store::{ConfigStore, EditMode, FileSink, LoadOutcome};
