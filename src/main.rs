//! # Placard CLI
//!
//! Command-line interface for template card composition.
//!
//! ## Usage
//!
//! ```bash
//! # List configured fields (seeding them from the dataset's columns)
//! placard fields --data records.json
//!
//! # Move a field globally
//! placard set name x 120
//! placard set name y 260
//!
//! # Override a field for one record only
//! placard set --record 3 name color Red
//!
//! # Drop every override for a record
//! placard reset --record 3
//!
//! # Render the interactive preview image for a record
//! placard preview --template card.png --data records.json --record 0 \
//!     --zoom 1.5 --out preview.png
//!
//! # Render and spool the whole batch
//! placard render --template card.png --data records.json --out jobs/
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use placard::{
    batch::{run_batch, BatchOptions, DirectorySpooler},
    compose::Composer,
    dataset::{DataTable, MemoryTable},
    fonts::FontCatalog,
    signature::SignatureResolver,
    store::{ConfigStore, EditMode, FileSink, LoadOutcome},
    view::{ViewTransform, Zoom},
    FieldProp, PlacardError,
};
use image::RgbaImage;

/// Placard - Template card composition utility
#[derive(Parser, Debug)]
#[command(name = "placard")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Field configuration file
    #[arg(long, global = true, default_value = "print_config.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List configured fields and their placement
    Fields {
        /// Dataset file; its columns seed missing field entries
        #[arg(long)]
        data: Option<PathBuf>,
    },

    /// Set one field property, globally or for a single record
    Set {
        /// Field name (a dataset column, or the signature field)
        field: String,

        /// Property to set: x, y, size, enable, font, bold, upper, color, w, h, path
        key: String,

        /// New value
        value: String,

        /// Apply to this record only instead of globally
        #[arg(long)]
        record: Option<usize>,
    },

    /// Drop every per-record override for a record
    Reset {
        /// Record index (0-based)
        #[arg(long)]
        record: usize,
    },

    /// Render the preview surface for one record to a PNG
    Preview {
        /// Template image
        #[arg(long)]
        template: PathBuf,

        /// Dataset file (JSON array of records)
        #[arg(long)]
        data: PathBuf,

        /// Record index (0-based)
        #[arg(long, default_value = "0")]
        record: usize,

        /// Zoom factor
        #[arg(long, default_value = "1.0")]
        zoom: f32,

        /// Preview surface size as WIDTHxHEIGHT
        #[arg(long, default_value = "800x600")]
        surface: String,

        /// Signature asset folder
        #[arg(long)]
        signatures: Option<PathBuf>,

        /// Output PNG path
        #[arg(long, default_value = "preview.png")]
        out: PathBuf,
    },

    /// Render the selected records and spool them as job files
    Render {
        /// Template image
        #[arg(long)]
        template: PathBuf,

        /// Dataset file (JSON array of records)
        #[arg(long)]
        data: PathBuf,

        /// Comma-separated record indices (defaults to every record)
        #[arg(long)]
        records: Option<String>,

        /// Signature asset folder
        #[arg(long)]
        signatures: Option<PathBuf>,

        /// Output directory for job files
        #[arg(long, default_value = "jobs")]
        out: PathBuf,

        /// Delay between submissions in milliseconds
        #[arg(long, default_value = "1500")]
        delay_ms: u64,
    },
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), PlacardError> {
    let cli = Cli::parse();
    let (mut store, outcome) = ConfigStore::open(FileSink::new(&cli.config));
    if outcome == LoadOutcome::Degraded {
        eprintln!(
            "Warning: {} was unreadable and has been replaced with defaults",
            cli.config.display()
        );
    }

    match cli.command {
        Commands::Fields { data } => {
            if let Some(data) = data {
                let table = MemoryTable::from_json_file(&data)?;
                store.ensure_fields(table.columns().iter().map(String::as_str))?;
            }
            for (name, field) in store.global() {
                println!(
                    "{:<24} {:?} at ({}, {}) {}",
                    name,
                    field.kind(),
                    field.x(),
                    field.y(),
                    if field.enabled() { "on" } else { "off" },
                );
            }
            for idx in store.customized_records() {
                println!("record {idx}: {} override(s)", store.overridden_fields(idx).len());
            }
        }

        Commands::Set {
            field,
            key,
            value,
            record,
        } => {
            let prop = parse_prop(&key, &value)?;
            let (mode, idx) = match record {
                Some(idx) => (EditMode::Individual, idx),
                None => (EditMode::Global, 0),
            };
            match store.update(&field, prop, mode, idx)? {
                placard::store::UpdateOutcome::Applied => {}
                placard::store::UpdateOutcome::UnknownField => {
                    return Err(PlacardError::Config(format!(
                        "no field named '{field}'; run `placard fields --data <file>` to seed fields"
                    )));
                }
                placard::store::UpdateOutcome::Rejected => {
                    return Err(PlacardError::Config(format!(
                        "'{value}' is not a valid value for '{key}'"
                    )));
                }
            }
        }

        Commands::Reset { record } => {
            if store.reset_record(record)? {
                println!("Overrides dropped for record {record}");
            } else {
                println!("Record {record} had no overrides");
            }
        }

        Commands::Preview {
            template,
            data,
            record,
            zoom,
            surface,
            signatures,
            out,
        } => {
            let template = load_template(&template)?;
            let table = MemoryTable::from_json_file(&data)?;
            check_record(record, &table)?;
            store.ensure_fields(table.columns().iter().map(String::as_str))?;

            let surface = parse_surface(&surface)?;
            let transform = ViewTransform::fit(template.dimensions(), surface, Zoom::new(zoom));
            let fonts = FontCatalog::new();
            let resolver = SignatureResolver::new(signatures);
            let composer = Composer::new(&template, &fonts, &resolver);

            let overridden = store.overridden_fields(record);
            let (img, _) = composer.render_preview(
                &table,
                record,
                &store.resolve(record),
                &transform,
                surface,
                &overridden,
            );
            img.save(&out)
                .map_err(|e| PlacardError::Image(format!("Failed to save PNG: {}", e)))?;
            println!("Saved to {}", out.display());
        }

        Commands::Render {
            template,
            data,
            records,
            signatures,
            out,
            delay_ms,
        } => {
            let template = load_template(&template)?;
            let table = MemoryTable::from_json_file(&data)?;
            store.ensure_fields(table.columns().iter().map(String::as_str))?;

            let selection = match records {
                Some(list) => parse_records(&list)?,
                None => (0..table.len()).collect(),
            };
            for &idx in &selection {
                check_record(idx, &table)?;
            }

            let fonts = FontCatalog::new();
            let resolver = SignatureResolver::new(signatures);
            let composer = Composer::new(&template, &fonts, &resolver);
            let mut spooler = DirectorySpooler::new(&out)?;
            let options = BatchOptions {
                delay: Duration::from_millis(delay_ms),
            };

            println!("Rendering {} record(s) to {}...", selection.len(), out.display());
            let report = run_batch(
                &composer,
                &store,
                &table,
                &selection,
                &mut spooler,
                &options,
                &AtomicBool::new(false),
            );
            println!("{} submitted, {} failed", report.submitted.len(), report.failed.len());
            for (idx, msg) in &report.failed {
                eprintln!("  record {idx}: {msg}");
            }
        }
    }

    Ok(())
}

/// Load the template image as RGBA
fn load_template(path: &PathBuf) -> Result<RgbaImage, PlacardError> {
    let img = image::open(path)
        .map_err(|e| PlacardError::Image(format!("Failed to open {}: {}", path.display(), e)))?;
    Ok(img.to_rgba8())
}

fn check_record(idx: usize, table: &MemoryTable) -> Result<(), PlacardError> {
    if idx >= table.len() {
        return Err(PlacardError::Dataset(format!(
            "record index {idx} out of range (dataset has {} records)",
            table.len()
        )));
    }
    Ok(())
}

/// Parse a `set` key/value pair into a field property
fn parse_prop(key: &str, value: &str) -> Result<FieldProp, PlacardError> {
    let bad = || PlacardError::Config(format!("'{value}' is not a valid value for '{key}'"));
    let prop = match key.to_lowercase().as_str() {
        "x" => FieldProp::X(value.parse().map_err(|_| bad())?),
        "y" => FieldProp::Y(value.parse().map_err(|_| bad())?),
        "size" => FieldProp::Size(value.parse().map_err(|_| bad())?),
        "enable" => FieldProp::Enable(parse_bool(value).ok_or_else(bad)?),
        "font" => FieldProp::Font(value.to_string()),
        "bold" => FieldProp::Bold(parse_bool(value).ok_or_else(bad)?),
        "upper" => FieldProp::Upper(parse_bool(value).ok_or_else(bad)?),
        "color" => FieldProp::Color(value.to_string()),
        "w" => FieldProp::W(value.parse().map_err(|_| bad())?),
        "h" => FieldProp::H(value.parse().map_err(|_| bad())?),
        "path" => FieldProp::Path(PathBuf::from(value)),
        _ => {
            return Err(PlacardError::Config(format!(
                "unknown property '{key}' (expected x, y, size, enable, font, bold, upper, color, w, h or path)"
            )));
        }
    };
    Ok(prop)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Parse a WIDTHxHEIGHT surface size
fn parse_surface(value: &str) -> Result<(u32, u32), PlacardError> {
    let err = || PlacardError::Config(format!("'{value}' is not a WIDTHxHEIGHT size"));
    let (w, h) = value.split_once(['x', 'X']).ok_or_else(err)?;
    Ok((
        w.trim().parse().map_err(|_| err())?,
        h.trim().parse().map_err(|_| err())?,
    ))
}

/// Parse a comma-separated record index list
fn parse_records(value: &str) -> Result<Vec<usize>, PlacardError> {
    value
        .split(',')
        .map(|s| {
            s.trim().parse().map_err(|_| {
                PlacardError::Config(format!("'{s}' is not a record index"))
            })
        })
        .collect()
}
