//! # Configuration Store
//!
//! Owns the two configuration tiers — the global field map and the
//! per-record overrides — and the merge logic that produces the effective
//! configuration for a record.
//!
//! Persistence goes through the [`ConfigSink`] port: the full
//! `{global, custom}` unit is rewritten after every mutation, no batching.
//! A malformed persisted document never blocks startup; the store degrades
//! to empty state and reports it through [`LoadOutcome::Degraded`].

use crate::error::PlacardError;
use crate::field::{FieldConfig, FieldPatch, FieldProp, SIGNATURE_FIELD};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::PathBuf;

/// Persistence port for the configuration unit.
///
/// The store never touches the filesystem directly; tests substitute
/// [`MemorySink`] and assert on write counts and contents.
pub trait ConfigSink {
    /// Read the persisted unit. `None` means nothing has been persisted yet.
    fn load(&self) -> Result<Option<String>, PlacardError>;

    /// Overwrite the persisted unit in full.
    fn store(&self, payload: &str) -> Result<(), PlacardError>;
}

/// File-backed sink. Every save rewrites the whole file.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl ConfigSink for FileSink {
    fn load(&self) -> Result<Option<String>, PlacardError> {
        if !self.path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&self.path)?))
    }

    fn store(&self, payload: &str) -> Result<(), PlacardError> {
        fs::write(&self.path, payload)?;
        Ok(())
    }
}

/// In-memory sink that counts writes.
#[derive(Debug, Default)]
pub struct MemorySink {
    contents: RefCell<Option<String>>,
    writes: Cell<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink pre-seeded with a persisted document.
    pub fn with_contents(payload: impl Into<String>) -> Self {
        Self {
            contents: RefCell::new(Some(payload.into())),
            writes: Cell::new(0),
        }
    }

    /// Number of times `store` has been called.
    pub fn writes(&self) -> usize {
        self.writes.get()
    }

    /// Last persisted payload, if any.
    pub fn contents(&self) -> Option<String> {
        self.contents.borrow().clone()
    }
}

impl ConfigSink for MemorySink {
    fn load(&self) -> Result<Option<String>, PlacardError> {
        Ok(self.contents.borrow().clone())
    }

    fn store(&self, payload: &str) -> Result<(), PlacardError> {
        *self.contents.borrow_mut() = Some(payload.to_string());
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}

/// How the persisted unit came up at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Nothing persisted yet; starting from defaults.
    Fresh,
    /// Persisted unit parsed cleanly.
    Loaded,
    /// Persisted unit was unreadable or malformed; degraded to empty state.
    Degraded,
}

/// Which configuration tier an update targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditMode {
    /// Edit the global entry, affecting every record without an override.
    #[default]
    Global,
    /// Edit (and thereby customize) a single record.
    Individual,
}

/// Result of an update attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Value applied and persisted.
    Applied,
    /// Global-mode update against a field with no global entry. Silent no-op.
    UnknownField,
    /// Invalid value or property/variant mismatch. The update is dropped.
    Rejected,
}

/// The serialized `{global, custom}` unit. Record indices serialize as
/// JSON object keys (strings) and parse back to integers on load.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedUnit {
    #[serde(default)]
    global: IndexMap<String, FieldConfig>,
    #[serde(default)]
    custom: BTreeMap<usize, IndexMap<String, FieldPatch>>,
}

/// The effective configuration for one record: a fresh copy, never a view
/// into the store's own maps.
pub type ResolvedConfig = IndexMap<String, FieldConfig>;

/// Two-tier configuration store with autosave-per-mutation.
pub struct ConfigStore<S: ConfigSink> {
    global: IndexMap<String, FieldConfig>,
    custom: BTreeMap<usize, IndexMap<String, FieldPatch>>,
    sink: S,
}

impl<S: ConfigSink> ConfigStore<S> {
    /// Load the persisted unit through the sink.
    ///
    /// Read or parse failures degrade to empty state instead of propagating;
    /// the outcome tells the caller which case occurred. The signature field
    /// default is injected if absent.
    pub fn open(sink: S) -> (Self, LoadOutcome) {
        let (unit, outcome) = match sink.load() {
            Ok(Some(payload)) => match serde_json::from_str::<PersistedUnit>(&payload) {
                Ok(unit) => (unit, LoadOutcome::Loaded),
                Err(err) => {
                    log::warn!("malformed config unit, starting empty: {err}");
                    (PersistedUnit::default(), LoadOutcome::Degraded)
                }
            },
            Ok(None) => (PersistedUnit::default(), LoadOutcome::Fresh),
            Err(err) => {
                log::warn!("config unit unreadable, starting empty: {err}");
                (PersistedUnit::default(), LoadOutcome::Degraded)
            }
        };

        let mut store = Self {
            global: unit.global,
            custom: unit.custom,
            sink,
        };
        store
            .global
            .entry(SIGNATURE_FIELD.to_string())
            .or_insert_with(|| FieldConfig::default_for(SIGNATURE_FIELD));
        (store, outcome)
    }

    /// Serialize the full unit and overwrite the persisted document.
    pub fn save(&self) -> Result<(), PlacardError> {
        let unit = PersistedUnit {
            global: self.global.clone(),
            custom: self.custom.clone(),
        };
        let payload = serde_json::to_string_pretty(&unit)?;
        self.sink.store(&payload)
    }

    /// The effective configuration for a record: a deep copy of the global
    /// map with the record's patches merged key-by-key. Field names with no
    /// global entry are materialized from the patch over the type default.
    pub fn resolve(&self, idx: usize) -> ResolvedConfig {
        let mut resolved = self.global.clone();
        if let Some(patches) = self.custom.get(&idx) {
            for (name, patch) in patches {
                match resolved.get_mut(name) {
                    Some(config) => patch.apply_to(config),
                    None => {
                        resolved.insert(name.clone(), patch.materialize(name));
                    }
                }
            }
        }
        resolved
    }

    /// Apply one property update under the given edit mode and persist.
    ///
    /// Global mode is a silent no-op for unknown fields. Individual mode
    /// seeds the record's patch with a full snapshot of the global entry
    /// before setting the key, which flags the record as customized.
    pub fn update(
        &mut self,
        field: &str,
        prop: FieldProp,
        mode: EditMode,
        idx: usize,
    ) -> Result<UpdateOutcome, PlacardError> {
        if !prop.is_valid() {
            log::warn!("dropping invalid value for {field}.{prop:?}");
            return Ok(UpdateOutcome::Rejected);
        }

        match mode {
            EditMode::Global => {
                let Some(config) = self.global.get_mut(field) else {
                    return Ok(UpdateOutcome::UnknownField);
                };
                if !config.set(&prop) {
                    log::warn!("dropping mismatched property for {field}: {prop:?}");
                    return Ok(UpdateOutcome::Rejected);
                }
            }
            EditMode::Individual => {
                let kind = self
                    .global
                    .get(field)
                    .map(FieldConfig::kind)
                    .unwrap_or_else(|| FieldConfig::default_for(field).kind());
                if !prop.fits(kind) {
                    log::warn!("dropping mismatched property for {field}: {prop:?}");
                    return Ok(UpdateOutcome::Rejected);
                }
                let seed = self.global.get(field).map(FieldPatch::from_config);
                let patches = self.custom.entry(idx).or_default();
                patches
                    .entry(field.to_string())
                    .or_insert_with(|| seed.unwrap_or_default())
                    .set(&prop);
            }
        }

        self.save()?;
        Ok(UpdateOutcome::Applied)
    }

    /// Delete every override for a record and persist.
    ///
    /// Returns `false` when the record had no customization (a no-op the
    /// caller may report, not an error).
    pub fn reset_record(&mut self, idx: usize) -> Result<bool, PlacardError> {
        if self.custom.remove(&idx).is_none() {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    /// Insert the type-appropriate default for every name not yet known.
    /// Idempotent; persists only when something was inserted.
    pub fn ensure_fields<I, N>(&mut self, names: I) -> Result<(), PlacardError>
    where
        I: IntoIterator<Item = N>,
        N: AsRef<str>,
    {
        let mut inserted = false;
        for name in names {
            let name = name.as_ref();
            if !self.global.contains_key(name) {
                self.global
                    .insert(name.to_string(), FieldConfig::default_for(name));
                inserted = true;
            }
        }
        if inserted {
            self.save()?;
        }
        Ok(())
    }

    /// Whether the record carries any override. Flagged on any individual
    /// write, even one that restates the global value.
    pub fn is_customized(&self, idx: usize) -> bool {
        self.custom.contains_key(&idx)
    }

    /// Record indices with overrides, for row flagging in the list view.
    pub fn customized_records(&self) -> Vec<usize> {
        self.custom.keys().copied().collect()
    }

    /// Field names overridden for a record; drives the preview highlight
    /// under individual edit mode.
    pub fn overridden_fields(&self, idx: usize) -> HashSet<String> {
        self.custom
            .get(&idx)
            .map(|patches| patches.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn global(&self) -> &IndexMap<String, FieldConfig> {
        &self.global
    }

    pub fn field(&self, name: &str) -> Option<&FieldConfig> {
        self.global.get(name)
    }
}
