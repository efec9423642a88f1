//! Persisted range state: current range, theme flag, history, favorites, and
//! custom formulas.
//!
//! The state is split in two layers:
//!
//! - [`RangeState`] is the plain serializable document. Its methods only mutate
//!   memory, which makes them easy to test in isolation.
//! - [`RangeStore`] owns a `RangeState` plus a [`StateStorage`] backend. Every
//!   mutating method applies the change to the state and then immediately writes the
//!   whole document back (write-through, no batching).
//!
//! # Persisted layout
//!
//! ```text
//! {
//!   "start": 1, "end": 100, "step": 1, "isDarkMode": true,
//!   "history":        [ { "id", "timestamp", "stats": { ..., "stdDev" } }, ... ],   // newest first, max 50
//!   "favorites":      [ { "id", "name", "start", "end", "step", "createdAt" }, ... ], // newest first, max 20
//!   "customFormulas": [ { "id", "name", "formula", "description",
//!                         "variables": [ { "name", "default" } ], "createdAt" }, ... ]
//! }
//! ```
//!
//! # Example
//!
//! ```rust
//! use rangesync::sequence::RangeParameters;
//! use rangesync::storage::MemoryStorage;
//! use rangesync::store::RangeStore;
//!
//! let storage = MemoryStorage::new();
//! let mut store = RangeStore::open_default(storage.clone());
//!
//! let entry_id = store.commit_range(RangeParameters::new(1.0, 10.0, 1.0)).id.clone();
//! assert_eq!(store.state().history()[0].id, entry_id);
//! assert_eq!(store.state().history()[0].stats.sum, 55.0);
//!
//! // The mutation already reached storage.
//! let reopened = RangeStore::open_default(storage);
//! assert_eq!(reopened.state().history().len(), 1);
//! ```

use crate::rangesync::config::RangeSyncConfig;
use crate::rangesync::sequence::RangeParameters;
use crate::rangesync::statistics::{nullable_f64, RangeStats};
use crate::rangesync::storage::{StateStorage, StorageError};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Most history entries kept; older ones are evicted.
pub const HISTORY_CAPACITY: usize = 50;

/// Most favorites kept; older ones are evicted.
pub const FAVORITES_CAPACITY: usize = 20;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

const NAIVE_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// Parse an ISO-8601 timestamp.
///
/// Offsets (`Z`, `+01:00`, `+0100`) are honoured. A date-time without an offset is
/// read as UTC, and a bare date as midnight UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in NAIVE_TIMESTAMP_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

pub(crate) fn iso_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| de::Error::custom(format!("invalid ISO-8601 timestamp {:?}", raw)))
}

pub(crate) fn optional_iso_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid ISO-8601 timestamp {:?}", raw))),
        None => Ok(None),
    }
}

/// Read a stored list one entry at a time, dropping (and logging) entries that do
/// not parse instead of rejecting the whole document.
fn lenient_entries<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items = match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Null => return Ok(Vec::new()),
        other => {
            log::warn!("Ignoring stored list that is not an array: {}", other);
            return Ok(Vec::new());
        }
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(entry) => Some(entry),
            Err(err) => {
                log::warn!("Skipping unreadable stored entry: {}", err);
                None
            }
        })
        .collect())
}

/// One committed calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    #[serde(deserialize_with = "iso_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub stats: RangeStats,
}

/// A named, saved range configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteRange {
    pub id: String,
    pub name: String,
    #[serde(deserialize_with = "nullable_f64")]
    pub start: f64,
    #[serde(deserialize_with = "nullable_f64")]
    pub end: f64,
    #[serde(deserialize_with = "nullable_f64")]
    pub step: f64,
    #[serde(deserialize_with = "iso_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl FavoriteRange {
    pub fn params(&self) -> RangeParameters {
        RangeParameters::new(self.start, self.end, self.step)
    }
}

/// A declared formula variable and the value it takes by default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaVariable {
    pub name: String,
    #[serde(deserialize_with = "nullable_f64")]
    pub default: f64,
}

impl FormulaVariable {
    pub fn new(name: impl Into<String>, default: f64) -> Self {
        Self {
            name: name.into(),
            default,
        }
    }
}

/// A saved, user-authored formula definition. Only the definition is stored,
/// never an evaluated result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFormula {
    pub id: String,
    pub name: String,
    pub formula: String,
    pub description: String,
    /// Declared variables in order. Names are expected to be unique; that is up to
    /// the caller.
    pub variables: Vec<FormulaVariable>,
    #[serde(deserialize_with = "iso_timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Everything needed to create a [`CustomFormula`]; the store assigns `id` and
/// `created_at`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewCustomFormula {
    pub name: String,
    pub formula: String,
    pub description: String,
    pub variables: Vec<FormulaVariable>,
}

impl NewCustomFormula {
    pub fn new(name: impl Into<String>, formula: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            formula: formula.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, default: f64) -> Self {
        self.variables.push(FormulaVariable::new(name, default));
        self
    }
}

/// A partial update for a [`CustomFormula`]. `None` fields are left untouched;
/// `id` and `created_at` can never change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomFormulaUpdate {
    pub name: Option<String>,
    pub formula: Option<String>,
    pub description: Option<String>,
    pub variables: Option<Vec<FormulaVariable>>,
}

impl CustomFormulaUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn formula(mut self, formula: impl Into<String>) -> Self {
        self.formula = Some(formula.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn variables(mut self, variables: Vec<FormulaVariable>) -> Self {
        self.variables = Some(variables);
        self
    }

    fn apply_to(self, formula: &mut CustomFormula) {
        if let Some(name) = self.name {
            formula.name = name;
        }
        if let Some(expression) = self.formula {
            formula.formula = expression;
        }
        if let Some(description) = self.description {
            formula.description = description;
        }
        if let Some(variables) = self.variables {
            formula.variables = variables;
        }
    }
}

/// The full persisted document.
///
/// Fields missing from a stored document fall back to their defaults individually,
/// so older or partial documents still load. Within the history, favorites, and
/// custom formula lists, an entry that does not parse is skipped with a warning and
/// the rest of the document is kept. Timestamps are written as RFC 3339 and read as
/// any ISO-8601 form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RangeState {
    #[serde(deserialize_with = "nullable_f64")]
    start: f64,
    #[serde(deserialize_with = "nullable_f64")]
    end: f64,
    #[serde(deserialize_with = "nullable_f64")]
    step: f64,
    is_dark_mode: bool,
    #[serde(deserialize_with = "lenient_entries")]
    history: Vec<HistoryEntry>,
    #[serde(deserialize_with = "lenient_entries")]
    favorites: Vec<FavoriteRange>,
    #[serde(deserialize_with = "lenient_entries")]
    custom_formulas: Vec<CustomFormula>,
}

impl Default for RangeState {
    fn default() -> Self {
        Self {
            start: 1.0,
            end: 100.0,
            step: 1.0,
            is_dark_mode: true,
            history: Vec::new(),
            favorites: Vec::new(),
            custom_formulas: Vec::new(),
        }
    }
}

impl RangeState {
    pub fn range(&self) -> RangeParameters {
        RangeParameters::new(self.start, self.end, self.step)
    }

    pub fn is_dark_mode(&self) -> bool {
        self.is_dark_mode
    }

    /// Newest first.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Newest first.
    pub fn favorites(&self) -> &[FavoriteRange] {
        &self.favorites
    }

    /// Newest first.
    pub fn custom_formulas(&self) -> &[CustomFormula] {
        &self.custom_formulas
    }

    /// Replace the current range. No validation happens here.
    pub fn set_range(&mut self, params: RangeParameters) {
        self.start = params.start;
        self.end = params.end;
        self.step = params.step;
    }

    pub fn add_history(&mut self, stats: RangeStats) -> &HistoryEntry {
        self.history.insert(
            0,
            HistoryEntry {
                id: new_id(),
                timestamp: Utc::now(),
                stats,
            },
        );
        self.history.truncate(HISTORY_CAPACITY);
        &self.history[0]
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn add_favorite(
        &mut self,
        name: impl Into<String>,
        params: RangeParameters,
    ) -> &FavoriteRange {
        self.favorites.insert(
            0,
            FavoriteRange {
                id: new_id(),
                name: name.into(),
                start: params.start,
                end: params.end,
                step: params.step,
                created_at: Utc::now(),
            },
        );
        self.favorites.truncate(FAVORITES_CAPACITY);
        &self.favorites[0]
    }

    /// Returns whether anything was removed.
    pub fn remove_favorite(&mut self, id: &str) -> bool {
        let before = self.favorites.len();
        self.favorites.retain(|fav| fav.id != id);
        self.favorites.len() != before
    }

    pub fn favorite(&self, id: &str) -> Option<&FavoriteRange> {
        self.favorites.iter().find(|fav| fav.id == id)
    }

    /// Make the favorite's range current. An unknown id changes nothing.
    pub fn load_favorite(&mut self, id: &str) -> Option<RangeParameters> {
        let params = self.favorite(id)?.params();
        self.set_range(params);
        Some(params)
    }

    /// Whether a favorite with exactly these parameters already exists.
    ///
    /// Duplicates are allowed; this only lets a caller discourage them.
    pub fn is_favorited(&self, params: &RangeParameters) -> bool {
        self.favorites.iter().any(|fav| fav.params() == *params)
    }

    pub fn add_custom_formula(&mut self, definition: NewCustomFormula) -> &CustomFormula {
        self.custom_formulas.insert(
            0,
            CustomFormula {
                id: new_id(),
                name: definition.name,
                formula: definition.formula,
                description: definition.description,
                variables: definition.variables,
                created_at: Utc::now(),
            },
        );
        &self.custom_formulas[0]
    }

    /// Returns whether anything was removed.
    pub fn remove_custom_formula(&mut self, id: &str) -> bool {
        let before = self.custom_formulas.len();
        self.custom_formulas.retain(|formula| formula.id != id);
        self.custom_formulas.len() != before
    }

    /// Merge `update` into the formula with `id`. An unknown id changes nothing.
    pub fn update_custom_formula(
        &mut self,
        id: &str,
        update: CustomFormulaUpdate,
    ) -> Option<&CustomFormula> {
        let formula = self.custom_formulas.iter_mut().find(|f| f.id == id)?;
        update.apply_to(formula);
        Some(&*formula)
    }

    pub fn custom_formula(&self, id: &str) -> Option<&CustomFormula> {
        self.custom_formulas.iter().find(|formula| formula.id == id)
    }

    /// Flip the theme flag, returning the new value.
    pub fn toggle_dark_mode(&mut self) -> bool {
        self.is_dark_mode = !self.is_dark_mode;
        self.is_dark_mode
    }

    pub fn to_json(&self) -> Result<String, StorageError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, StorageError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A [`RangeStore`] shared between threads. Each mutation runs under the lock, so
/// prepend-and-cap stays atomic.
pub type SharedRangeStore<S> = Arc<Mutex<RangeStore<S>>>;

/// The range state bound to a storage backend, with write-through persistence.
#[derive(Debug)]
pub struct RangeStore<S: StateStorage> {
    state: RangeState,
    storage: S,
    key: String,
    large_range_threshold: u64,
    preview_points: usize,
}

impl<S: StateStorage> RangeStore<S> {
    /// Hydrate from `storage` using the key and limits in `config`.
    ///
    /// A missing document yields the defaults (`1..=100` step `1`, dark mode on,
    /// empty collections). An unreadable or malformed document is logged and also
    /// replaced by the defaults; it is overwritten on the next mutation.
    pub fn open(storage: S, config: &RangeSyncConfig) -> Self {
        let state = hydrate(&storage, &config.storage_key);
        log::info!(
            "Opened range store '{}' ({} history, {} favorites, {} formulas)",
            config.storage_key,
            state.history.len(),
            state.favorites.len(),
            state.custom_formulas.len()
        );
        Self {
            state,
            storage,
            key: config.storage_key.clone(),
            large_range_threshold: config.large_range_threshold,
            preview_points: config.preview_points,
        }
    }

    /// [`open`](Self::open) with [`RangeSyncConfig::default`].
    pub fn open_default(storage: S) -> Self {
        Self::open(storage, &RangeSyncConfig::default())
    }

    pub fn state(&self) -> &RangeState {
        &self.state
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_key(&self) -> &str {
        &self.key
    }

    /// Leading values of the current range, as many as the configured preview size.
    pub fn preview(&self) -> Vec<f64> {
        self.state.range().preview(self.preview_points)
    }

    /// Serialize the whole state and write it to storage.
    ///
    /// Mutating methods call this themselves and only log a failure; call it
    /// directly when the caller needs to know the write succeeded.
    pub fn persist(&self) -> Result<(), StorageError> {
        let json = self.state.to_json()?;
        self.storage.save(&self.key, &json)
    }

    fn flush(&self) {
        if let Err(err) = self.persist() {
            log::error!("Failed to persist range state '{}': {}", self.key, err);
        }
    }

    pub fn set_range(&mut self, params: RangeParameters) {
        self.state.set_range(params);
        self.flush();
    }

    pub fn add_history(&mut self, stats: RangeStats) -> &HistoryEntry {
        self.state.add_history(stats);
        self.flush();
        &self.state.history[0]
    }

    pub fn clear_history(&mut self) {
        log::info!("Clearing {} history entries", self.state.history.len());
        self.state.clear_history();
        self.flush();
    }

    /// Apply a range: make it current, compute its statistics, and record them in
    /// history, all in a single write.
    pub fn commit_range(&mut self, params: RangeParameters) -> &HistoryEntry {
        if params.is_oversized(self.large_range_threshold) {
            log::warn!(
                "Committing a large range ({} -> {} by {}): about {} elements",
                params.start,
                params.end,
                params.effective_step(),
                params.estimated_count()
            );
        }
        let stats = RangeStats::from_params(&params);
        self.state.set_range(params);
        self.state.add_history(stats);
        self.flush();
        &self.state.history[0]
    }

    pub fn add_favorite(
        &mut self,
        name: impl Into<String>,
        params: RangeParameters,
    ) -> &FavoriteRange {
        self.state.add_favorite(name, params);
        self.flush();
        &self.state.favorites[0]
    }

    pub fn remove_favorite(&mut self, id: &str) -> bool {
        let removed = self.state.remove_favorite(id);
        self.flush();
        removed
    }

    /// Make a favorite's range current and return it. Unknown ids leave the state
    /// untouched and write nothing.
    pub fn load_favorite(&mut self, id: &str) -> Option<RangeParameters> {
        let params = self.state.load_favorite(id)?;
        self.flush();
        Some(params)
    }

    pub fn add_custom_formula(&mut self, definition: NewCustomFormula) -> &CustomFormula {
        self.state.add_custom_formula(definition);
        self.flush();
        &self.state.custom_formulas[0]
    }

    pub fn remove_custom_formula(&mut self, id: &str) -> bool {
        let removed = self.state.remove_custom_formula(id);
        self.flush();
        removed
    }

    pub fn update_custom_formula(
        &mut self,
        id: &str,
        update: CustomFormulaUpdate,
    ) -> Option<&CustomFormula> {
        self.state.update_custom_formula(id, update)?;
        self.flush();
        self.state.custom_formula(id)
    }

    pub fn toggle_dark_mode(&mut self) -> bool {
        let dark = self.state.toggle_dark_mode();
        self.flush();
        dark
    }

    pub fn into_shared(self) -> SharedRangeStore<S> {
        Arc::new(Mutex::new(self))
    }
}

impl<S: StateStorage> RangeStore<S>
where
    S: Default,
{
    /// A store over a fresh default backend with the default configuration.
    pub fn in_memory() -> Self {
        Self::open_default(S::default())
    }
}

fn hydrate<S: StateStorage>(storage: &S, key: &str) -> RangeState {
    match storage.load(key) {
        Ok(Some(json)) => match RangeState::from_json(&json) {
            Ok(state) => {
                log::debug!("Hydrated range state from '{}'", key);
                state
            }
            Err(err) => {
                log::warn!("Ignoring malformed range state '{}': {}", key, err);
                RangeState::default()
            }
        },
        Ok(None) => {
            log::debug!("No stored range state under '{}', using defaults", key);
            RangeState::default()
        }
        Err(err) => {
            log::warn!("Could not read range state '{}': {}", key, err);
            RangeState::default()
        }
    }
}
