//! # rangesync
//!
//! rangesync is the range analysis engine behind a range calculator: it turns a
//! `(start, end, step)` triple into a numeric sequence and its statistics, evaluates
//! user-authored formulas over named variables, and keeps history, favorites, and
//! saved formulas in a persisted store.
//!
//! The crate provides carefully layered pieces, leaf-first:
//!
//! * **Sequence Generator**: [`sequence::RangeParameters`] and its lazy, restartable
//!   [`sequence::Sequence`]. Direction comes from the bounds; the step magnitude is
//!   floored at [`sequence::MIN_STEP_MAGNITUDE`] so every walk terminates.
//! * **Statistics Calculator**: [`statistics::RangeStats`] (count, sum, average,
//!   min/max, population standard deviation), recomputed from scratch on every call.
//! * **Formula Evaluator**: [`formula::FormulaEvaluator`], a tokenizer plus
//!   recursive-descent parser over a fixed whitelist of functions and constants. No
//!   expression is ever executed as code.
//! * **Range Store**: [`RangeStore`], the persisted state with bounded history (50)
//!   and favorites (20), unbounded custom formulas, and write-through persistence to a
//!   [`storage::StateStorage`] backend.
//!
//! ## Getting Started
//!
//! ```rust
//! use rangesync::formula::FormulaEvaluator;
//! use rangesync::sequence::RangeParameters;
//! use rangesync::statistics::calculate_range_stats;
//! use rangesync::storage::MemoryStorage;
//! use rangesync::store::NewCustomFormula;
//! use rangesync::RangeStore;
//!
//! rangesync::init_logger();
//!
//! // Live preview: pure, cheap to call on every keystroke.
//! let preview = calculate_range_stats(10.0, 1.0, -1.0);
//! assert_eq!(preview.count, 10);
//! assert_eq!(preview.sum, 55.0);
//!
//! // Apply: commit the range and record it in history.
//! let mut store = RangeStore::open_default(MemoryStorage::new());
//! store.commit_range(RangeParameters::new(10.0, 1.0, -1.0));
//! assert_eq!(store.state().range(), RangeParameters::new(10.0, 1.0, -1.0));
//!
//! // Author a formula, test it, then save its definition.
//! let definition = NewCustomFormula::new("hypotenuse", "sqrt(pow(a, 2) + pow(b, 2))")
//!     .with_variable("a", 3.0)
//!     .with_variable("b", 4.0);
//! let saved = store.add_custom_formula(definition).clone();
//! let result = FormulaEvaluator::new().evaluate_custom_formula(&saved);
//! assert_eq!(result.unwrap(), 5.0);
//! ```
//!
//! ## Storage
//!
//! [`storage::FileStorage`] keeps one JSON document per key in a directory chosen by
//! [`RangeSyncConfig::state_dir`]; [`storage::MemoryStorage`] keeps them in memory.
//!
//! ```rust,no_run
//! use rangesync::storage::FileStorage;
//! use rangesync::{RangeStore, RangeSyncConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RangeSyncConfig::default();
//! let storage = FileStorage::open(&config.state_dir)?;
//! let mut store = RangeStore::open(storage, &config);
//! store.toggle_dark_mode();
//! # Ok(())
//! # }
//! ```

use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Initialise the global [`env_logger`] subscriber exactly once.
///
/// Applications embedding rangesync can opt in to simple `RUST_LOG` driven
/// diagnostics without choosing a logging backend upfront.
///
/// ```rust
/// rangesync::init_logger();
/// log::info!("Logger is ready");
/// ```
pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        env_logger::init();
    });
}

// Import the top-level `rangesync` module.
pub mod rangesync;

// Re-exporting key items for easier external access.
pub use rangesync::config;
pub use rangesync::config::RangeSyncConfig;
pub use rangesync::formula;
pub use rangesync::formula::{FormulaError, FormulaEvaluator, FormulaResult};
pub use rangesync::sequence;
pub use rangesync::share_link;
pub use rangesync::statistics;
pub use rangesync::statistics::{calculate_range_stats, RangeStats};
pub use rangesync::storage;
pub use rangesync::store;
pub use rangesync::store::{RangeState, RangeStore, SharedRangeStore};
pub use rangesync::usage;
