//! Adequacy recalculation engine
//!
//! Pure arithmetic over an in-memory level; no I/O.

pub mod adequacy;
pub mod recalculation;

pub use adequacy::{adequacy_percentage, assess, clamp_percent, classify};
pub use recalculation::{
    recompute_level_totals, rescale_from_adequacy, RescaleOutcome, CONTRIBUTOR_MIN_PER_100G,
    RESCALE_EPSILON,
};
