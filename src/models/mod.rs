//! Data models
//!
//! The typed analysis model and the records kept in the local store.

mod ingredient_row;
mod level;
mod nutrient;
mod save_attempt;
mod session;
mod stored_session;

pub use ingredient_row::IngredientRow;
pub use level::{AdequacyClass, AdequacyReport, Level, LevelTotals, NutrientAdequacy, Preparation};
pub use nutrient::{Nutrient, NutrientVector};
pub(crate) use nutrient::lenient_f64;
pub use save_attempt::SaveAttempt;
pub use session::{AnalysisSession, SessionError, SessionResult};
pub use stored_session::{StoredSession, StoredSessionSummary};
