pub mod form;
pub mod sync;

pub use form::{project, FormScope, FormValues, ScopedFields, GLOBAL_SCOPE};
pub use sync::{Notice, SaveOutcome, SettingsError, SettingsPhase, SettingsSync};
