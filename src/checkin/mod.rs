//! Proactive check-ins: opt-in settings, capped suggestion generation, and the
//! suggestion lifecycle.

pub mod scheduler;
pub mod settings;
pub mod suggestion;

pub use scheduler::{apply_action, generate_suggestion, list_active, run_daily_scheduler, SchedulerRun};
pub use settings::{get_settings, update_settings, CheckInSettings};
pub use suggestion::{CheckInAction, CheckInStatus, CheckInSuggestion, OpenLoopRef, ReasonDetails};
