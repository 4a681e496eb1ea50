//! uninews-reminder: recurrence engine for channel reminders.
//!
//! A reminder asks the platform to emit an announcement into a channel at
//! computed instants, either once or on a fixed day-multiple interval. This
//! crate holds the persisted record shape and the pure calendar logic over
//! it: parameter validation, cursor advancement with DST correction, and
//! firing eligibility. Nothing here performs I/O or logging; the scheduler
//! crate owns dispatch and persistence.

pub mod engine;
pub mod schedule;

pub use engine::{
    Evaluation, ValidationError, advance_once, evaluate, initialize_cursor, is_due, is_expired,
    validate,
};
pub use schedule::{DAY_SECONDS, MAX_INTERVAL_SECONDS, ReminderSchedule};
