//! The persisted reminder record.

use chrono::DateTime;
use chrono_tz::Tz;

use uninews_types::Priority;

/// Seconds in one calendar day.
pub const DAY_SECONDS: u32 = 86_400;

/// Longest allowed repeat interval: 28 days (4 weeks).
pub const MAX_INTERVAL_SECONDS: u32 = 28 * DAY_SECONDS;

/// One recurring (or one-shot) announcement request, as persisted.
///
/// All timestamps are zoned to the single configured platform time zone.
/// `next_date` is the recurrence cursor: the next instant at which the
/// schedule is eligible to fire. It is owned by the engine and never
/// exposed over the API or set directly by callers.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderSchedule {
    /// Unique id, assigned by the store at creation.
    pub id: i64,
    /// Channel whose subscribers receive the produced announcements.
    pub channel_id: i64,
    /// Moderator who authored the reminder.
    pub author_moderator: i64,
    /// Title of the produced announcement.
    pub title: String,
    /// Body text of the produced announcement.
    pub text: String,
    /// Priority of the produced announcement.
    pub priority: Priority,
    /// Set exactly once, never overwritten afterwards.
    pub creation_date: Option<DateTime<Tz>>,
    /// Updated on every caller-visible mutation of the record.
    pub modification_date: Option<DateTime<Tz>>,
    /// First intended firing instant. Never after `end_date`.
    pub start_date: DateTime<Tz>,
    /// Recurrence cursor. `None` until the cursor has been initialized.
    pub next_date: Option<DateTime<Tz>>,
    /// Last instant after which the schedule is permanently expired.
    pub end_date: DateTime<Tz>,
    /// Repeat interval in seconds. Zero means the reminder fires exactly
    /// once; any other value must be a whole number of days in [1, 28].
    pub interval: u32,
    /// When set, the next otherwise-due firing is suppressed. The cursor
    /// still advances past the suppressed occurrence.
    pub ignore_next: bool,
    /// A suspended schedule neither fires nor advances its cursor.
    pub active: bool,
}

impl ReminderSchedule {
    /// Stamp the creation date if it has not been set yet. Calling this
    /// again later is a no-op.
    pub fn touch_created(&mut self, now: DateTime<Tz>) {
        if self.creation_date.is_none() {
            self.creation_date = Some(now);
        }
    }

    /// Stamp the modification date. Every mutating operation on the record
    /// calls this.
    pub fn touch_modified(&mut self, now: DateTime<Tz>) {
        self.modification_date = Some(now);
    }
}
