//! Pure recurrence computation over a [`ReminderSchedule`].
//!
//! Every function here is a total, side-effect-free function of a schedule
//! value and the current time. Callers must run [`validate`] before handing
//! a schedule to [`advance_once`] or [`initialize_cursor`]; the advance
//! loop relies on the interval being zero or at least one day.

use chrono::{DateTime, Duration};
use chrono_tz::{OffsetComponents, Tz};
use thiserror::Error;

use crate::schedule::{DAY_SECONDS, MAX_INTERVAL_SECONDS, ReminderSchedule};

/// Rejection reasons for a create/update request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Interval is neither zero nor a whole number of days between 1 and
    /// 28 days, or a zero-length date range claims to repeat.
    #[error("interval must be zero or a multiple of one day between 1 and 28 days")]
    InvalidInterval,
    /// Start lies after end, or end is already in the past.
    #[error("start date must not be after end date and end date must lie in the future")]
    InvalidDateRange,
}

/// Outcome of one scheduler pass over a reminder.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// The reminder is due. The carried schedule has the cursor already
    /// advanced; the caller emits the announcement and persists it.
    Due(ReminderSchedule),
    /// The reminder was due but its next firing was marked to be skipped.
    /// The flag is cleared and the cursor advanced; nothing is emitted.
    DueSuppressed(ReminderSchedule),
    /// Not eligible right now (suspended, cursor in the future, or cursor
    /// not yet initialized).
    NotDue,
    /// Permanently done; never fires again.
    Expired,
}

/// Run both validation checks. Callers reject the whole create/update
/// request on the first failure; nothing is partially accepted.
pub fn validate(schedule: &ReminderSchedule, now: DateTime<Tz>) -> Result<(), ValidationError> {
    if !is_valid_interval(schedule) {
        return Err(ValidationError::InvalidInterval);
    }
    if !is_valid_date_range(schedule, now) {
        return Err(ValidationError::InvalidDateRange);
    }
    Ok(())
}

/// Zero is valid: it marks a one-time reminder. Any other interval must be
/// a multiple of a day within [1, 28] days, and a zero-length date range
/// cannot repeat.
pub fn is_valid_interval(schedule: &ReminderSchedule) -> bool {
    if schedule.interval == 0 {
        return true;
    }
    if schedule.start_date == schedule.end_date {
        return false;
    }
    schedule.interval % DAY_SECONDS == 0
        && (DAY_SECONDS..=MAX_INTERVAL_SECONDS).contains(&schedule.interval)
}

/// The start must not lie after the end, and the end must still be in the
/// future at validation time.
pub fn is_valid_date_range(schedule: &ReminderSchedule, now: DateTime<Tz>) -> bool {
    schedule.start_date <= schedule.end_date && schedule.end_date >= now
}

/// True once the cursor has passed the end date, or the end date itself has
/// passed. An expired schedule never fires again, regardless of `active`
/// or `ignore_next`.
pub fn is_expired(schedule: &ReminderSchedule, now: DateTime<Tz>) -> bool {
    schedule
        .next_date
        .is_some_and(|next| next > schedule.end_date)
        || schedule.end_date < now
}

/// Driver-facing eligibility: active, not expired, cursor reached.
pub fn is_due(schedule: &ReminderSchedule, now: DateTime<Tz>) -> bool {
    schedule.active
        && !is_expired(schedule, now)
        && schedule.next_date.is_some_and(|next| next <= now)
}

/// Advance the cursor by one period.
///
/// A one-time schedule parks the cursor one second past the end date, which
/// makes [`is_expired`] hold from then on. A repeating schedule adds the
/// interval as plain instant arithmetic and then compensates a crossed DST
/// boundary by ±1 hour, so the announcement keeps firing at the same local
/// wall-clock time. The interval bound of 28 days guarantees at most one
/// boundary per advance.
pub fn advance_once(schedule: &ReminderSchedule) -> ReminderSchedule {
    let mut out = schedule.clone();
    if schedule.interval == 0 {
        out.next_date = Some(schedule.end_date + Duration::seconds(1));
        return out;
    }
    let Some(cursor) = schedule.next_date else {
        // Cursor never initialized; nothing to advance from.
        return out;
    };
    let mut candidate = cursor + Duration::seconds(i64::from(schedule.interval));
    if in_dst(cursor) && !in_dst(candidate) {
        // Fell back out of DST between the two occurrences.
        candidate += Duration::hours(1);
    } else if !in_dst(cursor) && in_dst(candidate) {
        // Sprang forward into DST between the two occurrences.
        candidate -= Duration::hours(1);
    }
    out.next_date = Some(candidate);
    out
}

/// Establish the cursor for a freshly created or rescheduled reminder.
///
/// The cursor starts at `start_date`. A start in the past (created
/// retroactively, or recomputed after downtime) is fast-forwarded one
/// period at a time, so intermediate DST corrections land exactly as a
/// live sequence of advances would. The loop terminates because a
/// validated nonzero interval is at least one day.
pub fn initialize_cursor(mut schedule: ReminderSchedule, now: DateTime<Tz>) -> ReminderSchedule {
    if schedule.next_date.is_none() {
        schedule.next_date = Some(schedule.start_date);
    }
    if schedule.interval == 0 {
        // The single occurrence is the start date itself.
        return schedule;
    }
    while schedule.next_date.is_some_and(|next| next < now) {
        schedule = advance_once(&schedule);
    }
    schedule
}

/// Classify a schedule for the scheduler driver.
///
/// On `Due` and `DueSuppressed` the returned schedule carries the advanced
/// cursor; persisting it is the caller's job. Advancing on every due
/// evaluation, fired or suppressed, is what keeps a schedule from firing
/// twice for the same occurrence or stalling on a suppressed one.
pub fn evaluate(schedule: &ReminderSchedule, now: DateTime<Tz>) -> Evaluation {
    if is_expired(schedule, now) {
        return Evaluation::Expired;
    }
    if !schedule.active {
        return Evaluation::NotDue;
    }
    match schedule.next_date {
        Some(next) if next <= now => {}
        _ => return Evaluation::NotDue,
    }
    if schedule.ignore_next {
        let mut advanced = advance_once(schedule);
        advanced.ignore_next = false;
        Evaluation::DueSuppressed(advanced)
    } else {
        Evaluation::Due(advance_once(schedule))
    }
}

fn in_dst(instant: DateTime<Tz>) -> bool {
    instant.offset().dst_offset() > Duration::zero()
}
