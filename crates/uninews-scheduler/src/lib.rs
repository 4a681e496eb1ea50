//! uninews-scheduler: periodic driver that fires due reminders.
//!
//! A single loop scans the active schedules once per tick, asks the
//! recurrence engine to classify each one, publishes announcements for the
//! due ones, and persists the advanced cursor. One loop means one writer:
//! the read-compute-advance-persist sequence for a record is never run
//! concurrently, so a cursor can never be double-advanced.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, info, warn};

use uninews_reminder::{Evaluation, ReminderSchedule, evaluate};
use uninews_store::ReminderStore;
use uninews_types::AnnouncementDraft;

/// Delivery boundary for announcements produced by firing reminders.
/// The real transport (channel fan-out, push notifications) plugs in here.
#[async_trait]
pub trait AnnouncementSink: Send + Sync {
    /// Deliver one announcement to the channel's subscribers.
    async fn publish(&self, draft: AnnouncementDraft) -> anyhow::Result<()>;
}

/// Sink that only logs the outbound announcement. Default when no
/// transport is wired up.
pub struct LogSink;

#[async_trait]
impl AnnouncementSink for LogSink {
    async fn publish(&self, draft: AnnouncementDraft) -> anyhow::Result<()> {
        info!(
            channel_id = draft.channel_id,
            priority = %draft.priority,
            title = %draft.title,
            "Announcement published"
        );
        Ok(())
    }
}

/// Injectable time source, so DST boundaries are testable.
pub trait Clock: Send + Sync {
    /// Current time in the platform time zone.
    fn now(&self) -> DateTime<Tz>;
}

/// Wall clock in the configured zone.
pub struct SystemClock {
    tz: Tz,
}

impl SystemClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }
}

/// Counters from one scheduler pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    pub evaluated: usize,
    pub fired: usize,
    pub suppressed: usize,
    pub expired: usize,
}

/// The scheduler driver.
pub struct ReminderScheduler {
    store: Arc<ReminderStore>,
    sink: Arc<dyn AnnouncementSink>,
    clock: Arc<dyn Clock>,
    tick: Duration,
}

impl ReminderScheduler {
    pub fn new(
        store: Arc<ReminderStore>,
        sink: Arc<dyn AnnouncementSink>,
        clock: Arc<dyn Clock>,
        tick: Duration,
    ) -> Self {
        Self {
            store,
            sink,
            clock,
            tick,
        }
    }

    /// Run the tick loop forever.
    pub async fn run(self: Arc<Self>) {
        info!(tick_seconds = self.tick.as_secs(), "Reminder scheduler started");
        loop {
            match self.tick_once().await {
                Ok(summary) if summary.fired > 0 || summary.suppressed > 0 => {
                    info!(
                        evaluated = summary.evaluated,
                        fired = summary.fired,
                        suppressed = summary.suppressed,
                        expired = summary.expired,
                        "Scheduler pass complete"
                    );
                }
                Ok(_) => {}
                Err(e) => warn!("Scheduler pass failed: {e}"),
            }
            tokio::time::sleep(self.tick).await;
        }
    }

    /// One pass over all active schedules.
    pub async fn tick_once(&self) -> anyhow::Result<TickSummary> {
        let now = self.clock.now();
        let schedules = self.store.list_active()?;
        let mut summary = TickSummary::default();

        for schedule in schedules {
            summary.evaluated += 1;
            match evaluate(&schedule, now) {
                Evaluation::Due(updated) => {
                    if self.fire(&schedule, updated).await {
                        summary.fired += 1;
                    }
                }
                Evaluation::DueSuppressed(updated) => {
                    debug!(reminder_id = schedule.id, "Suppressed one firing");
                    self.persist(updated);
                    summary.suppressed += 1;
                }
                Evaluation::NotDue => {}
                Evaluation::Expired => {
                    debug!(reminder_id = schedule.id, "Reminder expired");
                    summary.expired += 1;
                }
            }
        }
        Ok(summary)
    }

    /// Publish the announcement, then persist the advanced cursor. A failed
    /// publish leaves the stored cursor untouched so the next tick retries
    /// the same occurrence from the last durable state.
    async fn fire(&self, schedule: &ReminderSchedule, updated: ReminderSchedule) -> bool {
        let draft = AnnouncementDraft {
            channel_id: schedule.channel_id,
            author_moderator: schedule.author_moderator,
            title: schedule.title.clone(),
            text: schedule.text.clone(),
            priority: schedule.priority,
        };
        match self.sink.publish(draft).await {
            Ok(()) => {
                debug!(
                    reminder_id = schedule.id,
                    channel_id = schedule.channel_id,
                    "Reminder fired"
                );
                self.persist(updated);
                true
            }
            Err(e) => {
                warn!(
                    reminder_id = schedule.id,
                    "Failed to publish announcement, will retry next tick: {e}"
                );
                false
            }
        }
    }

    fn persist(&self, updated: ReminderSchedule) {
        if let Err(e) = self.store.update(&updated) {
            warn!(reminder_id = updated.id, "Failed to persist cursor: {e}");
        }
    }
}
