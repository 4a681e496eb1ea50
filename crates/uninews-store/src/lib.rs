//! uninews-store: SQLite persistence for reminder schedules.
//!
//! Dates are stored as RFC 3339 text and rehydrated into the configured
//! platform time zone on read. The store is the single durable home of the
//! recurrence cursor; the scheduler driver owns its read-modify-write cycle.

use std::path::Path;
use std::sync::Mutex;

use chrono::DateTime;
use chrono_tz::Tz;
use rusqlite::{Connection, Row};

use uninews_reminder::ReminderSchedule;
use uninews_types::Priority;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS reminders (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    channel_id INTEGER NOT NULL,
    author_moderator INTEGER NOT NULL,
    title TEXT NOT NULL,
    text TEXT NOT NULL,
    priority TEXT NOT NULL DEFAULT 'normal',
    creation_date TEXT,
    modification_date TEXT,
    start_date TEXT NOT NULL,
    next_date TEXT,
    end_date TEXT NOT NULL,
    interval_seconds INTEGER NOT NULL DEFAULT 0,
    ignore_next INTEGER NOT NULL DEFAULT 0,
    active INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS idx_reminders_channel ON reminders(channel_id);";

const COLUMNS: &str = "id, channel_id, author_moderator, title, text, priority, \
     creation_date, modification_date, start_date, next_date, end_date, \
     interval_seconds, ignore_next, active";

/// Persistent storage for reminder schedules.
pub struct ReminderStore {
    conn: Mutex<Connection>,
    tz: Tz,
}

impl ReminderStore {
    /// Open or create the reminder database at the given path.
    pub fn open(db_path: &Path, tz: Tz) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        conn.execute_batch(SCHEMA)?;
        tracing::info!("Reminder store opened: {}", db_path.display());
        Ok(Self {
            conn: Mutex::new(conn),
            tz,
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory(tz: Tz) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            tz,
        })
    }

    /// Insert a new schedule and return its assigned id.
    pub fn create(&self, schedule: &ReminderSchedule) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO reminders (channel_id, author_moderator, title, text, priority,
                creation_date, modification_date, start_date, next_date, end_date,
                interval_seconds, ignore_next, active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            rusqlite::params![
                schedule.channel_id,
                schedule.author_moderator,
                schedule.title,
                schedule.text,
                schedule.priority.as_str(),
                schedule.creation_date.map(|d| d.to_rfc3339()),
                schedule.modification_date.map(|d| d.to_rfc3339()),
                schedule.start_date.to_rfc3339(),
                schedule.next_date.map(|d| d.to_rfc3339()),
                schedule.end_date.to_rfc3339(),
                schedule.interval,
                schedule.ignore_next as i64,
                schedule.active as i64,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Overwrite an existing schedule. Returns false when the id is unknown.
    pub fn update(&self, schedule: &ReminderSchedule) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let count = conn.execute(
            "UPDATE reminders SET channel_id = ?2, author_moderator = ?3, title = ?4,
                text = ?5, priority = ?6, creation_date = ?7, modification_date = ?8,
                start_date = ?9, next_date = ?10, end_date = ?11, interval_seconds = ?12,
                ignore_next = ?13, active = ?14
             WHERE id = ?1",
            rusqlite::params![
                schedule.id,
                schedule.channel_id,
                schedule.author_moderator,
                schedule.title,
                schedule.text,
                schedule.priority.as_str(),
                schedule.creation_date.map(|d| d.to_rfc3339()),
                schedule.modification_date.map(|d| d.to_rfc3339()),
                schedule.start_date.to_rfc3339(),
                schedule.next_date.map(|d| d.to_rfc3339()),
                schedule.end_date.to_rfc3339(),
                schedule.interval,
                schedule.ignore_next as i64,
                schedule.active as i64,
            ],
        )?;
        Ok(count > 0)
    }

    /// Get a schedule by id.
    pub fn get(&self, id: i64) -> Result<Option<ReminderSchedule>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare(&format!("SELECT {COLUMNS} FROM reminders WHERE id = ?1"))?;
        let tz = self.tz;
        let result = stmt.query_row(rusqlite::params![id], |row| row_to_schedule(row, tz));
        match result {
            Ok(s) => Ok(Some(s)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List every active schedule, for the scheduler tick.
    pub fn list_active(&self) -> Result<Vec<ReminderSchedule>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare(&format!("SELECT {COLUMNS} FROM reminders WHERE active = 1"))?;
        let tz = self.tz;
        let schedules = stmt
            .query_map([], |row| row_to_schedule(row, tz))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(schedules)
    }

    /// List all schedules belonging to a channel.
    pub fn list_for_channel(&self, channel_id: i64) -> Result<Vec<ReminderSchedule>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM reminders WHERE channel_id = ?1 ORDER BY id"
        ))?;
        let tz = self.tz;
        let schedules = stmt
            .query_map(rusqlite::params![channel_id], |row| row_to_schedule(row, tz))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(schedules)
    }

    /// Delete a schedule. Returns false when the id is unknown.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let count = conn.execute("DELETE FROM reminders WHERE id = ?1", rusqlite::params![id])?;
        Ok(count > 0)
    }
}

fn row_to_schedule(row: &Row<'_>, tz: Tz) -> rusqlite::Result<ReminderSchedule> {
    Ok(ReminderSchedule {
        id: row.get(0)?,
        channel_id: row.get(1)?,
        author_moderator: row.get(2)?,
        title: row.get(3)?,
        text: row.get(4)?,
        priority: parse_priority(5, row.get::<_, String>(5)?)?,
        creation_date: parse_optional_date(6, row.get::<_, Option<String>>(6)?, tz)?,
        modification_date: parse_optional_date(7, row.get::<_, Option<String>>(7)?, tz)?,
        start_date: parse_date(8, row.get::<_, String>(8)?, tz)?,
        next_date: parse_optional_date(9, row.get::<_, Option<String>>(9)?, tz)?,
        end_date: parse_date(10, row.get::<_, String>(10)?, tz)?,
        interval: row.get(11)?,
        ignore_next: row.get::<_, i64>(12)? != 0,
        active: row.get::<_, i64>(13)? != 0,
    })
}

fn parse_date(idx: usize, value: String, tz: Tz) -> rusqlite::Result<DateTime<Tz>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&tz))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn parse_optional_date(
    idx: usize,
    value: Option<String>,
    tz: Tz,
) -> rusqlite::Result<Option<DateTime<Tz>>> {
    value.map(|v| parse_date(idx, v, tz)).transpose()
}

fn parse_priority(idx: usize, value: String) -> rusqlite::Result<Priority> {
    value.parse().map_err(|e: uninews_types::InvalidPriority| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uninews_reminder::DAY_SECONDS;

    fn berlin() -> Tz {
        "Europe/Berlin".parse().unwrap()
    }

    fn sample(tz: Tz, channel_id: i64) -> ReminderSchedule {
        ReminderSchedule {
            id: 0,
            channel_id,
            author_moderator: 42,
            title: "Exam registration".into(),
            text: "Closes at the end of the month.".into(),
            priority: Priority::High,
            creation_date: Some(tz.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).unwrap()),
            modification_date: Some(tz.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).unwrap()),
            start_date: tz.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
            next_date: Some(tz.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()),
            end_date: tz.with_ymd_and_hms(2025, 6, 30, 9, 0, 0).unwrap(),
            interval: 7 * DAY_SECONDS,
            ignore_next: false,
            active: true,
        }
    }

    #[test]
    fn test_create_and_get_round_trip() {
        let tz = berlin();
        let store = ReminderStore::open_in_memory(tz).unwrap();

        let mut schedule = sample(tz, 10);
        let id = store.create(&schedule).unwrap();
        schedule.id = id;

        let loaded = store.get(id).unwrap().expect("schedule should exist");
        assert_eq!(loaded, schedule);
    }

    #[test]
    fn test_get_unknown_id_is_none() {
        let store = ReminderStore::open_in_memory(berlin()).unwrap();
        assert!(store.get(999).unwrap().is_none());
    }

    #[test]
    fn test_update_persists_cursor_advance() {
        let tz = berlin();
        let store = ReminderStore::open_in_memory(tz).unwrap();

        let mut schedule = sample(tz, 10);
        schedule.id = store.create(&schedule).unwrap();

        schedule.next_date = Some(tz.with_ymd_and_hms(2025, 6, 8, 9, 0, 0).unwrap());
        assert!(store.update(&schedule).unwrap());

        let loaded = store.get(schedule.id).unwrap().unwrap();
        assert_eq!(loaded.next_date, schedule.next_date);
    }

    #[test]
    fn test_update_unknown_id_is_false() {
        let tz = berlin();
        let store = ReminderStore::open_in_memory(tz).unwrap();
        let mut schedule = sample(tz, 10);
        schedule.id = 12345;
        assert!(!store.update(&schedule).unwrap());
    }

    #[test]
    fn test_list_active_skips_suspended() {
        let tz = berlin();
        let store = ReminderStore::open_in_memory(tz).unwrap();

        store.create(&sample(tz, 1)).unwrap();
        let mut suspended = sample(tz, 2);
        suspended.active = false;
        store.create(&suspended).unwrap();

        let active = store.list_active().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].channel_id, 1);
    }

    #[test]
    fn test_list_for_channel_filters_and_orders() {
        let tz = berlin();
        let store = ReminderStore::open_in_memory(tz).unwrap();

        let a = store.create(&sample(tz, 7)).unwrap();
        store.create(&sample(tz, 8)).unwrap();
        let b = store.create(&sample(tz, 7)).unwrap();

        let listed = store.list_for_channel(7).unwrap();
        assert_eq!(listed.iter().map(|s| s.id).collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    fn test_delete() {
        let tz = berlin();
        let store = ReminderStore::open_in_memory(tz).unwrap();
        let id = store.create(&sample(tz, 1)).unwrap();
        assert!(store.delete(id).unwrap());
        assert!(!store.delete(id).unwrap());
        assert!(store.get(id).unwrap().is_none());
    }

    #[test]
    fn test_instants_survive_zone_rehydration() {
        // Stored as RFC 3339 with whatever offset applied; read back in the
        // configured zone the instant must be identical.
        let tz = berlin();
        let store = ReminderStore::open_in_memory(tz).unwrap();

        let mut schedule = sample(tz, 1);
        // A start inside DST, an end outside it.
        schedule.start_date = tz.with_ymd_and_hms(2025, 10, 25, 9, 0, 0).unwrap();
        schedule.next_date = Some(schedule.start_date);
        schedule.end_date = tz.with_ymd_and_hms(2025, 11, 25, 9, 0, 0).unwrap();
        schedule.id = store.create(&schedule).unwrap();

        let loaded = store.get(schedule.id).unwrap().unwrap();
        assert_eq!(loaded.start_date, schedule.start_date);
        assert_eq!(loaded.end_date, schedule.end_date);
        assert_eq!(loaded.next_date, schedule.next_date);
    }
}
