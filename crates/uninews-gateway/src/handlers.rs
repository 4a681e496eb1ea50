//! REST handlers for the reminder resource.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use uninews_reminder::{ReminderSchedule, ValidationError, initialize_cursor, validate};
use uninews_store::StoreError;
use uninews_types::Priority;

use crate::{GatewayState, authorize};

// ─── Errors ─────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("reminder not found")]
    NotFound,
    #[error("unauthorized")]
    Unauthorized,
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Store(e) => {
                error!("Storage error while handling request: {e}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

// ─── Wire types ─────────────────────────────────────────────────────────

/// Body of POST /channel/{channel_id}/reminder. Dates arrive with any
/// offset and are converted into the platform time zone before use.
#[derive(Debug, Deserialize)]
pub struct ReminderRequest {
    pub author_moderator: i64,
    pub title: String,
    pub text: String,
    #[serde(default)]
    pub priority: Priority,
    pub start_date: DateTime<FixedOffset>,
    pub end_date: DateTime<FixedOffset>,
    pub interval: u32,
    #[serde(default)]
    pub ignore_next: bool,
}

/// Body of PATCH /channel/{channel_id}/reminder/{reminder_id}. Absent
/// fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
pub struct ReminderPatch {
    pub title: Option<String>,
    pub text: Option<String>,
    pub priority: Option<Priority>,
    pub start_date: Option<DateTime<FixedOffset>>,
    pub end_date: Option<DateTime<FixedOffset>>,
    pub interval: Option<u32>,
    pub ignore_next: Option<bool>,
    pub active: Option<bool>,
}

/// Reminder as returned to clients. The recurrence cursor stays internal.
#[derive(Debug, Serialize)]
pub struct ReminderResponse {
    pub id: i64,
    pub channel_id: i64,
    pub author_moderator: i64,
    pub title: String,
    pub text: String,
    pub priority: Priority,
    pub creation_date: Option<DateTime<Tz>>,
    pub modification_date: Option<DateTime<Tz>>,
    pub start_date: DateTime<Tz>,
    pub end_date: DateTime<Tz>,
    pub interval: u32,
    pub ignore_next: bool,
    pub active: bool,
}

impl From<&ReminderSchedule> for ReminderResponse {
    fn from(s: &ReminderSchedule) -> Self {
        Self {
            id: s.id,
            channel_id: s.channel_id,
            author_moderator: s.author_moderator,
            title: s.title.clone(),
            text: s.text.clone(),
            priority: s.priority,
            creation_date: s.creation_date,
            modification_date: s.modification_date,
            start_date: s.start_date,
            end_date: s.end_date,
            interval: s.interval,
            ignore_next: s.ignore_next,
            active: s.active,
        }
    }
}

// ─── Handlers ───────────────────────────────────────────────────────────

/// GET /health — returns system status.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// POST /channel/{channel_id}/reminder — create a reminder.
pub async fn create_reminder(
    State(state): State<Arc<GatewayState>>,
    Path(channel_id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<ReminderRequest>,
) -> Result<(StatusCode, Json<ReminderResponse>), ApiError> {
    authorize(&state, &headers)?;
    let tz = state.tz;
    let now = Utc::now().with_timezone(&tz);

    let mut schedule = ReminderSchedule {
        id: 0,
        channel_id,
        author_moderator: req.author_moderator,
        title: req.title,
        text: req.text,
        priority: req.priority,
        creation_date: None,
        modification_date: None,
        next_date: None,
        start_date: req.start_date.with_timezone(&tz),
        end_date: req.end_date.with_timezone(&tz),
        interval: req.interval,
        ignore_next: req.ignore_next,
        active: true,
    };
    validate(&schedule, now)?;
    schedule.touch_created(now);
    schedule.touch_modified(now);
    let mut schedule = initialize_cursor(schedule, now);

    schedule.id = state.store.create(&schedule)?;
    info!(
        reminder_id = schedule.id,
        channel_id, "Reminder created"
    );
    Ok((StatusCode::CREATED, Json(ReminderResponse::from(&schedule))))
}

/// GET /channel/{channel_id}/reminder — list the channel's reminders.
pub async fn list_reminders(
    State(state): State<Arc<GatewayState>>,
    Path(channel_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Vec<ReminderResponse>>, ApiError> {
    authorize(&state, &headers)?;
    let reminders = state.store.list_for_channel(channel_id)?;
    Ok(Json(reminders.iter().map(ReminderResponse::from).collect()))
}

/// GET /channel/{channel_id}/reminder/{reminder_id} — fetch one reminder.
pub async fn get_reminder(
    State(state): State<Arc<GatewayState>>,
    Path((channel_id, reminder_id)): Path<(i64, i64)>,
    headers: HeaderMap,
) -> Result<Json<ReminderResponse>, ApiError> {
    authorize(&state, &headers)?;
    let schedule = fetch_in_channel(&state, channel_id, reminder_id)?;
    Ok(Json(ReminderResponse::from(&schedule)))
}

/// PATCH /channel/{channel_id}/reminder/{reminder_id} — partial update.
///
/// Changing any of the recurrence parameters (start, end, interval)
/// discards the stored cursor and recomputes it against the new
/// parameters. Metadata edits leave the cursor untouched.
pub async fn patch_reminder(
    State(state): State<Arc<GatewayState>>,
    Path((channel_id, reminder_id)): Path<(i64, i64)>,
    headers: HeaderMap,
    Json(patch): Json<ReminderPatch>,
) -> Result<Json<ReminderResponse>, ApiError> {
    authorize(&state, &headers)?;
    let tz = state.tz;
    let now = Utc::now().with_timezone(&tz);

    let mut schedule = fetch_in_channel(&state, channel_id, reminder_id)?;

    if let Some(title) = patch.title {
        schedule.title = title;
    }
    if let Some(text) = patch.text {
        schedule.text = text;
    }
    if let Some(priority) = patch.priority {
        schedule.priority = priority;
    }
    if let Some(ignore_next) = patch.ignore_next {
        schedule.ignore_next = ignore_next;
    }
    if let Some(active) = patch.active {
        schedule.active = active;
    }

    let mut recompute = false;
    if let Some(start) = patch.start_date {
        schedule.start_date = start.with_timezone(&tz);
        recompute = true;
    }
    if let Some(end) = patch.end_date {
        schedule.end_date = end.with_timezone(&tz);
        recompute = true;
    }
    if let Some(interval) = patch.interval {
        schedule.interval = interval;
        recompute = true;
    }

    validate(&schedule, now)?;
    schedule.touch_modified(now);
    if recompute {
        schedule.next_date = None;
        schedule = initialize_cursor(schedule, now);
    }

    if !state.store.update(&schedule)? {
        return Err(ApiError::NotFound);
    }
    info!(reminder_id, channel_id, "Reminder updated");
    Ok(Json(ReminderResponse::from(&schedule)))
}

/// DELETE /channel/{channel_id}/reminder/{reminder_id}.
pub async fn delete_reminder(
    State(state): State<Arc<GatewayState>>,
    Path((channel_id, reminder_id)): Path<(i64, i64)>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    authorize(&state, &headers)?;
    fetch_in_channel(&state, channel_id, reminder_id)?;
    if !state.store.delete(reminder_id)? {
        return Err(ApiError::NotFound);
    }
    info!(reminder_id, channel_id, "Reminder deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Fetch a reminder and check it belongs to the addressed channel. A
/// reminder reached through the wrong channel is treated as absent.
fn fetch_in_channel(
    state: &GatewayState,
    channel_id: i64,
    reminder_id: i64,
) -> Result<ReminderSchedule, ApiError> {
    match state.store.get(reminder_id)? {
        Some(schedule) if schedule.channel_id == channel_id => Ok(schedule),
        _ => Err(ApiError::NotFound),
    }
}
