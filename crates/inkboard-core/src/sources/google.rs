//! Google Calendar + Tasks adapter.
//!
//! Reads the day's events from the Calendar v3 API and open tasks from the
//! Tasks v1 API with a bearer token taken from the environment. Obtaining
//! and refreshing that token is left to an external helper.
//!
//! The trait methods are synchronous and drive the async client with
//! `Handle::block_on`, so they must be called from a blocking worker
//! (`spawn_blocking`), which is how the refresh loop calls them. Every
//! request is bounded by the configured timeout, so a silent server costs
//! one refresh tick at most.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::{CalendarSource, TaskSource};
use crate::config::GoogleConfig;
use crate::data::{DayWindow, DisplayZone, Event, Task};
use crate::error::{AdapterError, ConfigError, CoreError};

const CALENDAR_SERVICE: &str = "google-calendar";
const TASKS_SERVICE: &str = "google-tasks";
/// Upper bound on followed `nextPageToken`s per request.
const MAX_PAGES: usize = 5;
const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventList {
    #[serde(default)]
    items: Vec<ApiEvent>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiEvent {
    id: String,
    summary: Option<String>,
    status: Option<String>,
    start: Option<ApiTime>,
    end: Option<ApiTime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiTime {
    date_time: Option<DateTime<FixedOffset>>,
    date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskList {
    #[serde(default)]
    items: Vec<ApiTask>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiTask {
    id: String,
    title: Option<String>,
    /// Date-only value sent as midnight UTC.
    due: Option<DateTime<FixedOffset>>,
    status: Option<String>,
    notes: Option<String>,
}

impl ApiTime {
    /// Timed events carry `dateTime`; all-day events only a `date`, which
    /// is midnight in the display zone.
    fn resolve(&self, zone: DisplayZone) -> Option<(DateTime<Utc>, bool)> {
        if let Some(dt) = self.date_time {
            return Some((dt.with_timezone(&Utc), false));
        }
        Some((zone.midnight(self.date?), true))
    }
}

fn into_event(api: ApiEvent, zone: DisplayZone) -> Option<Event> {
    if api.status.as_deref() == Some("cancelled") {
        return None;
    }
    let title = api.summary.filter(|s| !s.trim().is_empty())?;
    let (start, all_day) = api.start.as_ref()?.resolve(zone)?;
    let end = api.end.as_ref().and_then(|t| t.resolve(zone)).map(|(e, _)| e);
    // All-day ends are exclusive dates; keep the last covered day instead.
    let end = match end {
        Some(end) if all_day => Some(end - chrono::Duration::days(1)).filter(|e| *e > start),
        other => other,
    };
    Some(Event {
        id: api.id,
        title,
        start,
        end,
        all_day,
    })
}

fn into_task(api: ApiTask) -> Option<Task> {
    let title = api.title.filter(|s| !s.trim().is_empty())?;
    Some(Task {
        id: api.id,
        title,
        due: api.due.map(|d| d.date_naive()),
        completed: api.status.as_deref() == Some("completed"),
        notes: api.notes.filter(|n| !n.trim().is_empty()),
    })
}

fn block_on<F: Future>(service: &str, fut: F) -> Result<F::Output, AdapterError> {
    let handle = tokio::runtime::Handle::try_current()
        .map_err(|_| AdapterError::Unavailable(format!("{service} (no async runtime)")))?;
    Ok(handle.block_on(fut))
}

/// Google Calendar + Tasks adapter.
pub struct GoogleSource {
    client: Client,
    token: String,
    calendar_base_url: String,
    tasks_base_url: String,
    calendar_id: String,
    task_list: String,
    zone: DisplayZone,
}

impl GoogleSource {
    /// # Errors
    ///
    /// Returns `Http` if the HTTP client cannot be built.
    pub fn new(
        token: impl Into<String>,
        config: &GoogleConfig,
        zone: DisplayZone,
    ) -> Result<Self, AdapterError> {
        let timeout = config.request_timeout();
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(MAX_CONNECT_TIMEOUT))
            .build()
            .map_err(|e| AdapterError::Http {
                service: CALENDAR_SERVICE.to_string(),
                message: format!("failed to build client: {e}"),
            })?;
        Ok(Self {
            client,
            token: token.into(),
            calendar_base_url: config.calendar_base_url.trim_end_matches('/').to_string(),
            tasks_base_url: config.tasks_base_url.trim_end_matches('/').to_string(),
            calendar_id: config.calendar_id.clone(),
            task_list: config.task_list.clone(),
            zone,
        })
    }

    /// Build from config, reading the token from `config.token_env`.
    ///
    /// # Errors
    ///
    /// Returns `MissingKey` if the variable is unset or empty.
    pub fn from_config(config: &GoogleConfig, zone: DisplayZone) -> Result<Self, CoreError> {
        let token = std::env::var(&config.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingKey(format!("env {}", config.token_env)))?;
        Ok(Self::new(token, config, zone)?)
    }

    fn url(&self, service: &str, base: &str, segments: &[&str]) -> Result<Url, AdapterError> {
        let mut url = Url::parse(base).map_err(|e| AdapterError::Http {
            service: service.to_string(),
            message: format!("invalid base URL '{base}': {e}"),
        })?;
        url.path_segments_mut()
            .map_err(|_| AdapterError::Http {
                service: service.to_string(),
                message: format!("base URL '{base}' cannot hold a path"),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        service: &str,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<T, AdapterError> {
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await
            .map_err(|e| AdapterError::Http {
                service: service.to_string(),
                message: if e.is_timeout() {
                    format!("request timed out: {e}")
                } else {
                    e.to_string()
                },
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AdapterError::Status {
                service: service.to_string(),
                status: status.as_u16(),
            });
        }

        resp.json::<T>().await.map_err(|e| AdapterError::Decode {
            service: service.to_string(),
            message: e.to_string(),
        })
    }

    /// Events overlapping `window`, unfiltered and in API order.
    pub async fn events_in(&self, window: DayWindow) -> Result<Vec<Event>, AdapterError> {
        let url = self.url(
            CALENDAR_SERVICE,
            &self.calendar_base_url,
            &["calendars", &self.calendar_id, "events"],
        )?;
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut query = vec![
                ("timeMin", window.start.to_rfc3339()),
                ("timeMax", window.end.to_rfc3339()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
                ("maxResults", "250".to_string()),
            ];
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }
            let page: EventList = self.get_json(CALENDAR_SERVICE, url.clone(), &query).await?;
            events.extend(page.items.into_iter().filter_map(|e| into_event(e, self.zone)));
            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        debug!(count = events.len(), day = ?window.day, "Fetched calendar events");
        Ok(events)
    }

    /// Open tasks from the configured list, in API order.
    pub async fn open_tasks(&self) -> Result<Vec<Task>, AdapterError> {
        let url = self.url(
            TASKS_SERVICE,
            &self.tasks_base_url,
            &["lists", &self.task_list, "tasks"],
        )?;
        let mut tasks = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut query = vec![
                ("showCompleted", "false".to_string()),
                ("maxResults", "100".to_string()),
            ];
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }
            let page: TaskList = self.get_json(TASKS_SERVICE, url.clone(), &query).await?;
            tasks.extend(page.items.into_iter().filter_map(into_task));
            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        debug!(count = tasks.len(), "Fetched tasks");
        Ok(tasks)
    }
}

impl CalendarSource for GoogleSource {
    fn name(&self) -> &str {
        CALENDAR_SERVICE
    }

    fn fetch_events(&self, window: DayWindow) -> Result<Vec<Event>, AdapterError> {
        block_on(CALENDAR_SERVICE, self.events_in(window))?
    }
}

impl TaskSource for GoogleSource {
    fn name(&self) -> &str {
        TASKS_SERVICE
    }

    fn fetch_tasks(&self) -> Result<Vec<Task>, AdapterError> {
        block_on(TASKS_SERVICE, self.open_tasks())?
    }
}
