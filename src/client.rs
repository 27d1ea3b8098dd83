use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::CalendarConfig;
use crate::error::CalendarError;
use crate::models::calendar::{CalendarEvent, EventDraft};

/// External calendar that mirrors the current availability.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CalendarApi: Send + Sync {
    /// Events that have not ended by `time_min`.
    async fn list_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError>;

    async fn create_event(
        &self,
        calendar_id: &str,
        event: &EventDraft,
    ) -> Result<CalendarEvent, CalendarError>;

    async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        event: &EventDraft,
    ) -> Result<(), CalendarError>;

    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<(), CalendarError>;
}

// Google Calendar v3 wire types
#[derive(Debug, Serialize, Deserialize)]
pub struct EventDateTime {
    #[serde(rename = "dateTime", skip_serializing_if = "Option::is_none")]
    pub date_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GoogleEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    pub start: EventDateTime,
    pub end: EventDateTime,
    #[serde(rename = "colorId", skip_serializing_if = "Option::is_none")]
    pub color_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EventsPage {
    #[serde(default)]
    pub items: Vec<GoogleEvent>,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

impl From<&EventDraft> for GoogleEvent {
    fn from(draft: &EventDraft) -> Self {
        Self {
            id: None,
            summary: draft.title.clone(),
            description: draft.description.clone(),
            start: EventDateTime {
                date_time: Some(draft.start),
            },
            end: EventDateTime {
                date_time: Some(draft.end),
            },
            color_id: draft.color_id.clone(),
        }
    }
}

impl TryFrom<GoogleEvent> for CalendarEvent {
    type Error = CalendarError;

    fn try_from(event: GoogleEvent) -> Result<Self, Self::Error> {
        let id = event
            .id
            .ok_or_else(|| CalendarError::Malformed("event without id".to_string()))?;
        // All-day events carry only a date and are never ours
        let (start, end) = match (event.start.date_time, event.end.date_time) {
            (Some(start), Some(end)) => (start, end),
            _ => return Err(CalendarError::Malformed(format!("event {} has no start time", id))),
        };

        Ok(CalendarEvent {
            id,
            title: event.summary,
            description: event.description,
            start,
            end,
            color_id: event.color_id,
        })
    }
}

/// Client for the Google Calendar v3 REST API
pub struct GoogleCalendarClient {
    client: Client,
    endpoint: String,
    access_token: String,
}

impl GoogleCalendarClient {
    pub fn new(config: &CalendarConfig) -> Self {
        Self {
            client: Client::new(),
            endpoint: config.api_endpoint.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
        }
    }

    fn events_url(&self, calendar_id: &str, event_id: Option<&str>) -> Result<Url, CalendarError> {
        let mut url = Url::parse(&self.endpoint)
            .map_err(|e| CalendarError::Malformed(format!("bad API endpoint: {}", e)))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| CalendarError::Malformed("API endpoint cannot be a base".to_string()))?;
            segments.pop_if_empty();
            segments.extend(["calendars", calendar_id, "events"]);
            if let Some(event_id) = event_id {
                segments.push(event_id);
            }
        }
        Ok(url)
    }

    async fn check(res: reqwest::Response) -> Result<reqwest::Response, CalendarError> {
        let status = res.status();
        if status.is_success() {
            Ok(res)
        } else {
            let body = res.text().await.unwrap_or_default();
            Err(CalendarError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl CalendarApi for GoogleCalendarClient {
    async fn list_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        let url = self.events_url(calendar_id, None)?;
        let time_min = time_min.to_rfc3339();
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        info!("Listing events in calendar {} ending after {}", calendar_id, time_min);

        loop {
            let mut request = self
                .client
                .get(url.clone())
                .bearer_auth(&self.access_token)
                .query(&[
                    ("timeMin", time_min.as_str()),
                    ("singleEvents", "true"),
                    ("orderBy", "startTime"),
                    ("maxResults", "250"),
                ]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let page = Self::check(request.send().await?)
                .await?
                .json::<EventsPage>()
                .await?;

            for item in page.items {
                match CalendarEvent::try_from(item) {
                    Ok(event) => events.push(event),
                    Err(e) => debug!("Skipping calendar entry: {}", e),
                }
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        info!("Found {} events", events.len());
        Ok(events)
    }

    async fn create_event(
        &self,
        calendar_id: &str,
        event: &EventDraft,
    ) -> Result<CalendarEvent, CalendarError> {
        let url = self.events_url(calendar_id, None)?;
        let res = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&GoogleEvent::from(event))
            .send()
            .await?;

        let created = Self::check(res).await?.json::<GoogleEvent>().await?;
        CalendarEvent::try_from(created)
    }

    async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        event: &EventDraft,
    ) -> Result<(), CalendarError> {
        let url = self.events_url(calendar_id, Some(event_id))?;
        let res = self
            .client
            .put(url)
            .bearer_auth(&self.access_token)
            .json(&GoogleEvent::from(event))
            .send()
            .await?;
        Self::check(res).await?;
        Ok(())
    }

    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<(), CalendarError> {
        let url = self.events_url(calendar_id, Some(event_id))?;
        let res = self
            .client
            .delete(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        Self::check(res).await?;
        Ok(())
    }
}
