use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use crate::client::{CalendarApi, MockCalendarApi};
use crate::error::{CalendarError, NotifyError, RenderError};
use crate::models::calendar::{CalendarEvent, EventDraft};
use crate::models::slot::SlotElement;
use crate::notifier::Notifier;
use crate::render::{CalendarRenderer, MockCalendarRenderer, PageHandle};

// A simple in-memory calendar with mutation counters
#[derive(Default)]
pub struct FakeCalendar {
    events: Mutex<BTreeMap<String, CalendarEvent>>,
    next_id: AtomicUsize,
    pub creates: AtomicUsize,
    pub updates: AtomicUsize,
    pub deletes: AtomicUsize,
}

impl FakeCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: Vec<CalendarEvent>) -> Self {
        let fake = Self::new();
        {
            let mut stored = fake.events.lock().unwrap();
            for event in events {
                stored.insert(event.id.clone(), event);
            }
        }
        fake
    }

    pub fn events(&self) -> Vec<CalendarEvent> {
        let mut events: Vec<CalendarEvent> = self.events.lock().unwrap().values().cloned().collect();
        events.sort_by_key(|e| e.start);
        events
    }

    pub fn mutations(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
            + self.updates.load(Ordering::SeqCst)
            + self.deletes.load(Ordering::SeqCst)
    }

    pub fn reset_counters(&self) {
        self.creates.store(0, Ordering::SeqCst);
        self.updates.store(0, Ordering::SeqCst);
        self.deletes.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl CalendarApi for FakeCalendar {
    // Same window rule as the Google API: events ending after time_min
    async fn list_events(
        &self,
        _calendar_id: &str,
        time_min: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        Ok(self
            .events()
            .into_iter()
            .filter(|e| e.end > time_min)
            .collect())
    }

    async fn create_event(
        &self,
        _calendar_id: &str,
        event: &EventDraft,
    ) -> Result<CalendarEvent, CalendarError> {
        let id = format!("event_{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let created = event.clone().into_event(id.clone());
        self.events.lock().unwrap().insert(id, created.clone());
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(created)
    }

    async fn update_event(
        &self,
        _calendar_id: &str,
        event_id: &str,
        event: &EventDraft,
    ) -> Result<(), CalendarError> {
        let mut events = self.events.lock().unwrap();
        if !events.contains_key(event_id) {
            return Err(CalendarError::Status {
                status: 404,
                body: format!("no event {}", event_id),
            });
        }
        events.insert(event_id.to_string(), event.clone().into_event(event_id.to_string()));
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_event(&self, _calendar_id: &str, event_id: &str) -> Result<(), CalendarError> {
        self.events.lock().unwrap().remove(event_id);
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Renderer that serves a fixed list of pages and disables "next" on the last one.
pub struct ScriptedRenderer {
    pages: Vec<Vec<SlotElement>>,
    current: AtomicUsize,
    pub settles: AtomicUsize,
    pub closed: AtomicUsize,
    fail_load: bool,
}

impl ScriptedRenderer {
    pub fn new(pages: Vec<Vec<SlotElement>>) -> Self {
        Self {
            pages,
            current: AtomicUsize::new(0),
            settles: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
            fail_load: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_load: true,
            ..Self::new(Vec::new())
        }
    }
}

#[async_trait]
impl CalendarRenderer for ScriptedRenderer {
    async fn load_calendar(&self, url: &str) -> Result<PageHandle, RenderError> {
        if self.fail_load {
            return Err(RenderError::Navigation(format!("timeout loading {}", url)));
        }
        self.current.store(0, Ordering::SeqCst);
        Ok(PageHandle {
            id: "page-1".to_string(),
        })
    }

    async fn slot_elements(&self, _page: &PageHandle) -> Result<Vec<SlotElement>, RenderError> {
        let index = self.current.load(Ordering::SeqCst);
        Ok(self.pages.get(index).cloned().unwrap_or_default())
    }

    async fn click_next(&self, _page: &PageHandle) -> Result<bool, RenderError> {
        let index = self.current.load(Ordering::SeqCst);
        if index + 1 < self.pages.len() {
            self.current.store(index + 1, Ordering::SeqCst);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn is_next_disabled(&self, _page: &PageHandle) -> Result<bool, RenderError> {
        Ok(self.current.load(Ordering::SeqCst) + 1 >= self.pages.len())
    }

    async fn end_of_range_reached(&self, _page: &PageHandle) -> Result<bool, RenderError> {
        Ok(false)
    }

    async fn wait_for_settle(&self, _page: &PageHandle, _delay: Duration) -> Result<(), RenderError> {
        self.settles.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self, _page: &PageHandle) -> Result<(), RenderError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Scripted renderer that parks the first settle until `release` is notified.
pub struct GatedRenderer {
    inner: ScriptedRenderer,
    held: AtomicBool,
    pub entered: Notify,
    pub release: Notify,
}

impl GatedRenderer {
    pub fn new(pages: Vec<Vec<SlotElement>>) -> Self {
        Self {
            inner: ScriptedRenderer::new(pages),
            held: AtomicBool::new(false),
            entered: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl CalendarRenderer for GatedRenderer {
    async fn load_calendar(&self, url: &str) -> Result<PageHandle, RenderError> {
        self.inner.load_calendar(url).await
    }

    async fn slot_elements(&self, page: &PageHandle) -> Result<Vec<SlotElement>, RenderError> {
        self.inner.slot_elements(page).await
    }

    async fn click_next(&self, page: &PageHandle) -> Result<bool, RenderError> {
        self.inner.click_next(page).await
    }

    async fn is_next_disabled(&self, page: &PageHandle) -> Result<bool, RenderError> {
        self.inner.is_next_disabled(page).await
    }

    async fn end_of_range_reached(&self, page: &PageHandle) -> Result<bool, RenderError> {
        self.inner.end_of_range_reached(page).await
    }

    async fn wait_for_settle(&self, page: &PageHandle, delay: Duration) -> Result<(), RenderError> {
        if !self.held.swap(true, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.wait_for_settle(page, delay).await
    }

    async fn close(&self, page: &PageHandle) -> Result<(), RenderError> {
        self.inner.close(page).await
    }
}

// Notifier that records every message it is asked to send
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap()
            .push((subject.to_string(), body.to_string()));
        if self.fail {
            return Err(NotifyError::Status {
                status: 503,
                body: "relay unavailable".to_string(),
            });
        }
        Ok(())
    }
}

/// Mock renderer whose "next" control never reports disabled and whose
/// pages always differ, for exercising the page ceiling.
pub fn setup_endless_renderer() -> (MockCalendarRenderer, Arc<AtomicUsize>) {
    let clicks = Arc::new(AtomicUsize::new(0));
    let mut renderer = MockCalendarRenderer::new();

    renderer.expect_load_calendar().returning(|_| {
        Ok(PageHandle {
            id: "endless".to_string(),
        })
    });
    renderer.expect_wait_for_settle().returning(|_, _| Ok(()));
    renderer.expect_is_next_disabled().returning(|_| Ok(false));
    renderer.expect_end_of_range_reached().returning(|_| Ok(false));
    renderer.expect_close().returning(|_| Ok(()));

    let clicks_ref = Arc::clone(&clicks);
    renderer.expect_click_next().returning(move |_| {
        clicks_ref.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    });

    let page_ref = Arc::clone(&clicks);
    renderer.expect_slot_elements().returning(move |_| {
        let page = page_ref.load(Ordering::SeqCst);
        Ok(vec![SlotElement::new(
            &format!("11:00pm - Monday, March {}, 2026 - Laser Cutter - Available", page + 1),
            "fc-timeline-event",
        )])
    });

    (renderer, clicks)
}

/// Mock calendar API whose listing always fails.
pub fn setup_unreachable_calendar() -> MockCalendarApi {
    let mut api = MockCalendarApi::new();
    api.expect_list_events().returning(|_, _| {
        Err(CalendarError::Status {
            status: 503,
            body: "backend error".to_string(),
        })
    });
    api.expect_create_event().never();
    api.expect_update_event().never();
    api.expect_delete_event().never();
    api
}
