use chrono::Utc;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::client::CalendarApi;
use crate::config::ScanConfig;
use crate::error::MonitorError;
use crate::models::calendar::ReconcileReport;
use crate::models::slot::{SlotKey, Snapshot};
use crate::notifier::Notifier;
use crate::render::CalendarRenderer;
use crate::services::differ::diff;
use crate::services::last_slot::reduce_last_slots;
use crate::services::pager::{Pager, Termination};
use crate::services::reconciler::CalendarReconciler;
use crate::services::report::{notification_body, notification_subject, run_summary};
use crate::services::slot_parser::SlotParser;
use crate::services::state_store::StateStore;

// Calendar collaborator together with the calendar it mirrors into
pub struct CalendarSync {
    pub api: Arc<dyn CalendarApi>,
    pub calendar_id: String,
    pub title_prefix: String,
}

/// What one run did, returned to callers and the HTTP trigger.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub pages_scanned: usize,
    pub termination: Termination,
    pub slots_seen: usize,
    pub available: usize,
    pub first_run: bool,
    pub added: Vec<SlotKey>,
    pub removed: Vec<SlotKey>,
    pub persisted: bool,
    pub notified: bool,
    pub calendar: Option<ReconcileReport>,
}

/// Runs the scan, diff, persist, notify and reconcile pipeline.
///
/// Steps run strictly in sequence and at most one run is active at a time.
pub struct AvailabilityMonitor {
    config: ScanConfig,
    parser: SlotParser,
    renderer: Arc<dyn CalendarRenderer>,
    store: Arc<StateStore>,
    notifier: Option<Arc<dyn Notifier>>,
    calendar: Option<CalendarSync>,
    summary_path: Option<PathBuf>,
    run_lock: Mutex<()>,
}

impl AvailabilityMonitor {
    pub fn new(
        config: ScanConfig,
        renderer: Arc<dyn CalendarRenderer>,
        store: Arc<StateStore>,
    ) -> Self {
        Self {
            parser: SlotParser::new(&config.watch_list),
            config,
            renderer,
            store,
            notifier: None,
            calendar: None,
            summary_path: None,
            run_lock: Mutex::new(()),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_calendar(mut self, calendar: CalendarSync) -> Self {
        self.calendar = Some(calendar);
        self
    }

    pub fn with_summary_path(mut self, path: PathBuf) -> Self {
        self.summary_path = Some(path);
        self
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    pub async fn run_once(&self) -> Result<RunReport, MonitorError> {
        let _guard = self
            .run_lock
            .try_lock()
            .map_err(|_| MonitorError::ScanInProgress)?;

        // Prior state is read exactly once, before scanning
        let previous = self.store.load();
        let first_run = previous.is_none();
        let previous = previous.unwrap_or_else(Snapshot::empty);

        let pager = Pager::new(
            self.renderer.as_ref(),
            &self.parser,
            self.config.page_ceiling,
            self.config.settle_delay,
        );
        let scan = pager.scan(&self.config.calendar_url).await?;

        let statuses = reduce_last_slots(&scan.records);
        let current = Snapshot::from_statuses(statuses, Utc::now());
        let delta = diff(&previous, &current);

        info!(
            "{} open last slots ({} new, {} gone)",
            current.len(),
            delta.added.len(),
            delta.removed.len()
        );

        let persisted = match self.store.save(&current) {
            Ok(()) => true,
            Err(e) => {
                error!("Continuing without persisted state: {}", e);
                false
            }
        };

        let notified = if delta.has_additions() || first_run {
            self.notify(&delta.added, first_run).await
        } else {
            info!(
                "No changes - same availability as last check ({} slots still available)",
                current.len()
            );
            false
        };

        self.write_summary(&current, &delta.added, first_run);

        let calendar = match &self.calendar {
            Some(sync) => {
                let reconciler = CalendarReconciler::new(
                    sync.api.as_ref(),
                    &sync.calendar_id,
                    &sync.title_prefix,
                    self.config.time_zone,
                    &self.config.calendar_url,
                );
                match reconciler.reconcile(&current).await {
                    Ok(report) => Some(report),
                    Err(e) => {
                        error!("Calendar reconciliation failed: {}", e);
                        None
                    }
                }
            }
            None => None,
        };

        Ok(RunReport {
            pages_scanned: scan.pages_scanned,
            termination: scan.termination,
            slots_seen: scan.records.len(),
            available: current.len(),
            first_run,
            added: delta.added,
            removed: delta.removed,
            persisted,
            notified,
            calendar,
        })
    }

    async fn notify(&self, added: &[SlotKey], first_run: bool) -> bool {
        let Some(notifier) = &self.notifier else {
            info!("Notifier not configured - {} new slots not emailed", added.len());
            return false;
        };

        let today = Utc::now().with_timezone(&self.config.time_zone).date_naive();
        let subject = notification_subject(added, first_run);
        let body = notification_body(added, first_run, today, &self.config.calendar_url);

        match notifier.send(&subject, &body).await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to send notification: {}", e);
                false
            }
        }
    }

    fn write_summary(&self, current: &Snapshot, added: &[SlotKey], first_run: bool) {
        let Some(path) = &self.summary_path else {
            return;
        };

        let summary = run_summary(current, added, first_run, &self.config.calendar_url);
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| file.write_all(summary.as_bytes()));

        if let Err(e) = result {
            warn!("Failed to write run summary to {}: {}", path.display(), e);
        }
    }
}
