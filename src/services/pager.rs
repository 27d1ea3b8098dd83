use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::MonitorError;
use crate::models::slot::{SlotElement, SlotRecord};
use crate::render::{CalendarRenderer, PageHandle};
use crate::services::slot_parser::SlotParser;

// Why the page walk stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    NextDisabled,
    EndOfRange,
    PageCeiling,
    Stalled,
    RenderFailure,
}

#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub records: Vec<SlotRecord>,
    pub pages_scanned: usize,
    pub termination: Termination,
}

/// Walks the paginated calendar, scraping each page once it has settled.
pub struct Pager<'a> {
    renderer: &'a dyn CalendarRenderer,
    parser: &'a SlotParser,
    page_ceiling: usize,
    settle_delay: Duration,
}

impl<'a> Pager<'a> {
    pub fn new(
        renderer: &'a dyn CalendarRenderer,
        parser: &'a SlotParser,
        page_ceiling: usize,
        settle_delay: Duration,
    ) -> Self {
        Self {
            renderer,
            parser,
            page_ceiling: page_ceiling.max(1),
            settle_delay,
        }
    }

    /// Scan every page starting at `url`.
    ///
    /// Failing to open the calendar or to read the first page is fatal. Any
    /// later failure ends the walk early and keeps what was collected.
    pub async fn scan(&self, url: &str) -> Result<ScanOutcome, MonitorError> {
        let page = self
            .renderer
            .load_calendar(url)
            .await
            .map_err(MonitorError::PageLoad)?;

        let result = self.walk(&page).await;

        if let Err(e) = self.renderer.close(&page).await {
            warn!("Failed to close calendar page: {}", e);
        }

        result
    }

    async fn walk(&self, page: &PageHandle) -> Result<ScanOutcome, MonitorError> {
        self.renderer
            .wait_for_settle(page, self.settle_delay)
            .await
            .map_err(MonitorError::PageLoad)?;

        let first = self
            .renderer
            .slot_elements(page)
            .await
            .map_err(MonitorError::NoPageData)?;

        let mut records = self.parser.parse(&first);
        info!("Page 1: {} watched slots", records.len());
        let mut previous_labels = labels(&first);
        let mut page_number = 1;

        let termination = loop {
            if let Some(reason) = self.end_reached(page).await {
                break reason;
            }

            if page_number >= self.page_ceiling {
                warn!(
                    "Reached safety limit of {} pages - stopping pagination",
                    self.page_ceiling
                );
                break Termination::PageCeiling;
            }

            match self.renderer.click_next(page).await {
                Ok(true) => debug!("Clicked next button"),
                Ok(false) => {
                    warn!("Next button could not be clicked - treating as end of calendar");
                    break Termination::Stalled;
                }
                Err(e) => {
                    warn!("Could not click next button: {}", e);
                    break Termination::RenderFailure;
                }
            }

            if let Err(e) = self.renderer.wait_for_settle(page, self.settle_delay).await {
                warn!("Page did not settle after advancing: {}", e);
                break Termination::RenderFailure;
            }

            let elements = match self.renderer.slot_elements(page).await {
                Ok(elements) => elements,
                Err(e) => {
                    warn!("Failed to read page {}: {}", page_number + 1, e);
                    break Termination::RenderFailure;
                }
            };

            let current_labels = labels(&elements);
            if !current_labels.is_empty() && current_labels == previous_labels {
                warn!(
                    "Page {} is unchanged after clicking next - aborting pagination",
                    page_number + 1
                );
                break Termination::Stalled;
            }

            page_number += 1;
            let page_records = self.parser.parse(&elements);
            info!("Page {}: {} watched slots", page_number, page_records.len());
            records.extend(page_records);
            previous_labels = current_labels;
        };

        info!(
            "Scanned {} pages, {} watched slots in total ({:?})",
            page_number,
            records.len(),
            termination
        );

        Ok(ScanOutcome {
            records,
            pages_scanned: page_number,
            termination,
        })
    }

    // Both end-of-data signals are checked; the first one that holds wins
    async fn end_reached(&self, page: &PageHandle) -> Option<Termination> {
        match self.renderer.is_next_disabled(page).await {
            Ok(true) => {
                info!("Next button is disabled - reached end of calendar");
                return Some(Termination::NextDisabled);
            }
            Ok(false) => {}
            Err(e) => {
                warn!("Could not read next button state: {}", e);
                return Some(Termination::RenderFailure);
            }
        }

        match self.renderer.end_of_range_reached(page).await {
            Ok(true) => {
                info!("End-of-range banner shown - reached end of calendar");
                Some(Termination::EndOfRange)
            }
            Ok(false) => None,
            Err(e) => {
                debug!("Could not check end-of-range banner: {}", e);
                None
            }
        }
    }
}

fn labels(elements: &[SlotElement]) -> Vec<String> {
    elements.iter().map(|e| e.label.clone()).collect()
}
