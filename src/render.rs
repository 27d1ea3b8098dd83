use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::RenderError;
use crate::models::slot::SlotElement;

// Opaque handle to a rendered page session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageHandle {
    pub id: String,
}

/// Headless browser collaborator that renders the reservation calendar.
///
/// Implementations own all selector and markup knowledge; the rest of the
/// crate only sees label and class pairs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CalendarRenderer: Send + Sync {
    async fn load_calendar(&self, url: &str) -> Result<PageHandle, RenderError>;

    async fn slot_elements(&self, page: &PageHandle) -> Result<Vec<SlotElement>, RenderError>;

    /// Returns `false` when the control is absent or disabled.
    async fn click_next(&self, page: &PageHandle) -> Result<bool, RenderError>;

    async fn is_next_disabled(&self, page: &PageHandle) -> Result<bool, RenderError>;

    /// Whether an end-of-range banner is shown on the current page.
    async fn end_of_range_reached(&self, page: &PageHandle) -> Result<bool, RenderError>;

    async fn wait_for_settle(&self, page: &PageHandle, delay: Duration) -> Result<(), RenderError>;

    async fn close(&self, page: &PageHandle) -> Result<(), RenderError>;
}

#[derive(Debug, Serialize)]
struct OpenPageRequest<'a> {
    url: &'a str,
    timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
struct FlagResponse {
    value: bool,
}

#[derive(Debug, Serialize)]
struct SettleRequest {
    delay_ms: u64,
}

/// Client for a headless-render sidecar that exposes page sessions over HTTP.
pub struct HttpRenderClient {
    client: Client,
    endpoint: String,
    navigation_timeout: Duration,
}

impl HttpRenderClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            navigation_timeout: Duration::from_secs(30),
        }
    }

    fn page_url(&self, page: &PageHandle, action: &str) -> String {
        format!("{}/pages/{}/{}", self.endpoint, page.id, action)
    }

    async fn check(res: reqwest::Response) -> Result<reqwest::Response, RenderError> {
        let status = res.status();
        if status.is_success() {
            Ok(res)
        } else {
            let body = res.text().await.unwrap_or_default();
            Err(RenderError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }

    async fn get_flag(&self, page: &PageHandle, action: &str) -> Result<bool, RenderError> {
        let res = self.client.get(self.page_url(page, action)).send().await?;
        let flag = Self::check(res).await?.json::<FlagResponse>().await?;
        Ok(flag.value)
    }
}

#[async_trait]
impl CalendarRenderer for HttpRenderClient {
    async fn load_calendar(&self, url: &str) -> Result<PageHandle, RenderError> {
        info!("Loading calendar page {}", url);

        let res = self
            .client
            .post(format!("{}/pages", self.endpoint))
            .json(&OpenPageRequest {
                url,
                timeout_ms: self.navigation_timeout.as_millis() as u64,
            })
            .timeout(self.navigation_timeout + Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| RenderError::Navigation(e.to_string()))?;

        let page = Self::check(res).await?.json::<PageHandle>().await?;
        debug!("Opened page session {}", page.id);
        Ok(page)
    }

    async fn slot_elements(&self, page: &PageHandle) -> Result<Vec<SlotElement>, RenderError> {
        let res = self
            .client
            .get(self.page_url(page, "slots"))
            .send()
            .await?;
        Ok(Self::check(res).await?.json::<Vec<SlotElement>>().await?)
    }

    async fn click_next(&self, page: &PageHandle) -> Result<bool, RenderError> {
        let res = self
            .client
            .post(self.page_url(page, "next"))
            .send()
            .await?;
        let clicked = Self::check(res).await?.json::<FlagResponse>().await?;
        Ok(clicked.value)
    }

    async fn is_next_disabled(&self, page: &PageHandle) -> Result<bool, RenderError> {
        self.get_flag(page, "next-disabled").await
    }

    async fn end_of_range_reached(&self, page: &PageHandle) -> Result<bool, RenderError> {
        self.get_flag(page, "end-of-range").await
    }

    async fn wait_for_settle(&self, page: &PageHandle, delay: Duration) -> Result<(), RenderError> {
        let res = self
            .client
            .post(self.page_url(page, "settle"))
            .json(&SettleRequest {
                delay_ms: delay.as_millis() as u64,
            })
            .timeout(delay + Duration::from_secs(10))
            .send()
            .await?;
        Self::check(res).await?;
        Ok(())
    }

    async fn close(&self, page: &PageHandle) -> Result<(), RenderError> {
        let res = self
            .client
            .delete(format!("{}/pages/{}", self.endpoint, page.id))
            .send()
            .await?;
        Self::check(res).await?;
        Ok(())
    }
}
