//! Incremental listing of a realm's devices.
//!
//! [`DeviceListPaginator`] walks `GET /v1/{realm}/devices` one bounded page at a time. The
//! cursor only moves after a page has been fetched and decoded successfully, so a failed
//! [`DeviceListPaginator::get_next_page`] can be retried as is.

use crate::models::DeviceListResponse;
use crate::Result;
use astarte_core::client::ServiceClient;
use astarte_core::query::QueryParams;
use astarte_core::{DeviceId, Error};
use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, trace};
use url::Url;

/// Query parameter bounding the page length.
pub const LIMIT_PARAM: &str = "limit";

/// Query parameter carrying the continuation token.
pub const FROM_TOKEN_PARAM: &str = "from_token";

/// Something that can fetch one page of the device list.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DevicePageSource: Send + Sync {
    /// Fetch the page at `endpoint` selected by `query`.
    async fn fetch_device_page(
        &self,
        endpoint: &Url,
        query: &QueryParams,
    ) -> Result<DeviceListResponse>;
}

#[async_trait]
impl DevicePageSource for ServiceClient {
    async fn fetch_device_page(
        &self,
        endpoint: &Url,
        query: &QueryParams,
    ) -> Result<DeviceListResponse> {
        self.get_json(endpoint.clone(), query.as_pairs(), StatusCode::OK)
            .await
    }
}

/// Position of the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginatorState {
    /// Nothing fetched yet.
    Ready,
    /// At least one page fetched and the server returned a continuation.
    HasMore,
    /// The last page has been returned. Terminal.
    Exhausted,
}

/// Stateful cursor over the device list of a realm.
///
/// Not meant to be shared: [`get_next_page`](Self::get_next_page) takes `&mut self`.
#[derive(Debug)]
pub struct DeviceListPaginator<S = ServiceClient> {
    source: S,
    endpoint: Url,
    query: QueryParams,
    page_size: u32,
    state: PaginatorState,
}

impl<S: DevicePageSource> DeviceListPaginator<S> {
    /// Create a paginator over `endpoint` returning at most `page_size` IDs per page.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if `page_size` is zero.
    pub fn new(source: S, endpoint: Url, page_size: u32) -> Result<Self> {
        if page_size == 0 {
            return Err(Error::ConfigError(
                "page size must be at least 1".to_string(),
            ));
        }

        let mut query = QueryParams::new();
        query.set(LIMIT_PARAM, page_size);

        Ok(Self {
            source,
            endpoint,
            query,
            page_size,
            state: PaginatorState::Ready,
        })
    }

    /// Returns true until a page without continuation has been returned.
    #[must_use]
    pub fn has_next_page(&self) -> bool {
        self.state != PaginatorState::Exhausted
    }

    /// Current cursor position.
    #[must_use]
    pub const fn state(&self) -> PaginatorState {
        self.state
    }

    /// Page size fixed at construction.
    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Continuation token the next fetch will send, if any.
    #[must_use]
    pub fn continuation_token(&self) -> Option<&str> {
        self.query.get(FROM_TOKEN_PARAM)
    }

    /// Fetch the next page of device IDs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PaginatorExhausted`] without issuing a request once the last page has
    /// been returned. Transport, status and decode failures are returned unchanged and leave
    /// the cursor where it was, as does [`Error::ParseError`] for a `next` link without a
    /// continuation token.
    pub async fn get_next_page(&mut self) -> Result<Vec<DeviceId>> {
        if !self.has_next_page() {
            return Err(Error::PaginatorExhausted);
        }

        let page = self
            .source
            .fetch_device_page(&self.endpoint, &self.query)
            .await?;
        let next_query = page
            .next_link()
            .map(|link| self.query_from_link(link))
            .transpose()?;

        match next_query {
            Some(query) => {
                trace!(next = ?query.as_pairs(), "device list continues");
                self.query = query;
                self.state = PaginatorState::HasMore;
            }
            None => self.state = PaginatorState::Exhausted,
        }

        debug!(
            endpoint = %self.endpoint,
            devices = page.data.len(),
            has_next = self.has_next_page(),
            "fetched device page"
        );

        Ok(page.data)
    }

    /// Drive the paginator to exhaustion, concatenating pages in arrival order.
    ///
    /// # Errors
    ///
    /// The first failing page aborts the walk; IDs gathered so far are discarded.
    pub async fn collect_remaining(mut self) -> Result<Vec<DeviceId>> {
        let mut devices = Vec::new();
        while self.has_next_page() {
            devices.extend(self.get_next_page().await?);
        }
        Ok(devices)
    }

    fn query_from_link(&self, link: &str) -> Result<QueryParams> {
        let url = self.endpoint.join(link)?;
        let mut query = QueryParams::from_url(&url);
        // Without a token the next fetch would restart the listing.
        if !matches!(query.get(FROM_TOKEN_PARAM), Some(token) if !token.is_empty()) {
            return Err(Error::ParseError(format!(
                "next link `{link}` carries no `{FROM_TOKEN_PARAM}`"
            )));
        }
        query.set(LIMIT_PARAM, self.page_size);
        Ok(query)
    }
}
