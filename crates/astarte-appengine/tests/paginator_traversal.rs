//! Paginator traversal against an in-memory device list.

use astarte_appengine::models::{DeviceListLinks, DeviceListResponse};
use astarte_appengine::paginator::{DeviceListPaginator, DevicePageSource, PaginatorState};
use astarte_appengine::{DeviceId, Result};
use astarte_core::query::QueryParams;
use astarte_core::Error;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use url::Url;

/// Serves `devices` in order. Tokens are opaque to the paginator.
struct MemoryBackend {
    devices: Vec<DeviceId>,
    fetches: AtomicUsize,
    fail_fetch: Mutex<Option<usize>>,
}

impl MemoryBackend {
    fn with_devices(count: usize) -> Self {
        Self {
            devices: (0..count).map(|_| DeviceId::random()).collect(),
            fetches: AtomicUsize::new(0),
            fail_fetch: Mutex::new(None),
        }
    }

    /// Fail the `nth` fetch (0-based) once.
    fn failing_once_at(mut self, nth: usize) -> Self {
        self.fail_fetch = Mutex::new(Some(nth));
        self
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DevicePageSource for &MemoryBackend {
    async fn fetch_device_page(
        &self,
        endpoint: &Url,
        query: &QueryParams,
    ) -> Result<DeviceListResponse> {
        let attempt = self.fetches.fetch_add(1, Ordering::SeqCst);
        {
            let mut fail = self.fail_fetch.lock().unwrap();
            if *fail == Some(attempt) {
                *fail = None;
                return Err(Error::Timeout("simulated".to_string()));
            }
        }

        let limit: usize = query.get("limit").unwrap().parse().unwrap();
        let start: usize = query
            .get("from_token")
            .map_or(0, |token| token.trim_start_matches("cursor-").parse().unwrap());
        let end = (start + limit).min(self.devices.len());

        Ok(DeviceListResponse {
            data: self.devices[start..end].to_vec(),
            links: DeviceListLinks {
                self_link: None,
                next: (end < self.devices.len()).then(|| {
                    format!("{}?limit={limit}&from_token=cursor-{end}", endpoint.path())
                }),
            },
        })
    }
}

fn endpoint() -> Url {
    Url::parse("http://appengine.local/v1/test/devices").unwrap()
}

async fn drive(backend: &MemoryBackend, page_size: u32) -> Vec<Vec<DeviceId>> {
    let mut paginator = DeviceListPaginator::new(backend, endpoint(), page_size).unwrap();
    let mut pages = Vec::new();
    while paginator.has_next_page() {
        pages.push(paginator.get_next_page().await.unwrap());
    }
    pages
}

#[tokio::test]
async fn exhausting_yields_every_device_once_in_order() {
    for count in 0..=12 {
        for page_size in 1..=6u32 {
            let backend = MemoryBackend::with_devices(count);
            let pages = drive(&backend, page_size).await;

            let limit = page_size as usize;
            assert!(pages.iter().all(|page| page.len() <= limit));
            assert_eq!(pages.concat(), backend.devices, "N={count} P={page_size}");
            assert_eq!(backend.fetches(), count.div_ceil(limit).max(1));
        }
    }
}

#[tokio::test]
async fn aggregation_matches_manual_walk() {
    for page_size in [1u32, 2, 3, 7] {
        let backend = MemoryBackend::with_devices(9);
        let manual = drive(&backend, page_size).await.concat();

        let aggregated = DeviceListPaginator::new(&backend, endpoint(), page_size)
            .unwrap()
            .collect_remaining()
            .await
            .unwrap();
        assert_eq!(aggregated, manual);
    }
}

#[tokio::test]
async fn five_devices_in_pages_of_two() {
    let backend = MemoryBackend::with_devices(5);
    let mut paginator = DeviceListPaginator::new(&backend, endpoint(), 2).unwrap();

    let mut sizes = Vec::new();
    let mut has_next = Vec::new();
    while paginator.has_next_page() {
        sizes.push(paginator.get_next_page().await.unwrap().len());
        has_next.push(paginator.has_next_page());
    }

    assert_eq!(sizes, vec![2, 2, 1]);
    assert_eq!(has_next, vec![true, true, false]);
    assert_eq!(paginator.state(), PaginatorState::Exhausted);
}

#[tokio::test]
async fn retried_page_matches_undisturbed_walk() {
    let backend = MemoryBackend::with_devices(7).failing_once_at(2);
    let mut paginator = DeviceListPaginator::new(&backend, endpoint(), 3).unwrap();

    let first = paginator.get_next_page().await.unwrap();
    let second = paginator.get_next_page().await.unwrap();

    let token_before = paginator.continuation_token().map(str::to_string);
    let err = paginator.get_next_page().await.unwrap_err();
    assert!(matches!(err, Error::Timeout(_)));
    assert!(paginator.has_next_page());
    assert_eq!(paginator.continuation_token().map(str::to_string), token_before);

    let third = paginator.get_next_page().await.unwrap();
    assert!(!paginator.has_next_page());

    assert_eq!([first, second, third].concat(), backend.devices);
}

#[tokio::test]
async fn aggregation_aborts_on_first_error() {
    let backend = MemoryBackend::with_devices(6).failing_once_at(1);
    let err = DeviceListPaginator::new(&backend, endpoint(), 2)
        .unwrap()
        .collect_remaining()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout(_)));
    assert_eq!(backend.fetches(), 2);
}
