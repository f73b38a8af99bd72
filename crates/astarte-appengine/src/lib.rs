//! AppEngine device management client for Astarte.
//!
//! Provides typed structures and asynchronous clients for querying and updating the devices
//! of a realm through the AppEngine API, including an incremental device listing that never
//! holds more than one page in memory.

#![deny(missing_docs)]

pub mod client;
pub mod models;
pub mod paginator;

pub use astarte_core::{DeviceId, DeviceIdentifier, DeviceIdentifierType};
pub use client::{AppEngineClient, AppEngineClientBuilder};
pub use models::{
    DeviceDetails, DeviceListLinks, DeviceListResponse, DevicePatch, DevicesStats,
    InterfaceIntrospection,
};
pub use paginator::{DeviceListPaginator, DevicePageSource, PaginatorState};

/// Convenient result alias that reuses the shared error type.
pub type Result<T> = astarte_core::Result<T>;
