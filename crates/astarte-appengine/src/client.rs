//! Asynchronous AppEngine device client.

use crate::models::{DeviceDetails, DevicePatch, DevicesStats};
use crate::paginator::DeviceListPaginator;
use crate::Result;
use astarte_core::client::{
    ClientConfig, ServiceClient, ServiceClientBuilder, APPENGINE_DEFAULT_TIMEOUT,
};
use astarte_core::config::{AppEngineConfig, DEFAULT_PAGE_SIZE};
use astarte_core::{DeviceId, DeviceIdentifier, DeviceIdentifierType};
use reqwest::StatusCode;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

const USER_AGENT: &str = concat!("astarte-appengine/", env!("CARGO_PKG_VERSION"));

/// Builder for [`AppEngineClient`].
#[derive(Debug, Clone)]
pub struct AppEngineClientBuilder {
    inner: ServiceClientBuilder,
    page_size: u32,
}

impl AppEngineClientBuilder {
    /// Create a builder for the specified base URL.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let builder = ServiceClientBuilder::new(
            base_url,
            Duration::from_secs(APPENGINE_DEFAULT_TIMEOUT),
        )?
        .with_user_agent(USER_AGENT);

        Ok(Self {
            inner: builder,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Create a builder from a validated configuration.
    pub fn from_config(config: &AppEngineConfig) -> Result<Self> {
        config.check()?;

        let mut builder = Self::new(&config.appengine_url)?
            .with_http_config(ClientConfig::new().with_timeout(config.timeout()))
            .with_page_size(config.page_size);
        if let Some(user_agent) = &config.user_agent {
            builder.inner = builder.inner.with_user_agent(user_agent.as_str());
        }
        Ok(builder)
    }

    /// Override the HTTP client configuration.
    #[must_use]
    pub fn with_http_config(mut self, config: ClientConfig) -> Self {
        self.inner = self.inner.with_http_config(config);
        self
    }

    /// Page size used by [`AppEngineClient::list_devices`].
    #[must_use]
    pub const fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<AppEngineClient> {
        if self.page_size == 0 {
            return Err(astarte_core::Error::ConfigError(
                "page size must be at least 1".to_string(),
            ));
        }

        let inner = self.inner.build()?;
        Ok(AppEngineClient {
            inner,
            page_size: self.page_size,
        })
    }
}

/// Asynchronous AppEngine client for device management.
#[derive(Debug, Clone)]
pub struct AppEngineClient {
    inner: ServiceClient,
    page_size: u32,
}

impl AppEngineClient {
    /// Construct a client directly from the base URL.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        AppEngineClientBuilder::new(base_url)?.build()
    }

    /// Return the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        self.inner.base_url()
    }

    /// List the IDs of every device in the realm.
    ///
    /// Pages are fetched until the list is exhausted. The first failing page aborts the whole
    /// listing; use [`device_list_paginator`](Self::device_list_paginator) to handle pages
    /// one at a time instead.
    pub async fn list_devices(&self, realm: &str) -> Result<Vec<DeviceId>> {
        self.device_list_paginator(realm, self.page_size)?
            .collect_remaining()
            .await
    }

    /// Paginator over the devices of the realm, `page_size` IDs at a time.
    pub fn device_list_paginator(
        &self,
        realm: &str,
        page_size: u32,
    ) -> Result<DeviceListPaginator> {
        let endpoint = self.inner.endpoint(&["v1", realm, "devices"])?;
        DeviceListPaginator::new(self.inner.clone(), endpoint, page_size)
    }

    /// Fetch the details of a device.
    pub async fn get_device(
        &self,
        realm: &str,
        identifier: &str,
        identifier_type: DeviceIdentifierType,
    ) -> Result<DeviceDetails> {
        let device = DeviceIdentifier::resolve(identifier, identifier_type);
        let url = self.device_endpoint(realm, &device, &[])?;
        self.inner.get_data(url, StatusCode::OK).await
    }

    /// Return the canonical ID of a device, looking it up when `identifier` is an alias.
    pub async fn get_device_id_from_identifier(
        &self,
        realm: &str,
        identifier: &str,
        identifier_type: DeviceIdentifierType,
    ) -> Result<DeviceId> {
        match DeviceIdentifier::resolve(identifier, identifier_type) {
            DeviceIdentifier::Id(device_id) => Ok(device_id),
            DeviceIdentifier::Alias(alias) => self.get_device_id_from_alias(realm, &alias).await,
        }
    }

    /// Return the canonical ID of the device owning `alias`.
    pub async fn get_device_id_from_alias(&self, realm: &str, alias: &str) -> Result<DeviceId> {
        self.get_device(realm, alias, DeviceIdentifierType::Alias)
            .await
            .map(|details| details.device_id)
    }

    /// List the interfaces in the device's introspection.
    pub async fn list_device_interfaces(
        &self,
        realm: &str,
        identifier: &str,
        identifier_type: DeviceIdentifierType,
    ) -> Result<Vec<String>> {
        let device = DeviceIdentifier::resolve(identifier, identifier_type);
        let url = self.device_endpoint(realm, &device, &["interfaces"])?;
        self.inner.get_data(url, StatusCode::OK).await
    }

    /// List the aliases of a device, by tag.
    pub async fn list_device_aliases(
        &self,
        realm: &str,
        device_id: &DeviceId,
    ) -> Result<HashMap<String, String>> {
        self.get_device(realm, device_id.as_str(), DeviceIdentifierType::DeviceId)
            .await
            .map(|details| details.aliases)
    }

    /// Set the alias stored under `tag`.
    pub async fn add_device_alias(
        &self,
        realm: &str,
        device_id: &DeviceId,
        tag: &str,
        alias: &str,
    ) -> Result<()> {
        self.patch_device(
            realm,
            &DeviceIdentifier::Id(device_id.clone()),
            &DevicePatch::set_alias(tag, alias),
        )
        .await
    }

    /// Delete the alias stored under `tag`.
    pub async fn delete_device_alias(
        &self,
        realm: &str,
        device_id: &DeviceId,
        tag: &str,
    ) -> Result<()> {
        self.patch_device(
            realm,
            &DeviceIdentifier::Id(device_id.clone()),
            &DevicePatch::delete_alias(tag),
        )
        .await
    }

    /// Set whether the device may request new credentials.
    pub async fn inhibit_device(
        &self,
        realm: &str,
        identifier: &str,
        identifier_type: DeviceIdentifierType,
        inhibit: bool,
    ) -> Result<()> {
        let device = DeviceIdentifier::resolve(identifier, identifier_type);
        self.patch_device(realm, &device, &DevicePatch::inhibit(inhibit))
            .await
    }

    /// Fetch the device counters of the realm.
    pub async fn get_devices_stats(&self, realm: &str) -> Result<DevicesStats> {
        let url = self.inner.endpoint(&["v1", realm, "stats", "devices"])?;
        self.inner.get_data(url, StatusCode::OK).await
    }

    /// List the metadata of a device.
    pub async fn list_device_metadata(
        &self,
        realm: &str,
        identifier: &str,
        identifier_type: DeviceIdentifierType,
    ) -> Result<HashMap<String, String>> {
        self.get_device(realm, identifier, identifier_type)
            .await
            .map(|details| details.metadata)
    }

    /// Set metadata `key` to `value`.
    pub async fn set_device_metadata(
        &self,
        realm: &str,
        identifier: &str,
        identifier_type: DeviceIdentifierType,
        key: &str,
        value: &str,
    ) -> Result<()> {
        let device = DeviceIdentifier::resolve(identifier, identifier_type);
        self.patch_device(realm, &device, &DevicePatch::set_metadata(key, value))
            .await
    }

    /// Delete metadata `key`.
    pub async fn delete_device_metadata(
        &self,
        realm: &str,
        identifier: &str,
        identifier_type: DeviceIdentifierType,
        key: &str,
    ) -> Result<()> {
        let device = DeviceIdentifier::resolve(identifier, identifier_type);
        self.patch_device(realm, &device, &DevicePatch::delete_metadata(key))
            .await
    }

    async fn patch_device(
        &self,
        realm: &str,
        device: &DeviceIdentifier,
        patch: &DevicePatch,
    ) -> Result<()> {
        let url = self.device_endpoint(realm, device, &[])?;
        self.inner.patch_data(url, patch, StatusCode::OK).await
    }

    fn device_endpoint(
        &self,
        realm: &str,
        device: &DeviceIdentifier,
        suffix: &[&str],
    ) -> Result<Url> {
        let [collection, key] = device.path_segments();
        let mut segments = vec!["v1", realm, collection, key];
        segments.extend_from_slice(suffix);
        self.inner.endpoint(&segments)
    }
}
