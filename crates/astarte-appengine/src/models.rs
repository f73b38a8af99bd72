//! AppEngine device models.

use astarte_core::DeviceId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One page of the realm's device list, as returned by `GET /v1/{realm}/devices`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceListResponse {
    /// Device IDs in server order.
    ///
    /// Listed IDs are taken as the server sent them, without the shape check applied to
    /// single devices, so one odd entry cannot wedge the cursor on its page.
    #[serde(deserialize_with = "deserialize_listed_ids")]
    pub data: Vec<DeviceId>,
    /// Navigation links.
    #[serde(default)]
    pub links: DeviceListLinks,
}

impl DeviceListResponse {
    /// The continuation link, if more pages remain.
    #[must_use]
    pub fn next_link(&self) -> Option<&str> {
        self.links.next.as_deref().filter(|link| !link.is_empty())
    }
}

fn deserialize_listed_ids<'de, D>(deserializer: D) -> Result<Vec<DeviceId>, D::Error>
where
    D: Deserializer<'de>,
{
    let ids = Vec::<String>::deserialize(deserializer)?;
    Ok(ids.into_iter().map(DeviceId::new_unchecked).collect())
}

/// Links attached to a device list page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceListLinks {
    /// Link to the page itself.
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    /// Link to the next page; its query string carries the continuation token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

/// Version and traffic counters of an interface in a device's introspection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InterfaceIntrospection {
    /// Interface name; only present in `previous_interfaces`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
    /// Messages exchanged on this interface.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchanged_msgs: Option<u64>,
    /// Bytes exchanged on this interface.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchanged_bytes: Option<u64>,
}

/// Device details as returned by AppEngine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceDetails {
    /// Canonical device ID.
    #[serde(rename = "id", alias = "device_id")]
    pub device_id: DeviceId,
    /// Alias tag to alias.
    #[serde(default)]
    pub aliases: HashMap<String, String>,
    /// Metadata key to value.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Whether the device is prevented from requesting new credentials.
    #[serde(default)]
    pub credentials_inhibited: bool,

    /// Interfaces currently declared by the device.
    #[serde(default)]
    pub introspection: HashMap<String, InterfaceIntrospection>,
    /// Interfaces the device declared in the past.
    #[serde(default)]
    pub previous_interfaces: Vec<InterfaceIntrospection>,
    /// Groups the device belongs to.
    #[serde(default)]
    pub groups: Vec<String>,

    /// Current connection state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected: Option<bool>,
    /// Last connection timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_connection: Option<DateTime<Utc>>,
    /// Last disconnection timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_disconnection: Option<DateTime<Utc>>,
    /// Registration timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_registration: Option<DateTime<Utc>>,
    /// First credentials request timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_credentials_request: Option<DateTime<Utc>>,
    /// IP address the device last connected from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen_ip: Option<String>,
    /// IP address of the last credentials request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_credentials_request_ip: Option<String>,
    /// Total messages received from the device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_received_msgs: Option<u64>,
    /// Total bytes received from the device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_received_bytes: Option<u64>,
}

/// Device counters of a realm.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DevicesStats {
    /// Registered devices.
    #[serde(default)]
    pub total_devices: u64,
    /// Devices currently connected.
    #[serde(default)]
    pub connected_devices: u64,
}

/// Partial update sent with `PATCH /v1/{realm}/devices/{id}`.
///
/// Map values are `Some(value)` to set a key and `None` to delete it; a deletion goes on the
/// wire as an explicit `null`, never as an absent key or an empty string.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct DevicePatch {
    /// Alias changes by tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aliases: Option<BTreeMap<String, Option<String>>>,
    /// Metadata changes by key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, Option<String>>>,
    /// New credentials inhibition state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials_inhibited: Option<bool>,
}

impl DevicePatch {
    /// Set alias `tag` to `alias`.
    #[must_use]
    pub fn set_alias(tag: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            aliases: Some(BTreeMap::from([(tag.into(), Some(alias.into()))])),
            ..Self::default()
        }
    }

    /// Delete the alias stored under `tag`.
    #[must_use]
    pub fn delete_alias(tag: impl Into<String>) -> Self {
        Self {
            aliases: Some(BTreeMap::from([(tag.into(), None)])),
            ..Self::default()
        }
    }

    /// Set metadata `key` to `value`.
    #[must_use]
    pub fn set_metadata(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            metadata: Some(BTreeMap::from([(key.into(), Some(value.into()))])),
            ..Self::default()
        }
    }

    /// Delete metadata `key`.
    #[must_use]
    pub fn delete_metadata(key: impl Into<String>) -> Self {
        Self {
            metadata: Some(BTreeMap::from([(key.into(), None)])),
            ..Self::default()
        }
    }

    /// Set the credentials inhibition state.
    #[must_use]
    pub fn inhibit(inhibit: bool) -> Self {
        Self {
            credentials_inhibited: Some(inhibit),
            ..Self::default()
        }
    }
}
