//! Canonical device IDs, aliases and identifier resolution.
//!
//! A canonical device ID is 128 bits of opaque data encoded as URL-safe base64 without
//! padding, which always yields a 22 character string. Anything else a caller passes to
//! identify a device is an alias.
//!
//! Autodetection is structural only: an alias that happens to be 22 characters of the
//! URL-safe alphabet is classified as a device ID. Callers that cannot rule this out should
//! pass an explicit [`DeviceIdentifierType`].

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Number of raw bytes behind a canonical device ID.
pub const DEVICE_ID_BYTES: usize = 16;

/// Length of the encoded form of a canonical device ID.
pub const DEVICE_ID_LEN: usize = 22;

// Trailing bits are not required to be zero, the server does not enforce it either.
const DEVICE_ID_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::RequireNone),
);

/// Returns true if `input` has the shape of a canonical device ID.
#[must_use]
pub fn is_valid_device_id(input: &str) -> bool {
    input.len() == DEVICE_ID_LEN
        && DEVICE_ID_ENGINE
            .decode(input)
            .is_ok_and(|bytes| bytes.len() == DEVICE_ID_BYTES)
}

/// Canonical device ID.
///
/// Holds the encoded string exactly as it was parsed or received, so IDs read from the
/// server are sent back byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    /// Parses a canonical device ID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDeviceId`] if the string is not 16 bytes of unpadded URL-safe
    /// base64.
    pub fn parse_str(input: &str) -> Result<Self> {
        if is_valid_device_id(input) {
            Ok(Self(input.to_string()))
        } else {
            Err(Error::InvalidDeviceId(input.to_string()))
        }
    }

    /// Wraps a string the caller asserts is a device ID, without checking its shape.
    #[must_use]
    pub fn new_unchecked(input: impl Into<String>) -> Self {
        Self(input.into())
    }

    /// Encodes a UUID as a device ID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(DEVICE_ID_ENGINE.encode(uuid.as_bytes()))
    }

    /// Generates a random device ID.
    #[must_use]
    pub fn random() -> Self {
        Self::from_uuid(Uuid::new_v4())
    }

    /// Decodes the ID back into a UUID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDeviceId`] for IDs built with [`DeviceId::new_unchecked`]
    /// that are not well formed.
    pub fn to_uuid(&self) -> Result<Uuid> {
        DEVICE_ID_ENGINE
            .decode(&self.0)
            .ok()
            .and_then(|bytes| Uuid::from_slice(&bytes).ok())
            .ok_or_else(|| Error::InvalidDeviceId(self.0.clone()))
    }

    /// Returns the encoded ID.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DeviceId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        if is_valid_device_id(&value) {
            Ok(Self(value))
        } else {
            Err(Error::InvalidDeviceId(value))
        }
    }
}

impl From<DeviceId> for String {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}

impl FromStr for DeviceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_str(s)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DeviceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// How the caller declares an identifier should be interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DeviceIdentifierType {
    /// Decide from the shape of the identifier.
    #[default]
    Autodetect,
    /// The identifier is a canonical device ID.
    DeviceId,
    /// The identifier is one of the device's aliases.
    Alias,
}

/// Identifier type after resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolvedIdentifierType {
    /// Canonical device ID.
    DeviceId,
    /// Device alias.
    Alias,
}

impl DeviceIdentifierType {
    /// Resolves the hint against `identifier`. Explicit hints are returned unchanged.
    #[must_use]
    pub fn resolve(self, identifier: &str) -> ResolvedIdentifierType {
        match self {
            Self::DeviceId => ResolvedIdentifierType::DeviceId,
            Self::Alias => ResolvedIdentifierType::Alias,
            Self::Autodetect if is_valid_device_id(identifier) => {
                ResolvedIdentifierType::DeviceId
            }
            Self::Autodetect => ResolvedIdentifierType::Alias,
        }
    }
}

/// Resolves the type of `identifier` given the caller's hint.
#[must_use]
pub fn resolve_identifier_type(
    identifier: &str,
    declared: DeviceIdentifierType,
) -> ResolvedIdentifierType {
    declared.resolve(identifier)
}

/// A device reference, either by canonical ID or by alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeviceIdentifier {
    /// Canonical device ID.
    Id(DeviceId),
    /// Alias chosen by the caller.
    Alias(String),
}

impl DeviceIdentifier {
    /// Builds the tagged identifier for `identifier` under the given hint.
    ///
    /// An explicit [`DeviceIdentifierType::DeviceId`] hint is trusted even when the string
    /// does not look like a canonical ID.
    #[must_use]
    pub fn resolve(identifier: &str, declared: DeviceIdentifierType) -> Self {
        match declared.resolve(identifier) {
            ResolvedIdentifierType::DeviceId => {
                Self::Id(DeviceId::new_unchecked(identifier))
            }
            ResolvedIdentifierType::Alias => Self::Alias(identifier.to_string()),
        }
    }

    /// Returns the resolved type of this identifier.
    #[must_use]
    pub const fn kind(&self) -> ResolvedIdentifierType {
        match self {
            Self::Id(_) => ResolvedIdentifierType::DeviceId,
            Self::Alias(_) => ResolvedIdentifierType::Alias,
        }
    }

    /// Path segments addressing the device below the realm.
    #[must_use]
    pub fn path_segments(&self) -> [&str; 2] {
        match self {
            Self::Id(id) => ["devices", id.as_str()],
            Self::Alias(alias) => ["devices-by-alias", alias.as_str()],
        }
    }
}

impl From<DeviceId> for DeviceIdentifier {
    fn from(id: DeviceId) -> Self {
        Self::Id(id)
    }
}

impl fmt::Display for DeviceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Alias(alias) => write!(f, "{alias}"),
        }
    }
}
