//! Ledger keys and records

use crate::error::{PinkeepError, PinkeepResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest content address accepted as a resource key
const MAX_RESOURCE_KEY_LEN: usize = 128;

/// Content address (hash) of a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceKey(String);

impl ResourceKey {
    /// Parse a content address, rejecting anything that is not plain base58/base32
    pub fn parse(raw: &str) -> PinkeepResult<Self> {
        if Self::is_well_formed(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(PinkeepError::InvalidResourceKey(raw.to_string()))
        }
    }

    /// Whether `raw` looks like a content address
    pub fn is_well_formed(raw: &str) -> bool {
        !raw.is_empty()
            && raw.len() <= MAX_RESOURCE_KEY_LEN
            && raw.bytes().all(|b| b.is_ascii_alphanumeric())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ResourceKey {
    type Error = PinkeepError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if Self::is_well_formed(&value) {
            Ok(Self(value))
        } else {
            Err(PinkeepError::InvalidResourceKey(value))
        }
    }
}

impl From<ResourceKey> for String {
    fn from(key: ResourceKey) -> Self {
        key.0
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Logical slot holding one current resource, e.g. `mainnet:aragon.aragonpm.eth`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NamespaceKey(String);

impl NamespaceKey {
    /// Build the slot for an app on a network
    pub fn for_app(network: &str, app_id: &str) -> PinkeepResult<Self> {
        Self::parse(&format!("{}:{}", network, app_id))
    }

    /// Parse `<network>:<app-id>`
    ///
    /// The separator keeps namespace keys disjoint from resource keys, which
    /// share the same ledger.
    pub fn parse(raw: &str) -> PinkeepResult<Self> {
        match raw.split_once(':') {
            Some((network, app)) if !network.is_empty() && !app.is_empty() => {
                Ok(Self(raw.to_string()))
            }
            _ => Err(PinkeepError::InvalidNamespaceKey(raw.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for NamespaceKey {
    type Error = PinkeepError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<NamespaceKey> for String {
    fn from(key: NamespaceKey) -> Self {
        key.0
    }
}

impl fmt::Display for NamespaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A ledger record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerEntry {
    /// Access-tracked resource, reaped once `expires_at` passes
    #[serde(rename = "expiring")]
    ExpiringResource {
        key: ResourceKey,
        expires_at: DateTime<Utc>,
    },

    /// Current resource of a namespace; never expires
    NamespacePin {
        key: NamespaceKey,
        pinned_hash: ResourceKey,
    },
}

impl LedgerEntry {
    /// Ledger key this entry is stored under
    pub fn key(&self) -> &str {
        match self {
            Self::ExpiringResource { key, .. } => key.as_str(),
            Self::NamespacePin { key, .. } => key.as_str(),
        }
    }

    /// Expiration time, if this entry expires at all
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::ExpiringResource { expires_at, .. } => Some(*expires_at),
            Self::NamespacePin { .. } => None,
        }
    }

    /// Whether the entry expired strictly before `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|at| at < now)
    }
}
