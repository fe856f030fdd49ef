//! Correlation identifier value type

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque token shared by every hop of one logical request.
///
/// Never blank: construction goes through [`CorrelationId::parse`] or
/// [`CorrelationId::generate`], so holding a `CorrelationId` means an
/// identifier is actually available.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Parse an optional raw value.
    ///
    /// Absent, empty and whitespace-only input means "no identifier".
    /// Anything else is kept verbatim.
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw {
            Some(value) if !value.trim().is_empty() => Some(Self(value.to_string())),
            _ => None,
        }
    }

    /// Mint a fresh UUID v4 identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// Whether the ID survives as an HTTP header or gRPC metadata value.
    ///
    /// Only visible ASCII and space qualify. Header parsers accept bytes above
    /// 0x7f, but the next hop cannot read them back as text.
    pub fn is_header_safe(&self) -> bool {
        self.0.bytes().all(|b| (0x20..0x7f).contains(&b))
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CorrelationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for CorrelationId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(Some(&raw))
            .ok_or_else(|| serde::de::Error::custom("correlation id must not be blank"))
    }
}

/// Values accepted wherever an identifier may be supplied.
///
/// Blank strings and `None` convert to "no identifier".
pub trait IntoCorrelationId {
    fn into_correlation_id(self) -> Option<CorrelationId>;
}

impl IntoCorrelationId for CorrelationId {
    fn into_correlation_id(self) -> Option<CorrelationId> {
        Some(self)
    }
}

impl IntoCorrelationId for &CorrelationId {
    fn into_correlation_id(self) -> Option<CorrelationId> {
        Some(self.clone())
    }
}

impl IntoCorrelationId for &str {
    fn into_correlation_id(self) -> Option<CorrelationId> {
        CorrelationId::parse(Some(self))
    }
}

impl IntoCorrelationId for String {
    fn into_correlation_id(self) -> Option<CorrelationId> {
        if self.trim().is_empty() {
            None
        } else {
            Some(CorrelationId(self))
        }
    }
}

impl IntoCorrelationId for &String {
    fn into_correlation_id(self) -> Option<CorrelationId> {
        CorrelationId::parse(Some(self))
    }
}

impl<T: IntoCorrelationId> IntoCorrelationId for Option<T> {
    fn into_correlation_id(self) -> Option<CorrelationId> {
        self.and_then(IntoCorrelationId::into_correlation_id)
    }
}
