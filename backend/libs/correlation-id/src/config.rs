//! Propagation configuration

use crate::context::CORRELATION_ID_HEADER;
use crate::error::ConfigError;
use http::HeaderName;

/// How inbound and outbound HTTP boundaries handle the correlation ID
#[derive(Debug, Clone)]
pub struct PropagationConfig {
    /// Header read on inbound requests and written on outbound ones
    pub header_name: HeaderName,

    /// Mint a fresh ID when an inbound request carries none
    pub generate_if_missing: bool,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            header_name: HeaderName::from_static(CORRELATION_ID_HEADER),
            generate_if_missing: true,
        }
    }
}

impl PropagationConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `CORRELATION_ID_HEADER`: header name (default: correlation-id)
    /// - `CORRELATION_ID_GENERATE`: generate missing IDs (true/false, default: true)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(name) = std::env::var("CORRELATION_ID_HEADER") {
            config.header_name = HeaderName::from_bytes(name.trim().as_bytes())
                .map_err(|_| ConfigError::InvalidHeaderName(name.clone()))?;
        }

        if let Ok(value) = std::env::var("CORRELATION_ID_GENERATE") {
            config.generate_if_missing =
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        name: "CORRELATION_ID_GENERATE",
                        value,
                    })?;
        }

        Ok(config)
    }
}
