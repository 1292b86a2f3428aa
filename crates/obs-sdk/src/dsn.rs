//! DSN parsing
//!
//! A DSN has the shape `scheme://API_KEY@host[:port][/path]`. The username is the
//! API key, and `scheme://host[:port]` is the base the ingestion path is appended to.

use std::fmt;
use std::str::FromStr;

use crate::error::ObsError;

/// A parsed DSN
#[derive(Clone, PartialEq, Eq)]
pub struct Dsn {
    endpoint: String,
    api_key: String,
}

impl Dsn {
    /// `scheme://host[:port]`, without a trailing slash
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl fmt::Debug for Dsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dsn")
            .field("endpoint", &self.endpoint)
            .field("api_key", &obs_core::utils::mask_sensitive(&self.api_key))
            .finish()
    }
}

impl FromStr for Dsn {
    type Err = ObsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_dsn(s)
    }
}

/// Parse a DSN into its endpoint and API key.
///
/// Any path or query component is ignored. A port equal to the scheme's
/// default is normalized away.
pub fn parse_dsn(dsn: &str) -> Result<Dsn, ObsError> {
    let url = url::Url::parse(dsn).map_err(|e| ObsError::InvalidDsn(format!("{}: {}", dsn, e)))?;

    let host = url
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| ObsError::InvalidDsn(format!("{}: missing host", dsn)))?;

    let api_key = url.username();
    if api_key.is_empty() {
        return Err(ObsError::InvalidDsn(format!("{}: missing API key", dsn)));
    }

    let endpoint = match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    };

    tracing::debug!("Parsed DSN - endpoint: {}", endpoint);

    Ok(Dsn {
        endpoint,
        api_key: api_key.to_string(),
    })
}
