use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::event::RandomSource;
use crate::transport::Transport;

/// Period of the background flush timer unless configured otherwise
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// Time budget of flushes triggered by the timer or left unspecified
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Options accepted by [`crate::init`]
#[derive(Clone)]
pub struct ClientOptions {
    pub dsn: String,
    pub environment: Option<String>,
    /// Defaults to the host name when absent
    pub server_name: Option<String>,
    /// `None` disables the background timer; events then leave only on explicit flush
    pub flush_interval: Option<Duration>,
    /// Replaces the HTTP transport derived from the DSN
    pub transport: Option<Arc<dyn Transport>>,
    /// Replaces OS randomness for event identifiers
    pub random: Option<Arc<dyn RandomSource>>,
}

impl ClientOptions {
    pub fn new(dsn: impl Into<String>) -> Self {
        Self {
            dsn: dsn.into(),
            environment: None,
            server_name: None,
            flush_interval: Some(DEFAULT_FLUSH_INTERVAL),
            transport: None,
            random: None,
        }
    }

    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn server_name(mut self, server_name: impl Into<String>) -> Self {
        self.server_name = Some(server_name.into());
        self
    }

    pub fn flush_interval(mut self, interval: Option<Duration>) -> Self {
        self.flush_interval = interval;
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = Some(random);
        self
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("environment", &self.environment)
            .field("server_name", &self.server_name)
            .field("flush_interval", &self.flush_interval)
            .field("custom_transport", &self.transport.is_some())
            .field("custom_random", &self.random.is_some())
            .finish_non_exhaustive()
    }
}

/// Host name of the machine, used as the default server name
pub(crate) fn host_name() -> Option<String> {
    use sysinfo::{System, SystemExt};

    System::new()
        .host_name()
        .or_else(|| std::env::var("HOSTNAME").ok())
        .filter(|name| !name.is_empty())
}
