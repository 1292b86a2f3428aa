use clap::Args;
use obs_core::Level;
use obs_sdk::{ClientOptions, EventBuilder};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Args)]
pub struct CaptureCommand {
    /// DSN of the gateway, `scheme://API_KEY@host[:port]`
    #[arg(long, env = "OBS_DSN", hide_env_values = true)]
    pub dsn: String,

    /// Event message
    #[arg(long, short)]
    pub message: String,

    /// Event level: error, warning, info
    #[arg(long, short, default_value = "error")]
    pub level: Level,

    /// Environment reported with the event
    #[arg(long, env = "OBS_ENVIRONMENT")]
    pub environment: Option<String>,

    /// Textual stack trace to attach, one frame per line
    #[arg(long)]
    pub trace: Option<String>,

    /// Extra context as key=value, may be repeated
    #[arg(long = "extra", value_parser = parse_key_value)]
    pub extra: Vec<(String, String)>,

    /// Number of copies to send
    #[arg(long, default_value_t = 1)]
    pub count: u32,

    /// Seconds the final flush may take
    #[arg(long, default_value_t = 5)]
    pub timeout: u64,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", s))
}

impl CaptureCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.run())
    }

    async fn run(self) -> anyhow::Result<()> {
        let mut options = ClientOptions::new(self.dsn).flush_interval(None);
        if let Some(environment) = self.environment {
            options = options.environment(environment);
        }
        let obs = obs_sdk::init(options)?;

        for _ in 0..self.count {
            let mut builder = EventBuilder::new(self.level, self.message.as_str());
            if let Some(trace) = &self.trace {
                builder = builder.with_stacktrace_text(trace);
            }
            for (key, value) in &self.extra {
                builder = builder.with_extra(key.as_str(), value.as_str());
            }

            let id = obs.capture(builder);
            println!("{}", id);
        }

        let timeout = Duration::from_secs(self.timeout);
        if obs.shutdown(timeout).await {
            info!("Delivered {} event(s)", self.count);
            Ok(())
        } else {
            warn!("Delivery did not complete within {:?}", timeout);
            Err(anyhow::anyhow!("flush timed out after {:?}", timeout))
        }
    }
}
