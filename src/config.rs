//! Runtime configuration and command line

use std::path::PathBuf;
use std::time::Duration;

use clap::{Arg, ArgMatches, Command, value_parser};

use crate::assets::{
    FPS_WINDOW, LATENCY_WINDOW, MAX_RECONNECT_ATTEMPTS, RECONNECT_DELAY, STATS_INTERVAL,
};

/// Where to connect and how to authenticate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub url: String,
    /// Sent as `Authorization: Bearer <token>` on the upgrade request
    pub token: Option<String>,
}

impl Endpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub endpoint: Endpoint,
    pub max_reconnect_attempts: u32,
    pub reconnect_delay: Duration,
    pub stats_interval: Duration,
    pub latency_window: usize,
    pub fps_window: Duration,
    /// Append decoded frames here as raw YUV 4:2:0
    pub dump_path: Option<PathBuf>,
}

impl ViewerConfig {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
            reconnect_delay: RECONNECT_DELAY,
            stats_interval: STATS_INTERVAL,
            latency_window: LATENCY_WINDOW,
            fps_window: FPS_WINDOW,
            dump_path: None,
        }
    }

    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_stats_interval(mut self, interval: Duration) -> Self {
        self.stats_interval = interval;
        self
    }

    pub fn with_dump_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.dump_path = Some(path.into());
        self
    }

    /// Build from parsed command line arguments
    pub fn from_matches(matches: &ArgMatches) -> anyhow::Result<Self> {
        let url = matches
            .get_one::<String>("url")
            .ok_or_else(|| anyhow::anyhow!("missing server URL"))?;

        let mut endpoint = Endpoint::new(url);
        if let Some(token) = matches.get_one::<String>("token") {
            endpoint = endpoint.with_token(token);
        }

        let mut config = ViewerConfig::new(endpoint);
        if let Some(&attempts) = matches.get_one::<u32>("max-attempts") {
            config = config.with_max_reconnect_attempts(attempts);
        }
        if let Some(&delay) = matches.get_one::<u64>("reconnect-delay-ms") {
            config = config.with_reconnect_delay(Duration::from_millis(delay));
        }
        if let Some(&interval) = matches.get_one::<u64>("stats-interval-ms") {
            config = config.with_stats_interval(Duration::from_millis(interval));
        }
        if let Some(path) = matches.get_one::<PathBuf>("dump") {
            config = config.with_dump_path(path);
        }
        Ok(config)
    }
}

pub fn command() -> Command {
    Command::new(app_name())
        .version(version())
        .author(env!("CARGO_PKG_AUTHORS"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(
            Arg::new("url")
                .value_name("URL")
                .help("WebSocket stream address, e.g. ws://host:8080/ws")
                .required(true),
        )
        .arg(
            Arg::new("token")
                .short('t')
                .long("token")
                .value_name("TOKEN")
                .help("Pairing token sent as a Bearer credential."),
        )
        .arg(
            Arg::new("max-attempts")
                .long("max-attempts")
                .value_name("N")
                .help("Connection closures tolerated before giving up.")
                .value_parser(value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new("reconnect-delay-ms")
                .long("reconnect-delay-ms")
                .value_name("MS")
                .help("Delay between reconnect attempts.")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("stats-interval-ms")
                .long("stats-interval-ms")
                .value_name("MS")
                .help("Period of the statistics report.")
                .value_parser(value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("dump")
                .long("dump")
                .value_name("PATH")
                .help("Write decoded frames to PATH as raw yuv420p.")
                .value_parser(value_parser!(PathBuf)),
        )
}

/// Returns a version as specified in Cargo.toml
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub fn app_name() -> &'static str {
    env!("CARGO_PKG_NAME")
}
