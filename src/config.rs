use std::str::FromStr;
use std::time::Duration;

use dioxus::logger::tracing::warn;

use crate::error::ConfigError;

pub const ENV_API_URL: &str = "STREAMRIDE_API_URL";
pub const ENV_PUSH_URL: &str = "STREAMRIDE_PUSH_URL";
pub const ENV_TRANSPORT: &str = "STREAMRIDE_TRANSPORT";
pub const ENV_TOPIC: &str = "STREAMRIDE_TOPIC";
pub const ENV_POLL_INTERVAL_MS: &str = "STREAMRIDE_POLL_INTERVAL_MS";
pub const ENV_RECONNECT_DELAY_MS: &str = "STREAMRIDE_RECONNECT_DELAY_MS";
pub const ENV_RECONNECT_ATTEMPTS: &str = "STREAMRIDE_RECONNECT_ATTEMPTS";
pub const ENV_HISTORY_LEN: &str = "STREAMRIDE_HISTORY_LEN";
pub const ENV_CONNECT_TIMEOUT_MS: &str = "STREAMRIDE_CONNECT_TIMEOUT_MS";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5_000);
pub const DEFAULT_HISTORY_LEN: usize = 60;
/// Budget for opening the socket and, for the broker, receiving `CONNECTED`.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(10_000);
pub const METRICS_PATH: &str = "/metrics/current";
pub const PUSH_PATH: &str = "/ws/metrics";

/// Which push binding a deployment talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// JSON `{type, data}` event envelopes over a plain WebSocket.
    EventSocket,
    /// STOMP 1.2 frames over a WebSocket, per-destination subscriptions.
    Stomp,
}

impl TransportKind {
    pub fn default_topic(self) -> &'static str {
        match self {
            TransportKind::EventSocket => "message",
            TransportKind::Stomp => "/topic/metrics",
        }
    }

    pub fn default_reconnect(self) -> ReconnectPolicy {
        match self {
            TransportKind::EventSocket => ReconnectPolicy {
                delay: Duration::from_millis(1_000),
                max_attempts: Some(5),
            },
            TransportKind::Stomp => ReconnectPolicy {
                delay: Duration::from_millis(5_000),
                max_attempts: None,
            },
        }
    }
}

impl FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "socket" | "event-socket" | "events" => Ok(TransportKind::EventSocket),
            "stomp" | "broker" => Ok(TransportKind::Stomp),
            _ => Err(ConfigError::Invalid {
                key: ENV_TRANSPORT,
                value: s.to_string(),
            }),
        }
    }
}

/// Fixed-delay reconnection. `max_attempts: None` retries forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub delay: Duration,
    pub max_attempts: Option<u32>,
}

impl ReconnectPolicy {
    /// Delay before the next attempt after `failures` consecutive failures,
    /// or `None` once the budget is spent.
    pub fn next_delay(&self, failures: u32) -> Option<Duration> {
        match self.max_attempts {
            Some(max) if failures > max => None,
            _ => Some(self.delay),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    /// Base for the polling endpoint; empty means same origin.
    pub api_base_url: String,
    pub push_url: String,
    pub transport: TransportKind,
    pub topic: String,
    pub poll_interval: Duration,
    pub reconnect: ReconnectPolicy,
    pub history_len: usize,
    pub connect_timeout: Duration,
}

impl DashboardConfig {
    pub fn with_endpoints(api_base_url: impl Into<String>, push_url: impl Into<String>) -> Self {
        let transport = TransportKind::Stomp;
        Self {
            api_base_url: api_base_url.into(),
            push_url: push_url.into(),
            transport,
            topic: transport.default_topic().to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            reconnect: transport.default_reconnect(),
            history_len: DEFAULT_HISTORY_LEN,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn metrics_url(&self) -> String {
        format!("{}{}", self.api_base_url.trim_end_matches('/'), METRICS_PATH)
    }

    /// Builds a config from `lookup`, falling back to `defaults` for every
    /// key that is absent. Transport-dependent defaults (topic, reconnect)
    /// follow the chosen transport.
    pub fn from_lookup<F>(defaults: DashboardConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let transport = match get(ENV_TRANSPORT) {
            Some(v) => v.parse()?,
            None => defaults.transport,
        };
        let mut reconnect = if transport == defaults.transport {
            defaults.reconnect
        } else {
            transport.default_reconnect()
        };
        if let Some(v) = get(ENV_RECONNECT_DELAY_MS) {
            reconnect.delay = Duration::from_millis(parse_number(ENV_RECONNECT_DELAY_MS, &v)?);
        }
        if let Some(v) = get(ENV_RECONNECT_ATTEMPTS) {
            reconnect.max_attempts = if v.trim().eq_ignore_ascii_case("unbounded") {
                None
            } else {
                match parse_number::<u32>(ENV_RECONNECT_ATTEMPTS, &v)? {
                    0 => None,
                    n => Some(n),
                }
            };
        }

        let topic = get(ENV_TOPIC).unwrap_or_else(|| {
            if transport == defaults.transport {
                defaults.topic.clone()
            } else {
                transport.default_topic().to_string()
            }
        });

        let poll_interval = match get(ENV_POLL_INTERVAL_MS) {
            Some(v) => match parse_number::<u64>(ENV_POLL_INTERVAL_MS, &v)? {
                0 => {
                    return Err(ConfigError::Invalid {
                        key: ENV_POLL_INTERVAL_MS,
                        value: v,
                    })
                }
                ms => Duration::from_millis(ms),
            },
            None => defaults.poll_interval,
        };

        let history_len = match get(ENV_HISTORY_LEN) {
            Some(v) => parse_number(ENV_HISTORY_LEN, &v)?,
            None => defaults.history_len,
        };

        let connect_timeout = match get(ENV_CONNECT_TIMEOUT_MS) {
            Some(v) => match parse_number::<u64>(ENV_CONNECT_TIMEOUT_MS, &v)? {
                0 => {
                    return Err(ConfigError::Invalid {
                        key: ENV_CONNECT_TIMEOUT_MS,
                        value: v,
                    })
                }
                ms => Duration::from_millis(ms),
            },
            None => defaults.connect_timeout,
        };

        Ok(Self {
            api_base_url: get(ENV_API_URL).unwrap_or(defaults.api_base_url),
            push_url: get(ENV_PUSH_URL).unwrap_or(defaults.push_url),
            transport,
            topic,
            poll_interval,
            reconnect,
            history_len,
            connect_timeout,
        })
    }

    #[cfg(not(feature = "web"))]
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(Self::default(), |key| std::env::var(key).ok())
    }

    /// Browser builds have no process environment; the same keys are baked
    /// in at compile time instead.
    #[cfg(feature = "web")]
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(Self::default(), |key| {
            let value = match key {
                ENV_API_URL => option_env!("STREAMRIDE_API_URL"),
                ENV_PUSH_URL => option_env!("STREAMRIDE_PUSH_URL"),
                ENV_TRANSPORT => option_env!("STREAMRIDE_TRANSPORT"),
                ENV_TOPIC => option_env!("STREAMRIDE_TOPIC"),
                ENV_POLL_INTERVAL_MS => option_env!("STREAMRIDE_POLL_INTERVAL_MS"),
                ENV_RECONNECT_DELAY_MS => option_env!("STREAMRIDE_RECONNECT_DELAY_MS"),
                ENV_RECONNECT_ATTEMPTS => option_env!("STREAMRIDE_RECONNECT_ATTEMPTS"),
                ENV_HISTORY_LEN => option_env!("STREAMRIDE_HISTORY_LEN"),
                ENV_CONNECT_TIMEOUT_MS => option_env!("STREAMRIDE_CONNECT_TIMEOUT_MS"),
                _ => None,
            };
            value.map(str::to_string)
        })
    }

    pub fn load() -> Self {
        match Self::from_env() {
            Ok(config) => config,
            Err(e) => {
                warn!("[config] {e}; using defaults");
                Self::default()
            }
        }
    }
}

#[cfg(not(feature = "web"))]
impl Default for DashboardConfig {
    fn default() -> Self {
        Self::with_endpoints("http://localhost:8083", format!("ws://localhost:8083{PUSH_PATH}"))
    }
}

/// Same-origin endpoints, so the dev-server proxy sees both channels.
#[cfg(feature = "web")]
impl Default for DashboardConfig {
    fn default() -> Self {
        let origin = web_sys::window()
            .and_then(|w| w.location().origin().ok())
            .unwrap_or_else(|| "http://localhost:8083".to_string());
        let push_url = format!("{}{PUSH_PATH}", websocket_origin(&origin));
        Self::with_endpoints(origin, push_url)
    }
}

pub fn websocket_origin(http_origin: &str) -> String {
    if let Some(rest) = http_origin.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = http_origin.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        http_origin.to_string()
    }
}

fn parse_number<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}
