// src/config.rs
//! `key=value` configuration file loader plus positional CLI overrides.
//!
//! The format is the one spec.md §6 requires: `#`-prefixed comment lines,
//! `key=value` lines, unknown keys ignored. This is deliberately not a
//! TOML/YAML/JSON config — nothing in the example pack parses this ad hoc
//! shape, so it is a hand-written line scanner rather than a mismatched
//! format crate.

use crate::error::ServerError;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use tracing::warn;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8080;
/// Default maximum simultaneously tracked connections.
pub const DEFAULT_MAX_CONNECTIONS: usize = 1000;
/// Default worker thread count.
pub const DEFAULT_THREAD_COUNT: usize = 4;

/// Process-level configuration: the three knobs spec.md §6 names
/// (`port`, `max_connections`, `thread_count`), loaded from a config file
/// and then overridable by positional CLI arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// TCP port to bind on all interfaces.
    pub port: u16,
    /// Maximum simultaneously tracked connections; also the listen backlog.
    pub max_connections: usize,
    /// Number of worker threads draining/flushing connections.
    pub thread_count: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            thread_count: DEFAULT_THREAD_COUNT,
        }
    }
}

impl Config {
    /// The address this config resolves to: all interfaces, `self.port`.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), self.port)
    }

    /// Loads a config file in the `key=value` / `#`-comment format.
    /// Missing keys keep their default; unknown keys are ignored
    /// (logged at debug) rather than rejected, per spec.md §6.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ServerError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ServerError::Config(format!("reading config file: {e}")))?;
        Ok(Self::parse(&text))
    }

    /// Parses `key=value` text directly, applying the same rules as
    /// [`Config::from_file`]. Exposed separately so callers (and tests)
    /// don't need a real file on disk.
    pub fn parse(text: &str) -> Self {
        let mut config = Self::default();
        for (lineno, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                warn!(line = lineno + 1, %raw_line, "ignoring malformed config line");
                continue;
            };
            let key = key.trim();
            let value = value.trim();
            match key {
                "port" => match value.parse() {
                    Ok(p) => config.port = p,
                    Err(_) => warn!(line = lineno + 1, value, "invalid port value, keeping default"),
                },
                "max_connections" => match value.parse() {
                    Ok(n) => config.max_connections = n,
                    Err(_) => warn!(
                        line = lineno + 1,
                        value, "invalid max_connections value, keeping default"
                    ),
                },
                "thread_count" => match value.parse() {
                    Ok(n) => config.thread_count = n,
                    Err(_) => warn!(
                        line = lineno + 1,
                        value, "invalid thread_count value, keeping default"
                    ),
                },
                other => {
                    warn!(line = lineno + 1, key = other, "ignoring unknown config key");
                }
            }
        }
        config
    }

    /// Applies up to three positional overrides, in the documented order
    /// `port max_connections thread_count` (spec.md §6's "CLI
    /// collaborator"). Unparseable or missing arguments are left at
    /// whatever the config file (or defaults) already set.
    pub fn apply_positional_overrides<I, S>(&mut self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut args = args.into_iter();
        if let Some(port) = args.next() {
            match port.as_ref().parse() {
                Ok(p) => self.port = p,
                Err(_) => warn!(value = port.as_ref(), "ignoring invalid port override"),
            }
        }
        if let Some(max_conn) = args.next() {
            match max_conn.as_ref().parse() {
                Ok(n) => self.max_connections = n,
                Err(_) => warn!(
                    value = max_conn.as_ref(),
                    "ignoring invalid max_connections override"
                ),
            }
        }
        if let Some(threads) = args.next() {
            match threads.as_ref().parse() {
                Ok(n) => self.thread_count = n,
                Err(_) => warn!(
                    value = threads.as_ref(),
                    "ignoring invalid thread_count override"
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_connections, 1000);
        assert_eq!(config.thread_count, 4);
    }

    #[test]
    fn test_parse_overrides_known_keys() {
        let text = "# comment\nport=9090\nmax_connections=500\nthread_count=8\n";
        let config = Config::parse(text);
        assert_eq!(config.port, 9090);
        assert_eq!(config.max_connections, 500);
        assert_eq!(config.thread_count, 8);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let text = "port=9090\nfrobnicate=true\n";
        let config = Config::parse(text);
        assert_eq!(config.port, 9090);
    }

    #[test]
    fn test_invalid_value_keeps_default() {
        let text = "port=not_a_number\n";
        let config = Config::parse(text);
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_blank_and_comment_lines_skipped() {
        let text = "\n# header comment\n   \nport=1234\n";
        let config = Config::parse(text);
        assert_eq!(config.port, 1234);
    }

    #[test]
    fn test_positional_overrides_apply_in_order() {
        let mut config = Config::default();
        config.apply_positional_overrides(["9999", "50", "2"]);
        assert_eq!(config.port, 9999);
        assert_eq!(config.max_connections, 50);
        assert_eq!(config.thread_count, 2);
    }

    #[test]
    fn test_partial_positional_overrides() {
        let mut config = Config::default();
        config.apply_positional_overrides(["7000"]);
        assert_eq!(config.port, 7000);
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn test_bind_addr_uses_unspecified_interface() {
        let config = Config {
            port: 4242,
            ..Default::default()
        };
        assert_eq!(config.bind_addr().port(), 4242);
        assert!(config.bind_addr().ip().is_unspecified());
    }
}
