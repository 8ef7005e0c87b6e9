//! Configuration file watcher for hot reload.
//!
//! Every write to the file is re-read and re-validated. A version that fails
//! validation is logged and dropped; the server keeps the last good one.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::ProxyConfig;

/// Only used by the polling backend.
const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// What happened to one reload attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reload {
    Applied,
    Rejected,
    /// The server dropped its receiver; nothing will pick the update up.
    Closed,
}

/// Monitors the configuration file and emits every valid new version.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<ProxyConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<ProxyConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching. The returned handle must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self { path, update_tx } = self;
        let watched = path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if touches(&event, &path) => {
                    if reload(&path, &update_tx) == Reload::Closed {
                        tracing::warn!(path = ?path, "Config update dropped, server is no longer listening");
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(POLL_INTERVAL),
        )?;
        watcher.watch(&watched, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?watched, "Config watcher started");
        Ok(watcher)
    }
}

/// A write or create that names the watched file, or names nothing at all.
fn touches(event: &Event, path: &Path) -> bool {
    if !(event.kind.is_modify() || event.kind.is_create()) {
        return false;
    }
    event.paths.is_empty()
        || event
            .paths
            .iter()
            .any(|p| p == path || p.file_name() == path.file_name())
}

/// Re-read `path` and hand a valid result to the server.
fn reload(path: &Path, tx: &mpsc::UnboundedSender<ProxyConfig>) -> Reload {
    let config = match load_config(path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(path = ?path, error = %e, "Config reload rejected, keeping current configuration");
            return Reload::Rejected;
        }
    };
    if tx.send(config).is_err() {
        return Reload::Closed;
    }
    tracing::info!(path = ?path, "Config reloaded");
    Reload::Applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, EventKind, ModifyKind};

    fn write(path: &Path, content: &str) {
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_valid_edit_is_sent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proxy.toml");
        write(&path, "[upstream]\nurl = \"http://grafana:3000\"\nrequest_timeout_ms = 750");
        let (tx, mut rx) = mpsc::unbounded_channel();

        assert_eq!(reload(&path, &tx), Reload::Applied);
        assert_eq!(rx.try_recv().unwrap().upstream.request_timeout_ms, 750);
    }

    #[test]
    fn test_invalid_edit_is_held_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proxy.toml");
        write(&path, "[upstream]\nrequest_timeout_ms = 0");
        let (tx, mut rx) = mpsc::unbounded_channel();

        assert_eq!(reload(&path, &tx), Reload::Rejected);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_receiver_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proxy.toml");
        write(&path, "[upstream]\nurl = \"http://grafana:3000\"");
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        assert_eq!(reload(&path, &tx), Reload::Closed);
    }

    #[test]
    fn test_only_writes_to_the_file_count() {
        let path = Path::new("/etc/dashboard-proxy/proxy.toml");
        let modify = EventKind::Modify(ModifyKind::Any);

        assert!(touches(&Event::new(modify).add_path(path.into()), path));
        assert!(touches(&Event::new(EventKind::Create(CreateKind::File)), path));
        assert!(!touches(
            &Event::new(modify).add_path("/etc/dashboard-proxy/other.toml".into()),
            path
        ));
        assert!(!touches(
            &Event::new(EventKind::Access(AccessKind::Any)).add_path(path.into()),
            path
        ));
    }
}
