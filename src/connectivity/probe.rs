//! Environment connectivity signal for a command-line process.
//!
//! A CLI has no browser-style online/offline events, so the signal comes
//! from reaching the remote store's health URL.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use super::monitor::ConnectivityMonitor;
use crate::config::{Config, ConnectivityMode};
use crate::error::NotesError;

const MAX_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Checks whether the remote store is reachable.
pub struct ConnectivityProbe {
    client: reqwest::Client,
    url: Option<String>,
}

impl ConnectivityProbe {
    /// Build a probe against `remote.health_url`.
    ///
    /// # Errors
    ///
    /// Returns `NotesError::Config` if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, NotesError> {
        let client = reqwest::Client::builder()
            .timeout(config.remote.timeout().min(MAX_PROBE_TIMEOUT))
            .build()
            .map_err(|e| NotesError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: config.remote.health_url.clone(),
        })
    }

    /// Probe once.
    ///
    /// Any HTTP response counts as online, a transport error as offline.
    /// Returns `None` when no health URL is configured.
    pub async fn check(&self) -> Option<bool> {
        let url = self.url.as_deref()?;
        match self.client.get(url).send().await {
            Ok(response) => {
                debug!(status = %response.status(), "probe reached remote");
                Some(true)
            },
            Err(e) => {
                debug!(error = %e, "probe failed");
                Some(false)
            },
        }
    }
}

/// Initial connectivity signal for this process, per `connectivity.mode`.
pub async fn initial_signal(config: &Config, probe: &ConnectivityProbe) -> Option<bool> {
    match config.connectivity.mode {
        ConnectivityMode::Online => Some(true),
        ConnectivityMode::Offline => Some(false),
        ConnectivityMode::Auto => probe.check().await,
    }
}

/// Probe on an interval and feed results to the monitor until `shutdown`
/// resolves.
pub async fn watch<S>(
    monitor: Arc<ConnectivityMonitor>,
    probe: ConnectivityProbe,
    interval: Duration,
    shutdown: S,
) where
    S: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => {
                info!("connectivity watch stopped");
                break;
            }
            _ = ticker.tick() => {
                if let Some(online) = probe.check().await {
                    monitor.set_online(online);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_with_health(url: Option<String>) -> Config {
        let mut config = Config::default();
        config.remote.health_url = url;
        config
    }

    #[tokio::test]
    async fn test_check_without_url_gives_no_signal() {
        let probe = ConnectivityProbe::from_config(&config_with_health(None)).unwrap();
        assert_eq!(probe.check().await, None);
    }

    #[tokio::test]
    async fn test_check_reachable_is_online() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let probe =
            ConnectivityProbe::from_config(&config_with_health(Some(server.uri()))).unwrap();
        assert_eq!(probe.check().await, Some(true));
    }

    #[tokio::test]
    async fn test_check_unreachable_is_offline() {
        // Port 1 on loopback refuses connections
        let probe = ConnectivityProbe::from_config(&config_with_health(Some(
            "http://127.0.0.1:1/health".to_string(),
        )))
        .unwrap();
        assert_eq!(probe.check().await, Some(false));
    }

    #[tokio::test]
    async fn test_initial_signal_modes() {
        let probe = ConnectivityProbe::from_config(&config_with_health(None)).unwrap();
        let mut config = Config::default();

        assert_eq!(initial_signal(&config, &probe).await, None);

        config.connectivity.mode = ConnectivityMode::Offline;
        assert_eq!(initial_signal(&config, &probe).await, Some(false));

        config.connectivity.mode = ConnectivityMode::Online;
        assert_eq!(initial_signal(&config, &probe).await, Some(true));
    }

    #[tokio::test]
    async fn test_watch_flips_monitor_online() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let monitor = ConnectivityMonitor::new(Some(false));
        let probe =
            ConnectivityProbe::from_config(&config_with_health(Some(server.uri()))).unwrap();

        watch(
            Arc::clone(&monitor),
            probe,
            Duration::from_millis(20),
            tokio::time::sleep(Duration::from_millis(200)),
        )
        .await;

        assert!(monitor.is_online());
    }
}
