//! Propagation hub
//!
//! Owns one resilient pipeline per enabled source:
//! - No ordering between sources; each refreshes on its own interval
//! - A failing source only ever affects its own slot
//! - Readers assemble the dashboard from the slots at any time

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use propwatch_fetch::{create_client, Refreshable, ResilientSource, SourceClient, SourceHealth};
use propwatch_sources::{
    ContestCalendarClient, HamQslClient, MeteorCalendarClient, NoaaSwpcClient, PotaClient, SotaClient,
    CONTEST_CALENDAR_URL, HAMQSL_URL, NOAA_BASE_URL, POTA_URL, SOTA_URL,
};

use crate::{AppConfig, Dashboard, DashboardInputs, SourceConfig};

pub const NOAA_REFRESH: Duration = Duration::from_secs(15 * 60);
pub const HAMQSL_REFRESH: Duration = Duration::from_secs(30 * 60);
pub const POTA_REFRESH: Duration = Duration::from_secs(60);
pub const SOTA_REFRESH: Duration = Duration::from_secs(60);
pub const CONTESTS_REFRESH: Duration = Duration::from_secs(6 * 60 * 60);
pub const METEORS_REFRESH: Duration = Duration::from_secs(24 * 60 * 60);

/// All source pipelines of one process
pub struct PropagationHub {
    noaa: Option<Arc<ResilientSource<NoaaSwpcClient>>>,
    hamqsl: Option<Arc<ResilientSource<HamQslClient>>>,
    pota: Option<Arc<ResilientSource<PotaClient>>>,
    sota: Option<Arc<ResilientSource<SotaClient>>>,
    contests: Option<Arc<ResilientSource<ContestCalendarClient>>>,
    meteors: Option<Arc<ResilientSource<MeteorCalendarClient>>>,
}

impl PropagationHub {
    /// Build pipelines for every enabled source
    pub fn from_config(config: &AppConfig) -> Result<Self, anyhow::Error> {
        let http = create_client(&config.http)?;
        let sources = &config.sources;

        let url = |source: &SourceConfig, default: &str| source.url.clone().unwrap_or_else(|| default.to_string());

        let hub = Self {
            noaa: sources.noaa.enabled.then(|| {
                let client = NoaaSwpcClient::with_base_url(http.clone(), &url(&sources.noaa, NOAA_BASE_URL));
                pipeline(client, &sources.noaa, NOAA_REFRESH, config)
            }),
            hamqsl: sources.hamqsl.enabled.then(|| {
                let client = HamQslClient::with_url(http.clone(), &url(&sources.hamqsl, HAMQSL_URL));
                pipeline(client, &sources.hamqsl, HAMQSL_REFRESH, config)
            }),
            pota: sources.pota.enabled.then(|| {
                let client = PotaClient::with_url(http.clone(), &url(&sources.pota, POTA_URL));
                pipeline(client, &sources.pota, POTA_REFRESH, config)
            }),
            sota: sources.sota.enabled.then(|| {
                let client = SotaClient::with_url(http.clone(), &url(&sources.sota, SOTA_URL));
                pipeline(client, &sources.sota, SOTA_REFRESH, config)
            }),
            contests: sources.contests.enabled.then(|| {
                let client = ContestCalendarClient::with_url(http.clone(), &url(&sources.contests, CONTEST_CALENDAR_URL));
                pipeline(client, &sources.contests, CONTESTS_REFRESH, config)
            }),
            meteors: sources
                .meteors
                .enabled
                .then(|| pipeline(MeteorCalendarClient::new(), &sources.meteors, METEORS_REFRESH, config)),
        };

        let enabled = hub.sources();
        if enabled.is_empty() {
            warn!("All sources are disabled");
        } else {
            info!(
                "Initialized {} sources: {}",
                enabled.len(),
                enabled.iter().map(|s| s.name()).collect::<Vec<_>>().join(", ")
            );
        }

        Ok(hub)
    }

    /// Enabled pipelines as schedulable handles
    pub fn sources(&self) -> Vec<Arc<dyn Refreshable>> {
        let mut sources: Vec<Arc<dyn Refreshable>> = Vec::new();
        if let Some(s) = &self.noaa {
            sources.push(s.clone());
        }
        if let Some(s) = &self.hamqsl {
            sources.push(s.clone());
        }
        if let Some(s) = &self.pota {
            sources.push(s.clone());
        }
        if let Some(s) = &self.sota {
            sources.push(s.clone());
        }
        if let Some(s) = &self.contests {
            sources.push(s.clone());
        }
        if let Some(s) = &self.meteors {
            sources.push(s.clone());
        }
        sources
    }

    /// Fetch every source once, concurrently
    pub async fn refresh_all(&self) {
        let sources = self.sources();
        join_all(sources.iter().map(|s| s.refresh())).await;

        let fresh = sources.iter().filter(|s| !s.health().serving_stale).count();
        info!("Refreshed {} sources ({} live)", sources.len(), fresh);
    }

    /// One periodic refresh task per source. The first refresh runs
    /// immediately. Abort the handles to stop.
    pub fn spawn_schedulers(&self) -> Vec<JoinHandle<()>> {
        self.sources()
            .into_iter()
            .map(|source| {
                tokio::spawn(async move {
                    let mut ticker = interval(source.refresh_interval());
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

                    loop {
                        ticker.tick().await;
                        source.refresh().await;

                        let health = source.health();
                        debug!(
                            "{} tick: breaker {}, {} consecutive fallback(s)",
                            health.name, health.breaker, health.consecutive_fallbacks
                        );
                    }
                })
            })
            .collect()
    }

    pub fn health(&self) -> Vec<SourceHealth> {
        self.sources().iter().map(|s| s.health()).collect()
    }

    /// Current slot contents, without fetching
    pub fn inputs(&self) -> DashboardInputs {
        DashboardInputs {
            noaa: self.noaa.as_ref().and_then(|s| s.snapshot()),
            hamqsl: self.hamqsl.as_ref().and_then(|s| s.snapshot()),
            pota: self.pota.as_ref().and_then(|s| s.snapshot()),
            sota: self.sota.as_ref().and_then(|s| s.snapshot()),
            contests: self.contests.as_ref().and_then(|s| s.snapshot()),
            meteors: self.meteors.as_ref().and_then(|s| s.snapshot()),
            health: self.health(),
        }
    }

    pub fn dashboard_at(&self, now: DateTime<Utc>) -> Dashboard {
        Dashboard::assemble(&self.inputs(), now)
    }

    pub fn dashboard(&self) -> Dashboard {
        self.dashboard_at(Utc::now())
    }
}

fn pipeline<C: SourceClient>(
    client: C,
    source: &SourceConfig,
    default_refresh: Duration,
    config: &AppConfig,
) -> Arc<ResilientSource<C>> {
    let settings = source.settings(client.name(), default_refresh);
    Arc::new(ResilientSource::new(
        client,
        settings,
        config.breaker.clone(),
        config.retry.clone(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use propwatch_fetch::RetryPolicy;

    /// Only the built-in meteor calendar enabled, so nothing touches the network
    fn offline_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.sources.noaa.enabled = false;
        config.sources.hamqsl.enabled = false;
        config.sources.pota.enabled = false;
        config.sources.sota.enabled = false;
        config.sources.contests.enabled = false;
        config
    }

    /// Every network source pointed at a closed local port
    fn unreachable_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.retry = RetryPolicy::none();
        for source in [
            &mut config.sources.noaa,
            &mut config.sources.hamqsl,
            &mut config.sources.pota,
            &mut config.sources.sota,
            &mut config.sources.contests,
        ] {
            source.url = Some("http://127.0.0.1:9".to_string());
            source.timeout_secs = 2;
        }
        config
    }

    #[test]
    fn test_disabled_sources_are_skipped() {
        let hub = PropagationHub::from_config(&offline_config()).unwrap();
        let names: Vec<_> = hub.sources().iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names, vec!["meteors"]);

        let all = PropagationHub::from_config(&AppConfig::default()).unwrap();
        assert_eq!(all.sources().len(), 6);
    }

    #[test]
    fn test_refresh_intervals_follow_config() {
        let mut config = offline_config();
        config.sources.meteors.refresh_secs = Some(3600);
        let hub = PropagationHub::from_config(&config).unwrap();
        assert_eq!(hub.sources()[0].refresh_interval(), Duration::from_secs(3600));

        let hub = PropagationHub::from_config(&offline_config()).unwrap();
        assert_eq!(hub.sources()[0].refresh_interval(), METEORS_REFRESH);
    }

    #[tokio::test]
    async fn test_dashboard_before_any_fetch() {
        let hub = PropagationHub::from_config(&offline_config()).unwrap();
        let dashboard = hub.dashboard();

        assert!(dashboard.meteor_showers.items.is_empty());
        assert_eq!(dashboard.sources.len(), 1);
        assert!(dashboard.sources[0].last_success_at.is_none());
    }

    #[tokio::test]
    async fn test_refresh_all_offline() {
        let hub = PropagationHub::from_config(&offline_config()).unwrap();
        hub.refresh_all().await;

        let dashboard = hub.dashboard();
        assert!(!dashboard.meteor_showers.items.is_empty());
        assert_eq!(dashboard.meteor_showers.provenance.sources, vec!["IMO Calendar"]);
        assert!(dashboard.sources[0].last_success_at.is_some());
    }

    #[tokio::test]
    async fn test_unreachable_sources_degrade() {
        let hub = PropagationHub::from_config(&unreachable_config()).unwrap();
        hub.refresh_all().await;

        let inputs = hub.inputs();
        let pota = inputs.pota.as_ref().unwrap();
        assert!(pota.degraded);
        assert_eq!(pota.source_label, "POTA (Degraded)");

        let dashboard = Dashboard::assemble(&inputs, Utc::now());
        assert!(dashboard.solar.is_none());
        assert_eq!(dashboard.activations.total, 0);
        // The calendar needs no network and still produces data
        assert!(!dashboard.meteor_showers.items.is_empty());

        let degraded = dashboard.sources.iter().filter(|h| h.last_success_at.is_none()).count();
        assert_eq!(degraded, 5);
    }

    #[tokio::test]
    async fn test_schedulers_refresh_immediately() {
        let hub = PropagationHub::from_config(&offline_config()).unwrap();
        let handles = hub.spawn_schedulers();
        assert_eq!(handles.len(), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(hub.inputs().meteors.is_some());

        for handle in handles {
            handle.abort();
        }
    }
}
