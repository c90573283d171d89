//! The periodic driver loop.
//!
//! One cycle probes every destination, appends the summaries to the
//! archive, then lets the scheduler send any report that is due. Cycles
//! never overlap: the next one starts `interval` after the previous one
//! finished.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, FixedOffset, Local};
use tokio_util::sync::CancellationToken;

use crate::archive::Archive;
use crate::classify::{Thresholds, TraceSummary, duration_ms};
use crate::config::AppConfig;
use crate::notify::{self, Notifier, SendError};
use crate::orchestrator::Orchestrator;
use crate::probe::{ProbeLimits, Prober, Tracer};
use crate::report::{DispatchOutcome, Scheduler};

/// What one cycle produced.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub timestamp: DateTime<FixedOffset>,
    pub summaries: Vec<TraceSummary>,
    /// Record appended to, or `None` when the append failed.
    pub record: Option<PathBuf>,
    pub dispatched: Vec<DispatchOutcome>,
}

/// Runs probing cycles until cancelled.
#[derive(Debug)]
pub struct Daemon {
    interval: Duration,
    destinations: Vec<String>,
    limits: ProbeLimits,
    thresholds: Thresholds,
    orchestrator: Orchestrator,
    archive: Archive,
    scheduler: Option<Scheduler>,
}

impl Daemon {
    /// Assemble a daemon from explicit components.
    ///
    /// Reports stay disabled unless both a report section and a notifier
    /// are given.
    pub fn new(
        config: &AppConfig,
        prober: Arc<dyn Prober>,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Self {
        let archive = Archive::new(&config.data_dir);
        let scheduler = match (&config.report, notifier) {
            (Some(report), Some(notifier)) => {
                Some(Scheduler::from_config(archive.clone(), report, notifier))
            }
            _ => None,
        };

        Self {
            interval: config.interval,
            destinations: config.probe.destinations.clone(),
            limits: config.probe.limits(),
            thresholds: config.probe.thresholds(),
            orchestrator: Orchestrator::from_config(prober, &config.probe),
            archive,
            scheduler,
        }
    }

    /// Assemble a daemon probing with ICMP and the configured transport.
    ///
    /// # Errors
    /// Returns `SendError` if the notification transport cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, SendError> {
        let prober: Arc<dyn Prober> =
            Arc::new(Tracer::icmp().with_resolve_names(config.probe.resolve_names));
        let notifier = config
            .report
            .as_ref()
            .map(|report| notify::from_config(&report.transport))
            .transpose()?;
        Ok(Self::new(config, prober, notifier))
    }

    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    pub fn reports_enabled(&self) -> bool {
        self.scheduler
            .as_ref()
            .is_some_and(|scheduler| !scheduler.schedules().is_empty())
    }

    /// Run a single cycle stamped `now`.
    ///
    /// Archive and notification failures are logged; the cycle always
    /// completes.
    pub async fn run_once(&self, now: DateTime<FixedOffset>) -> CycleReport {
        let started = Instant::now();
        tracing::info!(
            timestamp = %now.to_rfc3339(),
            destinations = self.destinations.len(),
            "Cycle started"
        );

        let summaries = self
            .orchestrator
            .run_cycle(&self.destinations, self.limits, self.thresholds)
            .await;

        let record = match self.archive.record_cycle(&now, &summaries) {
            Ok((location, rows)) => {
                tracing::debug!(
                    record = %location.record.display(),
                    rows,
                    "Cycle archived"
                );
                Some(location.record)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to archive cycle; its data is lost");
                None
            }
        };

        let dispatched = match &self.scheduler {
            Some(scheduler) => scheduler.dispatch_due(&now).await,
            None => Vec::new(),
        };

        let failures = summaries.iter().filter(|s| s.is_failure()).count();
        tracing::info!(
            traced = summaries.len(),
            failures,
            skipped = self.destinations.len() - summaries.len(),
            reports = dispatched.len(),
            elapsed_ms = duration_ms(started.elapsed()),
            "Cycle finished"
        );

        CycleReport {
            timestamp: now,
            summaries,
            record,
            dispatched,
        }
    }

    /// Run cycles until `cancel` fires.
    ///
    /// Cancellation is checked before each cycle and interrupts the sleep
    /// between cycles. A running cycle is allowed to finish.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            reports = self.reports_enabled(),
            "Monitor running"
        );

        while !cancel.is_cancelled() {
            self.run_once(Local::now().fixed_offset()).await;

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        tracing::info!("Monitor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CadenceConfig, ProbeConfig, ReportConfig, TransportConfig, WebhookConfig};
    use crate::probe::{HopObservation, HopStatus, ProbeError};
    use crate::report::ReportCadence;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProber {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Prober for CountingProber {
        async fn probe(
            &self,
            _destination: &str,
            _limits: ProbeLimits,
        ) -> Result<Vec<HopObservation>, ProbeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![HopObservation::new(
                1,
                None,
                Duration::from_millis(3),
                HopStatus::Success,
            )])
        }
    }

    struct NullNotifier;

    #[async_trait::async_trait]
    impl Notifier for NullNotifier {
        fn name(&self) -> &str {
            "null"
        }

        async fn send(
            &self,
            _recipient: &str,
            _subject: &str,
            _body: &str,
            _is_html: bool,
        ) -> Result<(), SendError> {
            Ok(())
        }
    }

    fn config(dir: &std::path::Path) -> AppConfig {
        let mut config = AppConfig::new(ProbeConfig::new(["a.test", "b.test"]));
        config.data_dir = dir.to_path_buf();
        config
    }

    fn prober() -> Arc<CountingProber> {
        Arc::new(CountingProber {
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_run_once_archives_and_skips_reports_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let daemon = Daemon::new(&config(dir.path()), prober(), None);
        assert!(!daemon.reports_enabled());

        let now = DateTime::parse_from_rfc3339("2026-10-20T12:00:00+02:00").unwrap();
        let report = daemon.run_once(now).await;

        assert_eq!(report.summaries.len(), 2);
        let record = report.record.unwrap();
        assert_eq!(record, dir.path().join("2026/43/Tuesday/Tuesday.csv"));
        assert!(report.dispatched.is_empty());
    }

    #[tokio::test]
    async fn test_run_once_dispatches_due_report() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.report = Some(ReportConfig {
            recipient: "ops@example.com".to_string(),
            daily: Some(CadenceConfig {
                send_hour: 6,
                weekday: None,
            }),
            weekly: None,
            mark_failed_sends: true,
            transport: TransportConfig::Webhook(WebhookConfig::new("https://example.com/hook")),
        });
        let daemon = Daemon::new(&config, prober(), Some(Arc::new(NullNotifier)));
        assert!(daemon.reports_enabled());

        let now = DateTime::parse_from_rfc3339("2026-10-20T12:00:00+02:00").unwrap();
        let first = daemon.run_once(now).await;
        assert_eq!(first.dispatched.len(), 1);
        assert_eq!(first.dispatched[0].cadence, ReportCadence::Daily);

        let second = daemon.run_once(now + chrono::Duration::minutes(1)).await;
        assert!(second.dispatched.is_empty());
    }

    #[tokio::test]
    async fn test_run_stops_before_first_cycle_when_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let prober = prober();
        let daemon = Daemon::new(&config(dir.path()), prober.clone(), None);

        let cancel = CancellationToken::new();
        cancel.cancel();
        daemon.run(cancel).await;
        assert_eq!(prober.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_run_interrupts_sleep_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.interval = Duration::from_secs(3600);
        let prober = prober();
        let daemon = Arc::new(Daemon::new(&config, prober.clone(), None));

        let cancel = CancellationToken::new();
        let handle = tokio::spawn({
            let daemon = Arc::clone(&daemon);
            let cancel = cancel.clone();
            async move { daemon.run(cancel).await }
        });

        tokio::time::sleep(Duration::from_millis(200)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("run did not stop after cancel")
            .unwrap();

        assert_eq!(prober.calls.load(Ordering::SeqCst), 2);
    }
}
