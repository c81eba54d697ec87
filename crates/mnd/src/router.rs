//! Routes domain events onto the external side-effect surfaces.
//!
//! The router is the single consumer of classified events from all channel
//! workers. It is cheap to clone (workers each hold a clone) and every
//! surface behind it is safe for concurrent invocation, so routing needs no
//! locking of its own.

use std::sync::Arc;

use tracing::debug;

use mn_core::{AlertKind, ChannelKind, CoarseState, DomainEvent, MonitorSettings};

use crate::alert::AlertBoard;
use crate::broadcast::StateBus;
use crate::progress::ProgressHandle;

/// Drives alerts, broadcasts, and the dump progress indicator from
/// classified channel events.
#[derive(Clone)]
pub struct EventRouter {
    alerts: Arc<AlertBoard>,
    bus: StateBus,
    progress: ProgressHandle,
    /// The platform resets the modem itself; showing an assert alert on top
    /// of that would be noise. Broadcasts are not suppressed.
    suppress_modem_assert_alert: bool,
}

impl EventRouter {
    pub fn new(
        alerts: Arc<AlertBoard>,
        bus: StateBus,
        progress: ProgressHandle,
        settings: &MonitorSettings,
    ) -> Self {
        Self {
            alerts,
            bus,
            progress,
            suppress_modem_assert_alert: settings.suppress_modem_assert_alert,
        }
    }

    /// Applies one event's side effects. Unrecognized events do nothing.
    pub fn route(&self, event: DomainEvent) {
        match event {
            DomainEvent::Alive(ChannelKind::Modem, text) => {
                self.alerts.hide(AlertKind::ModemAssert);
                self.alerts.hide(AlertKind::ModemBlock);
                self.bus.publish(ChannelKind::Modem, CoarseState::Alive, &text);
            }
            DomainEvent::Alive(kind, text) => {
                self.alerts.hide(AlertKind::WcnAssert);
                self.alerts.hide(AlertKind::ModemBlock);
                self.bus.publish(kind, CoarseState::Alive, &text);
            }
            DomainEvent::Assert(ChannelKind::Modem, text) => {
                if self.suppress_modem_assert_alert {
                    debug!("modem reset active, suppressing assert alert");
                } else {
                    self.alerts.show(AlertKind::ModemAssert, &text);
                }
                self.bus.publish(ChannelKind::Modem, CoarseState::Assert, &text);
            }
            DomainEvent::Assert(kind, text) => {
                self.alerts.show(AlertKind::WcnAssert, &text);
                self.bus.publish(kind, CoarseState::Assert, &text);
            }
            DomainEvent::Blocked(text) => {
                self.alerts.show(AlertKind::ModemBlock, &text);
            }
            DomainEvent::AgdspAssert(text) => {
                self.alerts.show(AlertKind::AgdspAssert, &text);
            }
            DomainEvent::DumpStart => {
                self.progress.start();
            }
            DomainEvent::DumpEnd => {
                self.progress.end();
            }
            DomainEvent::Unrecognized => {
                debug!("unrecognized chunk, no action");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::sleep;
    use tokio_util::sync::CancellationToken;

    use crate::alert::AlertPresenter;
    use crate::progress::{spawn_progress_task, ProgressIndicator};

    #[derive(Default)]
    struct RecordingPresenter {
        calls: Mutex<Vec<String>>,
    }

    impl RecordingPresenter {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl AlertPresenter for RecordingPresenter {
        fn show(&self, id: u32, _title: &str, body: &str) {
            self.calls.lock().unwrap().push(format!("show {id}: {body}"));
        }

        fn hide(&self, id: u32) {
            self.calls.lock().unwrap().push(format!("hide {id}"));
        }
    }

    #[derive(Default)]
    struct RecordingIndicator {
        calls: Mutex<Vec<&'static str>>,
    }

    impl ProgressIndicator for RecordingIndicator {
        fn start(&self, _title: &str, _message: &str) {
            self.calls.lock().unwrap().push("start");
        }

        fn stop(&self) {
            self.calls.lock().unwrap().push("stop");
        }
    }

    struct Fixture {
        router: EventRouter,
        presenter: Arc<RecordingPresenter>,
        indicator: Arc<RecordingIndicator>,
        bus: StateBus,
        _cancel: CancellationToken,
    }

    fn fixture_with(settings: MonitorSettings) -> Fixture {
        let presenter = Arc::new(RecordingPresenter::default());
        let board = Arc::new(AlertBoard::new(presenter.clone(), settings.alerts_enabled));
        let bus = StateBus::new();
        let indicator = Arc::new(RecordingIndicator::default());
        let cancel = CancellationToken::new();
        let (progress, _task) = spawn_progress_task(indicator.clone(), cancel.clone());

        Fixture {
            router: EventRouter::new(board, bus.clone(), progress, &settings),
            presenter,
            indicator,
            bus,
            _cancel: cancel,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(MonitorSettings::default())
    }

    #[tokio::test]
    async fn test_modem_alive_clears_alerts_and_broadcasts() {
        let fix = fixture();
        let mut rx = fix.bus.subscribe();

        // Raise the alerts that alive must clear.
        fix.router.route(DomainEvent::Assert(
            ChannelKind::Modem,
            "Modem Assert: x".to_string(),
        ));
        fix.router
            .route(DomainEvent::Blocked("Modem Blocked".to_string()));
        fix.router.route(DomainEvent::Alive(
            ChannelKind::Modem,
            "Modem Alive".to_string(),
        ));

        let calls = fix.presenter.calls();
        assert_eq!(
            calls,
            vec![
                "show 1: Modem Assert: x",
                "show 3: Modem Blocked",
                "hide 1",
                "hide 3",
            ]
        );

        // Assert broadcast, then alive broadcast, both with raw text.
        let first = rx.recv().await.unwrap();
        assert_eq!(first.state, CoarseState::Assert);
        let second = rx.recv().await.unwrap();
        assert_eq!(second.state, CoarseState::Alive);
        assert_eq!(second.message, "Modem Alive");
    }

    #[tokio::test]
    async fn test_modem_assert_shows_alert_and_broadcasts() {
        let fix = fixture();
        let mut rx = fix.bus.subscribe();

        fix.router.route(DomainEvent::Assert(
            ChannelKind::Modem,
            "Modem Assert: SIPC".to_string(),
        ));

        assert_eq!(fix.presenter.calls(), vec!["show 1: Modem Assert: SIPC"]);
        let change = rx.recv().await.unwrap();
        assert_eq!(change.subsystem, ChannelKind::Modem);
        assert_eq!(change.state, CoarseState::Assert);
        assert_eq!(change.message, "Modem Assert: SIPC");
    }

    #[tokio::test]
    async fn test_modem_assert_suppressed_still_broadcasts() {
        let settings = MonitorSettings {
            suppress_modem_assert_alert: true,
            ..Default::default()
        };
        let fix = fixture_with(settings);
        let mut rx = fix.bus.subscribe();

        fix.router.route(DomainEvent::Assert(
            ChannelKind::Modem,
            "Modem Assert".to_string(),
        ));

        // No alert shown, broadcast still sent.
        assert!(fix.presenter.calls().is_empty());
        let change = rx.recv().await.unwrap();
        assert_eq!(change.state, CoarseState::Assert);
    }

    #[tokio::test]
    async fn test_connectivity_events_use_wcn_alert() {
        let fix = fixture();

        fix.router.route(DomainEvent::Assert(
            ChannelKind::Connectivity,
            "WCN-CP2-EXCEPTION".to_string(),
        ));
        fix.router.route(DomainEvent::Alive(
            ChannelKind::Connectivity,
            "WCN-CP2-ALIVE".to_string(),
        ));

        assert_eq!(
            fix.presenter.calls(),
            vec!["show 2: WCN-CP2-EXCEPTION", "hide 2"]
        );
    }

    #[tokio::test]
    async fn test_blocked_and_agdsp_show_without_broadcast() {
        let fix = fixture();
        let mut rx = fix.bus.subscribe();

        fix.router
            .route(DomainEvent::Blocked("Modem Blocked".to_string()));
        fix.router
            .route(DomainEvent::AgdspAssert("AGDSP Assert".to_string()));

        assert_eq!(
            fix.presenter.calls(),
            vec!["show 3: Modem Blocked", "show 4: AGDSP Assert"]
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dump_events_drive_progress() {
        let fix = fixture();

        fix.router.route(DomainEvent::DumpStart);
        fix.router.route(DomainEvent::DumpEnd);
        sleep(Duration::from_millis(50)).await;

        assert_eq!(*fix.indicator.calls.lock().unwrap(), vec!["start", "stop"]);
    }

    #[tokio::test]
    async fn test_unrecognized_is_inert() {
        let fix = fixture();
        let mut rx = fix.bus.subscribe();

        fix.router.route(DomainEvent::Unrecognized);
        sleep(Duration::from_millis(20)).await;

        assert!(fix.presenter.calls().is_empty());
        assert!(fix.indicator.calls.lock().unwrap().is_empty());
        assert!(rx.try_recv().is_err());
    }
}
