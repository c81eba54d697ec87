//! Id-keyed alert state with idempotent show/hide semantics.
//!
//! The [`AlertBoard`] sits between the event router and the external
//! alert-presentation surface. It guarantees at-most-one active presentation
//! per [`AlertKind`]: re-showing an already-shown kind replaces its body
//! (one presentation, latest text), and hiding a kind that is not shown is a
//! no-op. Workers for different channels call into the board concurrently,
//! so all state lives behind a mutex.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use mn_core::AlertKind;

/// External alert-presentation surface.
///
/// Implementations must be safe for concurrent calls from multiple workers.
/// An alert stays visible until `hide` is called for its id; the raw body
/// text is also what the drill-down view displays when the alert is opened.
pub trait AlertPresenter: Send + Sync {
    /// Shows (or updates) the alert with the given numeric identity.
    fn show(&self, id: u32, title: &str, body: &str);

    /// Cancels the alert with the given numeric identity.
    fn hide(&self, id: u32);
}

/// Presenter that writes alerts to the log. Used when no platform
/// presentation surface is wired up.
pub struct LogPresenter;

impl AlertPresenter for LogPresenter {
    fn show(&self, id: u32, title: &str, body: &str) {
        tracing::warn!(id, title, body, "ALERT raised");
    }

    fn hide(&self, id: u32) {
        tracing::info!(id, "ALERT cleared");
    }
}

/// Tracks which alerts are active and forwards changes to the presenter.
pub struct AlertBoard {
    presenter: Arc<dyn AlertPresenter>,
    active: Mutex<HashMap<AlertKind, String>>,
    enabled: bool,
}

impl AlertBoard {
    /// Creates a board over the given presenter.
    ///
    /// When `enabled` is false no calls reach the presenter at all; the
    /// board still tracks nothing, so the rest of the pipeline is unchanged.
    pub fn new(presenter: Arc<dyn AlertPresenter>, enabled: bool) -> Self {
        Self {
            presenter,
            active: Mutex::new(HashMap::new()),
            enabled,
        }
    }

    /// Shows the alert for `kind` with the given body.
    ///
    /// Idempotent per kind: a second show replaces the body of the existing
    /// presentation rather than stacking another one.
    pub fn show(&self, kind: AlertKind, body: &str) {
        if !self.enabled {
            debug!(kind = ?kind, "alerts disabled, not showing");
            return;
        }
        let mut active = self.lock_active();
        let replaced = active.insert(kind, body.to_string()).is_some();
        debug!(kind = ?kind, id = kind.id(), replaced, "showing alert");
        self.presenter.show(kind.id(), kind.title(), body);
    }

    /// Hides the alert for `kind` if it is currently shown.
    pub fn hide(&self, kind: AlertKind) {
        if !self.enabled {
            return;
        }
        let mut active = self.lock_active();
        if active.remove(&kind).is_some() {
            debug!(kind = ?kind, id = kind.id(), "hiding alert");
            self.presenter.hide(kind.id());
        }
    }

    /// Returns the body of the active alert for `kind`, if any.
    pub fn active_body(&self, kind: AlertKind) -> Option<String> {
        self.lock_active().get(&kind).cloned()
    }

    /// Number of currently active alerts.
    pub fn active_count(&self) -> usize {
        self.lock_active().len()
    }

    // A poisoned mutex only means another worker panicked mid-update; the
    // map itself is still usable, so recover the guard instead of bubbling.
    fn lock_active(&self) -> MutexGuard<'_, HashMap<AlertKind, String>> {
        match self.active.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    /// Presenter that records every call for assertions.
    #[derive(Default)]
    struct RecordingPresenter {
        calls: StdMutex<Vec<String>>,
    }

    impl RecordingPresenter {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl AlertPresenter for RecordingPresenter {
        fn show(&self, id: u32, title: &str, body: &str) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("show {id} {title}: {body}"));
        }

        fn hide(&self, id: u32) {
            self.calls.lock().unwrap().push(format!("hide {id}"));
        }
    }

    fn board_with_recorder() -> (AlertBoard, Arc<RecordingPresenter>) {
        let presenter = Arc::new(RecordingPresenter::default());
        let board = AlertBoard::new(presenter.clone(), true);
        (board, presenter)
    }

    #[test]
    fn test_show_forwards_id_title_body() {
        let (board, presenter) = board_with_recorder();

        board.show(AlertKind::ModemAssert, "Modem Assert: cause");

        assert_eq!(
            presenter.calls(),
            vec!["show 1 modem assert: Modem Assert: cause"]
        );
        assert_eq!(board.active_count(), 1);
    }

    #[test]
    fn test_show_twice_is_one_presentation_with_latest_body() {
        let (board, _presenter) = board_with_recorder();

        board.show(AlertKind::WcnAssert, "first");
        board.show(AlertKind::WcnAssert, "second");

        assert_eq!(board.active_count(), 1);
        assert_eq!(
            board.active_body(AlertKind::WcnAssert),
            Some("second".to_string())
        );
    }

    #[test]
    fn test_hide_only_when_shown() {
        let (board, presenter) = board_with_recorder();

        // Hiding something never shown does not reach the presenter.
        board.hide(AlertKind::ModemBlock);
        assert!(presenter.calls().is_empty());

        board.show(AlertKind::ModemBlock, "Modem Blocked");
        board.hide(AlertKind::ModemBlock);

        assert_eq!(
            presenter.calls(),
            vec!["show 3 modem block: Modem Blocked", "hide 3"]
        );
        assert_eq!(board.active_count(), 0);
    }

    #[test]
    fn test_kinds_are_independent() {
        let (board, _presenter) = board_with_recorder();

        board.show(AlertKind::ModemAssert, "a");
        board.show(AlertKind::AgdspAssert, "b");
        board.hide(AlertKind::ModemAssert);

        assert_eq!(board.active_body(AlertKind::ModemAssert), None);
        assert_eq!(board.active_body(AlertKind::AgdspAssert), Some("b".to_string()));
    }

    #[test]
    fn test_disabled_board_suppresses_everything() {
        let presenter = Arc::new(RecordingPresenter::default());
        let board = AlertBoard::new(presenter.clone(), false);

        board.show(AlertKind::ModemAssert, "ignored");
        board.hide(AlertKind::ModemAssert);

        assert!(presenter.calls().is_empty());
        assert_eq!(board.active_count(), 0);
    }

    #[test]
    fn test_concurrent_show_hide_is_safe() {
        let (board, _presenter) = board_with_recorder();
        let board = Arc::new(board);

        let mut handles = Vec::new();
        for i in 0..8 {
            let board = board.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    board.show(AlertKind::ModemAssert, &format!("body {i}"));
                    board.hide(AlertKind::ModemAssert);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // At most one active presentation survives; here the final hide wins
        // or a show raced it, but the map never holds more than one entry.
        assert!(board.active_count() <= 1);
    }
}
