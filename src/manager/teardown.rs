use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::SurfaceManager;
use crate::analytics::{AnalyticsEvent, EventTracker};
use crate::surface::SurfaceHost;
use crate::tasks::TaskBoard;
use crate::view::ContentRenderer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Requested,
    HostClosed,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type TeardownListener = Rc<dyn Fn(CloseReason)>;

#[derive(Default)]
pub struct TeardownListeners {
    next_id: Cell<u64>,
    listeners: RefCell<Vec<(ListenerId, TeardownListener)>>,
}

impl TeardownListeners {
    pub fn subscribe(&self, listener: impl Fn(CloseReason) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(self.next_id.get().wrapping_add(1));
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    pub fn notify(&self, reason: CloseReason) {
        let listeners: Vec<TeardownListener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        tracing::debug!(reason = ?reason, listeners = listeners.len(), "notifying teardown listeners");
        for listener in listeners {
            listener(reason);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub trait CaptureControl {
    fn stop_capture(&self);
}

pub trait TaskReset {
    fn reset_tasks(&self);
}

impl TaskReset for TaskBoard {
    fn reset_tasks(&self) {
        self.reset();
    }
}

/// Runs the "start over" action across the panel and its dependents.
pub struct TeardownCoordinator<H, R>
where
    H: SurfaceHost + 'static,
    R: ContentRenderer + 'static,
{
    manager: SurfaceManager<H, R>,
    capture: Rc<dyn CaptureControl>,
    tasks: Rc<dyn TaskReset>,
    tracker: Rc<dyn EventTracker>,
}

impl<H, R> TeardownCoordinator<H, R>
where
    H: SurfaceHost + 'static,
    R: ContentRenderer + 'static,
{
    pub fn new(
        manager: SurfaceManager<H, R>,
        capture: Rc<dyn CaptureControl>,
        tasks: Rc<dyn TaskReset>,
        tracker: Rc<dyn EventTracker>,
    ) -> Self {
        Self {
            manager,
            capture,
            tasks,
            tracker,
        }
    }

    /// Closes the panel before stopping capture so it never lingers with stale content.
    pub fn start_over(&self) {
        tracing::info!(phase = ?self.manager.phase(), "start over requested");
        self.tracker.track(AnalyticsEvent::StartOverClicked);
        self.manager.close();
        self.capture.stop_capture();
        self.tasks.reset_tasks();
        self.manager.focus_host();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::recording::RecordingTracker;
    use crate::surface::fake::FakeHost;
    use crate::surface::{AcquirePolicy, HostSurface};
    use crate::geometry::{PanelMargins, PanelSize};
    use crate::manager::OpenOutcome;
    use crate::notification::recording::RecordingNotifier;
    use crate::surface::SurfaceMode;
    use crate::view::TaskScreen;
    use futures::executor::block_on;

    type EventLog = Rc<RefCell<Vec<String>>>;

    struct LoggedCapture(EventLog);

    impl CaptureControl for LoggedCapture {
        fn stop_capture(&self) {
            self.0.borrow_mut().push("stop-capture".to_string());
        }
    }

    struct LoggedTasks(EventLog);

    impl TaskReset for LoggedTasks {
        fn reset_tasks(&self) {
            self.0.borrow_mut().push("reset-tasks".to_string());
        }
    }

    fn manager(host: FakeHost) -> SurfaceManager<FakeHost, TaskScreen> {
        let manager = SurfaceManager::new(
            host,
            TaskScreen,
            AcquirePolicy::new(PanelSize::new(400, 500), PanelMargins::new(20, 100)),
        );
        manager.set_notifier(Rc::new(RecordingNotifier::default()));
        manager.set_tracker(Rc::new(RecordingTracker::default()));
        manager
    }

    #[test]
    fn listeners_are_notified_until_unsubscribed() {
        let listeners = TeardownListeners::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let id = {
            let seen = seen.clone();
            listeners.subscribe(move |reason| seen.borrow_mut().push(reason))
        };

        listeners.notify(CloseReason::HostClosed);
        assert!(listeners.unsubscribe(id));
        assert!(!listeners.unsubscribe(id));
        listeners.notify(CloseReason::Requested);

        assert_eq!(*seen.borrow(), vec![CloseReason::HostClosed]);
        assert!(listeners.is_empty());
    }

    #[test]
    fn start_over_closes_surface_then_stops_capture_then_resets_tasks() {
        let log: EventLog = Rc::new(RefCell::new(Vec::new()));
        let host = FakeHost::with_log(log.clone());
        let manager = manager(host.clone());
        assert_eq!(
            block_on(manager.open()),
            OpenOutcome::Opened(SurfaceMode::Docked)
        );
        log.borrow_mut().clear();
        let tracker = RecordingTracker::default();

        let coordinator = TeardownCoordinator::new(
            manager.clone(),
            Rc::new(LoggedCapture(log.clone())),
            Rc::new(LoggedTasks(log.clone())),
            Rc::new(tracker.clone()),
        );
        coordinator.start_over();

        assert_eq!(
            *log.borrow(),
            vec!["clear", "close", "stop-capture", "reset-tasks", "focus"]
        );
        assert_eq!(tracker.events(), vec![AnalyticsEvent::StartOverClicked]);
        assert!(host.last_surface().expect("surface").is_closed());
    }

    #[test]
    fn start_over_without_open_panel_still_resets_dependents() {
        let log: EventLog = Rc::new(RefCell::new(Vec::new()));
        let host = FakeHost::with_log(log.clone());
        let coordinator = TeardownCoordinator::new(
            manager(host),
            Rc::new(LoggedCapture(log.clone())),
            Rc::new(LoggedTasks(log.clone())),
            Rc::new(RecordingTracker::default()),
        );

        coordinator.start_over();

        assert_eq!(*log.borrow(), vec!["stop-capture", "reset-tasks", "focus"]);
    }

    #[test]
    fn task_board_reset_goes_through_task_reset() {
        let board = TaskBoard::new();
        board.replace_tasks(["one"]);
        board.reset_tasks();
        assert!(board.snapshot().tasks.is_empty());
    }
}
