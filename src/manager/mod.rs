use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use futures::future::{FutureExt, LocalBoxFuture};

use crate::analytics::{AnalyticsEvent, EventTracker, LogTracker};
use crate::capture::{CaptureLink, CloseCallback, GeometryGetter};
use crate::geometry::GeometrySnapshot;
use crate::notification::{DesktopNotifier, UserNotifier, POPUP_BLOCKED_MESSAGE};
use crate::state::{LifecycleEvent, LifecycleMachine, LifecyclePhase};
use crate::surface::{
    acquire_with, mirror_styles, AcquirePolicy, HostSurface, MountHandle, RefreshOutcome,
    SkipReason, Surface, SurfaceError, SurfaceHost, SurfaceMode, SurfaceResult,
};
use crate::tasks::RenderInputs;
use crate::view::ContentRenderer;

mod teardown;

pub use teardown::{
    CaptureControl, CloseReason, ListenerId, TaskReset, TeardownCoordinator, TeardownListeners,
};

type RootOf<H> = <<H as SurfaceHost>::Surface as HostSurface>::Root;
type PanelMachine<H> = LifecycleMachine<<H as SurfaceHost>::Surface, MountHandle<RootOf<H>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenOutcome {
    Opened(SurfaceMode),
    AlreadyActive,
    Denied,
    PopupBlocked,
    Failed(SurfaceError),
    /// A close arrived while the surface was being acquired.
    ClosedWhileOpening,
}

pub struct SurfaceManager<H, R>
where
    H: SurfaceHost + 'static,
    R: ContentRenderer + 'static,
{
    inner: Rc<Inner<H, R>>,
}

impl<H, R> Clone for SurfaceManager<H, R>
where
    H: SurfaceHost + 'static,
    R: ContentRenderer + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct Inner<H: SurfaceHost, R: ContentRenderer> {
    host: H,
    renderer: R,
    policy: AcquirePolicy,
    machine: RefCell<PanelMachine<H>>,
    visible: Cell<bool>,
    last_generation: Cell<u64>,
    latest_inputs: RefCell<RenderInputs>,
    listeners: TeardownListeners,
    capture: RefCell<Option<Rc<dyn CaptureLink>>>,
    notifier: RefCell<Rc<dyn UserNotifier>>,
    tracker: RefCell<Rc<dyn EventTracker>>,
}

impl<H, R> SurfaceManager<H, R>
where
    H: SurfaceHost + 'static,
    R: ContentRenderer + 'static,
{
    pub fn new(host: H, renderer: R, policy: AcquirePolicy) -> Self {
        Self {
            inner: Rc::new(Inner {
                host,
                renderer,
                policy,
                machine: RefCell::new(LifecycleMachine::new()),
                visible: Cell::new(false),
                last_generation: Cell::new(0),
                latest_inputs: RefCell::new(RenderInputs::default()),
                listeners: TeardownListeners::default(),
                capture: RefCell::new(None),
                notifier: RefCell::new(Rc::new(DesktopNotifier)),
                tracker: RefCell::new(Rc::new(LogTracker)),
            }),
        }
    }

    pub fn set_notifier(&self, notifier: Rc<dyn UserNotifier>) {
        *self.inner.notifier.borrow_mut() = notifier;
    }

    pub fn set_tracker(&self, tracker: Rc<dyn EventTracker>) {
        *self.inner.tracker.borrow_mut() = tracker;
    }

    /// Acquires, styles and mounts a fresh panel.
    ///
    /// Calls made while another open is pending or a panel is showing resolve
    /// to [`OpenOutcome::AlreadyActive`] without touching the host.
    pub fn open(&self) -> LocalBoxFuture<'static, OpenOutcome> {
        let inner = self.inner.clone();
        async move { inner.open().await }.boxed_local()
    }

    pub fn close(&self) -> bool {
        self.inner
            .close_with(LifecycleEvent::CloseRequested, CloseReason::Requested, None)
    }

    /// Teardown path for a panel the host already discarded.
    pub fn handle_host_close(&self) -> bool {
        self.inner
            .close_with(LifecycleEvent::HostClosed, CloseReason::HostClosed, None)
    }

    pub fn refresh_content(&self, inputs: RenderInputs) -> RefreshOutcome {
        self.inner.refresh_content(inputs)
    }

    pub fn query_geometry(&self) -> GeometrySnapshot {
        self.inner.query_geometry(None)
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.inner.machine.borrow().phase()
    }

    pub fn mode(&self) -> Option<SurfaceMode> {
        self.inner
            .machine
            .borrow()
            .open_parts()
            .map(|(surface, _)| surface.mode())
    }

    pub fn attach_capture(&self, link: Rc<dyn CaptureLink>) {
        self.detach_capture();
        let weak = Rc::downgrade(&self.inner);
        let close: CloseCallback = Rc::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.close_with(LifecycleEvent::CloseRequested, CloseReason::Requested, None);
            }
        });
        link.subscribe_close(close);
        *self.inner.capture.borrow_mut() = Some(link);
        self.inner.register_geometry();
    }

    pub fn detach_capture(&self) {
        self.inner.detach_capture();
    }

    pub fn on_teardown(&self, listener: impl Fn(CloseReason) + 'static) -> ListenerId {
        self.inner.listeners.subscribe(listener)
    }

    pub fn remove_teardown_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.unsubscribe(id)
    }

    pub fn focus_host(&self) {
        self.inner.host.focus_main_window();
    }

    pub fn shutdown(&self) {
        self.inner
            .close_with(LifecycleEvent::CloseRequested, CloseReason::Shutdown, None);
        self.detach_capture();
    }
}

impl<H, R> Inner<H, R>
where
    H: SurfaceHost + 'static,
    R: ContentRenderer + 'static,
{
    async fn open(self: Rc<Self>) -> OpenOutcome {
        let generation = {
            let mut machine = self.machine.borrow_mut();
            let phase = machine.phase();
            if phase != LifecyclePhase::Closed {
                tracing::debug!(phase = ?phase, "panel open already in progress; ignoring request");
                return OpenOutcome::AlreadyActive;
            }
            if let Err(err) = machine.begin_open() {
                tracing::warn!(?err, "failed to begin panel open");
                return OpenOutcome::AlreadyActive;
            }
            self.next_generation()
        };

        let pending = PendingOpen {
            inner: &*self,
            generation,
            settled: false,
        };
        let acquired = acquire_with(&self.host, &self.policy, generation).await;
        pending.settle();
        let surface = match acquired {
            Ok(surface) => surface,
            Err(err) => return self.fail_open(err),
        };
        let mode = surface.mode();

        let close_queued = match self.install(surface) {
            Ok(close_queued) => close_queued,
            Err(err) => return self.fail_open(err),
        };

        tracing::info!(mode = ?mode, generation, "guide panel opened");
        self.tracker
            .borrow()
            .track(AnalyticsEvent::SurfaceOpened { mode });
        self.register_geometry();

        if close_queued {
            tracing::debug!(generation, "running close queued during acquisition");
            self.close_with(LifecycleEvent::CloseRequested, CloseReason::Requested, None);
            return OpenOutcome::ClosedWhileOpening;
        }
        OpenOutcome::Opened(mode)
    }

    fn install(self: &Rc<Self>, surface: Surface<H::Surface>) -> SurfaceResult<bool> {
        let generation = surface.generation();
        let host_surface = surface.host();

        let prepared = mirror_styles(host_surface, &self.host.stylesheets())
            .map_err(|failure| SurfaceError::host("mirroring styles", failure))
            .and_then(|_| {
                host_surface
                    .mount_root()
                    .map_err(|failure| SurfaceError::host("creating mount root", failure))
            })
            .and_then(|root| {
                let inputs = self.latest_inputs.borrow().clone();
                MountHandle::mount(root, &self.renderer, &inputs)
                    .map_err(|failure| SurfaceError::host("mounting content", failure))
            });
        let mount = match prepared {
            Ok(mount) => mount,
            Err(err) => {
                host_surface.close();
                return Err(err);
            }
        };

        let weak = Rc::downgrade(self);
        host_surface.on_visibility_change(Box::new(move |visible| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_visibility(generation, visible);
            }
        }));
        let weak: Weak<Self> = Rc::downgrade(self);
        host_surface.on_close(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.close_with(
                    LifecycleEvent::HostClosed,
                    CloseReason::HostClosed,
                    Some(generation),
                );
            }
        }));
        self.visible.set(host_surface.is_visible());

        let mut machine = self.machine.borrow_mut();
        if !machine.can_transition(LifecycleEvent::Acquired) {
            drop(machine);
            mount.unmount();
            surface.host().close();
            return Err(SurfaceError::Host {
                stage: "finishing open",
                message: "lifecycle left the opening phase".to_string(),
            });
        }
        let close_queued = machine.close_queued();
        machine
            .finish_open(surface, mount)
            .map_err(|err| SurfaceError::Host {
                stage: "finishing open",
                message: err.to_string(),
            })?;
        Ok(close_queued)
    }

    fn fail_open(&self, err: SurfaceError) -> OpenOutcome {
        match self.machine.borrow_mut().abort_open() {
            Ok(true) => tracing::debug!("dropping close queued for a failed open"),
            Ok(false) => {}
            Err(state_err) => tracing::warn!(?state_err, "failed to abort panel open"),
        }
        self.visible.set(false);

        match err {
            SurfaceError::UserDenied => {
                tracing::debug!("docked panel request denied; staying closed");
                OpenOutcome::Denied
            }
            SurfaceError::PopupBlocked => {
                tracing::warn!("floating panel window was blocked");
                self.notifier.borrow().notify(POPUP_BLOCKED_MESSAGE);
                self.tracker.borrow().track(AnalyticsEvent::PopupBlocked);
                OpenOutcome::PopupBlocked
            }
            SurfaceError::Host { .. } => {
                tracing::error!(error = %err, "failed to open guide panel");
                OpenOutcome::Failed(err)
            }
        }
    }

    fn register_geometry(self: &Rc<Self>) {
        let Some(link) = self.capture.borrow().clone() else {
            return;
        };
        let generation = self
            .machine
            .borrow()
            .open_parts()
            .map(|(surface, _)| surface.generation());
        match generation {
            Some(generation) => {
                let weak = Rc::downgrade(self);
                let getter: GeometryGetter = Rc::new(move || {
                    weak.upgrade()
                        .map(|inner| inner.query_geometry(Some(generation)))
                        .unwrap_or(GeometrySnapshot::NONE)
                });
                link.subscribe_geometry(getter);
                tracing::debug!(generation, "registered panel geometry with capture session");
            }
            None => link.unsubscribe_geometry(),
        }
    }

    fn refresh_content(&self, inputs: RenderInputs) -> RefreshOutcome {
        *self.latest_inputs.borrow_mut() = inputs;
        let machine = self.machine.borrow();
        let Some((surface, mount)) = machine.open_parts() else {
            return RefreshOutcome::Skipped(SkipReason::NotOpen);
        };
        let inputs = self.latest_inputs.borrow();
        match mount.refresh(&self.renderer, &inputs) {
            Ok(outcome) => outcome,
            Err(failure) => {
                tracing::warn!(
                    generation = surface.generation(),
                    error = %failure,
                    "failed to refresh panel content"
                );
                RefreshOutcome::Skipped(SkipReason::HostRejected)
            }
        }
    }
}

/// Rolls an open back to `Closed` when its future is dropped before the host answers.
struct PendingOpen<'a, H: SurfaceHost, R: ContentRenderer> {
    inner: &'a Inner<H, R>,
    generation: u64,
    settled: bool,
}

impl<H: SurfaceHost, R: ContentRenderer> PendingOpen<'_, H, R> {
    fn settle(mut self) {
        self.settled = true;
    }
}

impl<H: SurfaceHost, R: ContentRenderer> Drop for PendingOpen<'_, H, R> {
    fn drop(&mut self) {
        if !self.settled {
            self.inner.abandon_open(self.generation);
        }
    }
}

impl<H: SurfaceHost, R: ContentRenderer> Inner<H, R> {
    fn next_generation(&self) -> u64 {
        let generation = self.last_generation.get().wrapping_add(1);
        self.last_generation.set(generation);
        generation
    }

    fn query_geometry(&self, generation: Option<u64>) -> GeometrySnapshot {
        let Ok(machine) = self.machine.try_borrow() else {
            return GeometrySnapshot::NONE;
        };
        match machine.open_parts() {
            Some((surface, _)) if generation.map_or(true, |id| id == surface.generation()) => {
                GeometrySnapshot::from_surface(surface.host().geometry(), true, self.visible.get())
            }
            _ => GeometrySnapshot::NONE,
        }
    }

    fn abandon_open(&self, generation: u64) {
        let Ok(mut machine) = self.machine.try_borrow_mut() else {
            tracing::warn!(generation, "could not roll back abandoned panel open");
            return;
        };
        if machine.phase() != LifecyclePhase::Opening {
            return;
        }
        match machine.abort_open() {
            Ok(close_queued) => {
                tracing::debug!(generation, close_queued, "panel open abandoned before acquisition finished");
            }
            Err(err) => tracing::warn!(?err, "failed to roll back abandoned panel open"),
        }
        self.visible.set(false);
    }

    fn handle_visibility(&self, generation: u64, visible: bool) {
        let current = self
            .machine
            .borrow()
            .open_parts()
            .map(|(surface, _)| surface.generation());
        if current != Some(generation) {
            tracing::debug!(generation, "ignoring visibility change from stale panel");
            return;
        }
        tracing::debug!(generation, visible, "panel visibility changed");
        self.visible.set(visible);
    }

    fn close_with(
        &self,
        event: LifecycleEvent,
        reason: CloseReason,
        generation: Option<u64>,
    ) -> bool {
        let (surface, mount) = {
            let mut machine = self.machine.borrow_mut();
            match machine.phase() {
                LifecyclePhase::Open => {}
                LifecyclePhase::Opening => {
                    if !machine.close_queued() {
                        if let Err(err) = machine.queue_close() {
                            tracing::warn!(?err, "failed to queue panel close");
                        }
                    }
                    return false;
                }
                phase => {
                    tracing::debug!(phase = ?phase, reason = ?reason, "close ignored; no open panel");
                    return false;
                }
            }
            if let Some(generation) = generation {
                let current = machine.open_parts().map(|(surface, _)| surface.generation());
                if current != Some(generation) {
                    tracing::debug!(generation, "ignoring close from stale panel");
                    return false;
                }
            }
            match machine.begin_close(event) {
                Ok(parts) => parts,
                Err(err) => {
                    tracing::warn!(?err, "failed to begin panel close");
                    return false;
                }
            }
        };

        mount.mark_closing();
        mount.unmount();
        if !surface.host().is_closed() {
            surface.host().close();
        }
        self.visible.set(false);
        if let Some(link) = self.capture.borrow().clone() {
            link.unsubscribe_geometry();
        }
        if let Err(err) = self.machine.borrow_mut().finish_close() {
            tracing::warn!(?err, "failed to finish panel close");
        }
        tracing::info!(
            generation = surface.generation(),
            mode = ?surface.mode(),
            reason = ?reason,
            "guide panel closed"
        );
        drop(surface);
        self.listeners.notify(reason);
        true
    }

    fn detach_capture(&self) {
        let link = self.capture.borrow_mut().take();
        if let Some(link) = link {
            link.unsubscribe_geometry();
            link.unsubscribe_close();
            tracing::debug!("detached capture session from panel manager");
        }
    }
}

impl<H: SurfaceHost, R: ContentRenderer> Drop for Inner<H, R> {
    fn drop(&mut self) {
        self.detach_capture();
        self.close_with(LifecycleEvent::CloseRequested, CloseReason::Shutdown, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::recording::RecordingTracker;
    use crate::capture::ScreenShare;
    use crate::geometry::{PanelMargins, PanelSize, ScreenArea, SurfaceGeometry};
    use crate::notification::recording::RecordingNotifier;
    use crate::surface::fake::{DockedBehavior, FakeHost};
    use crate::view::{TaskScreen, ViewNode};
    use futures::executor::{block_on, LocalPool};
    use futures::task::LocalSpawnExt;

    struct Harness {
        host: FakeHost,
        manager: SurfaceManager<FakeHost, TaskScreen>,
        notifier: RecordingNotifier,
        tracker: RecordingTracker,
        closes: Rc<RefCell<Vec<CloseReason>>>,
    }

    fn harness(host: FakeHost) -> Harness {
        let manager = SurfaceManager::new(
            host.clone(),
            TaskScreen,
            AcquirePolicy {
                unsupported_families: vec!["gnome".to_string()],
                ..AcquirePolicy::new(PanelSize::new(400, 500), PanelMargins::new(20, 100))
            },
        );
        let notifier = RecordingNotifier::default();
        let tracker = RecordingTracker::default();
        manager.set_notifier(Rc::new(notifier.clone()));
        manager.set_tracker(Rc::new(tracker.clone()));
        let closes = Rc::new(RefCell::new(Vec::new()));
        {
            let closes = closes.clone();
            manager.on_teardown(move |reason| closes.borrow_mut().push(reason));
        }
        Harness {
            host,
            manager,
            notifier,
            tracker,
            closes,
        }
    }

    fn open_docked() -> Harness {
        let harness = harness(FakeHost::new());
        assert_eq!(
            block_on(harness.manager.open()),
            OpenOutcome::Opened(SurfaceMode::Docked)
        );
        harness
    }

    #[test]
    fn overlapping_opens_create_a_single_surface() {
        let harness = harness(FakeHost::new());
        harness.host.set_docked_behavior(DockedBehavior::Gate);
        let mut pool = LocalPool::new();
        let outcomes = Rc::new(RefCell::new(Vec::new()));
        for _ in 0..3 {
            let manager = harness.manager.clone();
            let outcomes = outcomes.clone();
            pool.spawner()
                .spawn_local(async move {
                    let outcome = manager.open().await;
                    outcomes.borrow_mut().push(outcome);
                })
                .expect("spawn open");
        }

        pool.run_until_stalled();
        assert_eq!(harness.manager.phase(), LifecyclePhase::Opening);
        assert_eq!(
            *outcomes.borrow(),
            vec![OpenOutcome::AlreadyActive, OpenOutcome::AlreadyActive]
        );

        harness.host.release_docked();
        pool.run_until_stalled();

        assert_eq!(
            outcomes.borrow().last(),
            Some(&OpenOutcome::Opened(SurfaceMode::Docked))
        );
        assert_eq!(harness.host.surfaces().len(), 1);
        assert_eq!(
            block_on(harness.manager.open()),
            OpenOutcome::AlreadyActive
        );
        assert_eq!(harness.host.surfaces().len(), 1);
    }

    #[test]
    fn dropping_a_pending_open_rolls_back_to_closed() {
        let harness = harness(FakeHost::new());
        harness.host.set_docked_behavior(DockedBehavior::Gate);

        assert!(harness.manager.open().now_or_never().is_none());
        assert_eq!(harness.manager.phase(), LifecyclePhase::Closed);
        assert!(!harness.manager.close());
        assert!(harness.manager.query_geometry().is_none());

        harness.host.release_docked();
        harness.host.set_docked_behavior(DockedBehavior::Grant);
        assert_eq!(
            block_on(harness.manager.open()),
            OpenOutcome::Opened(SurfaceMode::Docked)
        );
        assert_eq!(harness.host.surfaces().len(), 1);
    }

    #[test]
    fn styles_are_mirrored_before_first_render_and_unmount_precedes_close() {
        let harness = open_docked();
        assert_eq!(
            harness.host.log(),
            vec!["acquire:docked", "style", "style", "render"]
        );

        assert!(harness.manager.close());

        assert_eq!(
            harness.host.log(),
            vec!["acquire:docked", "style", "style", "render", "clear", "close"]
        );
    }

    #[test]
    fn geometry_is_sentinel_exactly_when_no_panel_is_open() {
        let harness = harness(FakeHost::new());
        assert!(harness.manager.query_geometry().is_none());

        harness.host.set_docked_behavior(DockedBehavior::Gate);
        let mut pool = LocalPool::new();
        let manager = harness.manager.clone();
        pool.spawner()
            .spawn_local(async move {
                manager.open().await;
            })
            .expect("spawn open");
        pool.run_until_stalled();
        assert!(harness.manager.query_geometry().is_none());

        harness.host.release_docked();
        pool.run_until_stalled();
        assert_eq!(
            harness.manager.query_geometry(),
            GeometrySnapshot::from_surface(SurfaceGeometry::new(100, 100, 400, 500), true, true)
        );

        harness.manager.close();
        assert!(harness.manager.query_geometry().is_none());
    }

    #[test]
    fn geometry_reads_live_position_and_visibility() {
        let harness = open_docked();
        let surface = harness.host.last_surface().expect("surface");

        surface.move_to(SurfaceGeometry::new(10, 20, 400, 500));
        surface.set_visible(false);

        let snapshot = harness.manager.query_geometry();
        assert_eq!((snapshot.x, snapshot.y), (10, 20));
        assert!(snapshot.is_active);
        assert!(!snapshot.is_visible);

        surface.set_visible(true);
        assert!(harness.manager.query_geometry().is_visible);
    }

    #[test]
    fn repeated_close_notifies_listeners_once() {
        let harness = open_docked();

        assert!(harness.manager.close());
        assert!(!harness.manager.close());

        assert_eq!(*harness.closes.borrow(), vec![CloseReason::Requested]);
        assert_eq!(harness.manager.phase(), LifecyclePhase::Closed);
    }

    #[test]
    fn user_closing_the_window_tears_down_once() {
        let harness = open_docked();
        let surface = harness.host.last_surface().expect("surface");

        surface.user_close();
        assert!(!harness.manager.close());
        assert!(!harness.manager.handle_host_close());

        assert_eq!(*harness.closes.borrow(), vec![CloseReason::HostClosed]);
        assert!(harness.manager.query_geometry().is_none());
        assert_eq!(
            harness.host.log(),
            vec!["acquire:docked", "style", "style", "render", "user-close", "clear"]
        );
    }

    #[test]
    fn floating_fallback_uses_configured_size_and_margins() {
        let harness = harness(FakeHost::new().without_docked());
        harness.host.set_screen_area(ScreenArea::new(0, 0, 1920, 1080));

        let outcome = block_on(harness.manager.open());

        assert_eq!(outcome, OpenOutcome::Opened(SurfaceMode::Floating));
        assert_eq!(harness.manager.mode(), Some(SurfaceMode::Floating));
        assert_eq!(
            harness.manager.query_geometry().bounds(),
            SurfaceGeometry::new(1500, 480, 400, 500)
        );
        assert_eq!(
            harness.tracker.events(),
            vec![AnalyticsEvent::SurfaceOpened {
                mode: SurfaceMode::Floating
            }]
        );
    }

    #[test]
    fn unsupported_family_falls_back_to_floating() {
        let harness = harness(FakeHost::new().with_family("ubuntu:GNOME"));

        assert_eq!(
            block_on(harness.manager.open()),
            OpenOutcome::Opened(SurfaceMode::Floating)
        );
        assert_eq!(harness.host.log()[0], "acquire:floating");
    }

    #[test]
    fn denied_docked_request_stays_closed_silently() {
        let harness = harness(FakeHost::new());
        harness.host.set_docked_behavior(DockedBehavior::Deny);

        let outcome = block_on(harness.manager.open());

        assert_eq!(outcome, OpenOutcome::Denied);
        assert_eq!(harness.manager.phase(), LifecyclePhase::Closed);
        assert!(harness.host.surfaces().is_empty());
        assert!(harness.notifier.messages().is_empty());
        assert!(harness.closes.borrow().is_empty());
        assert!(harness.manager.query_geometry().is_none());
    }

    #[test]
    fn blocked_floating_window_notifies_user() {
        let harness = harness(FakeHost::new().without_docked());
        harness.host.block_floating();

        let outcome = block_on(harness.manager.open());

        assert_eq!(outcome, OpenOutcome::PopupBlocked);
        assert_eq!(harness.manager.phase(), LifecyclePhase::Closed);
        assert_eq!(
            harness.notifier.messages(),
            vec![POPUP_BLOCKED_MESSAGE.to_string()]
        );
        assert_eq!(harness.tracker.events(), vec![AnalyticsEvent::PopupBlocked]);
    }

    #[test]
    fn host_failure_is_reported_and_open_can_be_retried() {
        let harness = harness(FakeHost::new());
        harness.host.set_docked_behavior(DockedBehavior::Fail);

        let outcome = block_on(harness.manager.open());
        assert!(matches!(outcome, OpenOutcome::Failed(SurfaceError::Host { .. })));
        assert_eq!(harness.manager.phase(), LifecyclePhase::Closed);
        assert!(harness.notifier.messages().is_empty());

        harness.host.set_docked_behavior(DockedBehavior::Grant);
        assert_eq!(
            block_on(harness.manager.open()),
            OpenOutcome::Opened(SurfaceMode::Docked)
        );
    }

    #[test]
    fn rejected_initial_render_closes_the_acquired_surface() {
        let harness = harness(FakeHost::new());
        harness.host.reject_renders();

        let outcome = block_on(harness.manager.open());

        assert!(matches!(
            outcome,
            OpenOutcome::Failed(SurfaceError::Host {
                stage: "mounting content",
                ..
            })
        ));
        assert_eq!(harness.manager.phase(), LifecyclePhase::Closed);
        assert!(harness.host.last_surface().expect("surface").is_closed());
        assert!(harness.closes.borrow().is_empty());
    }

    #[test]
    fn close_while_opening_runs_after_mount() {
        let harness = harness(FakeHost::new());
        harness.host.set_docked_behavior(DockedBehavior::Gate);
        let mut pool = LocalPool::new();
        let outcome = Rc::new(RefCell::new(None));
        {
            let manager = harness.manager.clone();
            let outcome = outcome.clone();
            pool.spawner()
                .spawn_local(async move {
                    *outcome.borrow_mut() = Some(manager.open().await);
                })
                .expect("spawn open");
        }
        pool.run_until_stalled();

        assert!(!harness.manager.close());
        assert!(!harness.manager.close());
        harness.host.release_docked();
        pool.run_until_stalled();

        assert_eq!(*outcome.borrow(), Some(OpenOutcome::ClosedWhileOpening));
        assert_eq!(harness.manager.phase(), LifecyclePhase::Closed);
        assert!(harness.host.last_surface().expect("surface").is_closed());
        assert_eq!(*harness.closes.borrow(), vec![CloseReason::Requested]);
    }

    #[test]
    fn refresh_renders_only_while_open() {
        let harness = harness(FakeHost::new());
        let mut inputs = RenderInputs {
            goal: Some("Pair a headset".to_string()),
            ..RenderInputs::default()
        };

        assert_eq!(
            harness.manager.refresh_content(inputs.clone()),
            RefreshOutcome::Skipped(SkipReason::NotOpen)
        );

        block_on(harness.manager.open());
        let surface = harness.host.last_surface().expect("surface");
        let goal_text = |view: &ViewNode| {
            view.find(&|node| matches!(node, ViewNode::Text { text, .. } if text == "Pair a headset"))
                .is_some()
        };
        assert!(goal_text(&surface.rendered()[0]));

        inputs.is_loading = true;
        assert_eq!(
            harness.manager.refresh_content(inputs),
            RefreshOutcome::Rendered
        );
        assert_eq!(surface.rendered().len(), 2);

        harness.manager.close();
        assert_eq!(
            harness.manager.refresh_content(RenderInputs::default()),
            RefreshOutcome::Skipped(SkipReason::NotOpen)
        );
        assert_eq!(surface.rendered().len(), 2);
    }

    #[test]
    fn reopening_acquires_a_fresh_surface_and_ignores_the_old_one() {
        let harness = open_docked();
        let first = harness.host.last_surface().expect("first surface");
        harness.manager.close();

        block_on(harness.manager.open());
        let second = harness.host.last_surface().expect("second surface");
        assert_eq!(harness.host.surfaces().len(), 2);

        first.set_visible(false);
        first.user_close();
        assert!(harness.manager.query_geometry().is_visible);
        assert_eq!(harness.manager.phase(), LifecyclePhase::Open);
        assert!(!second.is_closed());
    }

    #[test]
    fn capture_session_sees_live_geometry_and_can_close_the_panel() {
        let harness = harness(FakeHost::new());
        let share = Rc::new(ScreenShare::new());
        harness.manager.attach_capture(share.clone());
        share.start();
        assert!(share.panel_snapshot().is_none());
        assert!(share.should_pause());

        block_on(harness.manager.open());
        assert_eq!(
            share.panel_snapshot(),
            harness.manager.query_geometry()
        );
        assert!(!share.should_pause());

        harness.host.last_surface().expect("surface").set_visible(false);
        assert!(share.should_pause());

        share.stop();
        assert_eq!(harness.manager.phase(), LifecyclePhase::Closed);
        assert!(share.panel_snapshot().is_none());
        assert_eq!(*harness.closes.borrow(), vec![CloseReason::Requested]);
    }

    #[test]
    fn dropping_the_manager_restores_capture_defaults() {
        let harness = open_docked();
        let share = Rc::new(ScreenShare::new());
        harness.manager.attach_capture(share.clone());
        share.start();
        assert!(!share.panel_snapshot().is_none());
        let surface = harness.host.last_surface().expect("surface");

        let Harness { manager, .. } = harness;
        drop(manager);

        assert!(share.panel_snapshot().is_none());
        assert!(surface.is_closed());
        share.stop();
        assert!(!share.is_sharing());
    }

    #[test]
    fn shutdown_closes_with_shutdown_reason_and_detaches() {
        let harness = open_docked();
        let share = Rc::new(ScreenShare::new());
        harness.manager.attach_capture(share.clone());

        harness.manager.shutdown();

        assert_eq!(*harness.closes.borrow(), vec![CloseReason::Shutdown]);
        share.start();
        share.stop();
        assert_eq!(harness.closes.borrow().len(), 1);
    }
}
