use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use futures::channel::oneshot;
use futures::future::{FutureExt, LocalBoxFuture};

use super::{
    HostCapabilities, HostCloseCallback, HostFailure, HostSurface, MountTarget, Stylesheet,
    SurfaceHost, VisibilityCallback,
};
use crate::geometry::{PanelSize, ScreenArea, SurfaceGeometry};
use crate::view::ViewNode;

type EventLog = Rc<RefCell<Vec<String>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DockedBehavior {
    Grant,
    Deny,
    Fail,
    /// Resolves only when [`FakeHost::release_docked`] is called.
    Gate,
}

struct FakeSurfaceState {
    log: EventLog,
    geometry: Cell<SurfaceGeometry>,
    visible: Cell<bool>,
    closed: Cell<bool>,
    styles: RefCell<Vec<String>>,
    links: RefCell<Vec<PathBuf>>,
    rendered: RefCell<Vec<ViewNode>>,
    visibility_callbacks: RefCell<Vec<VisibilityCallback>>,
    close_callbacks: RefCell<Vec<HostCloseCallback>>,
    fail_render: Cell<bool>,
}

#[derive(Clone)]
pub(crate) struct FakeSurface {
    state: Rc<FakeSurfaceState>,
}

impl FakeSurface {
    fn with_log(log: EventLog, geometry: SurfaceGeometry) -> Self {
        Self {
            state: Rc::new(FakeSurfaceState {
                log,
                geometry: Cell::new(geometry),
                visible: Cell::new(true),
                closed: Cell::new(false),
                styles: RefCell::new(Vec::new()),
                links: RefCell::new(Vec::new()),
                rendered: RefCell::new(Vec::new()),
                visibility_callbacks: RefCell::new(Vec::new()),
                close_callbacks: RefCell::new(Vec::new()),
                fail_render: Cell::new(false),
            }),
        }
    }

    pub(crate) fn detached() -> Self {
        Self::with_log(
            Rc::new(RefCell::new(Vec::new())),
            SurfaceGeometry::new(0, 0, 400, 500),
        )
    }

    fn record(&self, event: impl Into<String>) {
        self.state.log.borrow_mut().push(event.into());
    }

    pub(crate) fn log(&self) -> Vec<String> {
        self.state.log.borrow().clone()
    }

    pub(crate) fn geometry_value(&self) -> SurfaceGeometry {
        self.state.geometry.get()
    }

    pub(crate) fn move_to(&self, geometry: SurfaceGeometry) {
        self.state.geometry.set(geometry);
    }

    pub(crate) fn inserted_styles(&self) -> Vec<String> {
        self.state.styles.borrow().clone()
    }

    pub(crate) fn linked_stylesheets(&self) -> Vec<PathBuf> {
        self.state.links.borrow().clone()
    }

    pub(crate) fn rendered(&self) -> Vec<ViewNode> {
        self.state.rendered.borrow().clone()
    }

    pub(crate) fn fail_next_renders(&self) {
        self.state.fail_render.set(true);
    }

    pub(crate) fn set_visible(&self, visible: bool) {
        self.state.visible.set(visible);
        let callbacks = std::mem::take(&mut *self.state.visibility_callbacks.borrow_mut());
        for callback in &callbacks {
            callback(visible);
        }
        let mut stored = self.state.visibility_callbacks.borrow_mut();
        let added = std::mem::replace(&mut *stored, callbacks);
        stored.extend(added);
    }

    pub(crate) fn user_close(&self) {
        self.state.closed.set(true);
        self.record("user-close");
        self.fire_close_callbacks();
    }

    fn fire_close_callbacks(&self) {
        let callbacks = std::mem::take(&mut *self.state.close_callbacks.borrow_mut());
        for callback in &callbacks {
            callback();
        }
    }
}

pub(crate) struct FakeRoot {
    surface: FakeSurface,
}

impl MountTarget for FakeRoot {
    fn render(&self, view: &ViewNode) -> Result<(), HostFailure> {
        if self.surface.state.fail_render.get() {
            return Err(HostFailure::Other("render rejected".to_string()));
        }
        self.surface.record("render");
        self.surface.state.rendered.borrow_mut().push(view.clone());
        Ok(())
    }

    fn clear(&self) {
        self.surface.record("clear");
    }
}

impl HostSurface for FakeSurface {
    type Root = FakeRoot;

    fn geometry(&self) -> SurfaceGeometry {
        self.state.geometry.get()
    }

    fn is_visible(&self) -> bool {
        self.state.visible.get()
    }

    fn is_closed(&self) -> bool {
        self.state.closed.get()
    }

    fn insert_style(&self, css: &str) -> Result<(), HostFailure> {
        self.record("style");
        self.state.styles.borrow_mut().push(css.to_string());
        Ok(())
    }

    fn link_stylesheet(&self, path: &Path) -> Result<(), HostFailure> {
        self.record("link");
        self.state.links.borrow_mut().push(path.to_path_buf());
        Ok(())
    }

    fn mount_root(&self) -> Result<Self::Root, HostFailure> {
        Ok(FakeRoot {
            surface: self.clone(),
        })
    }

    fn on_visibility_change(&self, callback: VisibilityCallback) {
        self.state.visibility_callbacks.borrow_mut().push(callback);
    }

    fn on_close(&self, callback: HostCloseCallback) {
        self.state.close_callbacks.borrow_mut().push(callback);
    }

    fn close(&self) {
        if self.state.closed.replace(true) {
            return;
        }
        self.record("close");
        self.fire_close_callbacks();
    }
}

struct FakeHostState {
    log: EventLog,
    capabilities: RefCell<HostCapabilities>,
    screen_area: Cell<ScreenArea>,
    docked_behavior: Cell<DockedBehavior>,
    floating_blocked: Cell<bool>,
    reject_renders: Cell<bool>,
    gates: RefCell<Vec<oneshot::Sender<()>>>,
    surfaces: RefCell<Vec<FakeSurface>>,
    stylesheets: RefCell<Vec<Stylesheet>>,
    focus_calls: Cell<usize>,
}

#[derive(Clone)]
pub(crate) struct FakeHost {
    state: Rc<FakeHostState>,
}

impl FakeHost {
    pub(crate) fn new() -> Self {
        Self::with_log(Rc::new(RefCell::new(Vec::new())))
    }

    /// Shares `log` with the host so tests can interleave other recorded calls.
    pub(crate) fn with_log(log: EventLog) -> Self {
        Self {
            state: Rc::new(FakeHostState {
                log,
                capabilities: RefCell::new(HostCapabilities {
                    docked_supported: true,
                    family: None,
                }),
                screen_area: Cell::new(ScreenArea::new(0, 0, 1920, 1080)),
                docked_behavior: Cell::new(DockedBehavior::Grant),
                floating_blocked: Cell::new(false),
                reject_renders: Cell::new(false),
                gates: RefCell::new(Vec::new()),
                surfaces: RefCell::new(Vec::new()),
                stylesheets: RefCell::new(vec![Stylesheet::inline(
                    "runtime",
                    ".task-screen { padding: 8px; }",
                )]),
                focus_calls: Cell::new(0),
            }),
        }
    }

    pub(crate) fn without_docked(self) -> Self {
        self.state.capabilities.borrow_mut().docked_supported = false;
        self
    }

    pub(crate) fn with_family(self, family: &str) -> Self {
        self.state.capabilities.borrow_mut().family = Some(family.to_string());
        self
    }

    pub(crate) fn set_screen_area(&self, area: ScreenArea) {
        self.state.screen_area.set(area);
    }

    pub(crate) fn set_docked_behavior(&self, behavior: DockedBehavior) {
        self.state.docked_behavior.set(behavior);
    }

    pub(crate) fn block_floating(&self) {
        self.state.floating_blocked.set(true);
    }

    pub(crate) fn reject_renders(&self) {
        self.state.reject_renders.set(true);
    }

    pub(crate) fn release_docked(&self) {
        for gate in self.state.gates.borrow_mut().drain(..) {
            let _ = gate.send(());
        }
    }

    pub(crate) fn surfaces(&self) -> Vec<FakeSurface> {
        self.state.surfaces.borrow().clone()
    }

    pub(crate) fn last_surface(&self) -> Option<FakeSurface> {
        self.state.surfaces.borrow().last().cloned()
    }

    pub(crate) fn focus_calls(&self) -> usize {
        self.state.focus_calls.get()
    }

    pub(crate) fn log(&self) -> Vec<String> {
        self.state.log.borrow().clone()
    }

    fn record(&self, event: impl Into<String>) {
        self.state.log.borrow_mut().push(event.into());
    }

    fn new_surface(&self, geometry: SurfaceGeometry) -> FakeSurface {
        let surface = FakeSurface::with_log(self.state.log.clone(), geometry);
        if self.state.reject_renders.get() {
            surface.fail_next_renders();
        }
        self.state.surfaces.borrow_mut().push(surface.clone());
        surface
    }
}

impl SurfaceHost for FakeHost {
    type Surface = FakeSurface;

    fn capabilities(&self) -> HostCapabilities {
        self.state.capabilities.borrow().clone()
    }

    fn screen_area(&self) -> ScreenArea {
        self.state.screen_area.get()
    }

    fn request_docked(
        &self,
        size: PanelSize,
    ) -> LocalBoxFuture<'static, Result<Self::Surface, HostFailure>> {
        self.record("acquire:docked");
        let geometry = SurfaceGeometry::new(100, 100, size.width, size.height);
        match self.state.docked_behavior.get() {
            DockedBehavior::Grant => {
                let surface = self.new_surface(geometry);
                async move { Ok(surface) }.boxed_local()
            }
            DockedBehavior::Deny => async { Err(HostFailure::Denied) }.boxed_local(),
            DockedBehavior::Fail => {
                async { Err(HostFailure::Other("compositor unavailable".to_string())) }
                    .boxed_local()
            }
            DockedBehavior::Gate => {
                let (sender, receiver) = oneshot::channel();
                self.state.gates.borrow_mut().push(sender);
                let host = self.clone();
                async move {
                    receiver
                        .await
                        .map_err(|_| HostFailure::Other("gate dropped".to_string()))?;
                    Ok::<_, HostFailure>(host.new_surface(geometry))
                }
                .boxed_local()
            }
        }
    }

    fn open_floating(
        &self,
        geometry: SurfaceGeometry,
    ) -> Result<Option<Self::Surface>, HostFailure> {
        self.record("acquire:floating");
        if self.state.floating_blocked.get() {
            return Ok(None);
        }
        Ok(Some(self.new_surface(geometry)))
    }

    fn stylesheets(&self) -> Vec<Stylesheet> {
        self.state.stylesheets.borrow().clone()
    }

    fn focus_main_window(&self) {
        self.state.focus_calls.set(self.state.focus_calls.get() + 1);
        self.record("focus");
    }
}
