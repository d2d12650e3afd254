use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};
use gtk4::prelude::*;
use gtk4::gdk::ToplevelState;
use gtk4::{Application, ApplicationWindow, Box as GtkBox, CssProvider, Orientation, ScrolledWindow};

use super::hypr::{self, PinOutcome};
use super::layout::screen_area_near;
use super::view::{build_widget, ActionSink};
use super::worker::{spawn_worker_action, worker_future};
use super::MAIN_WINDOW_TITLE;
use crate::geometry::{PanelSize, ScreenArea, SurfaceGeometry};
use crate::surface::{
    HostCapabilities, HostCloseCallback, HostFailure, HostSurface, MountTarget, Stylesheet,
    SurfaceHost, VisibilityCallback,
};
use crate::ui::StyleTokens;
use crate::view::ViewNode;

const PANEL_TITLE_PREFIX: &str = "taskdock guide";

fn toplevel_hidden(state: ToplevelState) -> bool {
    state.intersects(ToplevelState::SUSPENDED | ToplevelState::MINIMIZED)
}

fn pin_failure(outcome: PinOutcome) -> Option<HostFailure> {
    match outcome {
        PinOutcome::Pinned => None,
        PinOutcome::Refused => Some(HostFailure::Denied),
        PinOutcome::WindowNotFound => Some(HostFailure::Other(
            "docked window never appeared in the compositor".to_string(),
        )),
    }
}

fn desktop_family() -> Option<String> {
    std::env::var("XDG_CURRENT_DESKTOP")
        .ok()
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| !value.is_empty())
}

pub(super) struct GtkSurfaceHost {
    app: Application,
    main_window: ApplicationWindow,
    tokens: StyleTokens,
    runtime_css: String,
    user_stylesheet: Option<PathBuf>,
    actions: ActionSink,
    serial: Cell<u64>,
}

impl GtkSurfaceHost {
    pub(super) fn new(
        app: Application,
        main_window: ApplicationWindow,
        tokens: StyleTokens,
        runtime_css: String,
        user_stylesheet: Option<PathBuf>,
        actions: ActionSink,
    ) -> Self {
        Self {
            app,
            main_window,
            tokens,
            runtime_css,
            user_stylesheet,
            actions,
            serial: Cell::new(0),
        }
    }

    fn new_surface(&self, requested: SurfaceGeometry) -> Option<GtkSurface> {
        if gtk4::gdk::Display::default().is_none() {
            tracing::warn!("no display available for a panel window");
            return None;
        }
        let serial = self.serial.get().wrapping_add(1);
        self.serial.set(serial);
        let title = format!("{PANEL_TITLE_PREFIX} {serial}");

        let window = ApplicationWindow::new(&self.app);
        window.set_title(Some(&title));
        window.set_decorated(false);
        window.set_resizable(false);
        window.set_default_size(requested.width, requested.height);
        window.add_css_class("taskdock-root");
        window.add_css_class("taskdock-panel");

        let root = GtkBox::new(Orientation::Vertical, 0);
        root.add_css_class("taskdock-panel-root");
        let scroller = ScrolledWindow::new();
        scroller.set_hscrollbar_policy(gtk4::PolicyType::Never);
        scroller.set_child(Some(&root));
        window.set_child(Some(&scroller));

        Some(GtkSurface::new(
            window,
            title,
            root,
            requested,
            self.tokens,
            self.actions.clone(),
        ))
    }
}

impl SurfaceHost for GtkSurfaceHost {
    type Surface = GtkSurface;

    fn capabilities(&self) -> HostCapabilities {
        HostCapabilities {
            docked_supported: hypr::docked_supported(),
            family: desktop_family(),
        }
    }

    fn screen_area(&self) -> ScreenArea {
        screen_area_near(hypr::window_geometry(MAIN_WINDOW_TITLE))
    }

    fn request_docked(
        &self,
        size: PanelSize,
    ) -> LocalBoxFuture<'static, Result<Self::Surface, HostFailure>> {
        let Some(surface) = self.new_surface(SurfaceGeometry::new(0, 0, size.width, size.height))
        else {
            return async { Err(HostFailure::Other("no display available".to_string())) }
                .boxed_local();
        };
        surface.state.window.present();
        let title = surface.state.title.clone();
        let docked = worker_future(move || hypr::dock_window(&title, size));
        let candidate = DockingCandidate(Some(surface));

        async move {
            let outcome = docked
                .await
                .map_err(|_| HostFailure::Other("docking worker stopped".to_string()))?;
            if let Some(failure) = pin_failure(outcome) {
                tracing::debug!(?outcome, "panel was not docked");
                return Err(failure);
            }
            let surface = candidate.hand_over().ok_or_else(|| {
                HostFailure::Other("docked window already released".to_string())
            })?;
            surface.state.refresh_geometry();
            Ok(surface)
        }
        .boxed_local()
    }

    fn open_floating(
        &self,
        geometry: SurfaceGeometry,
    ) -> Result<Option<Self::Surface>, HostFailure> {
        let Some(surface) = self.new_surface(geometry) else {
            return Ok(None);
        };
        surface.state.window.present();
        hypr::place_window(&surface.state.title, geometry);
        surface.state.refresh_geometry();
        Ok(Some(surface))
    }

    fn stylesheets(&self) -> Vec<Stylesheet> {
        let mut sheets = vec![Stylesheet::inline("runtime", self.runtime_css.clone())];
        if let Some(path) = self.user_stylesheet.as_ref().filter(|path| path.exists()) {
            sheets.push(Stylesheet::file("user", path.clone()));
        }
        sheets
    }

    fn focus_main_window(&self) {
        self.main_window.present();
    }
}

/// Closes a docked candidate window unless the request hands it over.
struct DockingCandidate(Option<GtkSurface>);

impl DockingCandidate {
    fn hand_over(mut self) -> Option<GtkSurface> {
        self.0.take()
    }
}

impl Drop for DockingCandidate {
    fn drop(&mut self) {
        if let Some(surface) = self.0.take() {
            surface.close();
        }
    }
}

struct GtkSurfaceState {
    window: ApplicationWindow,
    title: String,
    root: GtkBox,
    tokens: StyleTokens,
    actions: ActionSink,
    providers: RefCell<Vec<CssProvider>>,
    closed: Cell<bool>,
    backgrounded: Cell<bool>,
    reported_visible: Cell<bool>,
    geometry: Cell<SurfaceGeometry>,
    geometry_pending: Cell<bool>,
    visibility_callbacks: RefCell<Vec<VisibilityCallback>>,
    close_callbacks: RefCell<Vec<HostCloseCallback>>,
}

impl GtkSurfaceState {
    fn visible(&self) -> bool {
        !self.closed.get() && self.window.is_mapped() && !self.backgrounded.get()
    }

    fn sync_visibility(&self) {
        let visible = self.visible();
        if self.reported_visible.replace(visible) == visible {
            return;
        }
        for callback in self.visibility_callbacks.borrow().iter() {
            callback(visible);
        }
    }

    fn watch_toplevel_state(self: &Rc<Self>) {
        let Some(toplevel) = self
            .window
            .surface()
            .and_then(|surface| surface.downcast::<gtk4::gdk::Toplevel>().ok())
        else {
            return;
        };
        self.backgrounded.set(toplevel_hidden(toplevel.state()));
        let weak = Rc::downgrade(self);
        toplevel.connect_state_notify(move |toplevel| {
            if let Some(state) = weak.upgrade() {
                state.backgrounded.set(toplevel_hidden(toplevel.state()));
                state.sync_visibility();
            }
        });
    }

    fn window_sized_geometry(&self) -> SurfaceGeometry {
        let cached = self.geometry.get();
        let width = self.window.width();
        let height = self.window.height();
        SurfaceGeometry::new(
            cached.x,
            cached.y,
            if width > 0 { width } else { cached.width },
            if height > 0 { height } else { cached.height },
        )
    }

    /// Updates the cached geometry; compositor lookups run on a worker thread.
    fn refresh_geometry(self: &Rc<Self>) {
        if self.closed.get() {
            return;
        }
        if !hypr::docked_supported() {
            self.geometry.set(self.window_sized_geometry());
            return;
        }
        if self.geometry_pending.replace(true) {
            return;
        }
        let weak = Rc::downgrade(self);
        let title = self.title.clone();
        spawn_worker_action(
            move || hypr::window_geometry(&title),
            move |geometry| {
                let Some(state) = weak.upgrade() else {
                    return;
                };
                state.geometry_pending.set(false);
                if let Some(geometry) = geometry {
                    state.geometry.set(geometry);
                }
            },
        );
    }

    /// Drops the panel's style providers and reports the closure once.
    fn release(&self) {
        if self.closed.replace(true) {
            return;
        }
        let display = WidgetExt::display(&self.window);
        for provider in self.providers.borrow_mut().drain(..) {
            gtk4::style_context_remove_provider_for_display(&display, &provider);
        }
        self.visibility_callbacks.borrow_mut().clear();
        let callbacks = std::mem::take(&mut *self.close_callbacks.borrow_mut());
        for callback in &callbacks {
            callback();
        }
    }

    fn add_provider(&self, provider: CssProvider) {
        gtk4::style_context_add_provider_for_display(
            &WidgetExt::display(&self.window),
            &provider,
            gtk4::STYLE_PROVIDER_PRIORITY_APPLICATION,
        );
        self.providers.borrow_mut().push(provider);
    }
}

#[derive(Clone)]
pub(super) struct GtkSurface {
    state: Rc<GtkSurfaceState>,
}

impl GtkSurface {
    fn new(
        window: ApplicationWindow,
        title: String,
        root: GtkBox,
        requested: SurfaceGeometry,
        tokens: StyleTokens,
        actions: ActionSink,
    ) -> Self {
        let state = Rc::new(GtkSurfaceState {
            window,
            title,
            root,
            tokens,
            actions,
            providers: RefCell::new(Vec::new()),
            closed: Cell::new(false),
            backgrounded: Cell::new(false),
            reported_visible: Cell::new(false),
            geometry: Cell::new(requested),
            geometry_pending: Cell::new(false),
            visibility_callbacks: RefCell::new(Vec::new()),
            close_callbacks: RefCell::new(Vec::new()),
        });

        {
            let weak = Rc::downgrade(&state);
            state.window.connect_realize(move |_| {
                if let Some(state) = weak.upgrade() {
                    state.watch_toplevel_state();
                }
            });
        }
        {
            let weak = Rc::downgrade(&state);
            state.window.connect_map(move |_| {
                if let Some(state) = weak.upgrade() {
                    state.sync_visibility();
                }
            });
        }
        {
            let weak = Rc::downgrade(&state);
            state.window.connect_unmap(move |_| {
                if let Some(state) = weak.upgrade() {
                    state.sync_visibility();
                }
            });
        }
        {
            let weak = Rc::downgrade(&state);
            state.window.connect_close_request(move |_| {
                if let Some(state) = weak.upgrade() {
                    state.release();
                }
                gtk4::glib::Propagation::Proceed
            });
        }

        Self { state }
    }
}

pub(super) struct GtkMountRoot {
    container: GtkBox,
    tokens: StyleTokens,
    actions: ActionSink,
}

impl MountTarget for GtkMountRoot {
    fn render(&self, view: &ViewNode) -> Result<(), HostFailure> {
        self.clear();
        self.container
            .append(&build_widget(view, self.tokens, &self.actions));
        Ok(())
    }

    fn clear(&self) {
        while let Some(child) = self.container.first_child() {
            self.container.remove(&child);
        }
    }
}

impl HostSurface for GtkSurface {
    type Root = GtkMountRoot;

    /// Last known position; a refresh is queued so the next read sees any move.
    fn geometry(&self) -> SurfaceGeometry {
        let geometry = self.state.geometry.get();
        self.state.refresh_geometry();
        geometry
    }

    fn is_visible(&self) -> bool {
        self.state.visible()
    }

    fn is_closed(&self) -> bool {
        self.state.closed.get()
    }

    fn insert_style(&self, css: &str) -> Result<(), HostFailure> {
        if self.is_closed() {
            return Err(HostFailure::Other("panel window already closed".to_string()));
        }
        let provider = CssProvider::new();
        provider.load_from_data(css);
        self.state.add_provider(provider);
        Ok(())
    }

    fn link_stylesheet(&self, path: &Path) -> Result<(), HostFailure> {
        if self.is_closed() {
            return Err(HostFailure::Other("panel window already closed".to_string()));
        }
        let provider = CssProvider::new();
        provider.load_from_path(path);
        self.state.add_provider(provider);
        Ok(())
    }

    fn mount_root(&self) -> Result<Self::Root, HostFailure> {
        Ok(GtkMountRoot {
            container: self.state.root.clone(),
            tokens: self.state.tokens,
            actions: self.state.actions.clone(),
        })
    }

    fn on_visibility_change(&self, callback: VisibilityCallback) {
        self.state.visibility_callbacks.borrow_mut().push(callback);
    }

    fn on_close(&self, callback: HostCloseCallback) {
        self.state.close_callbacks.borrow_mut().push(callback);
    }

    fn close(&self) {
        if self.state.closed.get() {
            return;
        }
        self.state.window.close();
        if !self.state.closed.get() {
            self.state.release();
            self.state.window.destroy();
        }
    }
}
