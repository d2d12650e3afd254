use std::path::Path;

use futures::future::LocalBoxFuture;
use thiserror::Error;

use crate::geometry::{PanelSize, ScreenArea, SurfaceGeometry};
use crate::view::ViewNode;

mod acquire;
mod mount;
mod style;

#[cfg(test)]
pub(crate) mod fake;

pub use acquire::{acquire_with, AcquirePolicy};
pub use mount::{MountHandle, RefreshOutcome, SkipReason};
pub use style::{mirror_styles, MirrorReport, Stylesheet, StylesheetSource, PANEL_RESET_CSS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceMode {
    Docked,
    Floating,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostCapabilities {
    pub docked_supported: bool,
    pub family: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostFailure {
    #[error("request denied by host")]
    Denied,
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    #[error("docked panel request was denied")]
    UserDenied,
    #[error("floating panel window could not be created")]
    PopupBlocked,
    #[error("host error while {stage}: {message}")]
    Host {
        stage: &'static str,
        message: String,
    },
}

impl SurfaceError {
    pub(crate) fn host(stage: &'static str, failure: HostFailure) -> Self {
        SurfaceError::Host {
            stage,
            message: failure.to_string(),
        }
    }
}

pub type SurfaceResult<T> = std::result::Result<T, SurfaceError>;

pub type VisibilityCallback = Box<dyn Fn(bool)>;
pub type HostCloseCallback = Box<dyn Fn()>;

pub trait MountTarget {
    fn render(&self, view: &ViewNode) -> Result<(), HostFailure>;
    fn clear(&self);
}

pub trait HostSurface {
    type Root: MountTarget;

    fn geometry(&self) -> SurfaceGeometry;
    fn is_visible(&self) -> bool;
    fn is_closed(&self) -> bool;
    fn insert_style(&self, css: &str) -> Result<(), HostFailure>;
    fn link_stylesheet(&self, path: &Path) -> Result<(), HostFailure>;
    fn mount_root(&self) -> Result<Self::Root, HostFailure>;
    fn on_visibility_change(&self, callback: VisibilityCallback);
    /// Fired whenever the surface goes away, including after [`HostSurface::close`].
    fn on_close(&self, callback: HostCloseCallback);
    fn close(&self);
}

pub trait SurfaceHost {
    type Surface: HostSurface + 'static;

    fn capabilities(&self) -> HostCapabilities;
    fn screen_area(&self) -> ScreenArea;
    fn request_docked(
        &self,
        size: PanelSize,
    ) -> LocalBoxFuture<'static, Result<Self::Surface, HostFailure>>;
    /// `Ok(None)` means the host refused to create a top-level window.
    fn open_floating(
        &self,
        geometry: SurfaceGeometry,
    ) -> Result<Option<Self::Surface>, HostFailure>;
    fn stylesheets(&self) -> Vec<Stylesheet>;
    fn focus_main_window(&self);
}

pub struct Surface<S> {
    mode: SurfaceMode,
    generation: u64,
    host: S,
}

impl<S> Surface<S> {
    pub fn new(mode: SurfaceMode, generation: u64, host: S) -> Self {
        Self {
            mode,
            generation,
            host,
        }
    }

    pub fn mode(&self) -> SurfaceMode {
        self.mode
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn host(&self) -> &S {
        &self.host
    }
}
