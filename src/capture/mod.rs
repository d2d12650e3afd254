use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::rc::Rc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use self::hyprland::parse_focused_monitor;
use crate::geometry::{GeometrySnapshot, SurfaceGeometry};
use crate::manager::CaptureControl;
use image::{GenericImageView, Rgba, RgbaImage};
use thiserror::Error;

mod hyprland;

const TEMP_CAPTURE_DIR: &str = "taskdock";
const TEMP_CAPTURE_PREFIX: &str = "frame_";
const PANEL_MASK: Rgba<u8> = Rgba([24, 24, 27, 255]);

pub type GeometryGetter = Rc<dyn Fn() -> GeometrySnapshot>;
pub type CloseCallback = Rc<dyn Fn()>;

pub trait CaptureLink {
    fn subscribe_geometry(&self, getter: GeometryGetter);
    fn unsubscribe_geometry(&self);
    fn subscribe_close(&self, callback: CloseCallback);
    fn unsubscribe_close(&self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureArtifact {
    pub frame_id: String,
    pub path: PathBuf,
    pub monitor: String,
    pub width: u32,
    pub height: u32,
    /// Monitor rectangle in global coordinates.
    pub screen: SurfaceGeometry,
    pub captured_at_ms: u64,
    /// Panel rectangle covering part of the frame, in global coordinates.
    pub excluded: Option<SurfaceGeometry>,
    pub preview: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("{command} failed: {message}")]
    CommandFailed { command: String, message: String },
    #[error("could not run {command}")]
    CommandIo {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("no focused monitor reported by the compositor")]
    NoFocusedMonitor,
    #[error("malformed monitor list: {message}")]
    InvalidMonitorMetadata { message: String },
    #[error("unusable frame: {message}")]
    InvalidCaptureArtifact { message: String },
    #[error("could not decode frame image: {message}")]
    ImageReadFailed { message: String },
    #[error("screen sharing is not active")]
    NotSharing,
}

pub trait CaptureBackend {
    fn monitors_json(&self) -> Result<String, CaptureError>;
    fn grab_output(&self, monitor: &str, output: &Path) -> Result<(), CaptureError>;
    fn frame_size(&self, frame: &Path) -> Result<(u32, u32), CaptureError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCaptureBackend;

impl CaptureBackend for SystemCaptureBackend {
    fn monitors_json(&self) -> Result<String, CaptureError> {
        tool_stdout("hyprctl", &["monitors", "-j"])
    }

    fn grab_output(&self, monitor: &str, output: &Path) -> Result<(), CaptureError> {
        let target = output.to_string_lossy();
        run_tool("grim", &["-o", monitor, &target]).map(|_| ())
    }

    fn frame_size(&self, frame: &Path) -> Result<(u32, u32), CaptureError> {
        image::open(frame)
            .map(|image| image.dimensions())
            .map_err(|err| CaptureError::ImageReadFailed {
                message: err.to_string(),
            })
    }
}

pub fn capture_focused_monitor(panel: GeometrySnapshot) -> Result<CaptureArtifact, CaptureError> {
    capture_focused_monitor_with(&SystemCaptureBackend, panel)
}

/// Captures the focused monitor, noting where the panel covers it.
pub fn capture_focused_monitor_with<B: CaptureBackend>(
    backend: &B,
    panel: GeometrySnapshot,
) -> Result<CaptureArtifact, CaptureError> {
    let monitor = parse_focused_monitor(&backend.monitors_json()?)?;
    let since_epoch = SystemTime::now().duration_since(UNIX_EPOCH).map_err(|err| {
        CaptureError::InvalidCaptureArtifact {
            message: format!("clock is before the unix epoch: {err}"),
        }
    })?;

    let frame_id = since_epoch.as_nanos().to_string();
    let path = frame_path(&frame_id);

    let size = backend
        .grab_output(&monitor.name, &path)
        .and_then(|()| backend.frame_size(&path));
    let (width, height) = match size {
        Ok(size) => size,
        Err(err) => {
            remove_frame_file(&path, "capture failed");
            return Err(err);
        }
    };

    let screen = SurfaceGeometry::new(
        monitor.x,
        monitor.y,
        to_extent(monitor.width.unwrap_or(width)),
        to_extent(monitor.height.unwrap_or(height)),
    );

    Ok(CaptureArtifact {
        frame_id,
        path,
        monitor: monitor.name,
        width,
        height,
        screen,
        captured_at_ms: u64::try_from(since_epoch.as_millis()).unwrap_or(u64::MAX),
        excluded: excluded_panel_region(panel, screen),
        preview: None,
    })
}

/// Writes a scaled-down copy of the frame with the panel region blanked out.
pub fn render_preview(artifact: &CaptureArtifact, max_width: u32) -> Result<PathBuf, CaptureError> {
    let mut frame = image::open(&artifact.path)
        .map_err(|err| CaptureError::ImageReadFailed {
            message: err.to_string(),
        })?
        .to_rgba8();
    if let Some(panel) = artifact.excluded {
        blank_region(&mut frame, artifact.screen, panel);
    }

    let width = frame.width().clamp(1, max_width.max(1));
    let height = scaled_height(frame.width(), frame.height(), width);
    let preview = image::imageops::thumbnail(&frame, width, height);
    let path = frame_path(&format!("{}_preview", artifact.frame_id));
    if let Err(err) = preview.save(&path) {
        remove_frame_file(&path, "preview write failed");
        return Err(CaptureError::InvalidCaptureArtifact {
            message: format!("could not write preview: {err}"),
        });
    }
    Ok(path)
}

fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    if width == 0 {
        return 1;
    }
    let scaled = u64::from(height) * u64::from(target_width) / u64::from(width);
    u32::try_from(scaled).unwrap_or(u32::MAX).max(1)
}

/// Fills the part of `frame` that `region` covers, mapping global coordinates through `screen`.
fn blank_region(frame: &mut RgbaImage, screen: SurfaceGeometry, region: SurfaceGeometry) {
    if screen.width <= 0 || screen.height <= 0 {
        return;
    }
    let scale_x = f64::from(frame.width()) / f64::from(screen.width);
    let scale_y = f64::from(frame.height()) / f64::from(screen.height);
    let to_pixels = |offset: i32, scale: f64, limit: u32| -> u32 {
        (f64::from(offset.max(0)) * scale).round().min(f64::from(limit)) as u32
    };
    let left = to_pixels(region.x - screen.x, scale_x, frame.width());
    let top = to_pixels(region.y - screen.y, scale_y, frame.height());
    let right = to_pixels(region.x - screen.x + region.width, scale_x, frame.width());
    let bottom = to_pixels(region.y - screen.y + region.height, scale_y, frame.height());

    for y in top..bottom {
        for x in left..right {
            frame.put_pixel(x, y, PANEL_MASK);
        }
    }
}

fn to_extent(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn excluded_panel_region(panel: GeometrySnapshot, screen: SurfaceGeometry) -> Option<SurfaceGeometry> {
    if !panel.is_active || !panel.is_visible {
        return None;
    }
    let bounds = panel.bounds();
    bounds.intersects(screen).then_some(bounds)
}

/// Screen-sharing session the guide panel coordinates with.
pub struct ScreenShare {
    sharing: Cell<bool>,
    geometry_getter: RefCell<GeometryGetter>,
    close_callback: RefCell<Option<CloseCallback>>,
    last_frame: RefCell<Option<CaptureArtifact>>,
}

impl ScreenShare {
    pub fn new() -> Self {
        Self {
            sharing: Cell::new(false),
            geometry_getter: RefCell::new(no_panel_getter()),
            close_callback: RefCell::new(None),
            last_frame: RefCell::new(None),
        }
    }

    pub fn start(&self) {
        if !self.sharing.replace(true) {
            tracing::info!("screen sharing started");
        }
    }

    pub fn stop(&self) {
        if !self.sharing.replace(false) {
            return;
        }
        tracing::info!("screen sharing stopped");
        self.discard_last_frame();
        let callback = self.close_callback.borrow().clone();
        if let Some(callback) = callback {
            callback();
        }
    }

    pub fn is_sharing(&self) -> bool {
        self.sharing.get()
    }

    pub fn panel_snapshot(&self) -> GeometrySnapshot {
        let getter = self.geometry_getter.borrow().clone();
        getter()
    }

    /// Panel snapshot for the next frame, or `None` while capture should idle.
    pub fn frame_request(&self) -> Option<GeometrySnapshot> {
        if !self.is_sharing() {
            return None;
        }
        let panel = self.panel_snapshot();
        (panel.is_active && panel.is_visible).then_some(panel)
    }

    pub fn should_pause(&self) -> bool {
        self.frame_request().is_none()
    }

    pub fn capture_frame_with<B: CaptureBackend>(
        &self,
        backend: &B,
    ) -> Result<CaptureArtifact, CaptureError> {
        if !self.is_sharing() {
            return Err(CaptureError::NotSharing);
        }
        let artifact = capture_focused_monitor_with(backend, self.panel_snapshot())?;
        self.record_frame(artifact.clone());
        Ok(artifact)
    }

    pub fn record_frame(&self, artifact: CaptureArtifact) {
        if !self.is_sharing() {
            discard_artifact(&artifact, "sharing already stopped");
            return;
        }
        tracing::debug!(
            frame_id = %artifact.frame_id,
            monitor = %artifact.monitor,
            width = artifact.width,
            height = artifact.height,
            excluded = ?artifact.excluded,
            "recorded screen frame"
        );
        if let Some(previous) = self.last_frame.borrow_mut().replace(artifact) {
            discard_artifact(&previous, "superseded");
        }
    }

    pub fn last_frame(&self) -> Option<CaptureArtifact> {
        self.last_frame.borrow().clone()
    }

    fn discard_last_frame(&self) {
        if let Some(previous) = self.last_frame.borrow_mut().take() {
            discard_artifact(&previous, "sharing stopped");
        }
    }
}

impl Default for ScreenShare {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureLink for ScreenShare {
    fn subscribe_geometry(&self, getter: GeometryGetter) {
        *self.geometry_getter.borrow_mut() = getter;
    }

    fn unsubscribe_geometry(&self) {
        *self.geometry_getter.borrow_mut() = no_panel_getter();
    }

    fn subscribe_close(&self, callback: CloseCallback) {
        *self.close_callback.borrow_mut() = Some(callback);
    }

    fn unsubscribe_close(&self) {
        self.close_callback.borrow_mut().take();
    }
}

impl CaptureControl for ScreenShare {
    fn stop_capture(&self) {
        self.stop();
    }
}

fn discard_artifact(artifact: &CaptureArtifact, reason: &str) {
    remove_frame_file(&artifact.path, reason);
    if let Some(preview) = artifact.preview.as_deref() {
        remove_frame_file(preview, reason);
    }
}

fn no_panel_getter() -> GeometryGetter {
    Rc::new(|| GeometrySnapshot::NONE)
}

fn capture_temp_dir() -> PathBuf {
    std::env::temp_dir().join(TEMP_CAPTURE_DIR)
}

/// Removes frame files older than `max_age` left behind by earlier runs.
pub fn prune_stale_frames(max_age: Duration) -> usize {
    prune_stale_frames_in(&capture_temp_dir(), max_age, SystemTime::now())
}

fn prune_stale_frames_in(dir: &Path, max_age: Duration, now: SystemTime) -> usize {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return 0,
        Err(err) => {
            tracing::warn!(path = %dir.display(), ?err, "failed to read capture temp directory");
            return 0;
        }
    };

    let mut removed = 0;
    for path in entries.flatten().map(|entry| entry.path()) {
        if !path.is_file()
            || path
                .file_name()
                .and_then(|name| name.to_str())
                .is_none_or(|name| !name.starts_with(TEMP_CAPTURE_PREFIX))
        {
            continue;
        }
        let age = std::fs::metadata(&path)
            .and_then(|metadata| metadata.modified())
            .map(|modified| now.duration_since(modified).unwrap_or(Duration::ZERO))
            .unwrap_or(Duration::ZERO);
        if age > max_age && remove_frame_file(&path, "stale") == FileRemoval::Removed {
            removed += 1;
        }
    }
    if removed > 0 {
        tracing::info!(removed, "pruned stale capture frames");
    }
    removed
}

fn frame_path(frame_id: &str) -> PathBuf {
    let dir = capture_temp_dir();
    if let Err(err) = std::fs::create_dir_all(&dir) {
        tracing::warn!(path = %dir.display(), ?err, "could not create frame directory");
    }
    dir.join(format!("{TEMP_CAPTURE_PREFIX}{frame_id}.png"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileRemoval {
    Removed,
    Missing,
    Failed,
}

fn remove_frame_file(path: &Path, reason: &str) -> FileRemoval {
    remove_frame_file_with(path, reason, |path| std::fs::remove_file(path))
}

fn remove_frame_file_with(
    path: &Path,
    reason: &str,
    remove: impl FnOnce(&Path) -> std::io::Result<()>,
) -> FileRemoval {
    let Err(err) = remove(path) else {
        return FileRemoval::Removed;
    };
    if err.kind() == std::io::ErrorKind::NotFound {
        tracing::debug!(reason, path = %path.display(), "frame file already gone");
        FileRemoval::Missing
    } else {
        tracing::warn!(reason, path = %path.display(), ?err, "could not remove frame file");
        FileRemoval::Failed
    }
}

fn run_tool(command: &str, args: &[&str]) -> Result<Output, CaptureError> {
    let output = Command::new(command)
        .args(args)
        .output()
        .map_err(|source| CaptureError::CommandIo {
            command: command.to_string(),
            source,
        })?;
    if output.status.success() {
        return Ok(output);
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(CaptureError::CommandFailed {
        command: command.to_string(),
        message: format!("{} ({})", output.status, stderr.trim()),
    })
}

fn tool_stdout(command: &str, args: &[&str]) -> Result<String, CaptureError> {
    let stdout = String::from_utf8_lossy(&run_tool(command, args)?.stdout).into_owned();
    if stdout.trim().is_empty() {
        return Err(CaptureError::CommandFailed {
            command: command.to_string(),
            message: "empty output".to_string(),
        });
    }
    Ok(stdout)
}
