use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use crate::analytics::{AnalyticsEvent, EventTracker, LogTracker};
use crate::capture::{self, CaptureArtifact, CaptureError, CaptureLink, ScreenShare};
use crate::config::{user_stylesheet_path, AppConfig};
use crate::error::{AppError, AppResult};
use crate::geometry::GeometrySnapshot;
use crate::manager::{
    CaptureControl, CloseReason, OpenOutcome, SurfaceManager, TaskReset, TeardownCoordinator,
};
use crate::notification::DesktopNotifier;
use crate::tasks::{load_guide, TaskBoard};
use crate::ui::{StyleTokens, LAYOUT_TOKENS};
use crate::view::{TaskScreen, ViewAction};
use gtk4::prelude::*;
use gtk4::{
    Align, Application, ApplicationWindow, Box as GtkBox, Button, Entry, Label, Orientation,
    Picture, ScrolledWindow, TextView, ToggleButton, WrapMode,
};

mod host;
mod hypr;
mod layout;
mod runtime_css;
mod view;
mod worker;

use self::host::GtkSurfaceHost;
use self::runtime_css::{install_runtime_css, runtime_css};
use self::view::ActionSink;
use self::worker::spawn_worker_action;

pub(crate) const MAIN_WINDOW_TITLE: &str = "taskdock";
const APPLICATION_ID: &str = "io.github.taskdock";
const STALE_FRAME_MAX_AGE: Duration = Duration::from_secs(60 * 60);
const FRAME_PREVIEW_WIDTH: u32 = 480;

type PanelManager = SurfaceManager<GtkSurfaceHost, TaskScreen>;
type ActionSlot = Rc<RefCell<Option<ActionSink>>>;

/// Main-window controls of the host application.
struct HostControls {
    goal_entry: Entry,
    steps_view: TextView,
    load_button: Button,
    open_button: Button,
    start_over_button: Button,
    share_toggle: ToggleButton,
    status_label: Label,
    frame_preview: Picture,
    root: GtkBox,
}

fn build_host_controls(tokens: StyleTokens) -> HostControls {
    let root = GtkBox::new(Orientation::Vertical, tokens.spacing_12);
    root.add_css_class("taskdock-main");

    let goal_entry = Entry::new();
    goal_entry.set_placeholder_text(Some("What do you want to get done?"));

    let steps_view = TextView::new();
    steps_view.set_wrap_mode(WrapMode::WordChar);
    steps_view.add_css_class("taskdock-steps-editor");
    let steps_scroller = ScrolledWindow::new();
    steps_scroller.set_vexpand(true);
    steps_scroller.set_child(Some(&steps_view));

    let steps_hint = Label::new(Some("One step per line"));
    steps_hint.set_xalign(0.0);
    steps_hint.add_css_class("taskdock-status");

    let load_button = Button::with_label("Load steps");
    let open_button = Button::with_label("Open guide");
    let start_over_button = Button::with_label("Start over");
    let share_toggle = ToggleButton::with_label("Share screen");

    let actions = GtkBox::new(Orientation::Horizontal, tokens.spacing_8);
    actions.set_halign(Align::End);
    actions.append(&share_toggle);
    actions.append(&load_button);
    actions.append(&open_button);
    actions.append(&start_over_button);

    let frame_preview = Picture::new();
    frame_preview.set_can_shrink(true);
    frame_preview.set_height_request(tokens.preview_height);
    frame_preview.set_visible(false);
    frame_preview.add_css_class("taskdock-preview");

    let status_label = Label::new(Some("Ready."));
    status_label.set_xalign(0.0);
    status_label.set_wrap(true);
    status_label.add_css_class("taskdock-status");

    root.append(&goal_entry);
    root.append(&steps_hint);
    root.append(&steps_scroller);
    root.append(&actions);
    root.append(&frame_preview);
    root.append(&status_label);

    HostControls {
        goal_entry,
        steps_view,
        load_button,
        open_button,
        start_over_button,
        share_toggle,
        status_label,
        frame_preview,
        root,
    }
}

fn steps_from_text(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn open_outcome_status(outcome: &OpenOutcome) -> String {
    match outcome {
        OpenOutcome::Opened(mode) => format!("Guide open ({mode:?})."),
        OpenOutcome::AlreadyActive => "Guide is already open.".to_string(),
        OpenOutcome::Denied => "The compositor declined to dock the guide.".to_string(),
        OpenOutcome::PopupBlocked => "The guide window was blocked.".to_string(),
        OpenOutcome::Failed(err) => format!("Could not open the guide: {err}"),
        OpenOutcome::ClosedWhileOpening => "Guide closed.".to_string(),
    }
}

fn close_reason_status(reason: CloseReason) -> &'static str {
    match reason {
        CloseReason::Requested => "Guide closed.",
        CloseReason::HostClosed => "Guide window closed.",
        CloseReason::Shutdown => "Shutting down.",
    }
}

fn capture_with_preview(panel: GeometrySnapshot) -> Result<CaptureArtifact, CaptureError> {
    let mut artifact = capture::capture_focused_monitor(panel)?;
    match capture::render_preview(&artifact, FRAME_PREVIEW_WIDTH) {
        Ok(preview) => artifact.preview = Some(preview),
        Err(err) => tracing::warn!(?err, "failed to render frame preview"),
    }
    Ok(artifact)
}

fn show_frame_preview(picture: &Picture, frame: Option<CaptureArtifact>) {
    let texture = frame
        .and_then(|frame| frame.preview)
        .and_then(|path| match gtk4::gdk::Texture::from_filename(&path) {
            Ok(texture) => Some(texture),
            Err(err) => {
                tracing::warn!(path = %path.display(), ?err, "failed to load frame preview");
                None
            }
        });
    picture.set_visible(texture.is_some());
    picture.set_paintable(texture.as_ref());
}

fn start_capture_tick(share: Rc<ScreenShare>, interval: Duration, preview: Picture) {
    let in_flight = Rc::new(Cell::new(false));
    gtk4::glib::timeout_add_local(interval, move || {
        if in_flight.get() {
            return gtk4::glib::ControlFlow::Continue;
        }
        let Some(panel) = share.frame_request() else {
            return gtk4::glib::ControlFlow::Continue;
        };
        in_flight.set(true);
        let share = share.clone();
        let preview = preview.clone();
        let in_flight = in_flight.clone();
        spawn_worker_action(
            move || capture_with_preview(panel),
            move |result| {
                in_flight.set(false);
                match result {
                    Ok(artifact) => {
                        share.record_frame(artifact);
                        show_frame_preview(&preview, share.last_frame());
                    }
                    Err(err) => tracing::warn!(?err, "background frame capture failed"),
                }
            },
        );
        gtk4::glib::ControlFlow::Continue
    });
}

pub struct App {
    config: AppConfig,
    guide_path: Option<PathBuf>,
}

impl App {
    pub fn new(config: AppConfig, guide_path: Option<PathBuf>) -> Self {
        Self { config, guide_path }
    }

    pub fn start(&self) -> AppResult<()> {
        capture::prune_stale_frames(STALE_FRAME_MAX_AGE);

        let board = Rc::new(TaskBoard::new());

        tracing::info!("starting gtk runtime");
        gtk4::init().map_err(|err| AppError::GtkInit {
            message: err.to_string(),
        })?;
        let application = Application::new(
            Some(APPLICATION_ID),
            gtk4::gio::ApplicationFlags::NON_UNIQUE,
        );

        let config = self.config.clone();
        let guide_path = self.guide_path.clone();
        let action_slot: ActionSlot = Rc::new(RefCell::new(None));
        let manager_slot: Rc<RefCell<Option<PanelManager>>> = Rc::new(RefCell::new(None));
        let share = Rc::new(ScreenShare::new());
        let activate_once = Rc::new(Cell::new(false));

        {
            let board = board.clone();
            let action_slot = action_slot.clone();
            let manager_slot = manager_slot.clone();
            let share = share.clone();
            application.connect_activate(move |app| {
                if activate_once.replace(true) {
                    tracing::debug!("ignoring duplicate gtk activate signal");
                    return;
                }
                let tokens = LAYOUT_TOKENS;
                let motion_enabled = gtk4::Settings::default()
                    .map(|settings| settings.is_gtk_enable_animations())
                    .unwrap_or(true);
                let css = runtime_css(tokens, motion_enabled);
                install_runtime_css(&css);

                let window = ApplicationWindow::new(app);
                window.add_css_class("taskdock-root");
                window.set_title(Some(MAIN_WINDOW_TITLE));
                window.set_default_size(tokens.main_window_width, tokens.main_window_height);
                let controls = build_host_controls(tokens);
                window.set_child(Some(&controls.root));

                let forward: ActionSink = {
                    let action_slot = action_slot.clone();
                    Rc::new(move |action| {
                        let handler = action_slot.borrow().clone();
                        if let Some(handler) = handler {
                            handler(action);
                        }
                    })
                };
                let host = GtkSurfaceHost::new(
                    app.clone(),
                    window.clone(),
                    tokens,
                    css,
                    user_stylesheet_path(),
                    forward,
                );
                let manager = SurfaceManager::new(host, TaskScreen, config.acquire_policy());
                manager.set_notifier(Rc::new(DesktopNotifier));
                let tracker: Rc<dyn EventTracker> = Rc::new(LogTracker);
                manager.set_tracker(tracker.clone());
                manager.attach_capture(share.clone() as Rc<dyn CaptureLink>);
                manager.refresh_content(board.snapshot());

                let coordinator = Rc::new(TeardownCoordinator::new(
                    manager.clone(),
                    share.clone() as Rc<dyn CaptureControl>,
                    board.clone() as Rc<dyn TaskReset>,
                    tracker.clone(),
                ));

                let sync: Rc<dyn Fn()> = {
                    let manager = manager.clone();
                    let board = board.clone();
                    Rc::new(move || {
                        manager.refresh_content(board.snapshot());
                    })
                };

                {
                    let board = board.clone();
                    let coordinator = coordinator.clone();
                    let sync = sync.clone();
                    let tracker = tracker.clone();
                    let goal_entry = controls.goal_entry.clone();
                    let steps_view = controls.steps_view.clone();
                    let share_toggle = controls.share_toggle.clone();
                    let handler: ActionSink = Rc::new(move |action| match action {
                        ViewAction::CompleteTask(task_id) => {
                            if board.complete(task_id) {
                                tracker.track(AnalyticsEvent::TaskCompleted { task_id });
                                if board.all_completed() {
                                    tracker.track(AnalyticsEvent::AllTasksCompleted);
                                }
                            }
                            sync();
                        }
                        ViewAction::StartOver => {
                            coordinator.start_over();
                            goal_entry.set_text("");
                            steps_view.buffer().set_text("");
                            share_toggle.set_active(false);
                            sync();
                        }
                    });
                    action_slot.borrow_mut().replace(handler);
                }

                if let Some(path) = guide_path.clone() {
                    board.set_loading(true);
                    sync();
                    controls.status_label.set_text("Loading guide...");
                    let board = board.clone();
                    let sync = sync.clone();
                    let goal_entry = controls.goal_entry.clone();
                    let steps_view = controls.steps_view.clone();
                    let status_label = controls.status_label.clone();
                    spawn_worker_action(
                        move || load_guide(&path),
                        move |result| {
                            match result {
                                Ok(guide) => {
                                    board.load(&guide);
                                    goal_entry.set_text(&guide.goal);
                                    steps_view.buffer().set_text(&guide.steps.join("\n"));
                                    status_label
                                        .set_text(&format!("Loaded {} steps.", guide.steps.len()));
                                }
                                Err(err) => {
                                    board.set_loading(false);
                                    tracing::warn!(?err, "failed to load guide file");
                                    status_label.set_text(&format!("Could not load the guide: {err}"));
                                }
                            }
                            sync();
                        },
                    );
                }

                {
                    let status_label = controls.status_label.clone();
                    manager.on_teardown(move |reason| {
                        status_label.set_text(close_reason_status(reason));
                    });
                }

                {
                    let board = board.clone();
                    let sync = sync.clone();
                    let goal_entry = controls.goal_entry.clone();
                    let steps_view = controls.steps_view.clone();
                    let status_label = controls.status_label.clone();
                    controls.load_button.connect_clicked(move |_| {
                        let buffer = steps_view.buffer();
                        let text = buffer.text(&buffer.start_iter(), &buffer.end_iter(), false);
                        let steps = steps_from_text(text.as_str());
                        board.set_goal(goal_entry.text().as_str());
                        board.replace_tasks(steps.iter().map(String::as_str));
                        status_label.set_text(&format!("Loaded {} steps.", steps.len()));
                        sync();
                    });
                }

                {
                    let manager = manager.clone();
                    let status_label = controls.status_label.clone();
                    let board = board.clone();
                    controls.open_button.connect_clicked(move |_| {
                        manager.refresh_content(board.snapshot());
                        let manager = manager.clone();
                        let status_label = status_label.clone();
                        gtk4::glib::MainContext::default().spawn_local(async move {
                            let outcome = manager.open().await;
                            tracing::debug!(outcome = ?outcome, "open guide finished");
                            status_label.set_text(&open_outcome_status(&outcome));
                        });
                    });
                }

                {
                    let action_slot = action_slot.clone();
                    controls.start_over_button.connect_clicked(move |_| {
                        let handler = action_slot.borrow().clone();
                        if let Some(handler) = handler {
                            handler(ViewAction::StartOver);
                        }
                    });
                }

                {
                    let share = share.clone();
                    let preview = controls.frame_preview.clone();
                    controls.share_toggle.connect_toggled(move |toggle| {
                        if toggle.is_active() {
                            share.start();
                        } else {
                            share.stop();
                            show_frame_preview(&preview, None);
                        }
                    });
                }

                start_capture_tick(
                    share.clone(),
                    Duration::from_millis(config.capture_interval_ms()),
                    controls.frame_preview.clone(),
                );
                manager_slot.borrow_mut().replace(manager);
                window.present();
            });
        }

        {
            let action_slot = action_slot.clone();
            let manager_slot = manager_slot.clone();
            let share = share.clone();
            application.connect_shutdown(move |_| {
                action_slot.borrow_mut().take();
                if let Some(manager) = manager_slot.borrow_mut().take() {
                    manager.shutdown();
                }
                share.stop();
                tracing::info!("gtk runtime shut down");
            });
        }

        let program = std::env::args()
            .next()
            .unwrap_or_else(|| MAIN_WINDOW_TITLE.to_string());
        application.run_with_args(&[program]);
        Ok(())
    }
}
