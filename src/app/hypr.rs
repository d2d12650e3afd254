use std::io::{BufRead, BufReader};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::process::Command;
use std::time::{Duration, Instant};

use crate::geometry::{PanelSize, SurfaceGeometry};

const HYPR_LOOKUP_RETRY_COUNT: u8 = 40;
const HYPR_LOOKUP_RETRY_DELAY: Duration = Duration::from_millis(50);
const HYPR_PIN_RETRY_COUNT: u8 = 3;
const HYPR_PIN_EVENT_TIMEOUT: Duration = Duration::from_millis(350);

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct HyprClient {
    pub(super) address: String,
    pub(super) pinned: bool,
    pub(super) geometry: Option<SurfaceGeometry>,
}

impl HyprClient {
    fn selector(&self) -> String {
        format!("address:{}", self.address)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum PinOutcome {
    Pinned,
    /// The compositor rejected the pin or never confirmed it.
    Refused,
    WindowNotFound,
}

/// Whether the running compositor can keep a window docked above all workspaces.
pub(super) fn docked_supported() -> bool {
    std::env::var_os("HYPRLAND_INSTANCE_SIGNATURE").is_some()
}

fn parse_client_geometry(client: &serde_json::Value) -> Option<SurfaceGeometry> {
    let at = client.get("at")?.as_array()?;
    let size = client.get("size")?.as_array()?;
    if at.len() != 2 || size.len() != 2 {
        return None;
    }
    let x = i32::try_from(at[0].as_i64()?).ok()?;
    let y = i32::try_from(at[1].as_i64()?).ok()?;
    let width = i32::try_from(size[0].as_i64()?).ok()?;
    let height = i32::try_from(size[1].as_i64()?).ok()?;
    if width <= 0 || height <= 0 {
        return None;
    }
    Some(SurfaceGeometry::new(x, y, width, height))
}

pub(super) fn hypr_client_from_json(stdout: &[u8], expected_title: &str) -> Option<HyprClient> {
    let parsed: serde_json::Value = serde_json::from_slice(stdout).ok()?;
    parsed.as_array()?.iter().find_map(|client| {
        let title = client.get("title").and_then(serde_json::Value::as_str)?;
        if title != expected_title {
            return None;
        }
        let address = client.get("address").and_then(serde_json::Value::as_str)?;
        Some(HyprClient {
            address: address.to_string(),
            pinned: client
                .get("pinned")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false),
            geometry: parse_client_geometry(client),
        })
    })
}

fn find_hypr_client(expected_title: &str) -> Option<HyprClient> {
    let outcome = Command::new("hyprctl")
        .args(["-j", "clients"])
        .output()
        .ok()?;
    if !outcome.status.success() {
        return None;
    }
    hypr_client_from_json(&outcome.stdout, expected_title)
}

fn wait_for_client(expected_title: &str) -> Option<HyprClient> {
    retry_until_some(
        HYPR_LOOKUP_RETRY_COUNT,
        HYPR_LOOKUP_RETRY_DELAY,
        |_| find_hypr_client(expected_title),
        std::thread::sleep,
    )
}

fn retry_until_some<T, F, S>(
    retry_count: u8,
    retry_delay: Duration,
    mut action: F,
    mut sleep: S,
) -> Option<T>
where
    F: FnMut(u8) -> Option<T>,
    S: FnMut(Duration),
{
    for attempt in 1..=retry_count {
        if let Some(value) = action(attempt) {
            return Some(value);
        }
        if attempt < retry_count {
            sleep(retry_delay);
        }
    }
    None
}

/// Runs one `hyprctl dispatch` and reports whether it succeeded.
fn dispatch(window: &str, args: &[&str]) -> bool {
    match Command::new("hyprctl").arg("dispatch").args(args).output() {
        Ok(result) if result.status.success() => {
            tracing::debug!(window = window, args = ?args, "hyprctl dispatch applied");
            true
        }
        Ok(result) => {
            let stderr = String::from_utf8_lossy(&result.stderr);
            tracing::warn!(
                window = window,
                args = ?args,
                status = result.status.code(),
                stderr = stderr.trim(),
                "hyprctl dispatch returned non-zero status"
            );
            false
        }
        Err(err) => {
            tracing::debug!(window = window, args = ?args, ?err, "hyprctl dispatch failed");
            false
        }
    }
}

fn strip_window_chrome(window: &str, selector: &str) {
    for (property, value) in [
        ("decorate", "off"),
        ("border_size", "0"),
        ("no_shadow", "on"),
        ("no_dim", "on"),
    ] {
        dispatch(window, &["setprop", selector, property, value]);
    }
}

fn socket2_path() -> Option<PathBuf> {
    let signature = std::env::var("HYPRLAND_INSTANCE_SIGNATURE").ok()?;
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR").ok()?;
    Some(
        PathBuf::from(runtime_dir)
            .join("hypr")
            .join(signature)
            .join(".socket2.sock"),
    )
}

fn open_socket2_reader() -> Option<BufReader<UnixStream>> {
    let stream = UnixStream::connect(socket2_path()?).ok()?;
    let _ = stream.set_read_timeout(Some(Duration::from_millis(80)));
    Some(BufReader::new(stream))
}

fn parse_pin_event(line: &str) -> Option<(&str, bool)> {
    let event_data = line.trim().strip_prefix("pin>>")?;
    let (address, pin_state) = event_data.split_once(',')?;
    let pinned = match pin_state.trim() {
        "1" => true,
        "0" => false,
        _ => return None,
    };
    Some((address.trim(), pinned))
}

fn wait_for_pin_event<R: BufRead>(reader: &mut R, address: &str, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    let mut line = String::new();
    while Instant::now() < deadline {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => return false,
            Ok(_) => {
                if let Some((event_address, pinned)) = parse_pin_event(&line) {
                    if event_address == address {
                        return pinned;
                    }
                }
            }
            Err(err)
                if err.kind() == std::io::ErrorKind::WouldBlock
                    || err.kind() == std::io::ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(_) => return false,
        }
    }
    false
}

/// Floats, sizes and pins the window titled `title`. Blocks; run it off the main loop.
pub(super) fn dock_window(title: &str, size: PanelSize) -> PinOutcome {
    let Some(client) = wait_for_client(title) else {
        tracing::debug!(title = title, "panel window never appeared in hyprctl clients");
        return PinOutcome::WindowNotFound;
    };
    if client.pinned {
        return PinOutcome::Pinned;
    }

    let selector = client.selector();
    dispatch(title, &["setfloating", &selector]);
    strip_window_chrome(title, &selector);
    let resize_arg = format!(
        "exact {} {},{selector}",
        size.width.max(1),
        size.height.max(1)
    );
    dispatch(title, &["resizewindowpixel", &resize_arg]);

    let confirmed = retry_until_some(
        HYPR_PIN_RETRY_COUNT,
        HYPR_LOOKUP_RETRY_DELAY,
        |_| {
            let mut events = open_socket2_reader();
            if !dispatch(title, &["pin", &selector]) {
                return None;
            }
            let by_event = events
                .as_mut()
                .is_some_and(|reader| wait_for_pin_event(reader, &client.address, HYPR_PIN_EVENT_TIMEOUT));
            let verified = by_event
                || find_hypr_client(title).is_some_and(|current| current.pinned);
            verified.then_some(())
        },
        std::thread::sleep,
    );

    match confirmed {
        Some(()) => PinOutcome::Pinned,
        None => {
            tracing::warn!(title = title, "compositor did not confirm panel pin");
            PinOutcome::Refused
        }
    }
}

/// Floats the window titled `title` and moves it to `geometry` on a helper thread.
pub(super) fn place_window(title: &str, geometry: SurfaceGeometry) {
    if !docked_supported() {
        tracing::debug!(title = title, "skipping window placement outside Hyprland");
        return;
    }

    let title = title.to_string();
    std::thread::spawn(move || {
        let Some(client) = wait_for_client(&title) else {
            tracing::debug!(title = title, "panel window lookup failed for placement");
            return;
        };
        let selector = client.selector();
        dispatch(&title, &["setfloating", &selector]);
        strip_window_chrome(&title, &selector);
        let resize_arg = format!(
            "exact {} {},{selector}",
            geometry.width.max(1),
            geometry.height.max(1)
        );
        let move_arg = format!("exact {} {},{selector}", geometry.x, geometry.y);
        dispatch(&title, &["resizewindowpixel", &resize_arg]);
        dispatch(&title, &["movewindowpixel", &move_arg]);
    });
}

pub(super) fn window_geometry(title: &str) -> Option<SurfaceGeometry> {
    if !docked_supported() {
        return None;
    }
    find_hypr_client(title).and_then(|client| client.geometry)
}
