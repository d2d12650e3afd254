use serde::Deserialize;

use super::CaptureError;

#[derive(Deserialize)]
struct MonitorStatus {
    focused: bool,
    name: Option<String>,
    x: Option<i32>,
    y: Option<i32>,
    width: Option<i32>,
    height: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FocusedMonitor {
    pub(crate) name: String,
    pub(crate) x: i32,
    pub(crate) y: i32,
    pub(crate) width: Option<u32>,
    pub(crate) height: Option<u32>,
}

fn normalize_monitor_dimension(value: Option<i32>) -> Option<u32> {
    value
        .and_then(|size| u32::try_from(size).ok())
        .filter(|size| *size > 0)
}

pub(crate) fn parse_focused_monitor(monitors_json: &str) -> Result<FocusedMonitor, CaptureError> {
    let monitors: Vec<MonitorStatus> = serde_json::from_str(monitors_json).map_err(|err| {
        CaptureError::InvalidMonitorMetadata {
            message: err.to_string(),
        }
    })?;
    let monitor = monitors
        .into_iter()
        .find(|monitor| monitor.focused)
        .ok_or(CaptureError::NoFocusedMonitor)?;
    let name = monitor
        .name
        .filter(|item| !item.is_empty())
        .ok_or(CaptureError::NoFocusedMonitor)?;

    Ok(FocusedMonitor {
        name,
        x: monitor.x.unwrap_or(0),
        y: monitor.y.unwrap_or(0),
        width: normalize_monitor_dimension(monitor.width),
        height: normalize_monitor_dimension(monitor.height),
    })
}
