use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::geometry::{PanelMargins, PanelSize};
use crate::surface::AcquirePolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConfigPathError {
    MissingHomeDirectory,
}

const APP_DIR: &str = "taskdock";
const APP_CONFIG_FILE: &str = "config.json";
const USER_STYLE_FILE: &str = "style.css";

const MIN_PANEL_EDGE: i32 = 120;
const MIN_CAPTURE_INTERVAL_MS: u64 = 250;

/// Application-level settings from `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub panel_width: i32,
    pub panel_height: i32,
    pub margin_right: i32,
    pub margin_bottom: i32,
    pub force_floating: bool,
    pub docked_unsupported_families: Vec<String>,
    pub capture_interval_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            panel_width: 400,
            panel_height: 500,
            margin_right: 20,
            margin_bottom: 100,
            force_floating: false,
            docked_unsupported_families: vec!["gnome".to_string()],
            capture_interval_ms: 3_000,
        }
    }
}

impl AppConfig {
    pub fn panel_size(&self) -> PanelSize {
        PanelSize::new(
            self.panel_width.max(MIN_PANEL_EDGE),
            self.panel_height.max(MIN_PANEL_EDGE),
        )
    }

    pub fn acquire_policy(&self) -> AcquirePolicy {
        AcquirePolicy {
            force_floating: self.force_floating,
            unsupported_families: self
                .docked_unsupported_families
                .iter()
                .map(|family| family.trim().to_ascii_lowercase())
                .filter(|family| !family.is_empty())
                .collect(),
            ..AcquirePolicy::new(
                self.panel_size(),
                PanelMargins::new(self.margin_right.max(0), self.margin_bottom.max(0)),
            )
        }
    }

    pub fn capture_interval_ms(&self) -> u64 {
        self.capture_interval_ms.max(MIN_CAPTURE_INTERVAL_MS)
    }
}

pub fn load_app_config() -> AppConfig {
    let (xdg_config_home, home) = config_env_dirs();
    load_app_config_with(xdg_config_home.as_deref(), home.as_deref())
}

fn load_app_config_with(xdg_config_home: Option<&Path>, home: Option<&Path>) -> AppConfig {
    let path = match app_config_path(APP_DIR, APP_CONFIG_FILE, xdg_config_home, home) {
        Ok(p) => p,
        Err(_) => return AppConfig::default(),
    };
    if !path.exists() {
        return AppConfig::default();
    }
    match std::fs::read_to_string(&path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
            tracing::warn!(?err, ?path, "failed to parse config.json; using defaults");
            AppConfig::default()
        }),
        Err(err) => {
            tracing::warn!(?err, ?path, "failed to read config.json; using defaults");
            AppConfig::default()
        }
    }
}

/// Location of the optional user stylesheet mirrored into every panel.
pub fn user_stylesheet_path() -> Option<PathBuf> {
    let (xdg_config_home, home) = config_env_dirs();
    app_config_path(
        APP_DIR,
        USER_STYLE_FILE,
        xdg_config_home.as_deref(),
        home.as_deref(),
    )
    .ok()
}

pub(crate) fn config_env_dirs() -> (Option<PathBuf>, Option<PathBuf>) {
    (
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

pub(crate) fn app_config_path(
    app_dir: &str,
    file_name: &str,
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    let mut path = config_root(xdg_config_home, home)?;
    path.push(app_dir);
    path.push(file_name);
    Ok(path)
}

fn config_root(
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    if let Some(xdg) = xdg_config_home.filter(|path| !path.as_os_str().is_empty()) {
        return Ok(xdg.to_path_buf());
    }

    let home = home.ok_or(ConfigPathError::MissingHomeDirectory)?;
    Ok(home.join(".config"))
}
