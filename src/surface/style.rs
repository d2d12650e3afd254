use std::path::PathBuf;

use super::{HostFailure, HostSurface};

/// Fills the panel edge to edge without a second scrollbar.
pub const PANEL_RESET_CSS: &str = "
window.taskdock-panel,
window.taskdock-panel > .taskdock-panel-root {
  margin: 0;
  padding: 0;
}
window.taskdock-panel scrollbar {
  opacity: 0;
  min-width: 0;
  min-height: 0;
}
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StylesheetSource {
    Inline(String),
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stylesheet {
    pub name: String,
    pub source: StylesheetSource,
}

impl Stylesheet {
    pub fn inline(name: impl Into<String>, css: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: StylesheetSource::Inline(css.into()),
        }
    }

    pub fn file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source: StylesheetSource::File(path.into()),
        }
    }

    pub fn rules(&self) -> std::io::Result<String> {
        match &self.source {
            StylesheetSource::Inline(css) => Ok(css.clone()),
            StylesheetSource::File(path) => std::fs::read_to_string(path),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MirrorReport {
    pub inlined: usize,
    pub linked: usize,
}

/// Copies the host styling into `surface`, then appends [`PANEL_RESET_CSS`].
///
/// Sheets whose rules cannot be read are linked by path instead of inlined.
pub fn mirror_styles<S: HostSurface>(
    surface: &S,
    stylesheets: &[Stylesheet],
) -> Result<MirrorReport, HostFailure> {
    let mut report = MirrorReport::default();
    for sheet in stylesheets {
        match (sheet.rules(), &sheet.source) {
            (Ok(css), _) => {
                surface.insert_style(&css)?;
                report.inlined += 1;
            }
            (Err(err), StylesheetSource::File(path)) => {
                tracing::debug!(
                    sheet = %sheet.name,
                    path = %path.display(),
                    ?err,
                    "stylesheet rules unreadable; linking by path"
                );
                surface.link_stylesheet(path)?;
                report.linked += 1;
            }
            (Err(err), StylesheetSource::Inline(_)) => {
                tracing::warn!(sheet = %sheet.name, ?err, "skipping unreadable inline stylesheet");
            }
        }
    }
    surface.insert_style(PANEL_RESET_CSS)?;
    tracing::debug!(
        inlined = report.inlined,
        linked = report.linked,
        "mirrored host styles into panel"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::fake::FakeSurface;

    #[test]
    fn readable_sheets_are_inlined_and_reset_is_last() {
        let surface = FakeSurface::detached();
        let sheets = [
            Stylesheet::inline("runtime", ".a { color: red; }"),
            Stylesheet::inline("extra", ".b { color: blue; }"),
        ];

        let report = mirror_styles(&surface, &sheets).expect("mirror");

        assert_eq!(report, MirrorReport { inlined: 2, linked: 0 });
        let styles = surface.inserted_styles();
        assert_eq!(styles.len(), 3);
        assert_eq!(styles[0], ".a { color: red; }");
        assert_eq!(styles[2], PANEL_RESET_CSS);
    }

    #[test]
    fn unreadable_file_falls_back_to_link() {
        let surface = FakeSurface::detached();
        let missing = std::env::temp_dir().join("taskdock-missing-style-for-test.css");
        let sheets = [Stylesheet::file("user", missing.clone())];

        let report = mirror_styles(&surface, &sheets).expect("mirror");

        assert_eq!(report, MirrorReport { inlined: 0, linked: 1 });
        assert_eq!(surface.linked_stylesheets(), vec![missing]);
        assert_eq!(surface.inserted_styles(), vec![PANEL_RESET_CSS.to_string()]);
    }

    #[test]
    fn readable_file_is_inlined() {
        let path = std::env::temp_dir().join(format!("taskdock-style-{}.css", std::process::id()));
        std::fs::write(&path, ".user { margin: 2px; }").expect("write stylesheet");
        let surface = FakeSurface::detached();

        let report = mirror_styles(&surface, &[Stylesheet::file("user", path.clone())])
            .expect("mirror");

        assert_eq!(report.inlined, 1);
        assert_eq!(surface.inserted_styles()[0], ".user { margin: 2px; }");
        let _ = std::fs::remove_file(path);
    }
}
