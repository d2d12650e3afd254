use super::{HostCapabilities, HostFailure, Surface, SurfaceError, SurfaceHost, SurfaceMode, SurfaceResult};
use crate::geometry::{floating_placement, PanelMargins, PanelSize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquirePolicy {
    pub size: PanelSize,
    pub margins: PanelMargins,
    pub force_floating: bool,
    /// Desktop families on which the docked capability is advertised but unusable.
    pub unsupported_families: Vec<String>,
}

impl AcquirePolicy {
    pub fn new(size: PanelSize, margins: PanelMargins) -> Self {
        Self {
            size,
            margins,
            force_floating: false,
            unsupported_families: Vec::new(),
        }
    }

    pub fn prefers_docked(&self, capabilities: &HostCapabilities) -> bool {
        if self.force_floating || !capabilities.docked_supported {
            return false;
        }
        let Some(family) = capabilities.family.as_deref() else {
            return true;
        };
        !family.split(':').any(|part| {
            self.unsupported_families
                .iter()
                .any(|unsupported| unsupported.eq_ignore_ascii_case(part.trim()))
        })
    }
}

/// Obtains a fresh surface, docked when the host supports it and floating otherwise.
pub async fn acquire_with<H: SurfaceHost>(
    host: &H,
    policy: &AcquirePolicy,
    generation: u64,
) -> SurfaceResult<Surface<H::Surface>> {
    let capabilities = host.capabilities();
    if policy.prefers_docked(&capabilities) {
        tracing::debug!(
            generation,
            width = policy.size.width,
            height = policy.size.height,
            "requesting docked panel surface"
        );
        return match host.request_docked(policy.size).await {
            Ok(surface) => Ok(Surface::new(SurfaceMode::Docked, generation, surface)),
            Err(HostFailure::Denied) => Err(SurfaceError::UserDenied),
            Err(failure) => Err(SurfaceError::host("requesting docked panel", failure)),
        };
    }

    let geometry = floating_placement(host.screen_area(), policy.size, policy.margins);
    tracing::debug!(
        generation,
        docked_supported = capabilities.docked_supported,
        family = capabilities.family.as_deref(),
        x = geometry.x,
        y = geometry.y,
        width = geometry.width,
        height = geometry.height,
        "opening floating panel surface"
    );
    match host.open_floating(geometry) {
        Ok(Some(surface)) => Ok(Surface::new(SurfaceMode::Floating, generation, surface)),
        Ok(None) | Err(HostFailure::Denied) => Err(SurfaceError::PopupBlocked),
        Err(failure) => Err(SurfaceError::host("opening floating panel", failure)),
    }
}
