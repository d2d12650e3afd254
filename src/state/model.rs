use crate::surface::Surface;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecyclePhase {
    #[default]
    Closed,
    Opening,
    Open,
    Closing,
}

/// Panel lifecycle. The surface and its mount only exist while `Open`.
pub enum Lifecycle<S, M> {
    Closed,
    Opening { close_queued: bool },
    Open { surface: Surface<S>, mount: M },
    Closing,
}

impl<S, M> Lifecycle<S, M> {
    pub fn phase(&self) -> LifecyclePhase {
        match self {
            Lifecycle::Closed => LifecyclePhase::Closed,
            Lifecycle::Opening { .. } => LifecyclePhase::Opening,
            Lifecycle::Open { .. } => LifecyclePhase::Open,
            Lifecycle::Closing => LifecyclePhase::Closing,
        }
    }
}

impl<S, M> Default for Lifecycle<S, M> {
    fn default() -> Self {
        Lifecycle::Closed
    }
}

impl<S, M> std::fmt::Debug for Lifecycle<S, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lifecycle::Opening { close_queued } => f
                .debug_struct("Opening")
                .field("close_queued", close_queued)
                .finish(),
            Lifecycle::Open { surface, .. } => f
                .debug_struct("Open")
                .field("mode", &surface.mode())
                .field("generation", &surface.generation())
                .finish(),
            other => write!(f, "{:?}", other.phase()),
        }
    }
}
