use super::model::LifecyclePhase;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    OpenRequested,
    Acquired,
    AcquireFailed,
    CloseRequested,
    HostClosed,
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    pub from: LifecyclePhase,
    pub event: LifecycleEvent,
    pub to: LifecyclePhase,
}

impl StateTransition {
    pub const fn new(from: LifecyclePhase, event: LifecycleEvent, to: LifecyclePhase) -> Self {
        Self { from, event, to }
    }
}
