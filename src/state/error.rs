use super::event::LifecycleEvent;
use super::model::LifecyclePhase;
use thiserror::Error;

pub type StateResult<T> = std::result::Result<T, StateError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("invalid lifecycle transition: from {from:?} using event {event:?}")]
    InvalidTransition {
        from: LifecyclePhase,
        event: LifecycleEvent,
    },
}
