use super::error::{StateError, StateResult};
use super::event::{LifecycleEvent, StateTransition};
use super::model::{Lifecycle, LifecyclePhase};
use crate::surface::Surface;

const HISTORY_LIMIT: usize = 32;

pub struct LifecycleMachine<S, M> {
    lifecycle: Lifecycle<S, M>,
    transition_history: Vec<StateTransition>,
}

impl<S, M> LifecycleMachine<S, M> {
    pub fn new() -> Self {
        Self {
            lifecycle: Lifecycle::Closed,
            transition_history: Vec::new(),
        }
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.lifecycle.phase()
    }

    pub fn can_transition(&self, event: LifecycleEvent) -> bool {
        next_phase(self.phase(), event).is_some()
    }

    pub fn history(&self) -> &[StateTransition] {
        &self.transition_history
    }

    pub fn open_parts(&self) -> Option<(&Surface<S>, &M)> {
        match &self.lifecycle {
            Lifecycle::Open { surface, mount } => Some((surface, mount)),
            _ => None,
        }
    }

    pub fn close_queued(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Opening { close_queued: true })
    }

    pub fn begin_open(&mut self) -> StateResult<()> {
        self.check(LifecycleEvent::OpenRequested)?;
        self.commit(
            LifecycleEvent::OpenRequested,
            Lifecycle::Opening {
                close_queued: false,
            },
        );
        Ok(())
    }

    /// Defers a close until the pending acquisition resolves.
    pub fn queue_close(&mut self) -> StateResult<()> {
        if self.phase() != LifecyclePhase::Opening {
            return Err(self.invalid(LifecycleEvent::CloseRequested));
        }
        self.commit(
            LifecycleEvent::CloseRequested,
            Lifecycle::Opening { close_queued: true },
        );
        Ok(())
    }

    pub fn finish_open(&mut self, surface: Surface<S>, mount: M) -> StateResult<()> {
        self.check(LifecycleEvent::Acquired)?;
        self.commit(LifecycleEvent::Acquired, Lifecycle::Open { surface, mount });
        Ok(())
    }

    /// Returns whether a close had been queued while the acquisition was pending.
    pub fn abort_open(&mut self) -> StateResult<bool> {
        self.check(LifecycleEvent::AcquireFailed)?;
        let close_queued = self.close_queued();
        self.commit(LifecycleEvent::AcquireFailed, Lifecycle::Closed);
        Ok(close_queued)
    }

    /// Moves the open surface and its mount out of the machine, leaving it `Closing`.
    pub fn begin_close(&mut self, event: LifecycleEvent) -> StateResult<(Surface<S>, M)> {
        if !matches!(
            event,
            LifecycleEvent::CloseRequested | LifecycleEvent::HostClosed
        ) {
            return Err(self.invalid(event));
        }
        self.check(event)?;
        let from = self.phase();
        match std::mem::replace(&mut self.lifecycle, Lifecycle::Closing) {
            Lifecycle::Open { surface, mount } => {
                self.record(StateTransition::new(from, event, LifecyclePhase::Closing));
                Ok((surface, mount))
            }
            previous => {
                self.lifecycle = previous;
                Err(self.invalid(event))
            }
        }
    }

    pub fn finish_close(&mut self) -> StateResult<()> {
        self.check(LifecycleEvent::Released)?;
        self.commit(LifecycleEvent::Released, Lifecycle::Closed);
        Ok(())
    }

    fn check(&self, event: LifecycleEvent) -> StateResult<LifecyclePhase> {
        tracing::debug!(from = ?self.phase(), event = ?event, "request lifecycle transition");
        next_phase(self.phase(), event).ok_or_else(|| self.invalid(event))
    }

    fn invalid(&self, event: LifecycleEvent) -> StateError {
        let from = self.phase();
        tracing::warn!(from = ?from, event = ?event, "invalid lifecycle transition requested");
        StateError::InvalidTransition { from, event }
    }

    fn commit(&mut self, event: LifecycleEvent, next: Lifecycle<S, M>) {
        let record = StateTransition::new(self.phase(), event, next.phase());
        self.lifecycle = next;
        self.record(record);
    }

    /// Keeps the most recent transitions only.
    fn record(&mut self, transition: StateTransition) {
        if self.transition_history.len() == HISTORY_LIMIT {
            self.transition_history.remove(0);
        }
        self.transition_history.push(transition);
    }
}

fn next_phase(from: LifecyclePhase, event: LifecycleEvent) -> Option<LifecyclePhase> {
    use LifecycleEvent::*;
    match (from, event) {
        (LifecyclePhase::Closed, OpenRequested) => Some(LifecyclePhase::Opening),
        (LifecyclePhase::Opening, Acquired) => Some(LifecyclePhase::Open),
        (LifecyclePhase::Opening, AcquireFailed) => Some(LifecyclePhase::Closed),
        (LifecyclePhase::Opening, CloseRequested) => Some(LifecyclePhase::Opening),
        (LifecyclePhase::Open, CloseRequested) => Some(LifecyclePhase::Closing),
        (LifecyclePhase::Open, HostClosed) => Some(LifecyclePhase::Closing),
        (LifecyclePhase::Closing, Released) => Some(LifecyclePhase::Closed),
        _ => None,
    }
}

impl<S, M> Default for LifecycleMachine<S, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, M> std::fmt::Display for LifecycleMachine<S, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LifecyclePhase::{:?}", self.phase())
    }
}
