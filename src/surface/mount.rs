use std::cell::Cell;

use super::{HostFailure, MountTarget};
use crate::tasks::RenderInputs;
use crate::view::ContentRenderer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No open panel to render into.
    NotOpen,
    /// The panel has begun closing; its document must not be touched.
    StaleWrite,
    /// The host refused the rendered tree.
    HostRejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Rendered,
    Skipped(SkipReason),
}

pub struct MountHandle<T: MountTarget> {
    target: T,
    closing: Cell<bool>,
    renders: Cell<u64>,
}

impl<T: MountTarget> MountHandle<T> {
    pub fn mount<R: ContentRenderer + ?Sized>(
        target: T,
        renderer: &R,
        inputs: &RenderInputs,
    ) -> Result<Self, HostFailure> {
        let handle = Self {
            target,
            closing: Cell::new(false),
            renders: Cell::new(0),
        };
        handle.refresh(renderer, inputs)?;
        Ok(handle)
    }

    pub fn refresh<R: ContentRenderer + ?Sized>(
        &self,
        renderer: &R,
        inputs: &RenderInputs,
    ) -> Result<RefreshOutcome, HostFailure> {
        if self.closing.get() {
            return Ok(RefreshOutcome::Skipped(SkipReason::StaleWrite));
        }
        let view = renderer.render(inputs);
        self.target.render(&view)?;
        self.renders.set(self.renders.get().saturating_add(1));
        Ok(RefreshOutcome::Rendered)
    }

    pub fn mark_closing(&self) {
        self.closing.set(true);
    }

    pub fn is_closing(&self) -> bool {
        self.closing.get()
    }

    pub fn render_count(&self) -> u64 {
        self.renders.get()
    }

    pub fn unmount(self) {
        self.closing.set(true);
        self.target.clear();
    }
}
