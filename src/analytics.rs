use crate::surface::SurfaceMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticsEvent {
    StartOverClicked,
    TaskCompleted { task_id: u32 },
    AllTasksCompleted,
    SurfaceOpened { mode: SurfaceMode },
    PopupBlocked,
}

impl AnalyticsEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AnalyticsEvent::StartOverClicked => "start_over_clicked",
            AnalyticsEvent::TaskCompleted { .. } => "task_completed",
            AnalyticsEvent::AllTasksCompleted => "all_tasks_completed",
            AnalyticsEvent::SurfaceOpened { .. } => "surface_opened",
            AnalyticsEvent::PopupBlocked => "popup_blocked",
        }
    }
}

pub trait EventTracker {
    fn track(&self, event: AnalyticsEvent);
}

/// Records usage events as structured log lines under the `taskdock::analytics` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTracker;

impl EventTracker for LogTracker {
    fn track(&self, event: AnalyticsEvent) {
        match event {
            AnalyticsEvent::TaskCompleted { task_id } => {
                tracing::info!(target: "taskdock::analytics", event = event.name(), task_id);
            }
            AnalyticsEvent::SurfaceOpened { mode } => {
                tracing::info!(target: "taskdock::analytics", event = event.name(), mode = ?mode);
            }
            _ => tracing::info!(target: "taskdock::analytics", event = event.name()),
        }
    }
}
