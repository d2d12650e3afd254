use std::cell::RefCell;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("failed to read guide file: {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid guide file: {message}")]
    InvalidGuide { message: String },
}

pub type TaskResult<T> = std::result::Result<T, TaskError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: u32,
    pub instruction: String,
    pub completed: bool,
}

/// Snapshot of everything the panel renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderInputs {
    pub goal: Option<String>,
    pub tasks: Vec<Task>,
    pub is_loading: bool,
}

impl RenderInputs {
    pub fn all_completed(&self) -> bool {
        !self.tasks.is_empty() && self.tasks.iter().all(|task| task.completed)
    }

    pub fn next_pending(&self) -> Option<&Task> {
        self.tasks.iter().find(|task| !task.completed)
    }
}

/// A goal and its ordered steps, as stored in a guide file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Guide {
    pub goal: String,
    #[serde(default)]
    pub steps: Vec<String>,
}

pub fn load_guide(path: &Path) -> TaskResult<Guide> {
    let contents = std::fs::read_to_string(path).map_err(|source| TaskError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_guide(&contents)
}

pub fn parse_guide(contents: &str) -> TaskResult<Guide> {
    let guide: Guide = serde_json::from_str(contents).map_err(|err| TaskError::InvalidGuide {
        message: err.to_string(),
    })?;
    if guide.goal.trim().is_empty() {
        return Err(TaskError::InvalidGuide {
            message: "goal must not be empty".to_string(),
        });
    }
    Ok(guide)
}

/// In-memory task provider shared between the host window and the panel.
#[derive(Debug, Default)]
pub struct TaskBoard {
    inputs: RefCell<RenderInputs>,
}

impl TaskBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> RenderInputs {
        self.inputs.borrow().clone()
    }

    pub fn set_goal(&self, goal: impl Into<String>) {
        let goal = goal.into();
        let goal = goal.trim();
        self.inputs.borrow_mut().goal = (!goal.is_empty()).then(|| goal.to_string());
    }

    pub fn set_loading(&self, is_loading: bool) {
        self.inputs.borrow_mut().is_loading = is_loading;
    }

    pub fn replace_tasks<I, T>(&self, instructions: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let tasks = instructions
            .into_iter()
            .map(Into::<String>::into)
            .filter(|instruction| !instruction.trim().is_empty())
            .enumerate()
            .map(|(index, instruction)| Task {
                id: index as u32 + 1,
                instruction,
                completed: false,
            })
            .collect();
        let mut inputs = self.inputs.borrow_mut();
        inputs.tasks = tasks;
        inputs.is_loading = false;
    }

    pub fn load(&self, guide: &Guide) {
        self.set_goal(guide.goal.clone());
        self.replace_tasks(guide.steps.iter().cloned());
        tracing::info!(
            goal = %guide.goal,
            steps = guide.steps.len(),
            "loaded guide into task board"
        );
    }

    /// Returns `true` when the task transitioned to completed.
    pub fn complete(&self, id: u32) -> bool {
        let mut inputs = self.inputs.borrow_mut();
        let Some(task) = inputs.tasks.iter_mut().find(|task| task.id == id) else {
            tracing::debug!(task_id = id, "complete requested for unknown task");
            return false;
        };
        if task.completed {
            return false;
        }
        task.completed = true;
        true
    }

    pub fn all_completed(&self) -> bool {
        self.inputs.borrow().all_completed()
    }

    pub fn reset(&self) {
        *self.inputs.borrow_mut() = RenderInputs::default();
        tracing::debug!("task board reset");
    }
}
