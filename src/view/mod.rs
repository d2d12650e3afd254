use crate::tasks::{RenderInputs, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewAction {
    StartOver,
    CompleteTask(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewNode {
    Column {
        class: &'static str,
        children: Vec<ViewNode>,
    },
    Row {
        class: &'static str,
        children: Vec<ViewNode>,
    },
    Text {
        class: &'static str,
        text: String,
    },
    Button {
        class: &'static str,
        label: String,
        action: ViewAction,
    },
    Spinner,
}

impl ViewNode {
    pub fn text(class: &'static str, text: impl Into<String>) -> Self {
        ViewNode::Text {
            class,
            text: text.into(),
        }
    }

    pub fn button(class: &'static str, label: impl Into<String>, action: ViewAction) -> Self {
        ViewNode::Button {
            class,
            label: label.into(),
            action,
        }
    }

    pub fn children(&self) -> &[ViewNode] {
        match self {
            ViewNode::Column { children, .. } | ViewNode::Row { children, .. } => children,
            _ => &[],
        }
    }

    /// Depth-first search for the first node matching `predicate`.
    pub fn find(&self, predicate: &dyn Fn(&ViewNode) -> bool) -> Option<&ViewNode> {
        if predicate(self) {
            return Some(self);
        }
        self.children()
            .iter()
            .find_map(|child| child.find(predicate))
    }

    pub fn actions(&self) -> Vec<ViewAction> {
        let mut actions = Vec::new();
        self.collect_actions(&mut actions);
        actions
    }

    fn collect_actions(&self, out: &mut Vec<ViewAction>) {
        if let ViewNode::Button { action, .. } = self {
            out.push(*action);
        }
        for child in self.children() {
            child.collect_actions(out);
        }
    }
}

/// Pure function from the current task state to a widget tree.
pub trait ContentRenderer {
    fn render(&self, inputs: &RenderInputs) -> ViewNode;
}

impl<F> ContentRenderer for F
where
    F: Fn(&RenderInputs) -> ViewNode,
{
    fn render(&self, inputs: &RenderInputs) -> ViewNode {
        self(inputs)
    }
}

const GOAL_HINT: &str = "Follow the steps below. The panel stays on top while you work.";
const LOADING_LABEL: &str = "Working out the next steps…";
const EMPTY_LABEL: &str = "No steps yet. Set a goal in the main window.";
const COMPLETED_LABEL: &str = "All steps complete. Nice work!";

#[derive(Debug, Clone, Copy, Default)]
pub struct TaskScreen;

impl TaskScreen {
    fn task_row(task: &Task, is_next: bool) -> ViewNode {
        let marker = if task.completed { "✓" } else { "•" };
        let class = if task.completed {
            "task-step done"
        } else if is_next {
            "task-step current"
        } else {
            "task-step"
        };
        let mut children = vec![
            ViewNode::text("task-marker", marker),
            ViewNode::text("task-instruction", task.instruction.clone()),
        ];
        if is_next {
            children.push(ViewNode::button(
                "task-done-button",
                "Done",
                ViewAction::CompleteTask(task.id),
            ));
        }
        ViewNode::Row { class, children }
    }
}

impl ContentRenderer for TaskScreen {
    fn render(&self, inputs: &RenderInputs) -> ViewNode {
        let mut children = Vec::new();

        if let Some(goal) = inputs.goal.as_deref() {
            children.push(ViewNode::text("task-goal", goal));
            children.push(ViewNode::text("task-hint", GOAL_HINT));
        }

        let next_id = inputs.next_pending().map(|task| task.id);
        let steps = inputs
            .tasks
            .iter()
            .map(|task| Self::task_row(task, !inputs.is_loading && Some(task.id) == next_id))
            .collect::<Vec<_>>();

        if inputs.is_loading {
            children.push(ViewNode::Row {
                class: "task-loading",
                children: vec![ViewNode::Spinner, ViewNode::text("task-hint", LOADING_LABEL)],
            });
        } else if steps.is_empty() {
            children.push(ViewNode::text("task-hint", EMPTY_LABEL));
        }

        if !steps.is_empty() {
            children.push(ViewNode::Column {
                class: "task-steps",
                children: steps,
            });
        }

        if inputs.all_completed() {
            children.push(ViewNode::text("task-complete", COMPLETED_LABEL));
        }

        children.push(ViewNode::button(
            "task-start-over",
            "Start over",
            ViewAction::StartOver,
        ));

        ViewNode::Column {
            class: "task-screen",
            children,
        }
    }
}
