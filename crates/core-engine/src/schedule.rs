//! Schedule model: ordered steps of unordered task sets.

use std::sync::Arc;

use crate::task::Task;

/// User-built schedule. Steps execute in order with a happens-before
/// barrier between them; tasks within one step carry no ordering.
#[derive(Debug, Default)]
pub struct Schedule {
    label: String,
    steps: Vec<Vec<Arc<Task>>>,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Append a step containing a single task.
    pub fn step_task(&mut self, task: Task) -> Arc<Task> {
        let task = Arc::new(task);
        self.steps.push(vec![task.clone()]);
        task
    }

    /// Append a step of tasks that may run concurrently.
    pub fn step_tasks(&mut self, tasks: Vec<Task>) -> Vec<Arc<Task>> {
        let tasks: Vec<Arc<Task>> = tasks.into_iter().map(Arc::new).collect();
        self.steps.push(tasks.clone());
        tasks
    }

    pub fn steps(&self) -> &[Vec<Arc<Task>>] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_storage::Vector;
    use core_types::functions::IDENTITY_INT;
    use core_types::INT;

    fn map_task() -> Task {
        Task::VMap {
            w: Vector::new(2, INT.clone()),
            a: Vector::new(2, INT.clone()),
            op: IDENTITY_INT.clone(),
        }
    }

    #[test]
    fn steps_preserve_append_order() {
        let mut schedule = Schedule::new();
        schedule.set_label("bfs iteration");
        schedule.step_task(map_task());
        schedule.step_tasks(vec![map_task(), map_task()]);
        assert_eq!(schedule.label(), "bfs iteration");
        assert_eq!(schedule.steps().len(), 2);
        assert_eq!(schedule.steps()[0].len(), 1);
        assert_eq!(schedule.steps()[1].len(), 2);
    }
}
