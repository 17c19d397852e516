use crate::store::{Priority, Task, TaskStatus};

/// Fixed, deterministic board contents for demonstration without any live
/// dependency. Same tasks, same ids, every call.
pub fn demo_board() -> (Vec<Task>, String) {
    let goal = "Build a REST API for a recipe sharing app".to_string();
    let seeds = [
        (
            "demo-1",
            "Design the data model",
            "Recipes, ingredients, users, and their relations",
            Priority::High,
        ),
        (
            "demo-2",
            "Scaffold the service",
            "Project layout, routing, configuration, health endpoint",
            Priority::High,
        ),
        (
            "demo-3",
            "Implement recipe CRUD",
            "Create, read, update, delete with validation",
            Priority::Medium,
        ),
        (
            "demo-4",
            "Add search and filtering",
            "Full-text search over titles and ingredient filters",
            Priority::Medium,
        ),
        (
            "demo-5",
            "Write the API docs",
            "Endpoint reference with request and response examples",
            Priority::Low,
        ),
    ];
    let tasks = seeds
        .into_iter()
        .map(|(id, title, description, priority)| Task {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            priority,
            status: TaskStatus::Pending,
            progress: 0,
            log: Vec::new(),
            files_changed: Vec::new(),
        })
        .collect();
    (tasks, goal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_board_is_deterministic() {
        let (a, goal_a) = demo_board();
        let (b, goal_b) = demo_board();
        assert_eq!(goal_a, goal_b);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.id, y.id);
            assert_eq!(x.title, y.title);
        }
    }

    #[test]
    fn test_demo_tasks_start_pending() {
        let (tasks, _) = demo_board();
        assert!(!tasks.is_empty());
        for t in tasks {
            assert_eq!(t.status, TaskStatus::Pending);
            assert_eq!(t.progress, 0);
            assert!(t.log.is_empty());
        }
    }
}
