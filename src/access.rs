//! Authorization predicates.
//!
//! Everything here is a pure function of the acting worker and the target.
//! Authentication itself happens at the HTTP boundary; an actor reaching
//! these functions is always a logged-in worker.

use crate::types::{Task, Worker};

/// Any logged-in worker may view any worker's detail page.
pub fn can_view_worker_detail(_viewer: &Worker, _target: &Worker) -> bool {
    true
}

/// Staff may edit anyone; everyone else only themselves.
pub fn can_update_worker(viewer: &Worker, target: &Worker) -> bool {
    viewer.is_staff || viewer == target
}

pub fn can_delete_worker(viewer: &Worker) -> bool {
    viewer.is_staff
}

/// Only assignees may mark a task complete.
pub fn can_complete_task(worker: &Worker, task: &Task) -> bool {
    task.is_assignee(worker.id)
}

pub fn can_manage_positions(viewer: &Worker) -> bool {
    viewer.is_staff
}

pub fn can_search_tasks(viewer: &Worker) -> bool {
    viewer.is_staff
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Priority, TaskType};
    use chrono::NaiveDate;

    fn worker(id: i64, is_staff: bool) -> Worker {
        Worker {
            id,
            username: format!("user{}", id),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            is_staff,
            position: None,
            date_joined: 0,
        }
    }

    fn task_assigned_to(worker: &Worker) -> Task {
        Task {
            id: 1,
            name: "Fix bug".into(),
            description: String::new(),
            deadline: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            is_completed: false,
            priority: Priority::High,
            task_type: TaskType {
                id: 1,
                name: "Bug".into(),
            },
            created_by: None,
            assignees: vec![worker.summary()],
            created_at: 0,
        }
    }

    #[test]
    fn update_worker_requires_staff_or_self() {
        let staff = worker(1, true);
        let alice = worker(2, false);
        let bob = worker(3, false);

        assert!(can_update_worker(&staff, &alice));
        assert!(can_update_worker(&alice, &alice));
        assert!(!can_update_worker(&alice, &bob));
        assert!(can_update_worker(&staff, &staff));
    }

    #[test]
    fn self_match_is_by_id() {
        let alice = worker(2, false);
        let mut renamed = alice.clone();
        renamed.username = "alice2".into();
        assert!(can_update_worker(&alice, &renamed));
    }

    #[test]
    fn delete_and_positions_are_staff_only() {
        assert!(can_delete_worker(&worker(1, true)));
        assert!(!can_delete_worker(&worker(2, false)));
        assert!(can_manage_positions(&worker(1, true)));
        assert!(!can_manage_positions(&worker(2, false)));
        assert!(can_search_tasks(&worker(1, true)));
        assert!(!can_search_tasks(&worker(2, false)));
    }

    #[test]
    fn any_worker_views_details() {
        assert!(can_view_worker_detail(&worker(2, false), &worker(3, false)));
    }

    #[test]
    fn only_assignees_complete() {
        let alice = worker(2, false);
        let bob = worker(3, false);
        let task = task_assigned_to(&alice);
        assert!(can_complete_task(&alice, &task));
        assert!(!can_complete_task(&bob, &task));
        // staff get no special rights here
        assert!(!can_complete_task(&worker(1, true), &task));
    }
}
