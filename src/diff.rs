//! Map-level diffing between task records, so a projection that produces an
//! unchanged record never reaches subscribers.

use serde_json::{Map, Value};

use crate::model::Task;

/// The submap of `new`'s fields whose keys either don't appear in `prev` or
/// map to a different value there. Not symmetric: `diff(a, b) != diff(b,
/// a)` in general.
pub fn diff_fields(prev: &Task, new: &Task) -> Map<String, Value> {
    let prev_value = serde_json::to_value(prev).expect("Task always serializes");
    let new_value = serde_json::to_value(new).expect("Task always serializes");

    let Value::Object(prev_map) = prev_value else { unreachable!("Task serializes to an object") };
    let Value::Object(new_map) = new_value else { unreachable!("Task serializes to an object") };

    let mut changed = Map::new();
    for (key, new_val) in new_map {
        match prev_map.get(&key) {
            Some(prev_val) if *prev_val == new_val => {}
            _ => {
                changed.insert(key, new_val);
            }
        }
    }
    changed
}

/// Whether projecting the same task twice produces a change. Used by the
/// upsert path to decide whether to emit/store/log at all.
pub fn has_changed(prev: &Task, new: &Task) -> bool {
    !diff_fields(prev, new).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Task, TaskId, TaskState};

    #[test]
    fn identical_tasks_diff_to_empty() {
        let t = Task::empty(TaskId::from("t1"));
        assert!(diff_fields(&t, &t).is_empty());
        assert!(!has_changed(&t, &t));
    }

    #[test]
    fn state_change_appears_in_diff() {
        let prev = Task::empty(TaskId::from("t1"));
        let mut next = prev.clone();
        next.state = TaskState::Running;
        let changed = diff_fields(&prev, &next);
        assert!(changed.contains_key("state"));
        assert!(!changed.contains_key("id"));
    }

    #[test]
    fn projection_idempotent_under_equal_input() {
        // Diffing a task against an identical copy of itself must be empty.
        let prev = Task::empty(TaskId::from("t1"));
        let reprojected = prev.clone();
        assert!(diff_fields(&prev, &reprojected).is_empty());
    }
}
