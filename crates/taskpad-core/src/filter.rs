//! Pure derivation over the task collection: the filtered view and the
//! distinct-tag listing. No side effects; safe to recompute on every read.

use std::collections::BTreeSet;

use crate::tasks::{PriorityFilter, StatusFilter, Task, TaskFilter};

/// The ordered subsequence of `tasks` matching every criterion in `filter`.
/// Collection order is preserved; the default filter returns the collection
/// unchanged.
pub fn filtered_tasks(tasks: &[Task], filter: &TaskFilter) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| matches(task, filter))
        .cloned()
        .collect()
}

fn matches(task: &Task, filter: &TaskFilter) -> bool {
    let matches_search = filter.search.is_empty() || {
        let needle = filter.search.to_lowercase();
        task.title.to_lowercase().contains(&needle)
            || task.description.to_lowercase().contains(&needle)
    };

    let matches_status = match filter.status {
        StatusFilter::All => true,
        StatusFilter::Is(status) => task.status == status,
    };

    let matches_priority = match filter.priority {
        PriorityFilter::All => true,
        PriorityFilter::Is(priority) => task.priority == priority,
    };

    let matches_tags =
        filter.tags.is_empty() || filter.tags.iter().any(|tag| task.tags.contains(tag));

    matches_search && matches_status && matches_priority && matches_tags
}

/// Every tag appearing on any task, deduplicated, ascending lexicographic.
pub fn all_tags(tasks: &[Task]) -> Vec<String> {
    let set: BTreeSet<&str> = tasks
        .iter()
        .flat_map(|task| task.tags.iter().map(String::as_str))
        .collect();
    set.into_iter().map(str::to_owned).collect()
}
