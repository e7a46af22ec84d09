//! Merge ordering.
//!
//! A strict partial order deciding, between two mergeable tasks, which one
//! should survive. Criteria are evaluated lexicographically; the first one
//! that separates the tasks wins, and tasks no criterion separates are
//! incomparable.

use std::cmp::Ordering;

use synet_plan::TaskInstance;

/// Compares two merge candidates; `Greater` means `a` is the preferred
/// survivor, `None` that the tasks are incomparable.
pub fn merge_ordering(a: &TaskInstance, b: &TaskInstance) -> Option<Ordering> {
    let criteria = [
        // Prefer the task that is not finished.
        prefer(!a.is_finished(), !b.is_finished()),
        // Prefer the running task.
        prefer(a.is_running(), b.is_running()),
        // Prefer the task already bound to a deployment.
        prefer(a.execution_agent.is_some(), b.execution_agent.is_some()),
        // Prefer a real task over a data-service proxy.
        prefer(!a.model.is_proxy(), !b.model.is_proxy()),
        // Prefer the task with all arguments set.
        prefer(a.fully_instantiated(), b.fully_instantiated()),
        // Prefer a transaction proxy.
        prefer(a.transaction_proxy, b.transaction_proxy),
    ];
    criteria.into_iter().flatten().next()
}

fn prefer(a: bool, b: bool) -> Option<Ordering> {
    if a == b {
        None
    } else if a {
        Some(Ordering::Greater)
    } else {
        Some(Ordering::Less)
    }
}
