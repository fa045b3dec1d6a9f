//! Completion progress metrics.

use crate::model::task::Task;

/// Completed/total counts with a whole-number percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub completed_count: usize,
    pub total: usize,
    /// `0..=100`, rounded half-up.
    pub percent: u8,
}

/// Computes progress over the whole collection.
///
/// Empty collections report `0%`.
pub fn progress(tasks: &[Task]) -> Progress {
    let total = tasks.len();
    let completed_count = tasks.iter().filter(|task| task.completed).count();
    Progress {
        completed_count,
        total,
        percent: percent_half_up(completed_count, total),
    }
}

fn percent_half_up(part: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    // round(100 * part / total) with .5 rounding up, in integers.
    let scaled = (200 * part + total) / (2 * total);
    u8::try_from(scaled.min(100)).unwrap_or(100)
}
