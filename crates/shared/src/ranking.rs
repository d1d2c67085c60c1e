use std::cmp::Reverse;

use crate::models::SummaryResult;

/// Order by score, highest first. Equal scores keep their input order.
pub fn rank(mut results: Vec<SummaryResult>) -> Vec<SummaryResult> {
    // sort_by_key is stable
    results.sort_by_key(|r| Reverse(r.score));
    results
}
