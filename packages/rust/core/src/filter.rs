//! Date filtering, checkpoint diffing, and the month histogram.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike};

use internscout_shared::{Posting, ProgressRecord};

/// Keep postings whose latest timestamp is at or after `cutoff`.
pub fn filter_by_date(postings: Vec<Posting>, cutoff: i64) -> Vec<Posting> {
    postings
        .into_iter()
        .filter(|p| p.latest_timestamp() >= cutoff)
        .collect()
}

/// Split off postings already recorded in `progress`.
///
/// Returns the postings still to process and how many were skipped.
pub fn remaining(postings: Vec<Posting>, progress: &ProgressRecord) -> (Vec<Posting>, usize) {
    let total = postings.len();
    let todo: Vec<Posting> = postings
        .into_iter()
        .filter(|p| !progress.is_processed(&p.id))
        .collect();
    let skipped = total - todo.len();
    (todo, skipped)
}

/// Per-month counts of latest timestamps, plus how many pass the cutoff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateReport {
    pub total: usize,
    /// `(year, month)` → postings whose latest timestamp falls in that month (UTC).
    pub by_month: BTreeMap<(i32, u32), usize>,
    /// Postings with no usable timestamp.
    pub undated: usize,
    pub passing: usize,
}

impl DateReport {
    pub fn build(postings: &[Posting], cutoff: i64) -> Self {
        let mut report = Self {
            total: postings.len(),
            ..Self::default()
        };

        for posting in postings {
            let latest = posting.latest_timestamp();
            match DateTime::from_timestamp(latest, 0).filter(|_| latest > 0) {
                Some(dt) => *report.by_month.entry((dt.year(), dt.month())).or_default() += 1,
                None => report.undated += 1,
            }
            if latest >= cutoff {
                report.passing += 1;
            }
        }
        report
    }

    /// Share of postings that pass the cutoff, in percent.
    pub fn passing_percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passing as f64 / self.total as f64 * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at(id: &str, posted: i64, updated: i64) -> Posting {
        Posting::from_feed_value(json!({
            "id": id, "date_posted": posted, "date_updated": updated
        }))
        .unwrap()
    }

    const CUTOFF: i64 = 1_746_057_600;

    #[test]
    fn boundary_is_inclusive() {
        let postings = vec![
            at("on", 0, CUTOFF),
            at("before", CUTOFF - 1, 0),
            at("after", CUTOFF + 1, 0),
        ];
        let kept: Vec<String> = filter_by_date(postings, CUTOFF)
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(kept, vec!["on", "after"]);
    }

    #[test]
    fn uses_latest_of_posted_and_updated() {
        let postings = vec![at("bumped", CUTOFF - 1000, CUTOFF + 5)];
        assert_eq!(filter_by_date(postings, CUTOFF).len(), 1);
    }

    #[test]
    fn remaining_subtracts_processed_ids() {
        let mut progress = ProgressRecord::default();
        progress.processed_ids.insert("b".into());

        let (todo, skipped) = remaining(vec![at("a", 1, 1), at("b", 1, 1), at("c", 1, 1)], &progress);
        let ids: Vec<&str> = todo.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(skipped, 1);
    }

    #[test]
    fn date_report_groups_by_month() {
        // 2025-04-30, 2025-05-01, 2025-05-20, undated
        let postings = vec![
            at("a", 1_746_000_000, 0),
            at("b", CUTOFF, 0),
            at("c", 1_747_700_000, 0),
            at("d", 0, 0),
        ];
        let report = DateReport::build(&postings, CUTOFF);

        assert_eq!(report.total, 4);
        assert_eq!(report.by_month.get(&(2025, 4)), Some(&1));
        assert_eq!(report.by_month.get(&(2025, 5)), Some(&2));
        assert_eq!(report.undated, 1);
        assert_eq!(report.passing, 2);
        assert!((report.passing_percent() - 50.0).abs() < f64::EPSILON);
    }
}
