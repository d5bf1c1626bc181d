//! Idempotent merge of an incoming batch into the leave document.

use crate::models::{LeaveBatch, LeaveDocument, LeaveStatus};

/// Counters returned for logging.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeStats {
    pub new_employees: usize,
    pub updated_employees: usize,
}

/// Applies `incoming` to `current` under the merge rule: employee info is
/// always overwritten (upstream wins); per slot, an incoming Approved
/// always wins, an incoming Pending never demotes an existing Approved,
/// and every other incoming status overwrites.
///
/// Processing the same batch twice leaves the document unchanged.
pub fn merge_batch(current: &mut LeaveDocument, incoming: &LeaveBatch) -> MergeStats {
    let mut stats = MergeStats::default();

    for (userid, info) in &incoming.employee_info {
        if current.employee_info.contains_key(userid) {
            stats.updated_employees += 1;
        } else {
            stats.new_employees += 1;
        }
        current.employee_info.insert(userid.clone(), info.clone());
    }

    for (userid, slots) in &incoming.leave_data {
        for (slot, status) in slots {
            let existing = current.slot_status(userid, slot);
            let keep_existing = *status == LeaveStatus::Pending
                && existing == Some(LeaveStatus::Approved.text());
            if !keep_existing {
                current.set_slot(userid, slot, status.text());
            }
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EmployeeInfo;

    fn batch_with(userid: &str, slot: &str, status: LeaveStatus) -> LeaveBatch {
        let mut batch = LeaveBatch::default();
        batch
            .leave_data
            .entry(userid.to_string())
            .or_default()
            .insert(slot.to_string(), status);
        batch.employee_info.insert(
            userid.to_string(),
            EmployeeInfo {
                name: "Alice".into(),
                department: "Eng".into(),
            },
        );
        batch
    }

    #[test]
    fn first_observation_sets_slot() {
        let mut doc = LeaveDocument::default();
        let stats = merge_batch(&mut doc, &batch_with("u1", "2026-3.1", LeaveStatus::Pending));
        assert_eq!(doc.slot_status("u1", "2026-3.1"), Some("Pending"));
        assert_eq!(stats.new_employees, 1);
        assert_eq!(stats.updated_employees, 0);
    }

    #[test]
    fn approved_always_wins() {
        let mut doc = LeaveDocument::default();
        merge_batch(&mut doc, &batch_with("u1", "2026-3.1", LeaveStatus::Rejected));
        merge_batch(&mut doc, &batch_with("u1", "2026-3.1", LeaveStatus::Approved));
        assert_eq!(doc.slot_status("u1", "2026-3.1"), Some("Approved"));
    }

    #[test]
    fn pending_never_demotes_approved() {
        let mut doc = LeaveDocument::default();
        merge_batch(&mut doc, &batch_with("u1", "2026-3.1", LeaveStatus::Approved));
        merge_batch(&mut doc, &batch_with("u1", "2026-3.1", LeaveStatus::Pending));
        assert_eq!(doc.slot_status("u1", "2026-3.1"), Some("Approved"));
    }

    #[test]
    fn other_statuses_overwrite() {
        let mut doc = LeaveDocument::default();
        merge_batch(&mut doc, &batch_with("u1", "2026-3.1", LeaveStatus::Approved));
        merge_batch(&mut doc, &batch_with("u1", "2026-3.1", LeaveStatus::Withdrawn));
        assert_eq!(doc.slot_status("u1", "2026-3.1"), Some("Withdrawn"));

        merge_batch(&mut doc, &batch_with("u1", "2026-3.1", LeaveStatus::Pending));
        assert_eq!(doc.slot_status("u1", "2026-3.1"), Some("Pending"));
    }

    #[test]
    fn merge_is_idempotent() {
        let mut once = LeaveDocument::default();
        let batch = batch_with("u1", "2026-3.1", LeaveStatus::Approved);
        merge_batch(&mut once, &batch);

        let mut thrice = LeaveDocument::default();
        for _ in 0..3 {
            merge_batch(&mut thrice, &batch);
        }
        assert_eq!(once, thrice);
    }

    #[test]
    fn employee_info_is_overwritten_by_upstream() {
        let mut doc = LeaveDocument::default();
        merge_batch(&mut doc, &batch_with("u1", "2026-3.1", LeaveStatus::Pending));

        let mut renamed = batch_with("u1", "2026-3.2", LeaveStatus::Pending);
        renamed.employee_info.insert(
            "u1".into(),
            EmployeeInfo {
                name: "Alice L".into(),
                department: "Platform".into(),
            },
        );
        let stats = merge_batch(&mut doc, &renamed);
        assert_eq!(stats.updated_employees, 1);
        assert_eq!(doc.employee_info["u1"].name, "Alice L");
        assert_eq!(doc.employee_info["u1"].department, "Platform");
    }

    #[test]
    fn half_and_full_day_are_distinct_slots() {
        let mut doc = LeaveDocument::default();
        merge_batch(&mut doc, &batch_with("u1", "2026-3.1", LeaveStatus::Approved));
        merge_batch(&mut doc, &batch_with("u1", "2026-3.1 (AM)", LeaveStatus::Pending));
        assert_eq!(doc.slot_status("u1", "2026-3.1"), Some("Approved"));
        assert_eq!(doc.slot_status("u1", "2026-3.1 (AM)"), Some("Pending"));
    }
}
