use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Upstream approval status codes and their store text.
///
/// Everything except `Pending` is terminal: once observed, the approval
/// leaves the active index and its date-slots carry the final text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Withdrawn,
    RevokedAfterApproval,
    Deleted,
    Paid,
}

impl LeaveStatus {
    /// Maps an upstream `sp_status` code; unknown codes yield `None` and
    /// the caller skips the record.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(LeaveStatus::Pending),
            2 => Some(LeaveStatus::Approved),
            3 => Some(LeaveStatus::Rejected),
            4 => Some(LeaveStatus::Withdrawn),
            6 => Some(LeaveStatus::RevokedAfterApproval),
            7 => Some(LeaveStatus::Deleted),
            10 => Some(LeaveStatus::Paid),
            _ => None,
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            LeaveStatus::Pending => 1,
            LeaveStatus::Approved => 2,
            LeaveStatus::Rejected => 3,
            LeaveStatus::Withdrawn => 4,
            LeaveStatus::RevokedAfterApproval => 6,
            LeaveStatus::Deleted => 7,
            LeaveStatus::Paid => 10,
        }
    }

    /// The text written into the leave document for this status.
    pub fn text(&self) -> &'static str {
        match self {
            LeaveStatus::Pending => "Pending",
            LeaveStatus::Approved => "Approved",
            LeaveStatus::Rejected => "Rejected",
            LeaveStatus::Withdrawn => "Withdrawn",
            LeaveStatus::RevokedAfterApproval => "RevokedAfterApproval",
            LeaveStatus::Deleted => "Deleted",
            LeaveStatus::Paid => "Paid",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, LeaveStatus::Pending)
    }
}

/// Employee identity attached to the leave document; upstream wins on
/// every new appearance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EmployeeInfo {
    pub name: String,
    pub department: String,
}

/// The single persisted leave document.
///
/// `leave_data` maps `userid -> date-slot -> status text`; a full day and
/// a half day on the same calendar date are distinct slots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LeaveDocument {
    #[serde(rename = "leaveData", default)]
    pub leave_data: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(rename = "employeeInfo", default)]
    pub employee_info: BTreeMap<String, EmployeeInfo>,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: String,
}

impl LeaveDocument {
    pub fn slot_status(&self, userid: &str, slot: &str) -> Option<&str> {
        self.leave_data
            .get(userid)
            .and_then(|slots| slots.get(slot))
            .map(String::as_str)
    }

    pub fn set_slot(&mut self, userid: &str, slot: &str, status_text: &str) {
        self.leave_data
            .entry(userid.to_string())
            .or_default()
            .insert(slot.to_string(), status_text.to_string());
    }
}

/// An incoming batch produced by transforming upstream approval details,
/// not yet merged into the store.
#[derive(Debug, Clone, Default)]
pub struct LeaveBatch {
    pub leave_data: BTreeMap<String, BTreeMap<String, LeaveStatus>>,
    pub employee_info: BTreeMap<String, EmployeeInfo>,
}

impl LeaveBatch {
    pub fn is_empty(&self) -> bool {
        self.leave_data.is_empty() && self.employee_info.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_code_round_trip() {
        for code in [1, 2, 3, 4, 6, 7, 10] {
            let status = LeaveStatus::from_code(code).expect("known code");
            assert_eq!(status.code(), code);
        }
        assert!(LeaveStatus::from_code(5).is_none());
        assert!(LeaveStatus::from_code(0).is_none());
        assert!(LeaveStatus::from_code(11).is_none());
    }

    #[test]
    fn only_pending_is_non_terminal() {
        assert!(!LeaveStatus::Pending.is_terminal());
        for status in [
            LeaveStatus::Approved,
            LeaveStatus::Rejected,
            LeaveStatus::Withdrawn,
            LeaveStatus::RevokedAfterApproval,
            LeaveStatus::Deleted,
            LeaveStatus::Paid,
        ] {
            assert!(status.is_terminal());
        }
    }

    #[test]
    fn document_serializes_with_camel_case_keys() {
        let mut doc = LeaveDocument::default();
        doc.set_slot("u1", "2026-2.14", "Pending");
        doc.employee_info.insert(
            "u1".into(),
            EmployeeInfo {
                name: "Alice".into(),
                department: "Eng".into(),
            },
        );
        doc.updated_at = "2026-02-14T00:00:00+00:00".into();

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["leaveData"]["u1"]["2026-2.14"], "Pending");
        assert_eq!(value["employeeInfo"]["u1"]["name"], "Alice");
        assert!(value["updatedAt"].is_string());
    }
}
