//! Reshapes upstream approval details into date-slots and leave batches.
//!
//! Slots key one calendar day (`"2026-2.14"`) or half-day
//! (`"2026-2.14 (AM)"`) per employee, rendered in the configured
//! timezone. A full day and a half day on the same date are distinct
//! slots on purpose.

use chrono::{Datelike, Timelike};
use chrono_tz::Tz;

use crate::models::{EmployeeInfo, LeaveBatch, LeaveStatus};
use crate::utils::time;
use crate::wecom::types::Vacation;
use crate::wecom::{ApprovalDetail, ApprovalPlatform};

/// Upstream duration marking a half-day slice.
const HALF_DAY_SECS: i64 = 43_200;

/// Placeholder for user and department names the upstream would not
/// resolve.
pub const UNKNOWN_NAME: &str = "未知";

fn full_day_slot(date: impl Datelike) -> String {
    format!("{}-{}.{}", date.year(), date.month(), date.day())
}

fn half_day_slot(date: impl Datelike, morning: bool) -> String {
    format!(
        "{}-{}.{} ({})",
        date.year(),
        date.month(),
        date.day(),
        if morning { "AM" } else { "PM" }
    )
}

/// Derives the date-slots covered by one vacation block.
///
/// Slice items win over the date range; a 43200-second slice is a
/// half-day, anything else a full day. Without slices the range is walked
/// one calendar day at a time.
pub fn generate_date_slots(vacation: &Vacation, tz: &Tz) -> Vec<String> {
    let Some(attendance) = vacation.attendance.as_ref() else {
        return Vec::new();
    };

    let mut slots = Vec::new();

    let day_items = attendance
        .slice_info
        .as_ref()
        .map(|slice| slice.day_items.as_slice())
        .unwrap_or_default();

    if !day_items.is_empty() {
        for item in day_items {
            let start = time::unix_to_local(item.daytime, tz);
            if item.duration == HALF_DAY_SECS {
                slots.push(half_day_slot(start.date_naive(), start.hour() < 12));
            } else {
                slots.push(full_day_slot(start.date_naive()));
            }
        }
    } else if let Some(range) = attendance.date_range.as_ref() {
        let begin = time::unix_to_local(range.new_begin, tz);
        let end = time::unix_to_local(range.new_end, tz);
        let half = range.kind == "halfday";
        let morning = begin.hour() < 12;

        let mut day = begin.date_naive();
        let last = end.date_naive();
        while day <= last {
            if half {
                slots.push(half_day_slot(day, morning));
            } else {
                slots.push(full_day_slot(day));
            }
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }
    }

    slots.dedup();
    slots
}

/// Slots for one approval detail, or an empty list when the detail has no
/// usable vacation block.
pub fn detail_slots(detail: &ApprovalDetail, tz: &Tz) -> Vec<String> {
    detail
        .vacation()
        .map(|vacation| generate_date_slots(vacation, tz))
        .unwrap_or_default()
}

/// Resolves the employee identity for a detail, falling back to the
/// placeholder name when upstream lookups fail.
pub async fn resolve_employee(platform: &dyn ApprovalPlatform, userid: &str) -> EmployeeInfo {
    let Some(profile) = platform.user(userid).await else {
        return EmployeeInfo {
            name: UNKNOWN_NAME.to_string(),
            department: UNKNOWN_NAME.to_string(),
        };
    };

    let dept_id = if profile.main_department != 0 {
        Some(profile.main_department)
    } else {
        profile.department_ids.first().copied()
    };

    let department = match dept_id {
        Some(id) => platform
            .department_name(id)
            .await
            .unwrap_or_else(|| UNKNOWN_NAME.to_string()),
        None => UNKNOWN_NAME.to_string(),
    };

    let name = if profile.name.is_empty() {
        UNKNOWN_NAME.to_string()
    } else {
        profile.name
    };

    EmployeeInfo { name, department }
}

/// Transforms a set of details into a mergeable batch. Details without a
/// known status, an applier, or any date-slot are skipped (logged, not an
/// error).
pub async fn build_batch(
    details: &[ApprovalDetail],
    platform: &dyn ApprovalPlatform,
    tz: &Tz,
) -> LeaveBatch {
    let mut batch = LeaveBatch::default();

    for detail in details {
        let Some(status) = LeaveStatus::from_code(detail.sp_status) else {
            tracing::debug!(sp_no = %detail.sp_no, code = detail.sp_status, "Skipping unknown status code");
            continue;
        };
        let Some(userid) = detail.applier_userid().map(str::to_string) else {
            tracing::debug!(sp_no = %detail.sp_no, "Skipping detail without applier");
            continue;
        };
        let slots = detail_slots(detail, tz);
        if slots.is_empty() {
            tracing::debug!(sp_no = %detail.sp_no, "Skipping detail without vacation dates");
            continue;
        }

        let slot_map = batch.leave_data.entry(userid.clone()).or_default();
        for slot in slots {
            // Within one batch the same merge rule applies: Approved is
            // never demoted by a Pending from another approval.
            match slot_map.get(&slot) {
                Some(LeaveStatus::Approved) if status == LeaveStatus::Pending => {}
                _ => {
                    slot_map.insert(slot, status);
                }
            }
        }

        if !batch.employee_info.contains_key(&userid) {
            let info = resolve_employee(platform, &userid).await;
            batch.employee_info.insert(userid, info);
        }
    }

    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::wecom::UserProfile;
    use async_trait::async_trait;
    use chrono_tz::Asia::Shanghai;

    fn vacation(json: serde_json::Value) -> Vacation {
        serde_json::from_value(json).unwrap()
    }

    // 2026-02-14 09:00 +08:00
    const FEB14_MORNING: i64 = 1_771_030_800;
    // 2026-02-14 14:00 +08:00
    const FEB14_AFTERNOON: i64 = 1_771_048_800;

    #[test]
    fn single_day_halfday_range_yields_one_half_slot() {
        let v = vacation(serde_json::json!({
            "attendance": {
                "date_range": {"type": "halfday", "new_begin": FEB14_MORNING, "new_end": FEB14_MORNING}
            }
        }));
        assert_eq!(generate_date_slots(&v, &Shanghai), vec!["2026-2.14 (AM)"]);

        let v = vacation(serde_json::json!({
            "attendance": {
                "date_range": {"type": "halfday", "new_begin": FEB14_AFTERNOON, "new_end": FEB14_AFTERNOON}
            }
        }));
        assert_eq!(generate_date_slots(&v, &Shanghai), vec!["2026-2.14 (PM)"]);
    }

    #[test]
    fn single_day_wholeday_range_yields_one_full_slot() {
        let v = vacation(serde_json::json!({
            "attendance": {
                "date_range": {"type": "wholeday", "new_begin": FEB14_MORNING, "new_end": FEB14_MORNING}
            }
        }));
        assert_eq!(generate_date_slots(&v, &Shanghai), vec!["2026-2.14"]);
    }

    #[test]
    fn multi_day_range_walks_calendar_days() {
        // 2026-02-27 09:00 through 2026-03-02 18:00 (+08:00)
        let begin = 1_772_154_000;
        let end = 1_772_445_600;
        let v = vacation(serde_json::json!({
            "attendance": {
                "date_range": {"type": "wholeday", "new_begin": begin, "new_end": end}
            }
        }));
        assert_eq!(
            generate_date_slots(&v, &Shanghai),
            vec!["2026-2.27", "2026-2.28", "2026-3.1", "2026-3.2"]
        );
    }

    #[test]
    fn slice_items_override_date_range() {
        let v = vacation(serde_json::json!({
            "attendance": {
                "date_range": {"type": "wholeday", "new_begin": FEB14_MORNING, "new_end": FEB14_MORNING},
                "slice_info": {"day_items": [
                    {"daytime": FEB14_MORNING, "duration": 43200},
                    {"daytime": FEB14_AFTERNOON + 86_400, "duration": 86400}
                ]}
            }
        }));
        assert_eq!(
            generate_date_slots(&v, &Shanghai),
            vec!["2026-2.14 (AM)", "2026-2.15"]
        );
    }

    #[test]
    fn missing_attendance_yields_no_slots() {
        let v = vacation(serde_json::json!({}));
        assert!(generate_date_slots(&v, &Shanghai).is_empty());
    }

    struct LookupPlatform;

    #[async_trait]
    impl ApprovalPlatform for LookupPlatform {
        async fn list_approval_numbers(
            &self,
            _start: i64,
            _end: i64,
        ) -> Result<Vec<String>, SyncError> {
            Ok(Vec::new())
        }

        async fn approval_detail(&self, _sp_no: &str) -> Result<ApprovalDetail, SyncError> {
            Err(SyncError::Api {
                code: -1,
                message: "not scripted".into(),
            })
        }

        async fn user(&self, userid: &str) -> Option<UserProfile> {
            (userid == "u1").then(|| UserProfile {
                name: "Alice".into(),
                department_ids: vec![7],
                main_department: 7,
            })
        }

        async fn department_name(&self, dept_id: i64) -> Option<String> {
            (dept_id == 7).then(|| "Eng".to_string())
        }
    }

    fn detail(sp_no: &str, status: i64, userid: &str) -> ApprovalDetail {
        serde_json::from_value(serde_json::json!({
            "sp_no": sp_no,
            "sp_status": status,
            "sp_name": "leave",
            "apply_time": FEB14_MORNING,
            "applier": {"userid": userid},
            "apply_data": {"contents": [{"value": {"vacation": {"attendance": {
                "date_range": {"type": "wholeday", "new_begin": FEB14_MORNING, "new_end": FEB14_MORNING}
            }}}}]}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn build_batch_resolves_employee_and_slots() {
        let details = vec![detail("A1", 1, "u1")];
        let batch = build_batch(&details, &LookupPlatform, &Shanghai).await;

        assert_eq!(
            batch.leave_data["u1"]["2026-2.14"],
            LeaveStatus::Pending
        );
        assert_eq!(
            batch.employee_info["u1"],
            EmployeeInfo {
                name: "Alice".into(),
                department: "Eng".into(),
            }
        );
    }

    #[tokio::test]
    async fn build_batch_falls_back_to_placeholder_identity() {
        let details = vec![detail("A1", 1, "ghost")];
        let batch = build_batch(&details, &LookupPlatform, &Shanghai).await;
        assert_eq!(
            batch.employee_info["ghost"],
            EmployeeInfo {
                name: UNKNOWN_NAME.into(),
                department: UNKNOWN_NAME.into(),
            }
        );
    }

    #[tokio::test]
    async fn build_batch_skips_unknown_status_and_missing_vacation() {
        let unknown_status = detail("A1", 5, "u1");
        let mut no_vacation = detail("A2", 1, "u1");
        no_vacation.apply_data = None;
        let batch = build_batch(&[unknown_status, no_vacation], &LookupPlatform, &Shanghai).await;
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn build_batch_keeps_approved_over_pending_within_batch() {
        let approved = detail("A1", 2, "u1");
        let pending = detail("A2", 1, "u1");
        let batch = build_batch(&[approved, pending], &LookupPlatform, &Shanghai).await;
        assert_eq!(
            batch.leave_data["u1"]["2026-2.14"],
            LeaveStatus::Approved
        );
    }
}
