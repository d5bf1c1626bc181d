//! Shared fixtures: a scripted approval platform, a service builder over
//! temp-dir stores, and a test configuration.

#![allow(dead_code)] // Each integration test includes only what it needs.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};

use leavesync_backend::error::SyncError;
use leavesync_backend::store::{ActiveIndexStore, CursorStore, LeaveStore};
use leavesync_backend::sync::SyncService;
use leavesync_backend::wecom::{ApprovalDetail, ApprovalPlatform, UserProfile};

/// 2026-02-14 09:00 +08:00.
pub const FEB14_MORNING: i64 = 1_771_030_800;
/// 2026-03-01 09:00 +08:00.
pub const MAR1_MORNING: i64 = 1_772_326_800;

/// Scripted stand-in for the upstream platform.
///
/// Detail fetches serve the current entry for the approval number; list
/// calls pop scripted results (and are recorded), defaulting to an empty
/// page.
#[derive(Default)]
pub struct FakePlatform {
    details: Mutex<HashMap<String, ApprovalDetail>>,
    detail_calls: Mutex<HashMap<String, usize>>,
    list_script: Mutex<VecDeque<Result<Vec<String>, SyncError>>>,
    list_calls: Mutex<Vec<(i64, i64)>>,
    users: Mutex<HashMap<String, UserProfile>>,
    departments: Mutex<HashMap<i64, String>>,
}

impl FakePlatform {
    pub fn new() -> Arc<Self> {
        let platform = Arc::new(Self::default());
        platform.add_user("u1", "Alice", 7);
        platform.add_department(7, "Eng");
        platform
    }

    pub fn add_user(&self, userid: &str, name: &str, dept: i64) {
        self.users.lock().unwrap().insert(
            userid.to_string(),
            UserProfile {
                name: name.to_string(),
                department_ids: vec![dept],
                main_department: dept,
            },
        );
    }

    pub fn add_department(&self, id: i64, name: &str) {
        self.departments.lock().unwrap().insert(id, name.to_string());
    }

    /// Sets (or replaces) the detail served for an approval number.
    pub fn set_detail(&self, detail: ApprovalDetail) {
        self.details
            .lock()
            .unwrap()
            .insert(detail.sp_no.clone(), detail);
    }

    pub fn push_list(&self, result: Result<Vec<String>, SyncError>) {
        self.list_script.lock().unwrap().push_back(result);
    }

    pub fn list_calls(&self) -> Vec<(i64, i64)> {
        self.list_calls.lock().unwrap().clone()
    }

    pub fn detail_calls(&self, sp_no: &str) -> usize {
        self.detail_calls
            .lock()
            .unwrap()
            .get(sp_no)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl ApprovalPlatform for FakePlatform {
    async fn list_approval_numbers(&self, start: i64, end: i64) -> Result<Vec<String>, SyncError> {
        self.list_calls.lock().unwrap().push((start, end));
        match self.list_script.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok(Vec::new()),
        }
    }

    async fn approval_detail(&self, sp_no: &str) -> Result<ApprovalDetail, SyncError> {
        *self
            .detail_calls
            .lock()
            .unwrap()
            .entry(sp_no.to_string())
            .or_insert(0) += 1;
        self.details
            .lock()
            .unwrap()
            .get(sp_no)
            .cloned()
            .ok_or_else(|| SyncError::Api {
                code: 301025,
                message: format!("no detail scripted for {}", sp_no),
            })
    }

    async fn user(&self, userid: &str) -> Option<UserProfile> {
        self.users.lock().unwrap().get(userid).cloned()
    }

    async fn department_name(&self, dept_id: i64) -> Option<String> {
        self.departments.lock().unwrap().get(&dept_id).cloned()
    }
}

/// A full-day approval detail covering `[begin, end]`.
pub fn detail(sp_no: &str, status: i64, userid: &str, begin: i64, end: i64) -> ApprovalDetail {
    serde_json::from_value(serde_json::json!({
        "sp_no": sp_no,
        "sp_status": status,
        "sp_name": "leave",
        "apply_time": begin,
        "applier": {"userid": userid},
        "apply_data": {"contents": [{"value": {"vacation": {"attendance": {
            "date_range": {"type": "wholeday", "new_begin": begin, "new_end": end}
        }}}}]}
    }))
    .unwrap()
}

pub const TEST_AES_KEY: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQ";
pub const TEST_TOKEN: &str = "test-callback-token";
pub const TEST_CORP_ID: &str = "wx_test_corp";

/// A configuration pointing at temp-dir stores, with callback credentials
/// set.
pub fn test_config(dir: &Path) -> leavesync_backend::config::Config {
    use std::str::FromStr;

    leavesync_backend::config::Config {
        corp_id: TEST_CORP_ID.to_string(),
        corp_secret: "secret".to_string(),
        callback_token: Some(TEST_TOKEN.to_string()),
        callback_aes_key: Some(TEST_AES_KEY.to_string()),
        api_base: "http://localhost:1".to_string(),
        data_dir: dir.to_path_buf(),
        sync_interval: cron::Schedule::from_str("0 */5 * * * *").unwrap(),
        auto_sync_enabled: false,
        status_check_interval: cron::Schedule::from_str("0 */5 * * * *").unwrap(),
        status_check_enabled: false,
        sync_baseline_timestamp: 0,
        active_cutoff_timestamp: 0,
        time_zone: chrono_tz::Asia::Shanghai,
        bind_addr: "127.0.0.1:0".parse().unwrap(),
    }
}

/// Percent-encodes the characters base64 can put into a query value.
pub fn query_encode(raw: &str) -> String {
    raw.replace('%', "%25")
        .replace('+', "%2B")
        .replace('/', "%2F")
        .replace('=', "%3D")
}

/// Builds a service over stores rooted in `dir`, with cursor baseline and
/// active-index cutoff both set to `baseline`.
pub fn service_at(platform: Arc<FakePlatform>, dir: &Path, baseline: i64) -> Arc<SyncService> {
    Arc::new(SyncService::new(
        platform,
        LeaveStore::new(dir.join("leave_data.json")),
        ActiveIndexStore::new(dir.join("active_approvals.json"), baseline),
        CursorStore::new(dir.join("sync_cursor.json"), baseline),
        chrono_tz::Asia::Shanghai,
    ))
}
