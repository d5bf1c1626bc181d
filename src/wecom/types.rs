//! Wire types for the approval platform's JSON responses. Only the fields
//! the sync engine reads are modeled; everything else is ignored.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: String,
    pub access_token: Option<String>,
    pub expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ApprovalListResponse {
    #[serde(default)]
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: String,
    #[serde(default)]
    pub sp_no_list: Vec<String>,
    pub next_cursor: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ApprovalDetailResponse {
    #[serde(default)]
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: String,
    pub info: Option<ApprovalDetail>,
}

/// The `info` object of an approval detail. Opaque to us except for the
/// identity, status, and vacation fields.
#[derive(Debug, Clone, Deserialize)]
pub struct ApprovalDetail {
    pub sp_no: String,
    #[serde(default)]
    pub sp_status: i64,
    #[serde(default)]
    pub sp_name: String,
    #[serde(default)]
    pub apply_time: i64,
    // The upstream mixes both spellings; accept either.
    #[serde(alias = "applyer")]
    pub applier: Option<Applier>,
    pub apply_data: Option<ApplyData>,
}

impl ApprovalDetail {
    pub fn applier_userid(&self) -> Option<&str> {
        self.applier
            .as_ref()
            .map(|a| a.userid.as_str())
            .filter(|id| !id.is_empty())
    }

    /// The first content entry carrying a vacation block, if any.
    pub fn vacation(&self) -> Option<&Vacation> {
        self.apply_data
            .as_ref()?
            .contents
            .iter()
            .find_map(|content| content.value.as_ref()?.vacation.as_ref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Applier {
    #[serde(default)]
    pub userid: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplyData {
    #[serde(default)]
    pub contents: Vec<ApplyContent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplyContent {
    pub value: Option<ContentValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentValue {
    pub vacation: Option<Vacation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Vacation {
    pub attendance: Option<Attendance>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Attendance {
    pub date_range: Option<DateRange>,
    pub slice_info: Option<SliceInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DateRange {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub new_begin: i64,
    #[serde(default)]
    pub new_end: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SliceInfo {
    #[serde(default)]
    pub day_items: Vec<DayItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DayItem {
    #[serde(default)]
    pub daytime: i64,
    #[serde(default)]
    pub duration: i64,
}

#[derive(Debug, Deserialize)]
pub struct UserResponse {
    #[serde(default)]
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub department: Vec<i64>,
    #[serde(default)]
    pub main_department: i64,
}

/// Cached identity of one upstream user.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub name: String,
    pub department_ids: Vec<i64>,
    pub main_department: i64,
}

#[derive(Debug, Deserialize)]
pub struct DepartmentListResponse {
    #[serde(default)]
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: String,
    #[serde(default)]
    pub department: Vec<DepartmentInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DepartmentInfo {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}
