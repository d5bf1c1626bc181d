use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::error::SyncError;
use crate::wecom::types::{
    ApprovalDetail, ApprovalDetailResponse, ApprovalListResponse, DepartmentListResponse,
    TokenResponse, UserProfile, UserResponse,
};
use crate::wecom::{ApprovalPlatform, MAX_WINDOW_SECS};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Re-issue the token once less than this much lifetime remains.
const TOKEN_MARGIN: Duration = Duration::from_secs(300);
const PAGE_SIZE: i64 = 100;
const PAGE_PAUSE: Duration = Duration::from_millis(200);
/// Upstream record-type filter code for leave approvals.
const RECORD_TYPE_LEAVE: &str = "1";

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Token-cached HTTPS client for the approval platform.
///
/// The user and department maps are process-lifetime caches; a racy
/// double-fetch only costs one redundant request.
pub struct WecomClient {
    http: Client,
    base: String,
    corp_id: String,
    secret: String,
    token: RwLock<Option<CachedToken>>,
    users: RwLock<HashMap<String, UserProfile>>,
    departments: RwLock<HashMap<i64, String>>,
}

impl WecomClient {
    pub fn new(base: &str, corp_id: &str, secret: &str) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("leavesync-backend/0.1")
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to initialize HTTP client: {}", e))?;

        Ok(Self {
            http,
            base: base.trim_end_matches('/').to_string(),
            corp_id: corp_id.to_string(),
            secret: secret.to_string(),
            token: RwLock::new(None),
            users: RwLock::new(HashMap::new()),
            departments: RwLock::new(HashMap::new()),
        })
    }

    /// Returns a cached access token, re-issuing once less than five
    /// minutes of lifetime remain.
    pub async fn token(&self) -> Result<String, SyncError> {
        {
            let guard = self.token.read().await;
            if let Some(cached) = guard.as_ref() {
                if cached.expires_at.saturating_duration_since(Instant::now()) > TOKEN_MARGIN {
                    return Ok(cached.value.clone());
                }
            }
        }

        let url = format!(
            "{}/gettoken?corpid={}&corpsecret={}",
            self.base, self.corp_id, self.secret
        );
        let response: TokenResponse = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(request_error)?
            .json()
            .await
            .map_err(request_error)?;

        if response.errcode != 0 {
            return Err(SyncError::Auth {
                code: response.errcode,
                message: response.errmsg,
            });
        }
        let value = response.access_token.ok_or_else(|| SyncError::Auth {
            code: response.errcode,
            message: "token response missing access_token".to_string(),
        })?;
        let ttl = Duration::from_secs(response.expires_in.unwrap_or(7200).max(0) as u64);

        let mut guard = self.token.write().await;
        *guard = Some(CachedToken {
            value: value.clone(),
            expires_at: Instant::now() + ttl,
        });
        Ok(value)
    }
}

fn request_error(err: reqwest::Error) -> SyncError {
    SyncError::Api {
        code: -1,
        message: err.to_string(),
    }
}

fn application_error(code: i64, message: String) -> SyncError {
    if code == 45009 {
        SyncError::RateLimited { attempts: 1 }
    } else {
        SyncError::Api { code, message }
    }
}

#[async_trait]
impl ApprovalPlatform for WecomClient {
    async fn list_approval_numbers(&self, start: i64, end: i64) -> Result<Vec<String>, SyncError> {
        if end < start {
            return Err(SyncError::Range(format!(
                "window end {} precedes start {}",
                end, start
            )));
        }
        if end - start > MAX_WINDOW_SECS {
            return Err(SyncError::Range(format!(
                "window of {} seconds exceeds the 31-day cap",
                end - start
            )));
        }

        let token = self.token().await?;
        let url = format!("{}/oa/getapprovalinfo?access_token={}", self.base, token);

        let mut sp_nos = Vec::new();
        let mut cursor: i64 = 0;
        loop {
            let body = serde_json::json!({
                "starttime": start.to_string(),
                "endtime": end.to_string(),
                "cursor": cursor,
                "size": PAGE_SIZE,
                "filters": [{"key": "record_type", "value": RECORD_TYPE_LEAVE}],
            });
            let response: ApprovalListResponse = self
                .http
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(request_error)?
                .json()
                .await
                .map_err(request_error)?;

            if response.errcode != 0 {
                return Err(application_error(response.errcode, response.errmsg));
            }

            let page_len = response.sp_no_list.len();
            sp_nos.extend(response.sp_no_list);

            match response.next_cursor {
                Some(next) if next > 0 && page_len > 0 => {
                    cursor = next;
                    tokio::time::sleep(PAGE_PAUSE).await;
                }
                _ => break,
            }
        }

        tracing::debug!(start, end, count = sp_nos.len(), "Listed approval numbers");
        Ok(sp_nos)
    }

    async fn approval_detail(&self, sp_no: &str) -> Result<ApprovalDetail, SyncError> {
        let token = self.token().await?;
        let url = format!("{}/oa/getapprovaldetail?access_token={}", self.base, token);

        let response: ApprovalDetailResponse = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "sp_no": sp_no }))
            .send()
            .await
            .map_err(request_error)?
            .json()
            .await
            .map_err(request_error)?;

        if response.errcode != 0 {
            return Err(application_error(response.errcode, response.errmsg));
        }
        response.info.ok_or_else(|| SyncError::Api {
            code: 0,
            message: format!("detail response for {} missing info", sp_no),
        })
    }

    async fn user(&self, userid: &str) -> Option<UserProfile> {
        if let Some(profile) = self.users.read().await.get(userid) {
            return Some(profile.clone());
        }

        let token = match self.token().await {
            Ok(token) => token,
            Err(err) => {
                tracing::warn!(userid, %err, "User lookup skipped: no token");
                return None;
            }
        };
        let url = format!(
            "{}/user/get?access_token={}&userid={}",
            self.base, token, userid
        );
        let response: UserResponse = match self.http.get(&url).send().await {
            Ok(resp) => match resp.json().await {
                Ok(json) => json,
                Err(err) => {
                    tracing::warn!(userid, %err, "User lookup returned invalid JSON");
                    return None;
                }
            },
            Err(err) => {
                tracing::warn!(userid, %err, "User lookup request failed");
                return None;
            }
        };
        if response.errcode != 0 {
            tracing::warn!(
                userid,
                errcode = response.errcode,
                errmsg = %response.errmsg,
                "User lookup rejected by upstream"
            );
            return None;
        }

        let profile = UserProfile {
            name: response.name,
            department_ids: response.department,
            main_department: response.main_department,
        };
        self.users
            .write()
            .await
            .insert(userid.to_string(), profile.clone());
        Some(profile)
    }

    async fn department_name(&self, dept_id: i64) -> Option<String> {
        if let Some(name) = self.departments.read().await.get(&dept_id) {
            return Some(name.clone());
        }

        let token = match self.token().await {
            Ok(token) => token,
            Err(err) => {
                tracing::warn!(dept_id, %err, "Department lookup skipped: no token");
                return None;
            }
        };
        let url = format!(
            "{}/department/list?access_token={}&id={}",
            self.base, token, dept_id
        );
        let response: DepartmentListResponse = match self.http.get(&url).send().await {
            Ok(resp) => match resp.json().await {
                Ok(json) => json,
                Err(err) => {
                    tracing::warn!(dept_id, %err, "Department lookup returned invalid JSON");
                    return None;
                }
            },
            Err(err) => {
                tracing::warn!(dept_id, %err, "Department lookup request failed");
                return None;
            }
        };
        if response.errcode != 0 {
            tracing::warn!(
                dept_id,
                errcode = response.errcode,
                errmsg = %response.errmsg,
                "Department lookup rejected by upstream"
            );
            return None;
        }

        let name = response
            .department
            .into_iter()
            .find(|d| d.id == dept_id)
            .map(|d| d.name)?;
        self.departments.write().await.insert(dept_id, name.clone());
        Some(name)
    }
}
