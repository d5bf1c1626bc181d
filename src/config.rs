use anyhow::anyhow;
use chrono_tz::Tz;
use cron::Schedule;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

/// Unix timestamp of 2026-01-01 00:00 UTC+8, the deployment's tracking epoch.
/// Both the sync cursor and the active-index cutoff fall back to it.
const DEFAULT_BASELINE_TIMESTAMP: i64 = 1_767_196_800;

const DEFAULT_API_BASE: &str = "https://qyapi.weixin.qq.com/cgi-bin";
const DEFAULT_CRON: &str = "*/5 * * * *";

#[derive(Debug, Clone)]
pub struct Config {
    pub corp_id: String,
    pub corp_secret: String,
    pub callback_token: Option<String>,
    pub callback_aes_key: Option<String>,
    pub api_base: String,
    pub data_dir: PathBuf,
    pub sync_interval: Schedule,
    pub auto_sync_enabled: bool,
    pub status_check_interval: Schedule,
    pub status_check_enabled: bool,
    pub sync_baseline_timestamp: i64,
    pub active_cutoff_timestamp: i64,
    pub time_zone: Tz,
    pub bind_addr: SocketAddr,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let corp_id = env::var("WECOM_CORPID").unwrap_or_default();
        let corp_secret = env::var("WECOM_SECRET").unwrap_or_default();

        let callback_token = env::var("WECOM_CALLBACK_TOKEN").ok().filter(|s| !s.is_empty());
        let callback_aes_key = env::var("WECOM_CALLBACK_ENCODING_AES_KEY")
            .ok()
            .filter(|s| !s.is_empty());

        let api_base = env::var("WECOM_API_BASE")
            .unwrap_or_else(|_| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        let data_dir = PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string()));

        let sync_interval = parse_cron("SYNC_INTERVAL")?;
        let status_check_interval = parse_cron("STATUS_CHECK_INTERVAL")?;

        let auto_sync_enabled = parse_bool("AUTO_SYNC_ENABLED", true);
        let status_check_enabled = parse_bool("STATUS_CHECK_ENABLED", true);

        let sync_baseline_timestamp =
            parse_i64("SYNC_BASELINE_TIMESTAMP", DEFAULT_BASELINE_TIMESTAMP)?;
        let active_cutoff_timestamp =
            parse_i64("ACTIVE_CUTOFF_TIMESTAMP", sync_baseline_timestamp)?;

        let time_zone_name = env::var("APP_TIMEZONE").unwrap_or_else(|_| "Asia/Shanghai".to_string());
        let time_zone: Tz = time_zone_name
            .parse()
            .map_err(|_| anyhow!("Invalid APP_TIMEZONE value: {}", time_zone_name))?;

        let bind_addr_raw = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_addr: SocketAddr = bind_addr_raw
            .parse()
            .map_err(|_| anyhow!("Invalid BIND_ADDR value: {}", bind_addr_raw))?;

        Ok(Config {
            corp_id,
            corp_secret,
            callback_token,
            callback_aes_key,
            api_base,
            data_dir,
            sync_interval,
            auto_sync_enabled,
            status_check_interval,
            status_check_enabled,
            sync_baseline_timestamp,
            active_cutoff_timestamp,
            time_zone,
            bind_addr,
        })
    }

    /// Both callback credentials, or `None` when the push endpoint is not
    /// configured (the queue-drain task is only started when they exist).
    pub fn callback_credentials(&self) -> Option<(&str, &str)> {
        match (self.callback_token.as_deref(), self.callback_aes_key.as_deref()) {
            (Some(token), Some(key)) => Some((token, key)),
            _ => None,
        }
    }

    pub fn leave_file(&self) -> PathBuf {
        self.data_dir.join("leave_data.json")
    }

    pub fn active_index_file(&self) -> PathBuf {
        self.data_dir.join("active_approvals.json")
    }

    pub fn cursor_file(&self) -> PathBuf {
        self.data_dir.join("sync_cursor.json")
    }
}

fn parse_cron(key: &str) -> anyhow::Result<Schedule> {
    let raw = env::var(key).unwrap_or_else(|_| DEFAULT_CRON.to_string());
    // The 5-field crontab form is accepted alongside cron's native 6/7 fields.
    let normalized = if raw.split_whitespace().count() == 5 {
        format!("0 {}", raw)
    } else {
        raw.clone()
    };
    Schedule::from_str(&normalized).map_err(|e| anyhow!("Invalid {} value {:?}: {}", key, raw, e))
}

fn parse_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_i64(key: &str, default: i64) -> anyhow::Result<i64> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| anyhow!("Invalid {} value: {}", key, raw)),
        Err(_) => Ok(default),
    }
}
