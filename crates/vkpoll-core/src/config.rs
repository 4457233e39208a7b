use std::{env, fs, path::Path, time::Duration};

use crate::{
    errors::Error,
    events::flags::LongPollMode,
    longpoll::{LongPollKind, PollParams},
    retry::RetryPolicy,
    Result,
};

/// Typed runtime configuration, read from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    // API
    pub access_token: String,
    pub group_id: Option<i64>,
    pub api_version: String,
    pub api_base_url: String,
    pub api_timeout: Duration,

    // Long-poll
    pub longpoll_wait: u32,
    pub longpoll_mode: u32,
    pub longpoll_version: u32,
    pub longpoll_use_https: bool,

    // Soft-failure backoff
    pub resync_max_attempts: u32,
    pub resync_base_delay: Duration,
    pub resync_max_delay: Duration,

    // Behavior flags
    pub resolve_attachments: bool,
}

impl Config {
    /// Seed from `./.env` (without overriding existing vars), then read the
    /// process environment.
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(env_str)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);

        // Required
        let access_token = get("VK_ACCESS_TOKEN").ok_or_else(|| {
            Error::Config("VK_ACCESS_TOKEN environment variable is required".to_string())
        })?;

        let group_id = match get("VK_GROUP_ID") {
            None => None,
            Some(raw) => Some(raw.trim().parse::<i64>().map_err(|_| {
                Error::Config(format!("VK_GROUP_ID must be an integer, got {raw:?}"))
            })?),
        };

        let api_version = get("VK_API_VERSION").unwrap_or_else(|| "5.131".to_string());
        let api_base_url = get("VK_API_BASE_URL")
            .unwrap_or_else(|| "https://api.vk.com".to_string())
            .trim_end_matches('/')
            .to_string();
        let api_timeout =
            Duration::from_millis(parse_num(get("VK_API_TIMEOUT_MS")).unwrap_or(10_000));

        // Group servers speak protocol version 1, user servers version 2.
        let default_version = if group_id.is_some() { 1 } else { 2 };
        let longpoll_wait = parse_num(get("LONGPOLL_WAIT")).unwrap_or(25);
        let longpoll_mode = parse_num(get("LONGPOLL_MODE")).unwrap_or(LongPollMode::DEFAULT);
        let longpoll_version = parse_num(get("LONGPOLL_VERSION")).unwrap_or(default_version);
        let longpoll_use_https = parse_bool(get("LONGPOLL_USE_HTTPS")).unwrap_or(true);

        let resync_max_attempts = parse_num(get("RESYNC_MAX_ATTEMPTS")).unwrap_or(16);
        let resync_base_delay =
            Duration::from_millis(parse_num(get("RESYNC_BASE_DELAY_MS")).unwrap_or(250));
        let resync_max_delay =
            Duration::from_millis(parse_num(get("RESYNC_MAX_DELAY_MS")).unwrap_or(10_000));

        let resolve_attachments = parse_bool(get("RESOLVE_ATTACHMENTS")).unwrap_or(false);

        Ok(Self {
            access_token,
            group_id,
            api_version,
            api_base_url,
            api_timeout,
            longpoll_wait,
            longpoll_mode,
            longpoll_version,
            longpoll_use_https,
            resync_max_attempts,
            resync_base_delay,
            resync_max_delay,
            resolve_attachments,
        })
    }

    pub fn longpoll_kind(&self) -> LongPollKind {
        match self.group_id {
            Some(group_id) => LongPollKind::Group { group_id },
            None => LongPollKind::User {
                use_https: self.longpoll_use_https,
            },
        }
    }

    /// `mode` only applies to user servers.
    pub fn poll_params(&self) -> PollParams {
        PollParams {
            wait: self.longpoll_wait,
            mode: self.group_id.is_none().then_some(self.longpoll_mode),
            version: self.longpoll_version,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.resync_max_attempts,
            self.resync_base_delay,
            self.resync_max_delay,
        )
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };
        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = &val[1..val.len() - 1];
        }
        out.push((key.to_string(), val.to_string()));
    }
    out
}

fn parse_bool(v: Option<String>) -> Option<bool> {
    v.map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn parse_num<T: std::str::FromStr>(v: Option<String>) -> Option<T> {
    v.and_then(|s| s.trim().parse::<T>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
