use std::{collections::HashMap, fs};

use anyhow::{anyhow, Result};

#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: String,
    /// Explicit websocket endpoint; derived from `base_url` when unset.
    pub realtime_url: Option<String>,
    pub bearer_token: String,
    pub reconnect_delay_seconds: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".into(),
            realtime_url: None,
            bearer_token: "dev-token".into(),
            reconnect_delay_seconds: 10,
        }
    }
}

impl Settings {
    /// The refresh channel endpoint: explicit override, or the API base
    /// with the scheme swapped to ws(s) and the `/package` path appended.
    pub fn realtime_endpoint(&self) -> Result<String> {
        if let Some(explicit) = &self.realtime_url {
            return Ok(explicit.clone());
        }
        let ws_base = if self.base_url.starts_with("https://") {
            self.base_url.replacen("https://", "wss://", 1)
        } else if self.base_url.starts_with("http://") {
            self.base_url.replacen("http://", "ws://", 1)
        } else {
            return Err(anyhow!("base_url must start with http:// or https://"));
        };
        Ok(format!("{}/package", ws_base.trim_end_matches('/')))
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("console.toml") {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("base_url") {
                settings.base_url = v.clone();
            }
            if let Some(v) = file_cfg.get("realtime_url") {
                settings.realtime_url = Some(v.clone());
            }
            if let Some(v) = file_cfg.get("bearer_token") {
                settings.bearer_token = v.clone();
            }
            if let Some(v) = file_cfg.get("reconnect_delay_seconds") {
                if let Ok(parsed) = v.parse::<u64>() {
                    settings.reconnect_delay_seconds = parsed;
                }
            }
        }
    }

    if let Ok(v) = std::env::var("APP__BASE_URL") {
        settings.base_url = v;
    }
    if let Ok(v) = std::env::var("APP__REALTIME_URL") {
        settings.realtime_url = Some(v);
    }
    if let Ok(v) = std::env::var("APP__BEARER_TOKEN") {
        settings.bearer_token = v;
    }
    if let Ok(v) = std::env::var("APP__RECONNECT_DELAY_SECONDS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.reconnect_delay_seconds = parsed;
        }
    }

    settings
}
