use std::{collections::HashMap, fs};

use client_core::{DEFAULT_LIST_LIMIT, DEFAULT_TOP_N};
use serde::Deserialize;
use tracing::warn;

pub const CONFIG_FILE: &str = "console.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConsoleSettings {
    pub api_base_url: String,
    pub list_limit: u32,
    pub default_top_n: u32,
    pub request_timeout_secs: u64,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".into(),
            list_limit: DEFAULT_LIST_LIMIT,
            default_top_n: DEFAULT_TOP_N,
            request_timeout_secs: 30,
        }
    }
}

/// Defaults, then `console.toml` in the working directory, then the
/// environment.
pub fn load_settings() -> ConsoleSettings {
    let mut settings = ConsoleSettings::default();
    if let Ok(raw) = fs::read_to_string(CONFIG_FILE) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

pub fn apply_file(settings: &mut ConsoleSettings, raw: &str) {
    let file_cfg = match toml::from_str::<HashMap<String, String>>(raw) {
        Ok(file_cfg) => file_cfg,
        Err(err) => {
            warn!(file = CONFIG_FILE, error = %err, "ignoring unreadable config file");
            return;
        }
    };
    if let Some(v) = file_cfg.get("api_base_url") {
        settings.api_base_url = v.clone();
    }
    if let Some(v) = file_cfg.get("list_limit") {
        set_parsed(&mut settings.list_limit, "list_limit", v);
    }
    if let Some(v) = file_cfg.get("default_top_n") {
        set_parsed(&mut settings.default_top_n, "default_top_n", v);
    }
    if let Some(v) = file_cfg.get("request_timeout_secs") {
        set_parsed(
            &mut settings.request_timeout_secs,
            "request_timeout_secs",
            v,
        );
    }
}

pub fn apply_env(settings: &mut ConsoleSettings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("CONSOLE_API_BASE_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = lookup("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }

    if let Some(v) = lookup("APP__LIST_LIMIT") {
        set_parsed(&mut settings.list_limit, "APP__LIST_LIMIT", &v);
    }
    if let Some(v) = lookup("APP__DEFAULT_TOP_N") {
        set_parsed(&mut settings.default_top_n, "APP__DEFAULT_TOP_N", &v);
    }
    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        set_parsed(
            &mut settings.request_timeout_secs,
            "APP__REQUEST_TIMEOUT_SECS",
            &v,
        );
    }
}

fn set_parsed<T: std::str::FromStr>(slot: &mut T, key: &str, raw: &str) {
    match raw.trim().parse::<T>() {
        Ok(parsed) => *slot = parsed,
        Err(_) => warn!(key, value = raw, "ignoring non-numeric setting"),
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
