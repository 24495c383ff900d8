use std::{collections::HashMap, fs};

use serde_json::{json, Value};
use tracing::warn;

const SETTINGS_FILE: &str = "server.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub bind_addr: String,
    /// Payload served by `GET /data`.
    pub data: Value,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".into(),
            data: json!({ "message": "data from server" }),
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();
    if let Ok(raw) = fs::read_to_string(SETTINGS_FILE) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let file_cfg = match toml::from_str::<HashMap<String, String>>(raw) {
        Ok(cfg) => cfg,
        Err(err) => {
            warn!(file = SETTINGS_FILE, %err, "ignoring unreadable settings file");
            return;
        }
    };
    if let Some(v) = file_cfg.get("bind_addr") {
        settings.bind_addr = v.clone();
    }
    if let Some(v) = file_cfg.get("data") {
        set_data(settings, v);
    }
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("SERVER_BIND") {
        settings.bind_addr = v;
    }
    if let Some(v) = lookup("APP__BIND_ADDR") {
        settings.bind_addr = v;
    }
    if let Some(v) = lookup("APP__DATA") {
        set_data(settings, &v);
    }
}

fn set_data(settings: &mut Settings, raw: &str) {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => settings.data = value,
        Err(err) => warn!(%err, "data is not valid JSON; keeping previous value"),
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
