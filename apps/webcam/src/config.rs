use std::{collections::HashMap, fmt, fs, str::FromStr};

use tracing::warn;

const SETTINGS_FILE: &str = "webcam.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CameraKind {
    /// No camera; capture requests are reported as unsupported.
    #[default]
    #[value(name = "none")]
    Disabled,
    /// Built-in test pattern.
    Synthetic,
}

impl FromStr for CameraKind {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(CameraKind::Disabled),
            "synthetic" => Ok(CameraKind::Synthetic),
            other => Err(format!("unknown camera kind '{other}'")),
        }
    }
}

impl fmt::Display for CameraKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CameraKind::Disabled => "none",
            CameraKind::Synthetic => "synthetic",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub namespace: String,
    pub camera: CameraKind,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080".into(),
            namespace: "baseapp".into(),
            camera: CameraKind::Disabled,
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
    if let Some(v) = file_cfg.get("server_url") {
        settings.server_url = v.clone();
    }
    if let Some(v) = file_cfg.get("namespace") {
        settings.namespace = v.clone();
    }
    if let Some(v) = file_cfg.get("camera") {
        set_camera(settings, v);
    }
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("APP__SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = lookup("APP__NAMESPACE") {
        settings.namespace = v;
    }
    if let Some(v) = lookup("APP__CAMERA") {
        set_camera(settings, &v);
    }
}

fn set_camera(settings: &mut Settings, raw: &str) {
    match raw.parse::<CameraKind>() {
        Ok(kind) => settings.camera = kind,
        Err(err) => warn!(%err, "keeping camera '{}'", settings.camera),
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
