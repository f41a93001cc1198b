use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{bail, Context};
use serde::Deserialize;
use tracing::warn;

pub const SETTINGS_FILE: &str = "server.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub bind_addr: String,
    pub catalog_dir: String,
    pub renderer_url: String,
    pub render_timeout_seconds: u64,
    pub translate_per_step: f64,
    pub rotate_deg_per_step: f64,
    pub nearest_count: usize,
    pub max_send_queue: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".into(),
            catalog_dir: "./models".into(),
            renderer_url: "http://127.0.0.1:8500".into(),
            render_timeout_seconds: 30,
            translate_per_step: 0.1,
            rotate_deg_per_step: 2.0,
            nearest_count: 3,
            max_send_queue: 256,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    bind_addr: Option<String>,
    catalog_dir: Option<String>,
    renderer_url: Option<String>,
    render_timeout_seconds: Option<u64>,
    translate_per_step: Option<f64>,
    rotate_deg_per_step: Option<f64>,
    nearest_count: Option<usize>,
    max_send_queue: Option<usize>,
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(SETTINGS_FILE) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());

    settings
}

pub(crate) fn apply_file(settings: &mut Settings, raw: &str) {
    let file_cfg = match toml::from_str::<FileSettings>(raw) {
        Ok(file_cfg) => file_cfg,
        Err(error) => {
            warn!(%error, file = SETTINGS_FILE, "ignoring unreadable settings file");
            return;
        }
    };

    if let Some(v) = file_cfg.bind_addr {
        settings.bind_addr = v;
    }
    if let Some(v) = file_cfg.catalog_dir {
        settings.catalog_dir = v;
    }
    if let Some(v) = file_cfg.renderer_url {
        settings.renderer_url = v;
    }
    if let Some(v) = file_cfg.render_timeout_seconds {
        settings.render_timeout_seconds = v;
    }
    if let Some(v) = file_cfg.translate_per_step {
        settings.translate_per_step = v;
    }
    if let Some(v) = file_cfg.rotate_deg_per_step {
        settings.rotate_deg_per_step = v;
    }
    if let Some(v) = file_cfg.nearest_count {
        settings.nearest_count = v;
    }
    if let Some(v) = file_cfg.max_send_queue {
        settings.max_send_queue = v;
    }
}

pub(crate) fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("SERVER_BIND") {
        settings.bind_addr = v;
    }
    if let Some(v) = lookup("APP__BIND_ADDR") {
        settings.bind_addr = v;
    }

    if let Some(v) = lookup("APP__CATALOG_DIR") {
        settings.catalog_dir = v;
    }
    if let Some(v) = lookup("APP__RENDERER_URL") {
        settings.renderer_url = v;
    }

    override_parsed(
        &lookup,
        "APP__RENDER_TIMEOUT_SECONDS",
        &mut settings.render_timeout_seconds,
    );
    override_parsed(
        &lookup,
        "APP__TRANSLATE_PER_STEP",
        &mut settings.translate_per_step,
    );
    override_parsed(
        &lookup,
        "APP__ROTATE_DEG_PER_STEP",
        &mut settings.rotate_deg_per_step,
    );
    override_parsed(&lookup, "APP__NEAREST_COUNT", &mut settings.nearest_count);
    override_parsed(&lookup, "APP__MAX_SEND_QUEUE", &mut settings.max_send_queue);
}

fn override_parsed<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut T,
) {
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(parsed) => *target = parsed,
        Err(_) => warn!(key, value = %raw, "ignoring invalid numeric override"),
    }
}

pub fn prepare_catalog_dir(raw_catalog_dir: &str) -> anyhow::Result<PathBuf> {
    let raw_catalog_dir = raw_catalog_dir.trim();
    let catalog_dir = if raw_catalog_dir.is_empty() {
        PathBuf::from(Settings::default().catalog_dir)
    } else {
        Path::new(raw_catalog_dir).to_path_buf()
    };

    let metadata = fs::metadata(&catalog_dir).with_context(|| {
        format!(
            "model catalog directory '{}' is not accessible",
            catalog_dir.display()
        )
    })?;
    if !metadata.is_dir() {
        bail!(
            "model catalog path '{}' is not a directory",
            catalog_dir.display()
        );
    }

    Ok(catalog_dir)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
