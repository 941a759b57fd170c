// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use crate::Config;

/// Overrides `model.base_url`.
pub const ENV_BASE_URL: &str = "OPENROUTER_BASE_URL";
/// Overrides `model.name`.
pub const ENV_MODEL: &str = "CLIO_MODEL";

/// Ordered list of config file locations searched from lowest to highest priority.
/// Later files override earlier ones.
fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/clio/config.toml")];

    if let Some(cfg) = dirs::config_dir() {
        paths.push(cfg.join("clio/config.toml"));
    }

    // Project-local
    paths.push(PathBuf::from(".clio/config.toml"));

    paths
}

/// Load configuration by merging all discovered TOML files, then apply the
/// environment overrides.
/// The `extra` argument may provide an explicit path (e.g. `--config` CLI flag).
pub fn load(extra: Option<&Path>) -> anyhow::Result<Config> {
    let mut merged = toml::Value::Table(toml::map::Map::new());

    for path in config_search_paths() {
        if path.is_file() {
            debug!(path = %path.display(), "loading config layer");
            merge_toml(&mut merged, read_layer(&path)?);
        }
    }

    if let Some(p) = extra {
        debug!(path = %p.display(), "loading explicit config");
        merge_toml(&mut merged, read_layer(p)?);
    }

    let mut config: Config = merged
        .try_into()
        .context("config does not match the expected schema")?;
    apply_env_overrides(&mut config, |k| std::env::var(k).ok());
    Ok(config)
}

fn read_layer(path: &Path) -> anyhow::Result<toml::Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Environment variables take precedence over every file layer.
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.is_empty()) {
        debug!(%url, "base url from environment");
        config.model.base_url = url;
    }
    if let Some(model) = lookup(ENV_MODEL).filter(|v| !v.is_empty()) {
        debug!(%model, "model from environment");
        config.model.name = model;
    }
}

/// Deep-merge `src` into `dst`; src wins on scalar conflicts.
fn merge_toml(dst: &mut toml::Value, src: toml::Value) {
    match (dst, src) {
        (toml::Value::Table(d), toml::Value::Table(s)) => {
            for (k, v) in s {
                match d.get_mut(&k) {
                    Some(existing) => merge_toml(existing, v),
                    None => {
                        d.insert(k, v);
                    }
                }
            }
        }
        (dst, src) => *dst = src,
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
