//! Configuration commands for managing leadboard settings.
//!
//! - `config show`: Display current configuration
//! - `config set`: Set a configuration value
//! - `config get`: Read a single value
//! - `config path`: Print the config file location

use owo_colors::OwoColorize;
use serde_json::json;

use super::print_json;
use crate::config::{Config, SETTABLE_KEYS};
use crate::error::{LeadboardError, Result};

/// Reject keys written with underscores where a dot belongs, e.g. `api_token`.
fn validate_config_key(key: &str) -> Result<&str> {
    if SETTABLE_KEYS.contains(&key) {
        return Ok(key);
    }
    if !key.contains('.')
        && let Some(pos) = key.find('_')
    {
        let dot_version = format!("{}.{}", &key[..pos], &key[pos + 1..]);
        if SETTABLE_KEYS.contains(&dot_version.as_str()) {
            return Err(LeadboardError::Config(format!(
                "invalid config key '{key}'. Use dot notation: '{dot_version}'"
            )));
        }
    }
    Ok(key)
}

pub fn cmd_config_show(json: bool) -> Result<()> {
    let config = Config::load()?;
    let path = Config::config_path();
    let token_configured = config.token().is_some();
    let base_url = config.base_url().ok().map(|u| u.to_string());

    if json {
        return print_json(&json!({
            "config_file": path.to_string_lossy(),
            "api": {
                "base_url": base_url,
                "token_configured": token_configured,
                "page_size": config.api.page_size,
            },
            "query": config.query,
            "resources": config.all_resources().keys().collect::<Vec<_>>(),
        }));
    }

    let mut out = String::new();
    out.push_str(&format!("{}\n\n", "Configuration:".cyan().bold()));

    out.push_str(&format!("{}:\n", "api".cyan()));
    match &base_url {
        Some(url) => out.push_str(&format!("  base_url: {url}\n")),
        None => out.push_str(&format!("  base_url: {}\n", "not configured".dimmed())),
    }
    let token_status = if token_configured {
        "configured".green().to_string()
    } else {
        "not configured".dimmed().to_string()
    };
    out.push_str(&format!("  token: {token_status}\n"));
    if let Some(size) = config.api.page_size {
        out.push_str(&format!("  page_size: {size}\n"));
    }
    out.push('\n');

    out.push_str(&format!("{}:\n", "query".cyan()));
    for key in SETTABLE_KEYS.iter().filter(|k| k.starts_with("query.")) {
        if let Some(value) = config.get(key)? {
            out.push_str(&format!("  {}: {value}\n", &key["query.".len()..]));
        }
    }
    out.push('\n');

    let names: Vec<String> = config.all_resources().into_keys().collect();
    out.push_str(&format!("{}: {}\n\n", "resources".cyan(), names.join(", ")));

    out.push_str(&format!(
        "{}",
        format!("Config file: {}", path.display()).dimmed()
    ));
    println!("{out}");
    Ok(())
}

pub fn cmd_config_set(key: &str, value: &str) -> Result<()> {
    let key = validate_config_key(key)?;
    let mut config = Config::load()?;
    config.set(key, value)?;
    config.save()?;

    match config.get(key)? {
        Some(shown) => println!("Set {} to {}", key.cyan(), shown),
        None => println!("Unset {}", key.cyan()),
    }
    Ok(())
}

pub fn cmd_config_get(key: &str) -> Result<()> {
    let key = validate_config_key(key)?;
    let config = Config::load()?;
    match config.get(key)? {
        Some(value) => println!("{value}"),
        None => println!("{}", "not set".dimmed()),
    }
    Ok(())
}

pub fn cmd_config_path() -> Result<()> {
    println!("{}", Config::config_path().display());
    Ok(())
}
