//! Config command handler.
//!
//! Shows, reads and edits values in the global configuration file.

use crate::config::{
    global_config_path, load_global_config, project_config_path, save_global_config, Config,
    CONFIG_KEYS,
};
use crate::error::Result;
use crate::output::{print_success, BOLD, CYAN, GRAY, RESET, YELLOW};

/// Display the global configuration, then any project overrides.
pub fn config_show_command() -> Result<()> {
    let global_path = global_config_path()?;
    println!("{BOLD}# Global config{RESET}");
    println!("{GRAY}# {}{RESET}", global_path.display());
    println!();

    if !global_path.exists() {
        println!("{YELLOW}# (file does not exist, using defaults){RESET}");
        println!();
    }
    print_config_as_toml(&load_global_config()?)?;

    if let Some(project_path) = project_config_path().filter(|p| p.exists()) {
        println!();
        println!("{BOLD}# Project overrides{RESET}");
        println!("{GRAY}# {}{RESET}", project_path.display());
        println!();
        let content = std::fs::read_to_string(&project_path)?;
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            println!("{}", line);
        }
    }
    Ok(())
}

/// Print one value of the global configuration.
pub fn config_get_command(key: &str) -> Result<()> {
    let config = load_global_config()?;
    match config.get_key(key)? {
        Some(value) => println!("{}", value),
        None => println!("{GRAY}(unset){RESET}"),
    }
    Ok(())
}

/// Set a value in the global configuration.
///
/// The value is validated together with the rest of the file before it is
/// written, so an invalid value leaves the file untouched.
pub fn config_set_command(key: &str, value: &str) -> Result<()> {
    let mut config = load_global_config()?;
    config.set_key(key, value)?;
    save_global_config(&config)?;

    let shown = config.get_key(key)?.unwrap_or_default();
    print_success(&format!("Set {} = {}", key, shown));
    Ok(())
}

/// Reset a value in the global configuration to its default.
pub fn config_unset_command(key: &str) -> Result<()> {
    let mut config = load_global_config()?;
    config.unset_key(key)?;
    save_global_config(&config)?;
    print_success(&format!("Reset {} to its default", key));
    Ok(())
}

/// Print the configuration file locations.
pub fn config_path_command() -> Result<()> {
    println!("{}", global_config_path()?.display());
    if let Some(project_path) = project_config_path() {
        let note = if project_path.exists() {
            ""
        } else {
            " (not present)"
        };
        println!("{}{GRAY}{}{RESET}", project_path.display(), note);
    }
    Ok(())
}

/// Print a Config struct as valid TOML.
fn print_config_as_toml(config: &Config) -> Result<()> {
    for line in config_to_toml_string(config)?.lines() {
        match line.split_once(" = ") {
            Some((key, value)) => println!("{CYAN}{}{RESET} = {}", key, value),
            None => println!("{GRAY}{}{RESET}", line),
        }
    }
    Ok(())
}

/// Render every known key in display order; unset optional keys become comments.
pub fn config_to_toml_string(config: &Config) -> Result<String> {
    let mut lines = Vec::with_capacity(CONFIG_KEYS.len());
    for key in CONFIG_KEYS {
        match config.get_key(key)? {
            Some(value) => lines.push(format!("{} = {}", key, value)),
            None => lines.push(format!("# {} (unset)", key)),
        }
    }
    Ok(lines.join("\n"))
}
