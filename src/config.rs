use crate::error::{AutoPrError, Result};
use crate::platform::{MergeMethod, PlatformKind};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The base config directory name under ~/.config/
const CONFIG_DIR_NAME: &str = "auto-pr";

/// The filename for the global configuration file.
const GLOBAL_CONFIG_FILENAME: &str = "config.toml";

/// Optional per-repository overrides, read from the repository root.
pub const PROJECT_CONFIG_FILENAME: &str = ".auto-pr.toml";

/// Keys accepted by `config get/set/unset`, in display order.
pub const CONFIG_KEYS: &[&str] = &[
    "model",
    "language",
    "temperature",
    "max_tokens",
    "max_retries",
    "merge_method",
    "required_approvals",
    "wait_for_checks",
    "check_timeout_secs",
    "poll_interval_secs",
    "max_check_retries",
    "auto_resolve",
    "conflict_strategy",
    "delete_branch",
    "platform",
    "log_level",
];

// ============================================================================
// Configuration
// ============================================================================

/// How conflicts with the base branch are resolved locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictStrategy {
    #[default]
    Rebase,
    Merge,
}

impl ConflictStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictStrategy::Rebase => "rebase",
            ConflictStrategy::Merge => "merge",
        }
    }
}

impl std::str::FromStr for ConflictStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rebase" => Ok(ConflictStrategy::Rebase),
            "merge" => Ok(ConflictStrategy::Merge),
            other => Err(format!(
                "unknown conflict strategy '{}' (expected rebase or merge)",
                other
            )),
        }
    }
}

/// User configuration.
///
/// Missing fields take their default, so partial files work:
///
/// ```toml
/// model = "openrouter:anthropic/claude-3.5-sonnet"
/// merge_method = "squash"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `provider:model`, e.g. `claude:sonnet`.
    pub model: String,

    /// Language for generated text. English when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    pub temperature: f32,
    pub max_tokens: u32,

    /// Extra LLM attempts after a failure (never for authentication errors).
    pub max_retries: u32,

    pub merge_method: MergeMethod,

    /// Approvals needed before a PR counts as approved.
    pub required_approvals: u32,

    /// Wait for running checks before merging instead of failing.
    pub wait_for_checks: bool,

    pub check_timeout_secs: u64,
    pub poll_interval_secs: u64,

    /// Retries/extra waits allowed for failing checks in one merge run.
    pub max_check_retries: u32,

    pub auto_resolve: bool,
    pub conflict_strategy: ConflictStrategy,

    /// Delete the head branch after merging.
    pub delete_branch: bool,

    /// Force a platform instead of detecting it from the remote.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    /// Diagnostic log level (error, warn, info, debug, trace).
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: "claude:sonnet".to_string(),
            language: None,
            temperature: 0.7,
            max_tokens: 1024,
            max_retries: 3,
            merge_method: MergeMethod::Merge,
            required_approvals: 1,
            wait_for_checks: true,
            check_timeout_secs: 600,
            poll_interval_secs: 30,
            max_check_retries: 2,
            auto_resolve: false,
            conflict_strategy: ConflictStrategy::Rebase,
            delete_branch: false,
            platform: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Config {
    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Platform override, if one is configured.
    pub fn platform_kind(&self) -> Result<Option<PlatformKind>> {
        match &self.platform {
            None => Ok(None),
            Some(name) => PlatformKind::parse(name)
                .map(Some)
                .ok_or_else(|| AutoPrError::Config(format!("Unknown platform '{}'", name))),
        }
    }

    /// Current value of `key` rendered as TOML, `None` when unset.
    pub fn get_key(&self, key: &str) -> Result<Option<String>> {
        ensure_known_key(key)?;
        Ok(to_table(self)?.get(key).map(|v| v.to_string()))
    }

    /// Set `key` from a user-supplied string. Values that are not valid TOML
    /// literals are taken as strings.
    pub fn set_key(&mut self, key: &str, value: &str) -> Result<()> {
        ensure_known_key(key)?;
        let mut table = to_table(self)?;
        table.insert(key.to_string(), parse_value(value));
        let updated = from_table(table)
            .map_err(|e| AutoPrError::Config(format!("Invalid value for '{}': {}", key, e)))?;
        validate_config(&updated).map_err(|e| AutoPrError::Config(e.to_string()))?;
        *self = updated;
        Ok(())
    }

    /// Reset `key` to its default.
    pub fn unset_key(&mut self, key: &str) -> Result<()> {
        ensure_known_key(key)?;
        let mut table = to_table(self)?;
        table.remove(key);
        *self = from_table(table).map_err(|e| AutoPrError::Config(e.to_string()))?;
        Ok(())
    }
}

fn ensure_known_key(key: &str) -> Result<()> {
    if CONFIG_KEYS.contains(&key) {
        Ok(())
    } else {
        Err(AutoPrError::Config(format!(
            "Unknown config key '{}'. Valid keys: {}",
            key,
            CONFIG_KEYS.join(", ")
        )))
    }
}

fn to_table(config: &Config) -> Result<toml::Table> {
    let text = toml::to_string(config)
        .map_err(|e| AutoPrError::Config(format!("Failed to serialize config: {}", e)))?;
    text.parse::<toml::Table>()
        .map_err(|e| AutoPrError::Config(format!("Failed to serialize config: {}", e)))
}

fn from_table(table: toml::Table) -> std::result::Result<Config, String> {
    let text = toml::to_string(&table).map_err(|e| e.to_string())?;
    toml::from_str(&text).map_err(|e| e.to_string())
}

fn parse_value(value: &str) -> toml::Value {
    format!("v = {}", value)
        .parse::<toml::Table>()
        .ok()
        .and_then(|mut t| t.remove("v"))
        .unwrap_or_else(|| toml::Value::String(value.to_string()))
}

// ============================================================================
// Config Validation
// ============================================================================

use std::error::Error;
use std::fmt;

/// Error type for configuration validation failures.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    ZeroPollInterval,
    PollExceedsTimeout { poll: u64, timeout: u64 },
    TemperatureOutOfRange(f32),
    ZeroMaxTokens,
    ModelWithoutProvider(String),
    UnknownPlatform(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroPollInterval => write!(f, "`poll_interval_secs` must be greater than 0"),
            ConfigError::PollExceedsTimeout { poll, timeout } => write!(
                f,
                "`poll_interval_secs` ({}) cannot exceed `check_timeout_secs` ({})",
                poll, timeout
            ),
            ConfigError::TemperatureOutOfRange(t) => {
                write!(f, "`temperature` must be between 0.0 and 2.0, got {}", t)
            }
            ConfigError::ZeroMaxTokens => write!(f, "`max_tokens` must be greater than 0"),
            ConfigError::ModelWithoutProvider(model) => write!(
                f,
                "`model` must look like provider:model (e.g. claude:sonnet), got '{}'",
                model
            ),
            ConfigError::UnknownPlatform(name) => write!(
                f,
                "Unknown `platform` '{}'. Use github, gitlab, bitbucket or azure",
                name
            ),
        }
    }
}

impl Error for ConfigError {}

/// Validate a configuration for logical consistency.
pub fn validate_config(config: &Config) -> std::result::Result<(), ConfigError> {
    if config.poll_interval_secs == 0 {
        return Err(ConfigError::ZeroPollInterval);
    }
    if config.poll_interval_secs > config.check_timeout_secs {
        return Err(ConfigError::PollExceedsTimeout {
            poll: config.poll_interval_secs,
            timeout: config.check_timeout_secs,
        });
    }
    if !(0.0..=2.0).contains(&config.temperature) {
        return Err(ConfigError::TemperatureOutOfRange(config.temperature));
    }
    if config.max_tokens == 0 {
        return Err(ConfigError::ZeroMaxTokens);
    }
    match config.model.split_once(':') {
        Some((provider, name)) if !provider.is_empty() && !name.is_empty() => {}
        _ => return Err(ConfigError::ModelWithoutProvider(config.model.clone())),
    }
    if let Some(platform) = &config.platform {
        if PlatformKind::parse(platform).is_none() {
            return Err(ConfigError::UnknownPlatform(platform.clone()));
        }
    }
    Ok(())
}

// ============================================================================
// Config File Management
// ============================================================================

/// Default config file content with explanatory comments.
const DEFAULT_CONFIG_WITH_COMMENTS: &str = r#"# auto-pr configuration
# Repository-specific overrides can live in .auto-pr.toml at the repository root.

# LLM used for PR descriptions and merge commit messages, as provider:model.
# Providers: claude (claude CLI), openrouter (OPENROUTER_API_KEY), fireworks (FIREWORKS_API_KEY)
model = "claude:sonnet"

# Language for generated text (English when unset)
# language = "Spanish"

temperature = 0.7
max_tokens = 1024
max_retries = 3

# Merge method: merge, squash or rebase
merge_method = "merge"

# Approvals required before merging without confirmation
required_approvals = 1

# Wait for running checks before merging
wait_for_checks = true
check_timeout_secs = 600
poll_interval_secs = 30

# How many times failing checks may be retried (or waited on again) per merge
max_check_retries = 2

# Resolve conflicts with the base branch automatically, using rebase or merge
auto_resolve = false
conflict_strategy = "rebase"

# Delete the head branch after a successful merge
delete_branch = false

# Force a platform instead of detecting it from the git remote
# platform = "github"

# Diagnostic log level: error, warn, info, debug, trace
log_level = "warn"
"#;

/// Generate config file content with explanatory comments.
fn generate_config_with_comments(config: &Config) -> String {
    let language = match &config.language {
        Some(l) => format!("language = {}", toml::Value::String(l.clone())),
        None => "# language = \"Spanish\"".to_string(),
    };
    let platform = match &config.platform {
        Some(p) => format!("platform = {}", toml::Value::String(p.clone())),
        None => "# platform = \"github\"".to_string(),
    };
    format!(
        r#"# auto-pr configuration
# Repository-specific overrides can live in .auto-pr.toml at the repository root.

# LLM used for PR descriptions and merge commit messages, as provider:model.
# Providers: claude (claude CLI), openrouter (OPENROUTER_API_KEY), fireworks (FIREWORKS_API_KEY)
model = {}

# Language for generated text (English when unset)
{}

temperature = {}
max_tokens = {}
max_retries = {}

# Merge method: merge, squash or rebase
merge_method = "{}"

# Approvals required before merging without confirmation
required_approvals = {}

# Wait for running checks before merging
wait_for_checks = {}
check_timeout_secs = {}
poll_interval_secs = {}

# How many times failing checks may be retried (or waited on again) per merge
max_check_retries = {}

# Resolve conflicts with the base branch automatically, using rebase or merge
auto_resolve = {}
conflict_strategy = "{}"

# Delete the head branch after a successful merge
delete_branch = {}

# Force a platform instead of detecting it from the git remote
{}

# Diagnostic log level: error, warn, info, debug, trace
log_level = {}
"#,
        toml::Value::String(config.model.clone()),
        language,
        toml::Value::Float(config.temperature as f64),
        config.max_tokens,
        config.max_retries,
        config.merge_method,
        config.required_approvals,
        config.wait_for_checks,
        config.check_timeout_secs,
        config.poll_interval_secs,
        config.max_check_retries,
        config.auto_resolve,
        config.conflict_strategy.as_str(),
        config.delete_branch,
        platform,
        toml::Value::String(config.log_level.clone()),
    )
}

/// Get the auto-pr config directory path (~/.config/auto-pr/).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| AutoPrError::Config("Could not determine home directory".to_string()))?;
    Ok(home.join(".config").join(CONFIG_DIR_NAME))
}

/// Ensure the config directory exists. Returns whether it was newly created.
pub fn ensure_config_dir() -> Result<(PathBuf, bool)> {
    let dir = config_dir()?;
    let created = !dir.exists();
    fs::create_dir_all(&dir)?;
    Ok((dir, created))
}

/// Returns the path to `~/.config/auto-pr/config.toml`.
pub fn global_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(GLOBAL_CONFIG_FILENAME))
}

/// `.auto-pr.toml` at the root of the current repository, if inside one.
pub fn project_config_path() -> Option<PathBuf> {
    crate::git::GitCli::repo_root().map(|root| root.join(PROJECT_CONFIG_FILENAME))
}

/// Load a config from a specific path without any fallback logic.
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| {
        AutoPrError::Config(format!("Failed to parse config file at {:?}: {}", path, e))
    })
}

/// Load the global configuration, creating a commented default file if missing.
pub fn load_global_config() -> Result<Config> {
    load_global_config_at(&global_config_path()?)
}

fn load_global_config_at(path: &Path) -> Result<Config> {
    if !path.exists() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, DEFAULT_CONFIG_WITH_COMMENTS)?;
        return Ok(Config::default());
    }
    load_config_from_path(path)
}

/// Save the global configuration. Overwrites user comments.
pub fn save_global_config(config: &Config) -> Result<()> {
    ensure_config_dir()?;
    save_config_at(&global_config_path()?, config)
}

fn save_config_at(path: &Path, config: &Config) -> Result<()> {
    fs::write(path, generate_config_with_comments(config))?;
    Ok(())
}

/// Global config overlaid with the repository's `.auto-pr.toml`, validated.
pub fn get_effective_config() -> Result<Config> {
    load_effective_config(&global_config_path()?, project_config_path().as_deref())
}

fn load_effective_config(global_path: &Path, project_path: Option<&Path>) -> Result<Config> {
    let global = load_global_config_at(global_path)?;
    let config = match project_path.filter(|p| p.exists()) {
        Some(path) => overlay(&global, path)?,
        None => global,
    };
    validate_config(&config).map_err(|e| AutoPrError::Config(e.to_string()))?;
    Ok(config)
}

fn overlay(base: &Config, project_path: &Path) -> Result<Config> {
    let content = fs::read_to_string(project_path)?;
    let overrides = content.parse::<toml::Table>().map_err(|e| {
        AutoPrError::Config(format!(
            "Failed to parse project config file at {:?}: {}",
            project_path, e
        ))
    })?;
    let mut table = to_table(base)?;
    for (key, value) in overrides {
        if !CONFIG_KEYS.contains(&key.as_str()) {
            log::warn!("Ignoring unknown key '{}' in {:?}", key, project_path);
            continue;
        }
        table.insert(key, value);
    }
    log::debug!("Applied project config from {:?}", project_path);
    from_table(table).map_err(|e| {
        AutoPrError::Config(format!(
            "Invalid project config file at {:?}: {}",
            project_path, e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_dir_returns_path_ending_with_auto_pr() {
        let result = config_dir().unwrap();
        assert!(result.ends_with("auto-pr"));
        assert!(result.parent().unwrap().ends_with(".config"));
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_default_config_file_parses_to_defaults() {
        let parsed: Config = toml::from_str(DEFAULT_CONFIG_WITH_COMMENTS).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_generated_config_round_trips_custom_values() {
        let config = Config {
            model: "fireworks:accounts/fireworks/models/llama".into(),
            language: Some("German".into()),
            merge_method: MergeMethod::Squash,
            conflict_strategy: ConflictStrategy::Merge,
            platform: Some("github".into()),
            temperature: 0.25,
            ..Default::default()
        };
        let parsed: Config = toml::from_str(&generate_config_with_comments(&config)).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: Config = toml::from_str("merge_method = \"rebase\"\n").unwrap();
        assert_eq!(parsed.merge_method, MergeMethod::Rebase);
        assert_eq!(parsed.poll_interval_secs, 30);
    }

    // ========================================================================
    // Validation
    // ========================================================================

    #[test]
    fn test_validate_rejects_bad_polling() {
        let zero = Config {
            poll_interval_secs: 0,
            ..Default::default()
        };
        assert_eq!(validate_config(&zero), Err(ConfigError::ZeroPollInterval));

        let too_long = Config {
            poll_interval_secs: 700,
            ..Default::default()
        };
        assert!(matches!(
            validate_config(&too_long),
            Err(ConfigError::PollExceedsTimeout { poll: 700, timeout: 600 })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_llm_settings() {
        let hot = Config {
            temperature: 2.5,
            ..Default::default()
        };
        assert!(matches!(validate_config(&hot), Err(ConfigError::TemperatureOutOfRange(_))));

        let no_tokens = Config {
            max_tokens: 0,
            ..Default::default()
        };
        assert_eq!(validate_config(&no_tokens), Err(ConfigError::ZeroMaxTokens));

        let bare = Config {
            model: "sonnet".into(),
            ..Default::default()
        };
        assert!(matches!(validate_config(&bare), Err(ConfigError::ModelWithoutProvider(_))));
    }

    #[test]
    fn test_validate_rejects_unknown_platform() {
        let config = Config {
            platform: Some("sourcehut".into()),
            ..Default::default()
        };
        assert!(matches!(validate_config(&config), Err(ConfigError::UnknownPlatform(_))));
    }

    // ========================================================================
    // get / set / unset
    // ========================================================================

    #[test]
    fn test_set_key_parses_typed_values() {
        let mut config = Config::default();
        config.set_key("max_check_retries", "5").unwrap();
        config.set_key("auto_resolve", "true").unwrap();
        config.set_key("merge_method", "squash").unwrap();
        config.set_key("model", "openrouter:anthropic/claude-3.5-sonnet").unwrap();
        assert_eq!(config.max_check_retries, 5);
        assert!(config.auto_resolve);
        assert_eq!(config.merge_method, MergeMethod::Squash);
        assert_eq!(config.model, "openrouter:anthropic/claude-3.5-sonnet");
    }

    #[test]
    fn test_set_key_rejects_wrong_type_and_invalid_values() {
        let mut config = Config::default();
        assert!(config.set_key("max_tokens", "lots").is_err());
        assert!(config.set_key("poll_interval_secs", "0").is_err());
        assert!(config.set_key("nope", "1").is_err());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_get_and_unset_key() {
        let mut config = Config::default();
        assert_eq!(config.get_key("language").unwrap(), None);
        config.set_key("language", "French").unwrap();
        assert_eq!(config.get_key("language").unwrap().as_deref(), Some("\"French\""));
        config.set_key("required_approvals", "2").unwrap();
        config.unset_key("required_approvals").unwrap();
        config.unset_key("language").unwrap();
        assert_eq!(config, Config::default());
    }

    // ========================================================================
    // Files
    // ========================================================================

    #[test]
    fn test_load_global_config_creates_commented_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("auto-pr").join("config.toml");
        let config = load_global_config_at(&path).unwrap();
        assert_eq!(config, Config::default());
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# auto-pr configuration"));
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        let config = Config {
            delete_branch: true,
            ..Default::default()
        };
        save_config_at(&path, &config).unwrap();
        assert_eq!(load_config_from_path(&path).unwrap(), config);
    }

    #[test]
    fn test_project_config_overrides_global() {
        let temp = TempDir::new().unwrap();
        let global = temp.path().join("config.toml");
        save_config_at(
            &global,
            &Config {
                merge_method: MergeMethod::Squash,
                required_approvals: 2,
                ..Default::default()
            },
        )
        .unwrap();
        let project = temp.path().join(PROJECT_CONFIG_FILENAME);
        fs::write(&project, "required_approvals = 0\nunknown = 1\n").unwrap();

        let config = load_effective_config(&global, Some(&project)).unwrap();
        assert_eq!(config.merge_method, MergeMethod::Squash);
        assert_eq!(config.required_approvals, 0);
    }

    #[test]
    fn test_effective_config_is_validated() {
        let temp = TempDir::new().unwrap();
        let global = temp.path().join("config.toml");
        fs::write(&global, "model = \"sonnet\"\n").unwrap();
        assert!(matches!(
            load_effective_config(&global, None),
            Err(AutoPrError::Config(_))
        ));
    }
}
