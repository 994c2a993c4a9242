//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.concierge/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ConciergeConfig {
    #[serde(default)]
    pub widget: WidgetConfig,
    #[serde(default)]
    pub endpoints: EndpointConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct WidgetConfig {
    pub company_name: Option<String>,
    pub company_logo: Option<String>,
    pub introduction_text: Option<String>,
    pub initial_suggested_questions: Option<Vec<String>>,
    /// Anything that is not a non-negative integer
    /// falls back to the default.
    pub show_number_of_questions: Option<toml::Value>,
    pub input_placeholder: Option<String>,
    pub primary_color: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct EndpointConfig {
    pub chat_url: Option<String>,
    pub questions_url: Option<String>,
    pub analytics_url: Option<String>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_SHOW_NUMBER_OF_QUESTIONS: usize = 3;
pub const DEFAULT_COMPANY_NAME: &str = "Apollo Tyres";
pub const DEFAULT_COMPANY_LOGO: &str = "assets/images/company-logo.png";
pub const DEFAULT_INTRODUCTION: &str = "### 👋 Welcome to our AI Help Chat.";
pub const DEFAULT_INPUT_PLACEHOLDER: &str = "Type your question here...";
pub const DEFAULT_PRIMARY_COLOR: &str = "#0066cc";
pub const DEFAULT_CHAT_URL: &str = "http://localhost:9006/chat/stream";
pub const DEFAULT_QUESTIONS_URL: &str = "http://localhost:9006/chat/generate-questions";
pub const DEFAULT_ANALYTICS_URL: &str = "http://localhost:9006/analytics";

const DEFAULT_SUGGESTED_QUESTIONS: &[&str] = &[
    "What is the warranty period for Apollo tyres?",
    "How do I claim warranty for my tyres?",
    "What is covered under tyre warranty?",
    "How to check warranty status of my tyres?",
    "What documents are needed for warranty claim?",
];

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub company_name: String,
    pub company_logo: String,
    pub introduction_text: String,
    pub initial_suggested_questions: Vec<String>,
    pub show_number_of_questions: usize,
    pub input_placeholder: String,
    pub primary_color: String,
    pub chat_url: String,
    pub questions_url: String,
    pub analytics_url: String,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        resolve_with(&ConciergeConfig::default(), None, |_| None)
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns the `~/.concierge` directory.
pub fn home_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".concierge"))
}

/// Returns the path to `~/.concierge/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    home_dir().map(|d| d.join("config.toml"))
}

/// Load config from `path`, or `~/.concierge/config.toml` when `None`.
///
/// A missing default file is generated (commented out) and defaults are
/// returned. An explicit path that does not exist is an error.
pub fn load_config(path: Option<&Path>) -> Result<ConciergeConfig, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match config_path() {
            Some(p) => {
                if !p.exists() {
                    info!("No config file found, generating default at {}", p.display());
                    generate_default_config(&p);
                    return Ok(ConciergeConfig::default());
                }
                p
            }
            None => {
                warn!("Could not determine home directory, using default config");
                return Ok(ConciergeConfig::default());
            }
        },
    };

    let contents = fs::read_to_string(&path).map_err(ConfigError::Io)?;
    let config: ConciergeConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

/// Commented-out default config written on first run. Every line is a comment,
/// so it parses to `ConciergeConfig::default()`.
const DEFAULT_CONFIG_TEMPLATE: &str = r####"# Concierge Configuration
# All settings are optional. Defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [widget]
# company_name = "Apollo Tyres"
# company_logo = "assets/images/company-logo.png"
# introduction_text = "### 👋 Welcome to our AI Help Chat."
# initial_suggested_questions = [
#     "What is the warranty period for Apollo tyres?",
#     "How do I claim warranty for my tyres?",
# ]
# show_number_of_questions = 3      # anything but a whole number means 3
# input_placeholder = "Type your question here..."
# primary_color = "#0066cc"

# [endpoints]
# chat_url = "http://localhost:9006/chat/stream"                 # Or CONCIERGE_CHAT_URL
# questions_url = "http://localhost:9006/chat/generate-questions" # Or CONCIERGE_QUESTIONS_URL
# analytics_url = "http://localhost:9006/analytics"              # Or CONCIERGE_ANALYTICS_URL
"####;

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &Path) {
    if let Some(parent) = path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!("Failed to create config directory: {}", e);
        return;
    }
    if let Err(e) = fs::write(path, DEFAULT_CONFIG_TEMPLATE) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
///
/// `cli_chat_url` is the `--chat-url` flag (None = not specified).
pub fn resolve(config: &ConciergeConfig, cli_chat_url: Option<&str>) -> ResolvedConfig {
    resolve_with(config, cli_chat_url, |key| std::env::var(key).ok())
}

fn resolve_with(
    config: &ConciergeConfig,
    cli_chat_url: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> ResolvedConfig {
    let widget = &config.widget;
    let endpoints = &config.endpoints;

    // Chat URL: CLI → env → config → default
    let chat_url = cli_chat_url
        .map(|s| s.to_string())
        .or_else(|| env("CONCIERGE_CHAT_URL"))
        .or_else(|| endpoints.chat_url.clone())
        .unwrap_or_else(|| DEFAULT_CHAT_URL.to_string());

    let questions_url = env("CONCIERGE_QUESTIONS_URL")
        .or_else(|| endpoints.questions_url.clone())
        .unwrap_or_else(|| DEFAULT_QUESTIONS_URL.to_string());

    let analytics_url = env("CONCIERGE_ANALYTICS_URL")
        .or_else(|| endpoints.analytics_url.clone())
        .unwrap_or_else(|| DEFAULT_ANALYTICS_URL.to_string());

    ResolvedConfig {
        company_name: widget
            .company_name
            .clone()
            .unwrap_or_else(|| DEFAULT_COMPANY_NAME.to_string()),
        company_logo: widget
            .company_logo
            .clone()
            .unwrap_or_else(|| DEFAULT_COMPANY_LOGO.to_string()),
        introduction_text: widget
            .introduction_text
            .clone()
            .unwrap_or_else(|| DEFAULT_INTRODUCTION.to_string()),
        initial_suggested_questions: widget.initial_suggested_questions.clone().unwrap_or_else(
            || DEFAULT_SUGGESTED_QUESTIONS.iter().map(|q| q.to_string()).collect(),
        ),
        show_number_of_questions: resolve_question_count(widget.show_number_of_questions.as_ref()),
        input_placeholder: widget
            .input_placeholder
            .clone()
            .unwrap_or_else(|| DEFAULT_INPUT_PLACEHOLDER.to_string()),
        primary_color: widget
            .primary_color
            .clone()
            .unwrap_or_else(|| DEFAULT_PRIMARY_COLOR.to_string()),
        chat_url,
        questions_url,
        analytics_url,
    }
}

fn resolve_question_count(value: Option<&toml::Value>) -> usize {
    match value {
        Some(toml::Value::Integer(n)) if *n >= 0 => *n as usize,
        Some(other) => {
            warn!(
                "show_number_of_questions must be a whole number, got {}; using {}",
                other, DEFAULT_SHOW_NUMBER_OF_QUESTIONS
            );
            DEFAULT_SHOW_NUMBER_OF_QUESTIONS
        }
        None => DEFAULT_SHOW_NUMBER_OF_QUESTIONS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_resolve_uses_defaults_when_empty() {
        let resolved = resolve_with(&ConciergeConfig::default(), None, no_env);
        assert_eq!(resolved.show_number_of_questions, 3);
        assert_eq!(resolved.company_name, DEFAULT_COMPANY_NAME);
        assert_eq!(resolved.initial_suggested_questions.len(), 5);
        assert_eq!(resolved.chat_url, DEFAULT_CHAT_URL);
    }

    #[test]
    fn test_sparse_toml_parses() {
        let toml_str = r#"
[widget]
company_name = "Acme Wheels"
"#;
        let config: ConciergeConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.widget.company_name.as_deref(), Some("Acme Wheels"));
        assert!(config.widget.show_number_of_questions.is_none());
        assert!(config.endpoints.chat_url.is_none());
    }

    #[test]
    fn test_question_count_falls_back_unless_whole_number() {
        let cases = [
            ("show_number_of_questions = 5", 5),
            ("show_number_of_questions = 0", 0),
            ("show_number_of_questions = -2", 3),
            ("show_number_of_questions = 2.5", 3),
            ("show_number_of_questions = \"4\"", 3),
            ("show_number_of_questions = true", 3),
        ];
        for (line, expected) in cases {
            let config: ConciergeConfig = toml::from_str(&format!("[widget]\n{line}\n")).unwrap();
            let resolved = resolve_with(&config, None, no_env);
            assert_eq!(resolved.show_number_of_questions, expected, "{line}");
        }
    }

    #[test]
    fn test_env_overrides_file_and_cli_overrides_env() {
        let config = ConciergeConfig {
            endpoints: EndpointConfig {
                chat_url: Some("http://file/chat".into()),
                questions_url: Some("http://file/questions".into()),
                analytics_url: None,
            },
            ..Default::default()
        };
        let env = |key: &str| match key {
            "CONCIERGE_CHAT_URL" => Some("http://env/chat".to_string()),
            "CONCIERGE_ANALYTICS_URL" => Some("http://env/analytics".to_string()),
            _ => None,
        };

        let resolved = resolve_with(&config, None, env);
        assert_eq!(resolved.chat_url, "http://env/chat");
        assert_eq!(resolved.questions_url, "http://file/questions");
        assert_eq!(resolved.analytics_url, "http://env/analytics");

        let resolved = resolve_with(&config, Some("http://cli/chat"), env);
        assert_eq!(resolved.chat_url, "http://cli/chat");
    }

    #[test]
    fn test_full_toml() {
        let toml_str = r##"
[widget]
company_name = "Acme"
introduction_text = "Hi!"
initial_suggested_questions = ["A?", "B?"]
show_number_of_questions = 1
primary_color = "#ff0000"

[endpoints]
analytics_url = "http://stats.local"
"##;
        let config: ConciergeConfig = toml::from_str(toml_str).unwrap();
        let resolved = resolve_with(&config, None, no_env);
        assert_eq!(resolved.introduction_text, "Hi!");
        assert_eq!(resolved.initial_suggested_questions, vec!["A?", "B?"]);
        assert_eq!(resolved.show_number_of_questions, 1);
        assert_eq!(resolved.primary_color, "#ff0000");
        assert_eq!(resolved.analytics_url, "http://stats.local");
    }

    #[test]
    fn test_default_template_parses_to_defaults() {
        let config: ConciergeConfig = toml::from_str(DEFAULT_CONFIG_TEMPLATE).unwrap();
        assert!(config.widget.introduction_text.is_none());
        assert!(config.endpoints.chat_url.is_none());

        let resolved = resolve_with(&config, None, no_env);
        assert_eq!(resolved.show_number_of_questions, 3);
        assert_eq!(resolved.introduction_text, DEFAULT_INTRODUCTION);
    }

    #[test]
    fn test_generated_default_config_loads() {
        let dir = std::env::temp_dir().join(format!("concierge-{}", uuid::Uuid::new_v4()));
        let path = dir.join("config.toml");
        generate_default_config(&path);
        assert!(fs::read_to_string(&path).unwrap().contains("### 👋 Welcome"));

        let config = load_config(Some(&path)).unwrap();
        assert!(config.widget.company_name.is_none());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_explicit_path() {
        let path = std::env::temp_dir().join(format!("concierge-{}.toml", uuid::Uuid::new_v4()));
        fs::write(&path, "[widget]\ninput_placeholder = \"Ask away\"\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.widget.input_placeholder.as_deref(), Some("Ask away"));
        fs::remove_file(&path).unwrap();

        assert!(matches!(load_config(Some(&path)), Err(ConfigError::Io(_))));
    }
}
