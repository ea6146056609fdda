mod llm;
mod server;
mod sessions;
mod turn;

pub use llm::*;
pub use server::*;
pub use sessions::*;
pub use turn::*;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub turn: TurnConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.port".into(),
                message: "port must be greater than 0".into(),
            });
        }
        if self.server.host.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.host".into(),
                message: "host must not be empty".into(),
            });
        }

        if self.sessions.max_sessions == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "sessions.max_sessions".into(),
                message: "max_sessions must be greater than 0 (slot 0 is LOCAL)".into(),
            });
        }
        if self.sessions.session_timeout_sec == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "sessions.session_timeout_sec".into(),
                message: "session_timeout_sec must be greater than 0".into(),
            });
        }
        if self.sessions.max_satellite_workers == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "sessions.max_satellite_workers".into(),
                message: "max_satellite_workers must be greater than 0".into(),
            });
        }

        if self.turn.max_tool_iterations == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "turn.max_tool_iterations".into(),
                message: "max_tool_iterations must be greater than 0".into(),
            });
        }

        if self.llm.default_kind == LlmKind::Cloud && self.llm.default_cloud_provider.is_none() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "llm.default_cloud_provider".into(),
                message: "default_kind = cloud requires default_cloud_provider".into(),
            });
        }
        if self.llm.default_kind == LlmKind::Local && self.llm.local.endpoint.is_none() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "llm.local.endpoint".into(),
                message: "default_kind = local but no local.endpoint configured".into(),
            });
        }

        let mut seen_providers: HashSet<CloudProvider> = HashSet::new();
        for (i, provider) in self.llm.cloud_providers.iter().enumerate() {
            if provider.endpoint.is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("llm.cloud_providers[{i}].endpoint"),
                    message: "endpoint must not be empty".into(),
                });
            } else if !provider.endpoint.starts_with("http://")
                && !provider.endpoint.starts_with("https://")
            {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("llm.cloud_providers[{i}].endpoint"),
                    message: format!(
                        "endpoint must start with http:// or https:// (got \"{}\")",
                        provider.endpoint
                    ),
                });
            }
            if provider.api_key_env.is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("llm.cloud_providers[{i}].api_key_env"),
                    message: "api_key_env must not be empty".into(),
                });
            }
            if !seen_providers.insert(provider.provider) {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Warning,
                    field: format!("llm.cloud_providers[{i}].provider"),
                    message: format!(
                        "duplicate cloud provider {:?} — later entry will shadow earlier one",
                        provider.provider
                    ),
                });
            }
        }

        if self.server.cors.allowed_origins.len() == 1 && self.server.cors.allowed_origins[0] == "*" {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "server.cors.allowed_origins".into(),
                message: "wildcard \"*\" allows all origins (not recommended for production)".into(),
            });
        }

        errors
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            llm: LlmConfig {
                default_kind: LlmKind::Cloud,
                default_cloud_provider: Some(CloudProvider::Openai),
                cloud_providers: vec![CloudProviderConfig {
                    provider: CloudProvider::Openai,
                    endpoint: "https://api.openai.com/v1".into(),
                    api_key_env: "OPENAI_API_KEY".into(),
                    default_model: "gpt-4o".into(),
                }],
                ..LlmConfig::default()
            },
            ..Config::default()
        }
    }

    fn find_issue<'a>(issues: &'a [ConfigError], field_prefix: &str) -> Option<&'a ConfigError> {
        issues.iter().find(|e| e.field.starts_with(field_prefix))
    }

    #[test]
    fn valid_config_passes() {
        let issues = valid_config().validate();
        let errors: Vec<_> = issues.iter().filter(|e| e.severity == ConfigSeverity::Error).collect();
        assert!(errors.is_empty(), "expected no errors, got: {errors:?}");
    }

    #[test]
    fn server_port_zero_is_error() {
        let mut cfg = valid_config();
        cfg.server.port = 0;
        let issues = cfg.validate();
        assert_eq!(find_issue(&issues, "server.port").unwrap().severity, ConfigSeverity::Error);
    }

    #[test]
    fn max_sessions_zero_is_error() {
        let mut cfg = valid_config();
        cfg.sessions.max_sessions = 0;
        let issues = cfg.validate();
        assert_eq!(
            find_issue(&issues, "sessions.max_sessions").unwrap().severity,
            ConfigSeverity::Error
        );
    }

    #[test]
    fn max_tool_iterations_zero_is_error() {
        let mut cfg = valid_config();
        cfg.turn.max_tool_iterations = 0;
        let issues = cfg.validate();
        assert_eq!(
            find_issue(&issues, "turn.max_tool_iterations").unwrap().severity,
            ConfigSeverity::Error
        );
    }

    #[test]
    fn cloud_kind_without_provider_is_error() {
        let mut cfg = valid_config();
        cfg.llm.default_cloud_provider = None;
        let issues = cfg.validate();
        assert!(find_issue(&issues, "llm.default_cloud_provider").is_some());
    }

    #[test]
    fn local_kind_without_endpoint_is_warning() {
        let mut cfg = valid_config();
        cfg.llm.default_kind = LlmKind::Local;
        cfg.llm.local.endpoint = None;
        let issues = cfg.validate();
        assert_eq!(
            find_issue(&issues, "llm.local.endpoint").unwrap().severity,
            ConfigSeverity::Warning
        );
    }

    #[test]
    fn provider_bad_scheme_is_error() {
        let mut cfg = valid_config();
        cfg.llm.cloud_providers[0].endpoint = "ftp://example.com".into();
        let issues = cfg.validate();
        assert_eq!(
            find_issue(&issues, "llm.cloud_providers[0].endpoint").unwrap().severity,
            ConfigSeverity::Error
        );
    }

    #[test]
    fn duplicate_provider_is_warning() {
        let mut cfg = valid_config();
        let dup = cfg.llm.cloud_providers[0].clone();
        cfg.llm.cloud_providers.push(dup);
        let issues = cfg.validate();
        let dup_issue = issues.iter().find(|e| e.message.contains("duplicate")).unwrap();
        assert_eq!(dup_issue.severity, ConfigSeverity::Warning);
    }

    #[test]
    fn cors_wildcard_is_warning() {
        let mut cfg = valid_config();
        cfg.server.cors.allowed_origins = vec!["*".into()];
        let issues = cfg.validate();
        assert_eq!(
            find_issue(&issues, "server.cors.allowed_origins").unwrap().severity,
            ConfigSeverity::Warning
        );
    }

    #[test]
    fn config_round_trips_through_toml() {
        let cfg = valid_config();
        let rendered = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.llm.default_kind, cfg.llm.default_kind);
        assert_eq!(parsed.sessions.max_sessions, cfg.sessions.max_sessions);
    }

    #[test]
    fn config_error_display_format() {
        let err = ConfigError {
            severity: ConfigSeverity::Error,
            field: "server.port".into(),
            message: "port must be greater than 0".into(),
        };
        assert_eq!(format!("{err}"), "[ERROR] server.port: port must be greater than 0");
    }
}
