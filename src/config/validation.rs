use super::{AppConfig, ConfigError};

/// Validate the full application config, returning an error if any rule is violated.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] when any configuration invariant is violated.
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    validate_agent(config)?;
    validate_supported_urls(config)?;
    validate_log_level(config)?;
    Ok(())
}

fn validation_err(msg: impl Into<String>) -> ConfigError {
    ConfigError::Validation(msg.into())
}

fn validate_agent(config: &AppConfig) -> Result<(), ConfigError> {
    let agent = &config.agent;
    let parsed = url::Url::parse(agent.base_url.trim())
        .map_err(|err| validation_err(format!("agent.base_url is not a valid URL: {err}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(validation_err(
            "agent.base_url must start with http:// or https://",
        ));
    }
    if agent.api_key.trim().is_empty() {
        return Err(validation_err("agent.api_key cannot be empty"));
    }
    if agent.timeout == 0 {
        return Err(validation_err("agent.timeout must be greater than 0"));
    }
    Ok(())
}

fn validate_supported_urls(config: &AppConfig) -> Result<(), ConfigError> {
    for (media_type, patterns) in &config.agent.supported_urls {
        if media_type.trim().is_empty() {
            return Err(validation_err(
                "agent.supported_urls contains an empty media type",
            ));
        }
        for pattern in patterns {
            regex_lite::Regex::new(pattern).map_err(|err| {
                validation_err(format!(
                    "agent.supported_urls['{media_type}']: invalid pattern '{pattern}': {err}"
                ))
            })?;
        }
    }
    Ok(())
}

fn validate_log_level(config: &AppConfig) -> Result<(), ConfigError> {
    let valid_levels = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL", "DISABLED"];
    if !valid_levels.contains(&config.features.log_level.to_uppercase().as_str()) {
        return Err(validation_err(format!(
            "log_level must be one of {valid_levels:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::*;
    use crate::stream::CancelPolicy;

    fn make_valid_config() -> AppConfig {
        AppConfig {
            agent: AgentConfig {
                base_url: "https://gateway.example.com".to_string(),
                api_key: "sk-test".to_string(),
                timeout: 180,
                on_cancel: CancelPolicy::Flush,
                supported_urls: default_supported_urls(),
            },
            features: FeaturesConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&make_valid_config()).is_ok());
    }

    #[test]
    fn test_invalid_base_url() {
        let mut config = make_valid_config();
        config.agent.base_url = "ftp://bad.url".to_string();
        assert!(validate_config(&config).is_err());

        config.agent.base_url = "not a url".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_empty_api_key() {
        let mut config = make_valid_config();
        config.agent.api_key = "  ".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_timeout() {
        let mut config = make_valid_config();
        config.agent.timeout = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_invalid_url_pattern() {
        let mut config = make_valid_config();
        config
            .agent
            .supported_urls
            .insert("application/pdf".to_string(), vec!["(unclosed".to_string()]);
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("application/pdf"));
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = make_valid_config();
        config.features.log_level = "VERBOSE".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_log_level_is_case_insensitive() {
        let mut config = make_valid_config();
        config.features.log_level = "warning".to_string();
        assert!(validate_config(&config).is_ok());
    }
}
