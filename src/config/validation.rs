use crate::config::types::{
    Config, CrawlerConfig, SelectorConfig, TargetConfig, UserAgentConfig, VocabularyConfig,
};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_target_config(&config.target)?;
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_vocabulary(&config.vocabulary)?;
    validate_selectors(&config.selectors)?;
    Ok(())
}

/// Validates the target description
fn validate_target_config(config: &TargetConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_location).map_err(|e| {
        ConfigError::InvalidUrl(format!(
            "Invalid base_location '{}': {}",
            config.base_location, e
        ))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_location '{}' must use HTTP or HTTPS",
            config.base_location
        )));
    }

    for (name, value) in [
        ("results_pattern", &config.results_pattern),
        ("login_pattern", &config.login_pattern),
        ("page_param", &config.page_param),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::InvalidPattern(format!(
                "{} cannot be empty",
                name
            )));
        }
    }

    if !config
        .page_param
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "page_param must be a plain query key, got '{}'",
            config.page_param
        )));
    }

    Ok(())
}

/// Validates crawl loop timing and bounds
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.gate_poll_interval_ms == 0 || config.verify_interval_ms == 0 {
        return Err(ConfigError::Validation(
            "poll intervals must be greater than zero".to_string(),
        ));
    }

    if config.gate_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "gate_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.gate_required_clears < 1 {
        return Err(ConfigError::Validation(format!(
            "gate_required_clears must be >= 1, got {}",
            config.gate_required_clears
        )));
    }

    if config.verify_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "verify_attempts must be >= 1, got {}",
            config.verify_attempts
        )));
    }

    if config.stall_horizon < 1 {
        return Err(ConfigError::Validation(format!(
            "stall_horizon must be >= 1, got {}",
            config.stall_horizon
        )));
    }

    if config.max_advance_failures < 1 {
        return Err(ConfigError::Validation(format!(
            "max_advance_failures must be >= 1, got {}",
            config.max_advance_failures
        )));
    }

    if config.max_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max_pages must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.name.is_empty() {
        return Err(ConfigError::Validation("name cannot be empty".to_string()));
    }

    if !config
        .name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "name must contain only alphanumeric characters and hyphens, got '{}'",
            config.name
        )));
    }

    if let Some(contact_url) = &config.contact_url {
        Url::parse(contact_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates the domain vocabulary
fn validate_vocabulary(config: &VocabularyConfig) -> Result<(), ConfigError> {
    if config.challenge_keywords.iter().all(|k| k.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "challenge_keywords needs at least one keyword".to_string(),
        ));
    }

    if config.default_headers.is_empty() {
        return Err(ConfigError::Validation(
            "default_headers cannot be empty".to_string(),
        ));
    }

    for (name, value) in [
        ("identifier_field", &config.identifier_field),
        ("name_field", &config.name_field),
        ("sequence_field", &config.sequence_field),
        ("link_suffix", &config.link_suffix),
        ("positional_prefix", &config.positional_prefix),
    ] {
        if value.is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    Ok(())
}

/// Validates that every selector parses as CSS
fn validate_selectors(config: &SelectorConfig) -> Result<(), ConfigError> {
    if config.pagination.is_empty() {
        return Err(ConfigError::Validation(
            "at least one pagination selector is required".to_string(),
        ));
    }

    let singles = [
        &config.page_number,
        &config.active_page,
        &config.next_page,
    ];
    for selector in config
        .pagination
        .iter()
        .chain(config.challenge.iter())
        .chain(singles)
    {
        validate_selector(selector)?;
    }

    Ok(())
}

fn validate_selector(selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidPattern(format!("Invalid selector '{}': {:?}", selector, e)))
}
