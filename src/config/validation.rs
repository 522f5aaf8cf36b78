use crate::config::types::{
    Config, ExtractConfig, FetchConfig, OutputConfig, PaginationConfig, SiteConfig,
};
use crate::ConfigError;
use reqwest::header::HeaderValue;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_fetch_config(&config.fetch)?;
    validate_pagination_config(&config.pagination)?;
    validate_extract_config(&config.extract)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the listing site coordinates
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let base = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must use http or https, got '{}'",
            base.scheme()
        )));
    }

    validate_coordinate("bucket", &config.bucket)?;
    validate_coordinate("subcategory", &config.subcategory)?;

    Url::parse(&config.referer)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid referer: {}", e)))?;

    Ok(())
}

/// A listing coordinate is spliced into a path segment, so it must stay inside one
fn validate_coordinate(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{} cannot be empty", field)));
    }

    if value.contains('/') || value.contains('?') || value.contains('#') {
        return Err(ConfigError::Validation(format!(
            "{} must be a single path token, got '{}'",
            field, value
        )));
    }

    Ok(())
}

/// Validates fetch timing and identity settings
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.max_retries == 0 {
        return Err(ConfigError::Validation(
            "max_retries must be >= 1".to_string(),
        ));
    }

    if config.pacing_min_ms > config.pacing_max_ms {
        return Err(ConfigError::Validation(format!(
            "pacing_min_ms ({}) cannot exceed pacing_max_ms ({})",
            config.pacing_min_ms, config.pacing_max_ms
        )));
    }

    if config.rate_limit_default_wait_ms > config.rate_limit_max_total_wait_ms {
        return Err(ConfigError::Validation(format!(
            "rate_limit_default_wait_ms ({}) cannot exceed rate_limit_max_total_wait_ms ({})",
            config.rate_limit_default_wait_ms, config.rate_limit_max_total_wait_ms
        )));
    }

    if config.rate_limit_max_waits == 0 {
        return Err(ConfigError::Validation(
            "rate_limit_max_waits must be >= 1".to_string(),
        ));
    }

    if config.user_agents.is_empty() {
        return Err(ConfigError::Validation(
            "user_agents must contain at least one entry".to_string(),
        ));
    }

    if config.user_agents.iter().any(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "user_agents cannot contain blank entries".to_string(),
        ));
    }

    if let Some(ua) = config
        .user_agents
        .iter()
        .find(|ua| HeaderValue::from_str(ua).is_err())
    {
        return Err(ConfigError::Validation(format!(
            "user agent {:?} is not a valid header value",
            ua
        )));
    }

    if HeaderValue::from_str(&config.accept_language).is_err() {
        return Err(ConfigError::Validation(format!(
            "accept_language {:?} is not a valid header value",
            config.accept_language
        )));
    }

    Ok(())
}

/// Validates the page walk limits
fn validate_pagination_config(config: &PaginationConfig) -> Result<(), ConfigError> {
    if config.max_pages == 0 {
        return Err(ConfigError::Validation(
            "max_pages must be >= 1".to_string(),
        ));
    }

    if config.full_page_threshold == 0 {
        return Err(ConfigError::Validation(
            "full_page_threshold must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates selectors and identifier patterns
fn validate_extract_config(config: &ExtractConfig) -> Result<(), ConfigError> {
    if config.record_selectors.is_empty() {
        return Err(ConfigError::Validation(
            "record_selectors must contain at least one selector".to_string(),
        ));
    }

    for selector in &config.record_selectors {
        validate_selector(selector)?;
    }

    validate_id_pattern(&config.link_id_pattern)?;
    validate_id_pattern(&config.image_id_pattern)?;

    Ok(())
}

/// Checks that a CSS selector parses
pub(crate) fn validate_selector(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

/// Checks that an identifier pattern compiles and captures the token
pub(crate) fn validate_id_pattern(pattern: &str) -> Result<regex_lite::Regex, ConfigError> {
    let regex = regex_lite::Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;

    // Group 0 is the whole match
    if regex.captures_len() < 2 {
        return Err(ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            message: "pattern must contain a capture group for the identifier".to_string(),
        });
    }

    Ok(regex)
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.path.trim().is_empty() {
        return Err(ConfigError::Validation("path cannot be empty".to_string()));
    }

    if !(-12..=14).contains(&config.utc_offset_hours) {
        return Err(ConfigError::Validation(format!(
            "utc_offset_hours must be between -12 and 14, got {}",
            config.utc_offset_hours
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_base_url() {
        let mut config = Config::default();
        config.site.base_url = "not a url".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));

        config.site.base_url = "ftp://listing.example.com".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_validate_coordinate() {
        assert!(validate_coordinate("bucket", "1").is_ok());
        assert!(validate_coordinate("bucket", "abc").is_ok());

        assert!(validate_coordinate("bucket", "").is_err());
        assert!(validate_coordinate("bucket", "1/2").is_err());
        assert!(validate_coordinate("bucket", "1?x").is_err());
    }

    #[test]
    fn test_validate_pacing_range() {
        let mut config = Config::default();
        config.fetch.pacing_min_ms = 500;
        config.fetch.pacing_max_ms = 100;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));

        config.fetch.pacing_max_ms = 500;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_validate_user_agents() {
        let mut config = Config::default();
        config.fetch.user_agents.clear();
        assert!(validate(&config).is_err());

        config.fetch.user_agents = vec!["  ".to_string()];
        assert!(validate(&config).is_err());

        config.fetch.user_agents = vec!["Mozilla/5.0\r\nX-Extra: 1".to_string()];
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_accept_language() {
        let mut config = Config::default();
        config.fetch.accept_language = "zh-CN\nX-Injected: 1".to_string();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("accept_language"));

        config.fetch.accept_language = "ja-JP,ja;q=0.9".to_string();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_validate_zero_limits() {
        let mut config = Config::default();
        config.pagination.full_page_threshold = 0;
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.fetch.max_retries = 0;
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.fetch.rate_limit_max_waits = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_validate_selector() {
        assert!(validate_selector("div.actor-card").is_ok());
        assert!(validate_selector(r#"[class*="actor-card"]"#).is_ok());

        assert!(matches!(
            validate_selector("div..broken"),
            Err(ConfigError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn test_validate_id_pattern() {
        assert!(validate_id_pattern(r"/actor/([a-f0-9-]+)/").is_ok());

        assert!(matches!(
            validate_id_pattern(r"/actor/[a-f0-9-]+/"),
            Err(ConfigError::InvalidPattern { .. })
        ));
        assert!(matches!(
            validate_id_pattern(r"/actor/([a-f0-9-+/"),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_validate_utc_offset() {
        let mut config = Config::default();
        config.output.utc_offset_hours = 15;
        assert!(validate(&config).is_err());

        config.output.utc_offset_hours = -12;
        assert!(validate(&config).is_ok());
    }
}
