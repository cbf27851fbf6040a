use crate::config::types::{
    ApiConfig, Config, CrawlerConfig, RateLimitConfig, RetryConfig, StorageConfig,
};
use crate::query::{FacetDimensions, StarRange, TimeWindow};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_api_config(&config.api)?;
    validate_crawler_config(&config.crawler)?;
    validate_rate_limit_config(&config.rate_limit)?;
    validate_retry_config(&config.retry)?;
    validate_storage_config(&config.storage)?;

    let dimensions = FacetDimensions::from_config(&config.search)?;
    validate_dimensions(&dimensions)?;
    Ok(())
}

/// Validates API connection settings
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.endpoint)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid endpoint: {}", e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl(format!(
            "Endpoint '{}' must use http or https",
            config.endpoint
        )));
    }

    if config.token_env.is_empty() {
        return Err(ConfigError::Validation(
            "token_env cannot be empty".to_string(),
        ));
    }

    if config.page_size < 1 || config.page_size > 100 {
        return Err(ConfigError::Validation(format!(
            "page_size must be between 1 and 100, got {}",
            config.page_size
        )));
    }

    if config.request_timeout_secs == 0 || config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request and connect timeouts must be at least 1 second".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawl loop settings
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.target_count < 1 {
        return Err(ConfigError::Validation(
            "target_count must be >= 1".to_string(),
        ));
    }

    if config.max_concurrency < 1 || config.max_concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrency must be between 1 and 100, got {}",
            config.max_concurrency
        )));
    }

    if config.flush_threshold < 1 {
        return Err(ConfigError::Validation(
            "flush_threshold must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_rate_limit_config(config: &RateLimitConfig) -> Result<(), ConfigError> {
    if config.requests_per_hour < 1 {
        return Err(ConfigError::Validation(
            "requests_per_hour must be >= 1".to_string(),
        ));
    }

    if config.window_secs < 1 {
        return Err(ConfigError::Validation(
            "window_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(
            "max_attempts must be >= 1".to_string(),
        ));
    }

    if config.initial_backoff_ms > config.max_backoff_ms {
        return Err(ConfigError::Validation(format!(
            "initial_backoff_ms ({}) cannot exceed max_backoff_ms ({})",
            config.initial_backoff_ms, config.max_backoff_ms
        )));
    }

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.flush_attempts < 1 {
        return Err(ConfigError::Validation(
            "flush_attempts must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates that every facet axis partitions the search space
///
/// Overlapping ranges would fetch the same repository under several
/// facets, so they are rejected rather than tolerated.
pub fn validate_dimensions(dimensions: &FacetDimensions) -> Result<(), ConfigError> {
    validate_languages(&dimensions.languages)?;
    validate_windows(&dimensions.windows)?;
    validate_star_ranges(&dimensions.star_ranges)?;
    Ok(())
}

fn validate_languages(languages: &[String]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for language in languages {
        let trimmed = language.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::Validation(
                "language cannot be empty".to_string(),
            ));
        }
        if trimmed.contains('"') {
            return Err(ConfigError::Validation(format!(
                "language '{}' cannot contain quotes",
                language
            )));
        }
        if !seen.insert(trimmed.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "language '{}' is listed more than once",
                language
            )));
        }
    }
    Ok(())
}

fn validate_windows(windows: &[TimeWindow]) -> Result<(), ConfigError> {
    for window in windows {
        if !window.is_well_formed() {
            return Err(ConfigError::Validation(format!(
                "window {}..{} ends before it starts",
                window.from, window.to
            )));
        }
    }

    for (i, a) in windows.iter().enumerate() {
        for b in &windows[i + 1..] {
            if a.overlaps(b) {
                return Err(ConfigError::OverlappingFacets(format!(
                    "creation windows {} and {} overlap",
                    a, b
                )));
            }
        }
    }
    Ok(())
}

fn validate_star_ranges(ranges: &[StarRange]) -> Result<(), ConfigError> {
    for range in ranges {
        if !range.is_well_formed() {
            return Err(ConfigError::Validation(format!(
                "star bucket {} has min greater than max",
                range
            )));
        }
    }

    for (i, a) in ranges.iter().enumerate() {
        for b in &ranges[i + 1..] {
            if a.overlaps(b) {
                return Err(ConfigError::OverlappingFacets(format!(
                    "star buckets {} and {} overlap",
                    a, b
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ranges(pairs: &[(u64, Option<u64>)]) -> Vec<StarRange> {
        pairs
            .iter()
            .map(|&(min, max)| StarRange::new(min, max))
            .collect()
    }

    #[test]
    fn test_disjoint_star_ranges_pass() {
        let r = ranges(&[(1, Some(9)), (10, Some(49)), (50, None)]);
        assert!(validate_star_ranges(&r).is_ok());
    }

    #[test]
    fn test_shared_edge_star_ranges_rejected() {
        let r = ranges(&[(1, Some(10)), (10, Some(50))]);
        assert!(matches!(
            validate_star_ranges(&r),
            Err(ConfigError::OverlappingFacets(_))
        ));
    }

    #[test]
    fn test_open_range_swallowing_later_bucket_rejected() {
        let r = ranges(&[(1000, None), (5000, Some(9000))]);
        assert!(validate_star_ranges(&r).is_err());
    }

    #[test]
    fn test_inverted_range_rejected() {
        let r = ranges(&[(50, Some(10))]);
        assert!(matches!(
            validate_star_ranges(&r),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_overlapping_windows_rejected() {
        let year = TimeWindow::calendar_year(2020).unwrap();
        let spring = TimeWindow::new(
            NaiveDate::from_ymd_opt(2020, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2020, 5, 31).unwrap(),
        );
        assert!(validate_windows(&[year, spring]).is_err());
        assert!(validate_windows(&[
            TimeWindow::calendar_year(2020).unwrap(),
            TimeWindow::calendar_year(2021).unwrap()
        ])
        .is_ok());
    }

    #[test]
    fn test_duplicate_language_rejected() {
        let langs = vec!["Rust".to_string(), "rust".to_string()];
        assert!(validate_languages(&langs).is_err());
        assert!(validate_languages(&["Go".to_string(), "C++".to_string()]).is_ok());
    }

    #[test]
    fn test_empty_dimensions_are_valid() {
        assert!(validate_dimensions(&FacetDimensions::default()).is_ok());
    }
}
