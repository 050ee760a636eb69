use crate::config::types::{
    Config, DispatcherConfig, FetcherConfig, OutputConfig, RewriterConfig, SourceConfig,
    SourceKind,
};
use crate::storage::is_valid_identifier;
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_fetcher_config(&config.fetcher)?;
    validate_dispatcher_config(&config.dispatcher)?;
    validate_output_config(&config.output)?;
    if let Some(rewriter) = &config.rewriter {
        validate_rewriter_config(rewriter)?;
    }
    validate_sources(&config.sources)?;
    Ok(())
}

fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 || config.timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "timeout-secs must be between 1 and 300, got {}",
            config.timeout_secs
        )));
    }

    if let Some(agent) = &config.user_agent {
        if agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "user-agent cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_dispatcher_config(config: &DispatcherConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 256 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 256, got {}",
            config.workers
        )));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_rewriter_config(config: &RewriterConfig) -> Result<(), ConfigError> {
    Url::parse(&config.endpoint).map_err(|e| {
        ConfigError::InvalidUrl(format!(
            "Invalid rewriter endpoint '{}': {}",
            config.endpoint, e
        ))
    })?;

    if config.model.trim().is_empty() {
        return Err(ConfigError::Validation(
            "rewriter model cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "rewriter timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates source entries, including name uniqueness across all sources
fn validate_sources(sources: &[SourceConfig]) -> Result<(), ConfigError> {
    let mut names = HashSet::new();

    for source in sources {
        if source.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "source name cannot be empty".to_string(),
            ));
        }

        if !names.insert(source.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate source name '{}'",
                source.name
            )));
        }

        validate_source(source)?;
    }

    Ok(())
}

fn validate_source(source: &SourceConfig) -> Result<(), ConfigError> {
    if source.kind == SourceKind::Postgres && !cfg!(feature = "postgres") {
        return Err(ConfigError::Validation(format!(
            "source '{}' uses kind \"postgres\" but this build lacks the postgres feature",
            source.name
        )));
    }

    if source.location.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "source '{}' location cannot be empty",
            source.name
        )));
    }

    for (key, value) in [
        ("table", &source.table),
        ("column", &source.column),
        ("output-table", &source.output_table),
    ] {
        if !is_valid_identifier(value) {
            return Err(ConfigError::InvalidIdentifier(format!(
                "source '{}' {} '{}'",
                source.name, key, value
            )));
        }
    }

    if source.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "source '{}' batch-size must be >= 1",
            source.name
        )));
    }

    if source.poll_interval_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "source '{}' poll-interval-secs must be >= 1",
            source.name
        )));
    }

    Ok(())
}
