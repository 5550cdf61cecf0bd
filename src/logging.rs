// ABOUTME: Logging configuration and structured logging setup for observability
// ABOUTME: Configures log levels, formats, and output destinations via environment
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Labs

//! Production-ready logging configuration with structured output

use anyhow::Result;
use std::env;
use tracing::info;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Default service name for structured logging
const SERVICE_NAME: &str = "solace-triage";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty, compact)
    pub format: LogFormat,
    /// Include source file and line numbers
    pub include_location: bool,
    /// Service name for structured logging
    pub service_name: String,
    /// Environment (development, staging, production)
    pub environment: String,
}

/// Log output format options
#[derive(Debug, Clone)]
pub enum LogFormat {
    /// `JSON` format for production logging
    Json,
    /// Pretty format for development
    Pretty,
    /// Compact format for space-constrained environments
    Compact,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Pretty,
            include_location: false,
            service_name: SERVICE_NAME.into(),
            environment: "development".into(),
        }
    }
}

impl LoggingConfig {
    /// Create logging configuration from environment variables
    #[must_use]
    pub fn from_env() -> Self {
        let level = env::var("RUST_LOG").unwrap_or_else(|_| "info".into());

        let format = match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("compact") => LogFormat::Compact,
            _ => LogFormat::Pretty,
        };

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());
        let is_production = environment == "production";

        Self {
            level,
            format,
            include_location: is_production || env::var("LOG_INCLUDE_LOCATION").is_ok(),
            service_name: env::var("SERVICE_NAME").unwrap_or_else(|_| SERVICE_NAME.into()),
            environment,
        }
    }
}

/// Initialize the global tracing subscriber from the given configuration
///
/// # Errors
///
/// Returns an error if the level filter is invalid or a subscriber is
/// already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.level)
        .or_else(|_| EnvFilter::try_new("info"))?;

    match config.format {
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_current_span(true)
                .with_file(config.include_location)
                .with_line_number(config.include_location);
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init()?;
        }
        LogFormat::Pretty => {
            let layer = fmt::layer()
                .pretty()
                .with_file(config.include_location)
                .with_line_number(config.include_location);
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init()?;
        }
        LogFormat::Compact => {
            let layer = fmt::layer()
                .compact()
                .with_file(config.include_location)
                .with_line_number(config.include_location);
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init()?;
        }
    }

    info!(
        service = %config.service_name,
        environment = %config.environment,
        "logging initialized"
    );

    Ok(())
}
