// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::try_create_layers;
use miette::IntoDiagnostic;
use tracing::dispatcher::DefaultGuard;
use tracing_core::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Where log output goes, and how much of it.
///
/// Fields:
/// - `writer_config`: [`WriterConfig`] to choose where to write the logs.
/// - `level_filter`: [`LevelFilter`] to use. [`LevelFilter::OFF`] disables logging.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub writer_config: WriterConfig,
    pub level_filter: LevelFilter,
}

/// - `String` is the path of the log file, eg: `/tmp/cmdline_echo.log`.
/// - [`DisplayPreference`] is the display to log to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriterConfig {
    None,
    Display(DisplayPreference),
    File(String),
    DisplayAndFile(DisplayPreference, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayPreference {
    Stdout,
    Stderr,
}

impl TracingConfig {
    #[must_use]
    pub fn new_file(file_path: impl Into<String>, level_filter: LevelFilter) -> Self {
        Self {
            writer_config: WriterConfig::File(file_path.into()),
            level_filter,
        }
    }

    #[must_use]
    pub fn new_display(preference: DisplayPreference, level_filter: LevelFilter) -> Self {
        Self {
            writer_config: WriterConfig::Display(preference),
            level_filter,
        }
    }

    #[must_use]
    pub fn get_writer_config(&self) -> WriterConfig { self.writer_config.clone() }

    #[must_use]
    pub fn get_level_filter(&self) -> LevelFilter { self.level_filter }

    /// Install as the process-wide default subscriber.
    ///
    /// # Errors
    ///
    /// The log file can't be created, or a global subscriber is already installed.
    pub fn install_global(self) -> miette::Result<()> {
        let layers = try_create_layers(self)?;
        tracing_subscriber::registry()
            .with(layers)
            .try_init()
            .into_diagnostic()
    }

    /// Install for the current thread only, until the returned guard is dropped.
    /// Handy in tests.
    ///
    /// # Errors
    ///
    /// The log file can't be created.
    pub fn install_thread_local(self) -> miette::Result<DefaultGuard> {
        let layers = try_create_layers(self)?;
        let subscriber = tracing_subscriber::registry().with(layers);
        Ok(tracing::subscriber::set_default(subscriber))
    }
}

/// Logging is off unless a level is given.
impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            writer_config: WriterConfig::None,
            level_filter: LevelFilter::OFF,
        }
    }
}
