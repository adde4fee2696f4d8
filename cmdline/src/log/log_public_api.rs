// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::TracingConfig;
use tracing::dispatcher::DefaultGuard;
use tracing_core::LevelFilter;

/// Logging is **DISABLED** by **default**.
///
/// Unless `options` carries a level other than [`LevelFilter::OFF`], nothing is
/// installed and every `tracing::debug!` etc. in this crate is a no-op.
///
/// # Errors
///
/// See [`TracingConfig::install_global()`].
pub fn try_initialize_logging_global(options: impl Into<TracingConfig>) -> miette::Result<()> {
    let it: TracingConfig = options.into();

    if matches!(it.get_level_filter(), LevelFilter::OFF) {
        return Ok(());
    }

    it.install_global()
}

/// Like [`try_initialize_logging_global()`], for the current thread only. Returns
/// [`None`] when logging is off.
///
/// # Errors
///
/// See [`TracingConfig::install_thread_local()`].
pub fn try_initialize_logging_thread_local(
    options: impl Into<TracingConfig>,
) -> miette::Result<Option<DefaultGuard>> {
    let it: TracingConfig = options.into();

    if matches!(it.get_level_filter(), LevelFilter::OFF) {
        return Ok(None);
    }

    it.install_thread_local().map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn off_installs_nothing() {
        assert!(
            try_initialize_logging_thread_local(TracingConfig::default())
                .unwrap()
                .is_none()
        );
        try_initialize_logging_global(TracingConfig::default()).unwrap();
    }
}
