// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use super::{DisplayPreference, WriterConfig, rolling_file_appender_impl,
            tracing_config::TracingConfig};
use tracing_core::LevelFilter;
use tracing_subscriber::{Layer, registry::LookupSpan};

/// Avoid gnarly type annotations by using a macro to create the `fmt` layer.
#[macro_export]
macro_rules! create_fmt {
    () => {
        tracing_subscriber::fmt::layer()
            .compact()
            .without_time()
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
    };
}

/// Type alias for a boxed layer.
pub type DynLayer<S> = dyn Layer<S> + Send + Sync + 'static;

/// Returns the layers. This does not initialize the tracing system; see
/// [`TracingConfig::install_global()`] for that.
///
/// The level filter is always the first layer, followed by the display layer and then
/// the file layer, when the writer config asks for them.
///
/// # Errors
///
/// The log file can't be created.
pub fn try_create_layers(
    tracing_config: TracingConfig,
) -> miette::Result<Vec<Box<DynLayer<tracing_subscriber::Registry>>>> {
    let level_filter = tracing_config.get_level_filter();
    let writer_config = tracing_config.get_writer_config();

    let mut return_it: Vec<Box<DynLayer<tracing_subscriber::Registry>>> =
        vec![Box::new(level_filter)];

    if let Some(layer) = try_create_display_layer(level_filter, writer_config.clone())? {
        return_it.push(layer);
    }

    if let Some(layer) = try_create_file_layer(level_filter, writer_config)? {
        return_it.push(layer);
    }

    Ok(return_it)
}

/// This erases the concrete type of the writer, and returns a boxed layer.
///
/// This is useful for composition of layers. There's more info in the docs
/// [here](https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/index.html#runtime-configuration-with-layers).
///
/// # Errors
///
/// Never at the moment; fallible to match [`try_create_file_layer()`].
pub fn try_create_display_layer<S>(
    level_filter: LevelFilter,
    writer_config: WriterConfig,
) -> miette::Result<Option<Box<DynLayer<S>>>>
where
    S: tracing_core::Subscriber,
    for<'a> S: LookupSpan<'a>,
{
    let fmt_layer = create_fmt!();

    Ok(match writer_config {
        WriterConfig::DisplayAndFile(display_pref, _)
        | WriterConfig::Display(display_pref) => match display_pref {
            DisplayPreference::Stdout => Some(Box::new(
                fmt_layer
                    .with_writer(std::io::stdout)
                    .with_filter(level_filter),
            )),
            DisplayPreference::Stderr => Some(Box::new(
                fmt_layer
                    .with_writer(std::io::stderr)
                    .with_filter(level_filter),
            )),
        },
        WriterConfig::None | WriterConfig::File(_) => None,
    })
}

/// Same as [`try_create_display_layer()`], for the log file. ANSI colors are turned off
/// so the file stays readable.
///
/// # Errors
///
/// The log file can't be created.
pub fn try_create_file_layer<S>(
    level_filter: LevelFilter,
    writer_config: WriterConfig,
) -> miette::Result<Option<Box<DynLayer<S>>>>
where
    S: tracing_core::Subscriber,
    for<'a> S: LookupSpan<'a>,
{
    let fmt_layer = create_fmt!().with_ansi(false);

    Ok(match writer_config {
        WriterConfig::DisplayAndFile(_, file_path) | WriterConfig::File(file_path) => {
            let file = rolling_file_appender_impl::try_create(file_path.as_str())?;
            Some(Box::new(
                fmt_layer.with_writer(file).with_filter(level_filter),
            ))
        }
        WriterConfig::None | WriterConfig::Display(_) => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn temp_log_file(name: &str) -> (PathBuf, String) {
        let dir = std::env::temp_dir()
            .join(format!("r3bl_cmdline_tracing_{name}_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let file_path = dir.join("my_temp_log_file.log");
        let file_path_str = file_path.to_str().unwrap().to_string();
        (dir, file_path_str)
    }

    #[test]
    fn test_try_create_display_layer() {
        let layer: Option<Box<DynLayer<tracing_subscriber::Registry>>> =
            try_create_display_layer(
                LevelFilter::DEBUG,
                WriterConfig::Display(DisplayPreference::Stderr),
            )
            .unwrap();
        assert!(layer.is_some());

        let layer: Option<Box<DynLayer<tracing_subscriber::Registry>>> =
            try_create_display_layer(LevelFilter::DEBUG, WriterConfig::None).unwrap();
        assert!(layer.is_none());
    }

    #[test]
    fn test_try_create_file_layer() {
        let (dir, file_path) = temp_log_file("file_layer");
        let layer: Option<Box<DynLayer<tracing_subscriber::Registry>>> =
            try_create_file_layer(LevelFilter::DEBUG, WriterConfig::File(file_path.clone()))
                .unwrap();

        assert!(layer.is_some());
        assert!(std::path::Path::new(&file_path).exists());
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_try_create_both_layers() {
        let (dir, file_path) = temp_log_file("both_layers");
        let tracing_config = TracingConfig {
            writer_config: WriterConfig::DisplayAndFile(
                DisplayPreference::Stdout,
                file_path.clone(),
            ),
            level_filter: LevelFilter::DEBUG,
        };

        let layers = try_create_layers(tracing_config).unwrap();
        assert_eq!(layers.len(), 3);
        assert!(std::path::Path::new(&file_path).exists());
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn thread_local_subscriber_writes_to_file() {
        let (dir, file_path) = temp_log_file("thread_local");
        let guard = TracingConfig::new_file(file_path.clone(), LevelFilter::WARN)
            .install_thread_local()
            .unwrap();

        tracing::warn!(message = "kept", fd = 3);
        tracing::debug!(message = "filtered out");
        drop(guard);

        let contents = std::fs::read_to_string(&file_path).unwrap();
        assert!(contents.contains("kept"));
        assert!(contents.contains("fd=3"));
        assert!(!contents.contains("filtered out"));
        std::fs::remove_dir_all(dir).unwrap();
    }
}
