// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{DisplayPreference, TracingConfig, TransportConfig, WriterConfig};
use clap::{Args, Parser, ValueEnum};
use tracing_core::LevelFilter;

/// More info: <https://docs.rs/clap/latest/clap/_derive/_tutorial/chapter_2/index.html>
#[derive(Debug, Parser)]
#[command(bin_name = "cmdline_echo")]
#[command(about = "🦜 Echo each line of stdin back to stdout, quoted")]
#[command(version)]
#[command(next_line_help = true)]
#[command(arg_required_else_help(false))]
pub struct CLIArg {
    #[command(flatten)]
    pub encoding_options: EncodingOption,

    #[command(flatten)]
    pub logging_options: LoggingOption,
}

#[derive(Debug, Args)]
pub struct EncodingOption {
    #[arg(
        long,
        help = "Decode stdin with this encoding label (eg: `latin1`, `shift_jis`) instead of the detected one."
    )]
    pub input_encoding: Option<String>,

    #[arg(
        long,
        help = "Encode stdout with this encoding label instead of the detected one."
    )]
    pub output_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct LoggingOption {
    #[arg(
        long,
        short = 'l',
        help = "Write logs to this file instead of stderr. Only used when `--log-level` is not `off`."
    )]
    pub log_file: Option<String>,

    #[arg(long, value_enum, default_value_t = LogLevelArg::Off)]
    pub log_level: LogLevelArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevelArg {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LevelFilter {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Off => LevelFilter::OFF,
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        }
    }
}

impl CLIArg {
    /// Stdout carries the echoed lines, so display logging goes to stderr.
    #[must_use]
    pub fn tracing_config(&self) -> TracingConfig {
        let LoggingOption {
            log_file,
            log_level,
        } = &self.logging_options;
        let writer_config = match (log_level, log_file) {
            (LogLevelArg::Off, _) => WriterConfig::None,
            (_, Some(file_path)) => WriterConfig::File(file_path.clone()),
            (_, None) => WriterConfig::Display(DisplayPreference::Stderr),
        };
        TracingConfig {
            writer_config,
            level_filter: (*log_level).into(),
        }
    }

    #[must_use]
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            input_encoding: self.encoding_options.input_encoding.clone(),
            output_encoding: self.encoding_options.output_encoding.clone(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        let cli_arg = CLIArg::try_parse_from(["cmdline_echo"]).unwrap();
        let tracing_config = cli_arg.tracing_config();
        assert_eq!(tracing_config.writer_config, WriterConfig::None);
        assert_eq!(tracing_config.level_filter, LevelFilter::OFF);

        let transport_config = cli_arg.transport_config();
        assert_eq!(transport_config.input_encoding, None);
        assert_eq!(transport_config.output_encoding, None);
    }

    #[test]
    fn all_options() {
        let cli_arg = CLIArg::try_parse_from([
            "cmdline_echo",
            "--input-encoding",
            "latin1",
            "--output-encoding",
            "utf-8",
            "--log-level",
            "debug",
            "-l",
            "/tmp/echo.log",
        ])
        .unwrap();

        let tracing_config = cli_arg.tracing_config();
        assert_eq!(
            tracing_config.writer_config,
            WriterConfig::File("/tmp/echo.log".into())
        );
        assert_eq!(tracing_config.level_filter, LevelFilter::DEBUG);

        let transport_config = cli_arg.transport_config();
        assert_eq!(transport_config.input_encoding.as_deref(), Some("latin1"));
        assert_eq!(transport_config.output_encoding.as_deref(), Some("utf-8"));
    }

    #[test]
    fn log_level_without_file_goes_to_stderr() {
        let cli_arg =
            CLIArg::try_parse_from(["cmdline_echo", "--log-level", "warn"]).unwrap();
        assert_eq!(
            cli_arg.tracing_config().writer_config,
            WriterConfig::Display(DisplayPreference::Stderr)
        );
    }

    #[test]
    fn bad_log_level_is_rejected() {
        assert!(CLIArg::try_parse_from(["cmdline_echo", "--log-level", "loud"]).is_err());
    }
}
