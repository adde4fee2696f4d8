// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Echo stdin to stdout through the terminal-aware transport. Try it interactively, or
//! with `printf 'a\nb' | cmdline_echo`.

use clap::Parser;
use r3bl_cmdline::{StreamHandle,
                   echo::{CLIArg, run_app},
                   setup_default_miette_global_report_handler,
                   try_initialize_logging_global};

const ISSUES_URL: &str = "https://github.com/r3bl-org/r3bl-open-core/issues/new";

fn main() -> miette::Result<()> {
    setup_default_miette_global_report_handler(ISSUES_URL);

    let cli_arg = CLIArg::parse();

    try_initialize_logging_global(cli_arg.tracing_config())?;
    // % is Display, ? is Debug.
    tracing::debug!(message = "Start logging...", cli_arg = ?cli_arg);

    run_app(
        StreamHandle::stdin(),
        StreamHandle::stdout(),
        &cli_arg.transport_config(),
    )?;

    tracing::debug!(message = "Stop logging...");
    Ok(())
}
