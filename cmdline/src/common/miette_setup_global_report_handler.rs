// Copyright (c) 2024-2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words winsize tcgetwinsize

//! Installs a [`miette`] report hook for the binaries in this crate.
//!
//! The hook is lazy: the terminal width is only measured when a report is actually
//! rendered, i.e. when `main() -> miette::Result<_>` returns an error.

use miette::MietteHandlerOpts;
use tracing::debug;

/// Fallback width when stderr is not a terminal.
const DEFAULT_REPORT_WIDTH: usize = 80;

/// Register the default global report handler. The `issues_url` is printed as the
/// footer of every report.
pub fn setup_default_miette_global_report_handler(issues_url: &'static str) {
    miette::set_hook(Box::new(move |_report| {
        let terminal_width = {
            let it = rustix::termios::tcgetwinsize(rustix::stdio::stderr())
                .map(|winsize| usize::from(winsize.ws_col))
                .ok()
                .filter(|cols| *cols > 0)
                .unwrap_or(DEFAULT_REPORT_WIDTH);
            debug!("miette::set_hook -> terminal_width: {}", it);
            it
        };
        Box::new(
            MietteHandlerOpts::new()
                .width(terminal_width)
                .wrap_lines(true)
                .unicode(true)
                .context_lines(3)
                .tab_width(4)
                .break_words(true)
                .with_cause_chain()
                .footer(issues_url.to_string())
                .build(),
        )
    }))
    .ok();
}
