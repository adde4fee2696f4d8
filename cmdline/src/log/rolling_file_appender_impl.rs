// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::path::PathBuf;

/// A file appender that never rolls over, writing to exactly `path_str`.
///
/// # Errors
///
/// `path_str` has no parent folder or no file name.
pub fn try_create(
    path_str: &str,
) -> miette::Result<tracing_appender::rolling::RollingFileAppender> {
    let path = PathBuf::from(path_str);

    let parent = match path.parent() {
        // A bare file name lives in the current folder.
        Some(parent) if parent.as_os_str().is_empty() => std::path::Path::new("."),
        Some(parent) => parent,
        None => {
            return Err(miette::miette!(
                "Can't access the folder of {}. It might not exist, or you don't have the required permissions.",
                path.display()
            ));
        }
    };

    let file_name = path.file_name().ok_or_else(|| {
        miette::miette!(
            "Can't access file name {}. It might not exist, or you don't have the required permissions.",
            path.display()
        )
    })?;

    Ok(tracing_appender::rolling::never(parent, file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_has_no_file_name() {
        assert!(try_create("/").is_err());
    }

    #[test]
    fn creates_file_on_first_write() {
        use std::io::Write;

        let dir = std::env::temp_dir()
            .join(format!("r3bl_cmdline_appender_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("appender.log");

        let mut appender = try_create(path.to_str().unwrap()).unwrap();
        appender.write_all(b"hello\n").unwrap();
        appender.flush().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
