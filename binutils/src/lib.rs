//! Shared command-line plumbing for the generator binaries: argument styling,
//! verbosity flags, logging and output files.

use std::io::Write;
use std::path::Path;

pub use clap;

pub mod verbose {
    //! `-v`/`-q` flags shared by every binary.
    pub use clap_verbosity_flag::{Level, LevelFilter, Verbosity};
}

/// Colour scheme of the `--help` output.
pub fn get_styles() -> clap::builder::Styles {
    use clap::builder::styling::{AnsiColor, Color, Style};

    clap::builder::Styles::styled()
        .usage(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Yellow))),
        )
        .header(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Yellow))),
        )
        .literal(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green))))
        .invalid(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .error(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .valid(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
        )
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::White))))
}

/// Map the verbosity given on the command line to a tracing level. No flag
/// means only errors are shown.
pub fn verbose_level_to_trace(level: Option<verbose::Level>) -> &'static tracing::Level {
    match level {
        Some(verbose::Level::Error) => &tracing::Level::WARN,
        Some(verbose::Level::Warn) => &tracing::Level::INFO,
        Some(verbose::Level::Info) => &tracing::Level::DEBUG,
        Some(verbose::Level::Debug) => &tracing::Level::TRACE,
        Some(verbose::Level::Trace) => &tracing::Level::TRACE,
        None => &tracing::Level::ERROR,
    }
}

/// Install the global tracing subscriber.
///
/// Logs go to stderr in a compact form. If `file` is given they are written
/// there as JSON lines instead.
pub fn logging_setup(level: &tracing::Level, file: Option<&std::fs::File>) {
    let builder = tracing_subscriber::fmt()
        .with_max_level(*level)
        .with_target(false);

    match file.map(|f| f.try_clone()) {
        Some(Ok(f)) => builder.json().with_writer(std::sync::Mutex::new(f)).init(),
        Some(Err(e)) => {
            builder.with_writer(std::io::stderr).without_time().init();
            tracing::error!("could not open log file, logging to stderr: {e}");
        }
        None => builder.with_writer(std::io::stderr).without_time().init(),
    }
}

/// Write `content` to `path` through a temporary file in the same directory,
/// so an interrupted run never leaves a truncated output behind.
pub fn write_output(path: &Path, content: &str) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_mapping() {
        assert_eq!(verbose_level_to_trace(None), &tracing::Level::ERROR);
        assert_eq!(
            verbose_level_to_trace(Some(verbose::Level::Info)),
            &tracing::Level::DEBUG
        );
    }

    #[test]
    fn test_write_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.S");
        write_output(&path, "nop\n").unwrap();
        write_output(&path, "halt\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "halt\n");
    }
}
