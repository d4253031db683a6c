use colored::Colorize;
use log::{Level, LevelFilter, Log, Metadata, Record};

/// prints engine logs to stderr, one colored line per record.
pub struct ShellLogger;

static LOGGER: ShellLogger = ShellLogger;

impl ShellLogger {
    /// installs the logger. unknown level names fall back to warnings only.
    pub fn init(level: &str) -> LevelFilter {
        let filter = parse_level(level);
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(filter);
        }
        filter
    }
}

pub fn parse_level(level: &str) -> LevelFilter {
    level.parse().unwrap_or(LevelFilter::Warn)
}

fn tag(level: Level) -> colored::ColoredString {
    match level {
        Level::Error => "error".red().bold(),
        Level::Warn => "warn".yellow().bold(),
        Level::Info => "info".green(),
        Level::Debug => "debug".blue(),
        Level::Trace => "trace".dimmed(),
    }
}

impl Log for ShellLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        eprintln!("[{} {}] {}", tag(record.level()), record.target().dimmed(), record.args());
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names() {
        assert_eq!(parse_level("trace"), LevelFilter::Trace);
        assert_eq!(parse_level("DEBUG"), LevelFilter::Debug);
        assert_eq!(parse_level("off"), LevelFilter::Off);
        assert_eq!(parse_level("loud"), LevelFilter::Warn);
    }
}
