use chrono::Local;
use log::{LevelFilter, Metadata, Record};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Appends timestamped log lines to a file.
pub struct Logger {
    file: Mutex<std::fs::File>,
    level: LevelFilter,
}

impl Logger {
    pub fn new(log_file: &Path, level: LevelFilter) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)?;

        Ok(Self {
            file: Mutex::new(file),
            level,
        })
    }
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Ok(mut file) = self.file.lock() {
            let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
            let _ = writeln!(
                file,
                "{} [{}] {}: {}",
                timestamp,
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
    }
}

fn level_for(debug: bool) -> LevelFilter {
    if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Installs the process logger: a file logger when `log_file` is given,
/// `env_logger` otherwise (honouring `RUST_LOG`).
pub fn init(log_file: Option<&Path>, debug: bool) -> anyhow::Result<()> {
    let level = level_for(debug);
    match log_file {
        Some(path) => {
            let logger = Logger::new(path, level)?;
            log::set_boxed_logger(Box::new(logger))?;
            log::set_max_level(level);
        }
        None => {
            let default = if debug { "debug" } else { "info" };
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).try_init()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::{Level, Log};
    use tempfile::tempdir;

    #[test]
    fn test_file_logger_respects_level() -> std::io::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("bot.log");
        let logger = Logger::new(&path, LevelFilter::Info)?;

        logger.log(
            &Record::builder()
                .args(format_args!("poll cycle completed"))
                .level(Level::Info)
                .target("lst_notifier::poller")
                .build(),
        );
        logger.log(
            &Record::builder()
                .args(format_args!("noisy detail"))
                .level(Level::Debug)
                .target("lst_notifier::poller")
                .build(),
        );
        logger.flush();

        let content = std::fs::read_to_string(&path)?;
        assert!(content.contains("[INFO] lst_notifier::poller: poll cycle completed"));
        assert!(!content.contains("noisy detail"));
        Ok(())
    }

    #[test]
    fn test_level_for_debug_flag() {
        assert_eq!(level_for(true), LevelFilter::Debug);
        assert_eq!(level_for(false), LevelFilter::Info);
    }
}
