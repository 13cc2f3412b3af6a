use anyhow::Result;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::fs;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    fn prefix(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG: ",
            Level::Info => "",
            Level::Warn => "WARN: ",
            Level::Error => "ERROR: ",
        }
    }
}

pub struct SessionLogger {
    log_buffer: Arc<Mutex<Vec<String>>>,
    log_path: PathBuf,
    log_dir: PathBuf,
    retention_count: usize,
    app_name: String,
    stream: bool,
}

impl SessionLogger {
    pub fn new(log_dir: PathBuf, app_name: &str, retention_count: usize, stream: bool) -> Result<Self> {
        fs::create_dir_all(&log_dir)?;

        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let log_filename = format!("{}_{}.log", app_name, timestamp);
        let log_path = log_dir.join(&log_filename);

        let logger = Self {
            log_buffer: Arc::new(Mutex::new(Vec::new())),
            log_path,
            log_dir,
            retention_count,
            app_name: app_name.to_string(),
            stream,
        };

        logger.clean_old_logs()?;
        logger.log(Level::Info, format!("=== {} Session Started ===", app_name));

        Ok(logger)
    }

    pub fn log(&self, level: Level, message: impl AsRef<str>) {
        // Debug lines are only worth the noise when someone is watching the stream
        if level == Level::Debug && !self.stream {
            return;
        }

        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let log_line = format!("[{}] {}{}", timestamp, level.prefix(), message.as_ref());

        if self.stream {
            match level {
                Level::Debug => tracing::debug!("{}", message.as_ref()),
                Level::Info => tracing::info!("{}", message.as_ref()),
                Level::Warn => tracing::warn!("{}", message.as_ref()),
                Level::Error => tracing::error!("{}", message.as_ref()),
            }
            let _ = self.write_line_to_file(&log_line);
        } else if let Ok(mut buffer) = self.log_buffer.lock() {
            buffer.push(log_line);
        }
    }

    fn write_line_to_file(&self, line: &str) -> Result<()> {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;
        writeln!(file, "{}", line)?;
        file.flush()?;
        Ok(())
    }

    fn clean_old_logs(&self) -> Result<()> {
        let mut log_files: Vec<(PathBuf, std::time::SystemTime)> = Vec::new();
        let prefix = format!("{}_", self.app_name);

        if let Ok(entries) = fs::read_dir(&self.log_dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|s| s.to_str()) != Some("log") {
                    continue;
                }
                let matches_prefix = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|name| name.starts_with(&prefix))
                    .unwrap_or(false);
                if !matches_prefix {
                    continue;
                }
                if let Ok(modified) = entry.metadata().and_then(|m| m.modified()) {
                    log_files.push((path, modified));
                }
            }
        }

        log_files.sort_by(|a, b| b.1.cmp(&a.1));

        // The file for this run does not exist yet, so keep one slot free for it
        let keep = self.retention_count.saturating_sub(1);
        for (path, _) in log_files.iter().skip(keep) {
            let _ = fs::remove_file(path);
        }

        Ok(())
    }

    pub fn flush_to_disk(&self) -> Result<()> {
        if let Ok(mut buffer) = self.log_buffer.lock() {
            if buffer.is_empty() {
                return Ok(());
            }

            let mut file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.log_path)?;

            for line in buffer.iter() {
                writeln!(file, "{}", line)?;
            }

            file.flush()?;
            buffer.clear();
        }

        Ok(())
    }

    pub fn finalize(&self) -> Result<()> {
        self.log(Level::Info, format!("=== {} Session Ended ===", self.app_name));
        self.flush_to_disk()?;
        Ok(())
    }

    pub fn log_path(&self) -> &PathBuf {
        &self.log_path
    }
}

impl Drop for SessionLogger {
    fn drop(&mut self) {
        let _ = self.flush_to_disk();
    }
}

static LOGGER: once_cell::sync::OnceCell<SessionLogger> = once_cell::sync::OnceCell::new();

pub fn init_logger(log_dir: PathBuf, app_name: &str, retention_count: usize, stream: bool) -> Result<()> {
    if stream {
        let _ = tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    }

    let logger = SessionLogger::new(log_dir, app_name, retention_count, stream)?;
    LOGGER.set(logger).map_err(|_| anyhow::anyhow!("Logger already initialized"))?;
    Ok(())
}

pub fn log(level: Level, message: impl AsRef<str>) {
    if let Some(logger) = LOGGER.get() {
        logger.log(level, message);
    }
}

pub fn log_error(message: impl AsRef<str>) {
    log(Level::Error, message);
}

pub fn log_warn(message: impl AsRef<str>) {
    log(Level::Warn, message);
}

pub fn log_info(message: impl AsRef<str>) {
    log(Level::Info, message);
}

pub fn log_debug(message: impl AsRef<str>) {
    log(Level::Debug, message);
}

pub fn finalize_logs() -> Result<()> {
    if let Some(logger) = LOGGER.get() {
        logger.finalize()?;
    }
    Ok(())
}

pub fn get_log_path() -> Option<PathBuf> {
    LOGGER.get().map(|logger| logger.log_path.clone())
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::log_info(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::log_warn(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::logger::log_error(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::logger::log_debug(format!($($arg)*))
    };
}
