//! Глобальный logger симуляции
//!
//! Combat системы пишут одну строку на каждый переход состояния.
//! Printer подменяется хостом (движок, тесты); по умолчанию — stdout.

use once_cell::sync::Lazy;
use std::sync::Mutex;

/// Printer + порог, под одним lock'ом
struct LoggerState {
    printer: Option<Box<dyn LogPrinter>>,
    threshold: LogLevel,
}

static LOGGER: Lazy<Mutex<LoggerState>> = Lazy::new(|| {
    Mutex::new(LoggerState {
        printer: None,
        threshold: LogLevel::Debug,
    })
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }
}

pub trait LogPrinter: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);
}

/// Заменить printer (хост ставит свой до первого update)
pub fn set_logger(printer: Box<dyn LogPrinter>) {
    if let Ok(mut state) = LOGGER.lock() {
        state.printer = Some(printer);
    }
}

/// Сообщения ниже порога отбрасываются до форматирования
pub fn set_log_level(level: LogLevel) {
    if let Ok(mut state) = LOGGER.lock() {
        state.threshold = level;
    }
}

/// Stdout printer, если хост ещё ничего не поставил
pub fn init_logger() {
    if let Ok(mut state) = LOGGER.lock() {
        if state.printer.is_none() {
            state.printer = Some(Box::new(ConsoleLogger));
        }
    }
}

pub fn log(message: &str) {
    log_with_level(LogLevel::Debug, message);
}

pub fn log_info(message: &str) {
    log_with_level(LogLevel::Info, message);
}

pub fn log_warning(message: &str) {
    log_with_level(LogLevel::Warning, message);
}

pub fn log_error(message: &str) {
    log_with_level(LogLevel::Error, message);
}

pub fn log_with_level(level: LogLevel, message: &str) {
    let Ok(state) = LOGGER.lock() else {
        return;
    };
    if level < state.threshold {
        return;
    }

    if let Some(printer) = state.printer.as_ref() {
        let timestamp = chrono::Local::now().format("%H:%M:%S%.3f");
        printer.log(level, &format!("[{}] {}", timestamp, message));
    }
}

pub struct ConsoleLogger;

impl LogPrinter for ConsoleLogger {
    fn log(&self, level: LogLevel, message: &str) {
        println!("[{}] {}", level.as_str(), message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct CapturePrinter(Arc<Mutex<Vec<(LogLevel, String)>>>);

    impl LogPrinter for CapturePrinter {
        fn log(&self, level: LogLevel, message: &str) {
            if let Ok(mut lines) = self.0.lock() {
                lines.push((level, message.to_string()));
            }
        }
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
        assert_eq!(LogLevel::Warning.as_str(), "WARNING");
    }

    #[test]
    fn test_threshold_filters_and_printer_receives_timestamped_line() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        set_logger(Box::new(CapturePrinter(lines.clone())));

        set_log_level(LogLevel::Warning);
        log("riposte debug line");
        log_error("riposte error line");
        set_log_level(LogLevel::Debug);

        // init_logger не вытесняет уже поставленный printer
        init_logger();
        log_info("riposte info line");

        let lines = lines.lock().unwrap();
        assert!(!lines.iter().any(|(_, line)| line.contains("riposte debug line")));

        let error = lines
            .iter()
            .find(|(_, line)| line.contains("riposte error line"))
            .unwrap();
        assert_eq!(error.0, LogLevel::Error);
        assert!(error.1.starts_with('['));

        assert!(lines.iter().any(|(_, line)| line.contains("riposte info line")));
    }
}
