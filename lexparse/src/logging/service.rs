//! Log sinks and the level-filtering service in front of them

use super::codes::Code;
use super::config;
use super::events::{LogEvent, LogLevel};
use crate::config::LoggingPreferences;
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A destination for log events
pub trait Logger: Send + Sync {
    fn log(&self, event: &LogEvent);
}

/// Line format used by text sinks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Plain,
    Json,
}

impl OutputFormat {
    fn render(self, event: &LogEvent) -> String {
        match self {
            OutputFormat::Plain => event.format(),
            // Fall back to plain text rather than lose the event
            OutputFormat::Json => event.format_json().unwrap_or_else(|_| event.format()),
        }
    }
}

/// Filters events by level and forwards the rest to one sink.
pub struct LoggingService {
    sink: Arc<dyn Logger>,
    min_level: LogLevel,
}

impl LoggingService {
    pub fn new(sink: Arc<dyn Logger>, min_level: LogLevel) -> Self {
        Self { sink, min_level }
    }

    /// Builds the service described by the environment's logging preferences.
    pub fn with_config() -> Self {
        Self::from_preferences(config::get_runtime_preferences())
    }

    /// With console output disabled every event is dropped.
    pub fn from_preferences(preferences: &LoggingPreferences) -> Self {
        let min_level = preferences.min_log_level;
        let mut sinks = MultiLogger::new(min_level);
        if preferences.enable_console_logging {
            let console = if preferences.use_structured_logging {
                ConsoleLogger::structured(min_level)
            } else {
                ConsoleLogger::new(min_level)
            };
            sinks.add_logger(Arc::new(console));
        }
        Self::new(Arc::new(sinks), min_level)
    }

    pub fn min_level(&self) -> LogLevel {
        self.min_level
    }

    pub fn should_log(&self, level: LogLevel) -> bool {
        level <= self.min_level
    }

    pub fn log_event(&self, event: LogEvent) {
        if self.should_log(event.level) {
            self.sink.log(&event);
        }
    }

    pub fn log_error(&self, code: Code, message: &str) {
        self.log_event(LogEvent::error(code, message));
    }

    pub fn log_success(&self, code: Code, message: &str) {
        self.log_event(LogEvent::success(code, message));
    }
}

/// Writes events to stderr, one line each.
pub struct ConsoleLogger {
    min_level: LogLevel,
    format: OutputFormat,
}

impl ConsoleLogger {
    pub fn new(min_level: LogLevel) -> Self {
        Self {
            min_level,
            format: OutputFormat::Plain,
        }
    }

    /// Console logger writing JSON lines
    pub fn structured(min_level: LogLevel) -> Self {
        Self {
            min_level,
            format: OutputFormat::Json,
        }
    }
}

impl Logger for ConsoleLogger {
    fn log(&self, event: &LogEvent) {
        if event.level <= self.min_level {
            let line = self.format.render(event);
            let _ = writeln!(io::stderr().lock(), "{}", line);
        }
    }
}

/// Keeps the most recent events in memory, up to the compile-time log buffer
/// size.
pub struct MemoryLogger {
    events: Mutex<VecDeque<LogEvent>>,
    capacity: usize,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::with_capacity(config::get_error_buffer_size())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn events(&self) -> Vec<LogEvent> {
        lock(&self.events).iter().cloned().collect()
    }

    pub fn event_count(&self) -> usize {
        lock(&self.events).len()
    }

    pub fn clear(&self) {
        lock(&self.events).clear();
    }

    pub fn events_with_code(&self, code: Code) -> Vec<LogEvent> {
        self.matching(|event| event.code == code)
    }

    pub fn errors(&self) -> Vec<LogEvent> {
        self.matching(LogEvent::is_error)
    }

    pub fn has_error_with_code(&self, code: Code) -> bool {
        lock(&self.events)
            .iter()
            .any(|event| event.is_error() && event.code == code)
    }

    pub fn has_success_with_code(&self, code: Code) -> bool {
        lock(&self.events)
            .iter()
            .any(|event| event.is_info() && event.code == code)
    }

    fn matching(&self, predicate: impl Fn(&LogEvent) -> bool) -> Vec<LogEvent> {
        lock(&self.events)
            .iter()
            .filter(|event| predicate(event))
            .cloned()
            .collect()
    }
}

impl Default for MemoryLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger for MemoryLogger {
    fn log(&self, event: &LogEvent) {
        let mut events = lock(&self.events);
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event.clone());
    }
}

/// Appends events to a file opened once at construction.
pub struct FileLogger {
    file: Mutex<File>,
    min_level: LogLevel,
    format: OutputFormat,
}

impl FileLogger {
    pub fn new<P: AsRef<Path>>(
        path: P,
        min_level: LogLevel,
        format: OutputFormat,
    ) -> io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            file: Mutex::new(file),
            min_level,
            format,
        })
    }
}

impl Logger for FileLogger {
    fn log(&self, event: &LogEvent) {
        if event.level <= self.min_level {
            let line = self.format.render(event);
            // A failed write cannot itself be logged.
            let _ = writeln!(lock(&self.file), "{}", line);
        }
    }
}

/// Fans events out to several sinks.
pub struct MultiLogger {
    loggers: Vec<Arc<dyn Logger>>,
    min_level: LogLevel,
}

impl MultiLogger {
    pub fn new(min_level: LogLevel) -> Self {
        Self {
            loggers: Vec::new(),
            min_level,
        }
    }

    pub fn add_logger(&mut self, logger: Arc<dyn Logger>) {
        self.loggers.push(logger);
    }

    pub fn with_console(mut self, console_level: LogLevel) -> Self {
        self.add_logger(Arc::new(ConsoleLogger::new(console_level)));
        self
    }

    pub fn with_file<P: AsRef<Path>>(
        mut self,
        path: P,
        file_level: LogLevel,
        format: OutputFormat,
    ) -> io::Result<Self> {
        self.add_logger(Arc::new(FileLogger::new(path, file_level, format)?));
        Ok(self)
    }

    pub fn with_memory(mut self) -> (Self, Arc<MemoryLogger>) {
        let memory = Arc::new(MemoryLogger::new());
        self.add_logger(memory.clone());
        (self, memory)
    }
}

impl Logger for MultiLogger {
    fn log(&self, event: &LogEvent) {
        if event.level <= self.min_level {
            for logger in &self.loggers {
                logger.log(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::codes;

    #[test]
    fn test_console_logger() {
        ConsoleLogger::new(LogLevel::Info).log(&LogEvent::info("Test message"));
        ConsoleLogger::structured(LogLevel::Debug).log(
            &LogEvent::error(codes::input::IO_ERROR, "Test error").with_context("key", "value"),
        );
    }

    #[test]
    fn test_memory_logger() {
        let logger = MemoryLogger::new();

        logger.log(&LogEvent::info("Message 1"));
        logger.log(&LogEvent::error(
            codes::lexical::UNEXPECTED_CHARACTER,
            "Error message",
        ));

        assert_eq!(logger.event_count(), 2);
        assert_eq!(logger.errors().len(), 1);
        assert!(logger.has_error_with_code(codes::lexical::UNEXPECTED_CHARACTER));
        assert!(!logger.has_error_with_code(codes::lexical::INVALID_INPUT));

        logger.clear();
        assert_eq!(logger.event_count(), 0);
    }

    #[test]
    fn test_memory_logger_drops_oldest() {
        let logger = MemoryLogger::with_capacity(2);
        for message in ["one", "two", "three"] {
            logger.log(&LogEvent::info(message));
        }

        let messages: Vec<String> = logger.events().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, ["two", "three"]);
    }

    #[test]
    fn test_file_logger() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("lexparse.log");
        let logger = FileLogger::new(&path, LogLevel::Info, OutputFormat::Plain).unwrap();

        logger.log(&LogEvent::success(codes::success::PARSING_COMPLETE, "done"));
        logger.log(&LogEvent::debug("filtered out"));

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("I020"));
        assert!(!written.contains("filtered out"));
    }

    #[test]
    fn test_file_logger_json_lines() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let logger = FileLogger::new(file.path(), LogLevel::Debug, OutputFormat::Json).unwrap();

        logger.log(&LogEvent::debug("first"));
        logger.log(&LogEvent::debug("second"));

        let written = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<serde_json::Value> = written
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["message"], "second");
    }

    #[test]
    fn test_multi_logger() {
        let (multi, memory) = MultiLogger::new(LogLevel::Debug).with_memory();
        let multi = multi.with_console(LogLevel::Error);

        multi.log(&LogEvent::info("Test message"));
        assert_eq!(memory.event_count(), 1);
    }

    #[test]
    fn test_logging_service_filters_by_level() {
        let logger = Arc::new(MemoryLogger::new());
        let service = LoggingService::new(logger.clone(), LogLevel::Info);

        service.log_error(codes::tree::MISSING_REQUIRED_NODE, "Test error");
        service.log_success(codes::success::LEXING_COMPLETE, "Lexed");
        service.log_event(LogEvent::debug("Not recorded"));

        assert_eq!(logger.event_count(), 2);
        assert!(logger.has_success_with_code(codes::success::LEXING_COMPLETE));
    }

    #[test]
    fn test_service_from_preferences() {
        let preferences = LoggingPreferences {
            use_structured_logging: true,
            enable_console_logging: false,
            min_log_level: LogLevel::Warning,
        };
        let service = LoggingService::from_preferences(&preferences);

        assert_eq!(service.min_level(), LogLevel::Warning);
        assert!(service.should_log(LogLevel::Error));
        assert!(!service.should_log(LogLevel::Info));
        service.log_error(codes::system::INTERNAL_ERROR, "dropped without a console");
    }
}
