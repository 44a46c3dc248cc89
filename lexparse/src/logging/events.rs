//! Log events emitted by the lexer, parser and driver

use super::codes::{self, Code, ErrorMetadata};
use crate::utils::Position;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Log severity levels, most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error = 0,
    Warning = 1,
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }
}

const UNCODED_WARNING: Code = Code::new("W000");
const UNCODED_INFO: Code = Code::new("I000");
const UNCODED_DEBUG: Code = Code::new("D000");

/// One log record.
///
/// Context pairs are kept sorted by key so plain output is stable.
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub code: Code,
    pub message: String,
    pub position: Option<Position>,
    pub context: BTreeMap<String, String>,
}

impl LogEvent {
    fn new(level: LogLevel, code: Code, message: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            code,
            message: truncate(message, super::config::get_max_log_message_length()),
            position: None,
            context: BTreeMap::new(),
        }
    }

    pub fn error(code: Code, message: &str) -> Self {
        Self::new(LogLevel::Error, code, message)
    }

    /// Uncoded warning
    pub fn warning(message: &str) -> Self {
        Self::new(LogLevel::Warning, UNCODED_WARNING, message)
    }

    pub fn warning_with_code(code: Code, message: &str) -> Self {
        Self::new(LogLevel::Warning, code, message)
    }

    pub fn info(message: &str) -> Self {
        Self::new(LogLevel::Info, UNCODED_INFO, message)
    }

    /// Info-level event carrying a success code
    pub fn success(code: Code, message: &str) -> Self {
        Self::new(LogLevel::Info, code, message)
    }

    pub fn debug(message: &str) -> Self {
        Self::new(LogLevel::Debug, UNCODED_DEBUG, message)
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_context(mut self, key: &str, value: &str) -> Self {
        self.context.insert(key.to_string(), value.to_string());
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == LogLevel::Error
    }

    pub fn is_info(&self) -> bool {
        self.level == LogLevel::Info
    }

    /// Registry entry for this event's code, if it has one
    pub fn metadata(&self) -> Option<&'static ErrorMetadata> {
        codes::get_error_metadata(self.code.as_str())
    }

    pub fn category(&self) -> &'static str {
        codes::get_category(self.code.as_str())
    }

    pub fn severity(&self) -> &'static str {
        codes::get_severity(self.code.as_str()).as_str()
    }

    /// Single-line plain text form
    pub fn format(&self) -> String {
        self.to_string()
    }

    /// Single-line JSON form for structured sinks
    pub fn format_json(&self) -> Result<String, serde_json::Error> {
        let line = JsonLine {
            timestamp: self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            level: self.level.as_str(),
            code: self.code.as_str(),
            message: &self.message,
            category: self.category(),
            severity: self.severity(),
            error: self
                .metadata()
                .filter(|_| self.is_error())
                .map(|metadata| JsonErrorMetadata {
                    recoverable: metadata.recoverable,
                    requires_halt: metadata.requires_halt,
                    recommended_action: metadata.recommended_action,
                }),
            position: self.position,
            context: Some(&self.context).filter(|context| !context.is_empty()),
        };
        serde_json::to_string(&line)
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} - {}", self.level.as_str(), self.code, self.message)?;
        if let Some(position) = &self.position {
            write!(f, " at {}", position)?;
        }
        for (key, value) in &self.context {
            write!(f, " {}={}", key, value)?;
        }
        Ok(())
    }
}

/// Cuts `message` to `limit` characters, marking the cut with `...`.
fn truncate(message: &str, limit: usize) -> String {
    match message.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &message[..cut]),
        None => message.to_string(),
    }
}

#[derive(Serialize)]
struct JsonLine<'a> {
    timestamp: String,
    level: &'static str,
    code: &'static str,
    message: &'a str,
    category: &'static str,
    severity: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonErrorMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    position: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a BTreeMap<String, String>>,
}

#[derive(Serialize)]
struct JsonErrorMetadata {
    recoverable: bool,
    requires_halt: bool,
    recommended_action: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_event_creation() {
        let event = LogEvent::error(codes::lexical::UNEXPECTED_CHARACTER, "Unexpected '#'");

        assert!(event.is_error());
        assert_eq!(event.code.as_str(), "E021");
        assert_eq!(event.message, "Unexpected '#'");
        assert_eq!(event.category(), "Lexical");
        assert!(event.metadata().is_some());
    }

    #[test]
    fn test_success_event_creation() {
        let event = LogEvent::success(codes::success::LEXING_COMPLETE, "Lexing finished");

        assert!(event.is_info());
        assert_eq!(event.code.as_str(), "I010");
    }

    #[test]
    fn test_event_with_context() {
        let event = LogEvent::error(codes::tree::MISSING_REQUIRED_NODE, "No parent")
            .with_context("operation", "rotate_left")
            .with_context("node", "3");

        assert_eq!(event.context.get("operation").map(String::as_str), Some("rotate_left"));
        assert_eq!(event.context.get("node").map(String::as_str), Some("3"));
    }

    #[test]
    fn test_event_formatting() {
        let event = LogEvent::error(codes::syntax::UNEXPECTED_LEXEME, "Unexpected lexeme")
            .with_position(Position::new(7, 1, 1))
            .with_context("found", "+")
            .with_context("expected", "number");

        assert_eq!(
            event.format(),
            "[ERROR] E031 - Unexpected lexeme at 1:1 expected=number found=+"
        );
    }

    #[test]
    fn test_long_message_is_truncated() {
        let limit = crate::logging::config::get_max_log_message_length();
        let event = LogEvent::info(&"x".repeat(limit + 10));
        assert_eq!(event.message.chars().count(), limit + 3);
        assert!(event.message.ends_with("..."));

        assert_eq!(truncate("héllo", 2), "hé...");
        assert_eq!(truncate("hé", 2), "hé");
    }

    #[test]
    fn test_json_formatting() {
        let event = LogEvent::error(codes::input::IO_ERROR, "Read failed")
            .with_position(Position::new(3, 0, 3))
            .with_context("source", "stdin");

        let json: serde_json::Value = serde_json::from_str(&event.format_json().unwrap()).unwrap();
        assert_eq!(json["level"], "ERROR");
        assert_eq!(json["code"], "E010");
        assert_eq!(json["message"], "Read failed");
        assert_eq!(json["position"]["offset"], 3);
        assert_eq!(json["context"]["source"], "stdin");
        assert!(json["error"]["recommended_action"].is_string());
    }

    #[test]
    fn test_json_omits_empty_sections() {
        let json: serde_json::Value =
            serde_json::from_str(&LogEvent::debug("quiet").format_json().unwrap()).unwrap();
        assert!(json.get("error").is_none());
        assert!(json.get("position").is_none());
        assert!(json.get("context").is_none());
    }
}
