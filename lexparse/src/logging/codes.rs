//! Consolidated error codes and classification system
//!
//! Single source of truth for all codes, their metadata, and classification functions.

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// CODE WRAPPER TYPE
// ============================================================================

/// Universal code wrapper for both error and success codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Code(&'static str);

impl Code {
    pub const fn new(code: &'static str) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ERROR CLASSIFICATION TYPES
// ============================================================================

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Critical = 0,
    High = 1,
    Medium = 2,
    Low = 3,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }
}

/// Complete metadata for a code
#[derive(Debug, Clone)]
pub struct ErrorMetadata {
    pub code: &'static str,
    pub category: &'static str,
    pub severity: Severity,
    pub recoverable: bool,
    pub requires_halt: bool,
    pub description: &'static str,
    pub recommended_action: &'static str,
}

impl ErrorMetadata {
    pub fn new(
        code: &'static str,
        category: &'static str,
        severity: Severity,
        recoverable: bool,
        requires_halt: bool,
        description: &'static str,
        recommended_action: &'static str,
    ) -> Self {
        Self {
            code,
            category,
            severity,
            recoverable,
            requires_halt,
            description,
            recommended_action,
        }
    }
}

// ============================================================================
// CODE CONSTANTS
// ============================================================================

/// System error codes
pub mod system {
    use super::Code;

    pub const INTERNAL_ERROR: Code = Code::new("ERR001");
    pub const INITIALIZATION_FAILURE: Code = Code::new("ERR002");
}

/// Input source error codes
pub mod input {
    use super::Code;

    pub const IO_ERROR: Code = Code::new("E010");
    pub const TASK_SPAWN_FAILURE: Code = Code::new("E011");
}

/// Lexical error codes
pub mod lexical {
    use super::Code;

    pub const END_OF_INPUT: Code = Code::new("E020");
    pub const UNEXPECTED_CHARACTER: Code = Code::new("E021");
    pub const INVALID_INPUT: Code = Code::new("E022");
    pub const LEXEME_TOO_LONG: Code = Code::new("E023");
    pub const STATE_FAILURE: Code = Code::new("E024");
}

/// Syntax error codes
pub mod syntax {
    use super::Code;

    pub const END_OF_INPUT: Code = Code::new("E030");
    pub const UNEXPECTED_LEXEME: Code = Code::new("E031");
    pub const MISSING_LEXEME: Code = Code::new("E032");
    pub const GRAMMAR_VIOLATION: Code = Code::new("E033");
    pub const PARSE_FN_FAILURE: Code = Code::new("E034");
}

/// Tree operation error codes
pub mod tree {
    use super::Code;

    pub const MISSING_REQUIRED_NODE: Code = Code::new("E040");
}

/// Pipeline coordination codes
pub mod pipeline {
    use super::Code;

    pub const CANCELLED: Code = Code::new("E050");
    pub const LEXER_ERROR_PRECEDENCE: Code = Code::new("W050");
}

/// Success codes
pub mod success {
    use super::Code;

    pub const SYSTEM_INITIALIZATION_COMPLETED: Code = Code::new("I001");
    pub const LEXING_COMPLETE: Code = Code::new("I010");
    pub const PARSING_COMPLETE: Code = Code::new("I020");
    pub const LEX_PARSE_COMPLETE: Code = Code::new("I030");
}

// ============================================================================
// ERROR METADATA REGISTRY
// ============================================================================

static ERROR_REGISTRY: OnceLock<HashMap<&'static str, ErrorMetadata>> = OnceLock::new();

fn get_error_registry() -> &'static HashMap<&'static str, ErrorMetadata> {
    ERROR_REGISTRY.get_or_init(|| {
        let entries = [
            // System errors
            ErrorMetadata::new(
                "ERR001",
                "System",
                Severity::Critical,
                false,
                true,
                "Critical internal error",
                "File a bug report with the input that triggered it",
            ),
            ErrorMetadata::new(
                "ERR002",
                "System",
                Severity::Critical,
                false,
                true,
                "Logging or configuration initialization failure",
                "Check configuration files and environment variables",
            ),
            // Input errors
            ErrorMetadata::new(
                "E010",
                "Input",
                Severity::High,
                false,
                true,
                "I/O error while reading from the rune source",
                "Check that the underlying reader is readable",
            ),
            ErrorMetadata::new(
                "E011",
                "Input",
                Severity::Critical,
                false,
                true,
                "The lexing task could not be started",
                "Check thread limits of the host process",
            ),
            // Lexical errors
            ErrorMetadata::new(
                "E020",
                "Lexical",
                Severity::Low,
                true,
                false,
                "End of input reached",
                "None; end of input terminates lexing normally",
            ),
            ErrorMetadata::new(
                "E021",
                "Lexical",
                Severity::Medium,
                false,
                true,
                "Character not accepted by the current lexing state",
                "Remove or escape the character",
            ),
            ErrorMetadata::new(
                "E022",
                "Lexical",
                Severity::Medium,
                false,
                true,
                "Malformed input detected by a lexing state",
                "Fix the input near the reported position",
            ),
            ErrorMetadata::new(
                "E023",
                "Lexical",
                Severity::High,
                false,
                true,
                "Pending lexeme exceeds the maximum lexeme size",
                "Emit or ignore text more often, or raise lexical.max_lexeme_size",
            ),
            ErrorMetadata::new(
                "E024",
                "Lexical",
                Severity::Medium,
                false,
                true,
                "A lexing state reported a failure",
                "Inspect the wrapped error",
            ),
            // Syntax errors
            ErrorMetadata::new(
                "E030",
                "Syntax",
                Severity::Low,
                true,
                false,
                "Parse function reached end of input",
                "None; end of input terminates parsing normally",
            ),
            ErrorMetadata::new(
                "E031",
                "Syntax",
                Severity::Medium,
                false,
                true,
                "Lexeme not valid at this point of the grammar",
                "Fix the input near the reported position",
            ),
            ErrorMetadata::new(
                "E032",
                "Syntax",
                Severity::Medium,
                false,
                true,
                "Input ended while a lexeme was still required",
                "Complete the input",
            ),
            ErrorMetadata::new(
                "E033",
                "Syntax",
                Severity::Medium,
                false,
                true,
                "Grammar rule violated",
                "Fix the input near the reported position",
            ),
            ErrorMetadata::new(
                "E034",
                "Syntax",
                Severity::Medium,
                false,
                true,
                "A parse function reported a failure",
                "Inspect the wrapped error",
            ),
            // Tree errors
            ErrorMetadata::new(
                "E040",
                "Tree",
                Severity::Low,
                true,
                false,
                "Tree operation needs a parent or sibling that does not exist",
                "Move the cursor before rotating or adopting",
            ),
            // Pipeline
            ErrorMetadata::new(
                "E050",
                "Pipeline",
                Severity::Low,
                true,
                false,
                "Work was cancelled before completion",
                "None; the partial tree is returned",
            ),
            ErrorMetadata::new(
                "W050",
                "Pipeline",
                Severity::Low,
                true,
                false,
                "Lexer error superseded the parser error",
                "Fix the lexical error first",
            ),
            // Success codes
            ErrorMetadata::new(
                "I001",
                "Success",
                Severity::Low,
                true,
                false,
                "Logging system initialized",
                "Continue",
            ),
            ErrorMetadata::new(
                "I010",
                "Success",
                Severity::Low,
                true,
                false,
                "Lexing task finished",
                "Continue",
            ),
            ErrorMetadata::new(
                "I020",
                "Success",
                Severity::Low,
                true,
                false,
                "Parse trampoline finished",
                "Continue",
            ),
            ErrorMetadata::new(
                "I030",
                "Success",
                Severity::Low,
                true,
                false,
                "Lex and parse completed",
                "Continue",
            ),
        ];

        entries
            .into_iter()
            .map(|metadata| (metadata.code, metadata))
            .collect()
    })
}

// ============================================================================
// CLASSIFICATION FUNCTIONS
// ============================================================================

/// Get error metadata for a specific code
pub fn get_error_metadata(code: &str) -> Option<&'static ErrorMetadata> {
    get_error_registry().get(code)
}

/// Get error severity from code
pub fn get_severity(code: &str) -> Severity {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.severity)
        .unwrap_or(Severity::Medium)
}

/// Get category from code
pub fn get_category(code: &str) -> &'static str {
    get_error_registry()
        .get(code)
        .map(|metadata| metadata.category)
        .unwrap_or("Unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_constant_is_registered() {
        let all = [
            system::INTERNAL_ERROR,
            system::INITIALIZATION_FAILURE,
            input::IO_ERROR,
            input::TASK_SPAWN_FAILURE,
            lexical::END_OF_INPUT,
            lexical::UNEXPECTED_CHARACTER,
            lexical::INVALID_INPUT,
            lexical::LEXEME_TOO_LONG,
            lexical::STATE_FAILURE,
            syntax::END_OF_INPUT,
            syntax::UNEXPECTED_LEXEME,
            syntax::MISSING_LEXEME,
            syntax::GRAMMAR_VIOLATION,
            syntax::PARSE_FN_FAILURE,
            tree::MISSING_REQUIRED_NODE,
            pipeline::CANCELLED,
            pipeline::LEXER_ERROR_PRECEDENCE,
            success::SYSTEM_INITIALIZATION_COMPLETED,
            success::LEXING_COMPLETE,
            success::PARSING_COMPLETE,
            success::LEX_PARSE_COMPLETE,
        ];

        for code in all {
            assert!(
                get_error_metadata(code.as_str()).is_some(),
                "missing metadata for {}",
                code
            );
        }
    }

    #[test]
    fn test_classification() {
        assert_eq!(get_category("E040"), "Tree");
        assert_eq!(get_severity("E011"), Severity::Critical);
        let metadata = get_error_metadata("E011").unwrap();
        assert!(metadata.requires_halt);
        assert!(!metadata.recoverable);
    }

    #[test]
    fn test_unknown_code_fallbacks() {
        assert!(get_error_metadata("X999").is_none());
        assert_eq!(get_category("X999"), "Unknown");
        assert_eq!(get_severity("X999"), Severity::Medium);
    }
}
