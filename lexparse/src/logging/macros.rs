//! Logging macros using Code types with Display context values

/// Log error with Code type - context values are formatted only when the level is enabled
#[macro_export]
macro_rules! log_error {
    ($code:expr, $message:expr) => {
        if $crate::logging::enabled($crate::logging::LogLevel::Error) {
            $crate::logging::log_error_with_context($code, $message, None, vec![])
        }
    };

    ($code:expr, $message:expr, position = $position:expr) => {
        if $crate::logging::enabled($crate::logging::LogLevel::Error) {
            $crate::logging::log_error_with_context($code, $message, Some($position), vec![])
        }
    };

    ($code:expr, $message:expr, $($key:expr => $value:expr),+) => {
        if $crate::logging::enabled($crate::logging::LogLevel::Error) {
            let context_strings: Vec<(&str, String)> = vec![$(($key, format!("{}", $value))),+];
            let context_refs: Vec<(&str, &str)> = context_strings.iter()
                .map(|(k, v)| (*k, v.as_str()))
                .collect();
            $crate::logging::log_error_with_context($code, $message, None, context_refs)
        }
    };

    ($code:expr, $message:expr, position = $position:expr, $($key:expr => $value:expr),+) => {
        if $crate::logging::enabled($crate::logging::LogLevel::Error) {
            let context_strings: Vec<(&str, String)> = vec![$(($key, format!("{}", $value))),+];
            let context_refs: Vec<(&str, &str)> = context_strings.iter()
                .map(|(k, v)| (*k, v.as_str()))
                .collect();
            $crate::logging::log_error_with_context($code, $message, Some($position), context_refs)
        }
    };
}

/// Log success with Code type - context values are formatted only when the level is enabled
#[macro_export]
macro_rules! log_success {
    ($code:expr, $message:expr) => {
        if $crate::logging::enabled($crate::logging::LogLevel::Info) {
            $crate::logging::log_success_with_context($code, $message, vec![])
        }
    };

    ($code:expr, $message:expr, $($key:expr => $value:expr),+) => {
        if $crate::logging::enabled($crate::logging::LogLevel::Info) {
            let context_strings: Vec<(&str, String)> = vec![$(($key, format!("{}", $value))),+];
            let context_refs: Vec<(&str, &str)> = context_strings.iter()
                .map(|(k, v)| (*k, v.as_str()))
                .collect();
            $crate::logging::log_success_with_context($code, $message, context_refs)
        }
    };
}

/// Log warning message, optionally with a specific code
#[macro_export]
macro_rules! log_warning {
    ($message:expr) => {
        if $crate::logging::enabled($crate::logging::LogLevel::Warning) {
            $crate::logging::log_warning_with_context(None, $message, vec![])
        }
    };

    (code = $code:expr, $message:expr) => {
        if $crate::logging::enabled($crate::logging::LogLevel::Warning) {
            $crate::logging::log_warning_with_context(Some($code), $message, vec![])
        }
    };

    (code = $code:expr, $message:expr, $($key:expr => $value:expr),+) => {
        if $crate::logging::enabled($crate::logging::LogLevel::Warning) {
            let context_strings: Vec<(&str, String)> = vec![$(($key, format!("{}", $value))),+];
            let context_refs: Vec<(&str, &str)> = context_strings.iter()
                .map(|(k, v)| (*k, v.as_str()))
                .collect();
            $crate::logging::log_warning_with_context(Some($code), $message, context_refs)
        }
    };

    ($message:expr, $($key:expr => $value:expr),+) => {
        if $crate::logging::enabled($crate::logging::LogLevel::Warning) {
            let context_strings: Vec<(&str, String)> = vec![$(($key, format!("{}", $value))),+];
            let context_refs: Vec<(&str, &str)> = context_strings.iter()
                .map(|(k, v)| (*k, v.as_str()))
                .collect();
            $crate::logging::log_warning_with_context(None, $message, context_refs)
        }
    };
}

/// Log debug message; context values are only formatted when debug output is enabled
#[macro_export]
macro_rules! log_debug {
    ($message:expr) => {
        if $crate::logging::debug_enabled() {
            $crate::logging::log_debug_with_context($message, vec![])
        }
    };

    ($message:expr, $($key:expr => $value:expr),+) => {
        if $crate::logging::debug_enabled() {
            let context_strings: Vec<(&str, String)> = vec![$(($key, format!("{}", $value))),+];
            let context_refs: Vec<(&str, &str)> = context_strings.iter()
                .map(|(k, v)| (*k, v.as_str()))
                .collect();
            $crate::logging::log_debug_with_context($message, context_refs)
        }
    };
}
