// build.rs - TOML-driven compile-time constant generation
use std::env;
use std::fs;
use std::path::Path;

#[derive(serde::Deserialize)]
struct CompileTimeConfig {
    reader: ReaderLimits,
    lexical: LexicalLimits,
    syntax: SyntaxLimits,
    logging: LoggingLimits,
}

#[derive(serde::Deserialize)]
struct ReaderLimits {
    read_chunk_bytes: usize,
    compact_threshold: usize,
}

#[derive(serde::Deserialize)]
struct LexicalLimits {
    min_advance_chunk: usize,
    max_lexeme_size: usize,
}

#[derive(serde::Deserialize)]
struct SyntaxLimits {
    receive_poll_interval_ms: u64,
}

#[derive(serde::Deserialize)]
struct LoggingLimits {
    log_buffer_size: usize,
    max_log_message_length: usize,
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=LEXPARSE_BUILD_PROFILE");
    println!("cargo:rerun-if-env-changed=LEXPARSE_CONFIG_DIR");

    let profile =
        env::var("LEXPARSE_BUILD_PROFILE").unwrap_or_else(|_| "development".to_string());
    let config_dir = env::var("LEXPARSE_CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

    // Find workspace root (parent of the lexparse directory)
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let workspace_root = Path::new(&manifest_dir)
        .parent()
        .expect("Could not find workspace root (parent directory)");

    let config_path = workspace_root
        .join(&config_dir)
        .join(format!("{}.toml", profile));

    println!("cargo:rerun-if-changed={}", config_path.display());

    if !config_path.exists() {
        panic!(
            "Configuration file not found: {}\nWorkspace root: {}\nLooking for: {}/{}/{}.toml",
            config_path.display(),
            workspace_root.display(),
            workspace_root.display(),
            config_dir,
            profile
        );
    }

    let config_content = fs::read_to_string(&config_path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", config_path.display(), e));

    let config: CompileTimeConfig = toml::from_str(&config_content)
        .unwrap_or_else(|e| panic!("Invalid TOML in {}: {}", config_path.display(), e));

    validate_limits(&config, &profile);
    generate_constants(&config, &profile);
}

fn validate_limits(config: &CompileTimeConfig, profile: &str) {
    const ABSOLUTE_MAX_LEXEME_SIZE: usize = 1 << 30;
    const ABSOLUTE_MAX_POLL_INTERVAL_MS: u64 = 1_000;

    if config.reader.read_chunk_bytes < 4 {
        panic!("reader.read_chunk_bytes must hold at least one UTF-8 sequence (4 bytes)");
    }

    if config.lexical.min_advance_chunk == 0 {
        panic!("lexical.min_advance_chunk must be positive");
    }

    if config.lexical.max_lexeme_size > ABSOLUTE_MAX_LEXEME_SIZE {
        panic!("lexical.max_lexeme_size exceeds absolute maximum");
    }

    if config.syntax.receive_poll_interval_ms == 0
        || config.syntax.receive_poll_interval_ms > ABSOLUTE_MAX_POLL_INTERVAL_MS
    {
        panic!("syntax.receive_poll_interval_ms must be within 1..=1000");
    }

    if config.logging.log_buffer_size < 100 {
        panic!("logging.log_buffer_size too small (min: 100)");
    }

    if profile == "production" && config.lexical.max_lexeme_size > 64 << 20 {
        panic!("PRODUCTION: lexical.max_lexeme_size too high for production");
    }
}

fn generate_constants(config: &CompileTimeConfig, profile: &str) {
    let out_dir = env::var("OUT_DIR").unwrap();
    let output_path = Path::new(&out_dir).join("constants.rs");

    let constants_code = format!(
        r#"
// Generated compile-time constants from TOML configuration
// Profile: {}
// DO NOT EDIT - Generated by build.rs

pub mod compile_time {{
    pub mod reader {{
        pub const READ_CHUNK_BYTES: usize = {};
        pub const COMPACT_THRESHOLD: usize = {};
    }}

    pub mod lexical {{
        pub const MIN_ADVANCE_CHUNK: usize = {};
        pub const MAX_LEXEME_SIZE: usize = {};
    }}

    pub mod syntax {{
        pub const RECEIVE_POLL_INTERVAL_MS: u64 = {};
    }}

    pub mod logging {{
        pub const LOG_BUFFER_SIZE: usize = {};
        pub const MAX_LOG_MESSAGE_LENGTH: usize = {};
    }}
}}
"#,
        profile,
        // Reader
        config.reader.read_chunk_bytes,
        config.reader.compact_threshold,
        // Lexical
        config.lexical.min_advance_chunk,
        config.lexical.max_lexeme_size,
        // Syntax
        config.syntax.receive_poll_interval_ms,
        // Logging
        config.logging.log_buffer_size,
        config.logging.max_log_message_length,
    );

    fs::write(output_path, constants_code).unwrap();
}
