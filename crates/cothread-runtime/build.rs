//! Build script for cothread-runtime
//!
//! Handles configuration merging:
//! 1. Start with library defaults
//! 2. If COTHREAD_CONFIG_RS env var is set, parse user's config file
//! 3. Merge user values over defaults (user wins)
//! 4. Generate OUT_DIR/cothread_merged_config.rs
//!
//! User only needs to specify values they want to change.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

/// Configuration parameter definition
struct ConfigParam {
    name: &'static str,
    rust_type: &'static str,
    default_value: &'static str,
}

/// All configuration parameters with their defaults
const CONFIG_PARAMS: &[ConfigParam] = &[
    ConfigParam {
        name: "STACK_SIZE",
        rust_type: "usize",
        default_value: "cothread_core::constants::DEFAULT_STACK_SIZE",
    },
    ConfigParam {
        name: "GUARD_PAGE",
        rust_type: "bool",
        default_value: "true",
    },
    ConfigParam {
        name: "DEBUG_LOGGING",
        rust_type: "bool",
        default_value: "false",
    },
];

fn main() {
    let out_dir = env::var("OUT_DIR").expect("OUT_DIR not set");
    let dest_path = Path::new(&out_dir).join("cothread_merged_config.rs");

    let mut config: HashMap<&str, String> = CONFIG_PARAMS
        .iter()
        .map(|p| (p.name, p.default_value.to_string()))
        .collect();

    let user_path = env::var("COTHREAD_CONFIG_RS").ok();
    if let Some(path) = &user_path {
        println!("cargo:rerun-if-changed={}", path);

        match fs::read_to_string(path) {
            Ok(content) => {
                parse_and_merge(&content, &mut config);
                println!("cargo:warning=Using custom config: {}", path);
            }
            Err(e) => {
                println!(
                    "cargo:warning=Failed to read COTHREAD_CONFIG_RS ({}): {}",
                    path, e
                );
            }
        }
    }

    println!("cargo:rerun-if-env-changed=COTHREAD_CONFIG_RS");
    println!("cargo:rerun-if-changed=build.rs");

    let output = generate_config(&config, user_path.is_some());
    fs::write(&dest_path, output).expect("Failed to write merged config");
}

/// Parse user's config file and merge known values into the config map
fn parse_and_merge(content: &str, config: &mut HashMap<&'static str, String>) {
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") || !line.starts_with("pub const ") {
            continue;
        }

        let Some((name, value)) = parse_const_line(line) else {
            continue;
        };
        match CONFIG_PARAMS.iter().find(|p| p.name == name) {
            Some(param) => {
                config.insert(param.name, value);
            }
            None => println!("cargo:warning=Unknown config parameter: {}", name),
        }
    }
}

/// Parse `pub const NAME: TYPE = VALUE;` into (name, value)
fn parse_const_line(line: &str) -> Option<(String, String)> {
    let rest = line.strip_prefix("pub const ")?.trim();

    let colon_pos = rest.find(':')?;
    let name = rest[..colon_pos].trim().to_string();

    let eq_pos = rest.find('=')?;
    let semi_pos = rest.rfind(';').unwrap_or(rest.len());
    let value = rest[eq_pos + 1..semi_pos].trim().to_string();

    Some((name, value))
}

/// Generate the merged config Rust file
fn generate_config(config: &HashMap<&str, String>, has_user_config: bool) -> String {
    let mut output = String::new();

    output.push_str("// Auto-generated by build.rs - do not edit\n");
    output.push_str("// Configuration merged from library defaults");
    if has_user_config {
        output.push_str(" and user's cothread_config.rs");
    }
    output.push_str("\n\n");

    for param in CONFIG_PARAMS {
        let value = &config[param.name];
        output.push_str(&format!(
            "pub const {}: {} = {};\n",
            param.name, param.rust_type, value
        ));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_const_line() {
        let result = parse_const_line("pub const GUARD_PAGE: bool = false;");
        assert_eq!(result, Some(("GUARD_PAGE".into(), "false".into())));

        let result = parse_const_line("pub const STACK_SIZE: usize = 256 * 1024;");
        assert_eq!(result, Some(("STACK_SIZE".into(), "256 * 1024".into())));

        assert_eq!(parse_const_line("pub const BROKEN"), None);
    }

    #[test]
    fn test_parse_and_merge() {
        let mut config: HashMap<&'static str, String> = HashMap::new();
        config.insert("STACK_SIZE", "65536".into());
        config.insert("GUARD_PAGE", "true".into());

        let user_config = r#"
            // Custom config
            pub const STACK_SIZE: usize = 131072;
            pub const NOT_A_PARAM: u8 = 1;
        "#;

        parse_and_merge(user_config, &mut config);

        assert_eq!(config.get("STACK_SIZE"), Some(&"131072".to_string()));
        assert_eq!(config.get("GUARD_PAGE"), Some(&"true".to_string()));
        assert!(!config.contains_key("NOT_A_PARAM"));
    }
}
