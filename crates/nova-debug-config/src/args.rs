use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{anchor, UserError};

/// Joins argument tokens into one command-line string.
///
/// Tokens containing whitespace or a double quote are wrapped in double quotes
/// with `\` and `"` escaped by a backslash.
pub fn concat_args(tokens: &[Value]) -> String {
    tokens
        .iter()
        .map(|token| {
            let text = match token {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            quote_arg(&text)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote_arg(arg: &str) -> String {
    if !arg.chars().any(|c| c == '"' || c.is_whitespace()) {
        return arg.to_string();
    }

    let mut out = String::with_capacity(arg.len() + 2);
    out.push('"');
    for c in arg.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Parses a dotenv-style environment file.
///
/// Blank lines and `#` comments are skipped, an optional `export ` prefix is
/// accepted and matching surrounding quotes are stripped from values.
pub fn parse_env_file(text: &str) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        env.insert(key.to_string(), unquote(value.trim()).to_string());
    }
    env
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

pub fn load_env_file(path: &Path) -> Result<BTreeMap<String, String>, UserError> {
    let text = std::fs::read_to_string(path).map_err(|err| {
        UserError::usage(format!(
            "Cannot load environment file '{}': {err}",
            path.display()
        ))
        .with_anchor(anchor::ENV_FILE_ERROR)
    })?;
    Ok(parse_env_file(&text))
}
