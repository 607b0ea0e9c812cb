//! Client directory map: mount path to checkout metadata directory.
//!
//! Stored as `config.json` in the state directory. The file is written by
//! hand often enough that `//` and `/* */` comments and trailing commas
//! are accepted.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{CheckoutError, CheckoutResult};

pub const CLIENT_DIRECTORY_MAP: &str = "config.json";

/// Load the client directory map from `<state_dir>/config.json`.
pub fn load_client_directory_map(state_dir: &Path) -> CheckoutResult<BTreeMap<String, PathBuf>> {
    let path = state_dir.join(CLIENT_DIRECTORY_MAP);
    let contents = std::fs::read_to_string(&path)?;
    parse_client_directory_map(&contents)
        .map_err(|reason| CheckoutError::ClientMap { path, reason })
}

/// Parse the contents of a client directory map.
pub fn parse_client_directory_map(
    contents: &str,
) -> Result<BTreeMap<String, PathBuf>, String> {
    let stripped = strip_comments(contents);
    if stripped.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(&strip_trailing_commas(&stripped)).map_err(|e| e.to_string())
}

/// Remove `//` and `/* */` comments that are not inside string literals.
fn strip_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        let next = chars.peek().copied();
        match (c, next) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for skipped in chars.by_ref() {
                    if prev == '*' && skipped == '/' {
                        break;
                    }
                    prev = skipped;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }
    out
}

/// Drop commas that directly precede a closing `}` or `]`.
fn strip_trailing_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            out.push(c);
            if c == '\\' {
                if let Some(&escaped) = chars.get(i + 1) {
                    out.push(escaped);
                    i += 1;
                }
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
            out.push(c);
        } else if c == ',' {
            let next = chars[i + 1..].iter().copied().find(|ch| !ch.is_whitespace());
            if !matches!(next, Some('}') | Some(']')) {
                out.push(c);
            }
        } else {
            out.push(c);
        }
        i += 1;
    }
    out
}
