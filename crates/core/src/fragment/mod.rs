//! URL-fragment contract for loading songs.
//!
//! Fragments are `&`-joined `key=value` pairs. Song payloads may themselves
//! contain `&`, so a separator only counts when it is followed by a
//! lowercase key and `=`. A fragment with no `key=value` pair at all is one
//! bare song payload.

use serde::{Deserialize, Serialize};

/// What a parsed fragment asks the player to do.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentRequest {
    /// Encoded song string to hand to the transport.
    pub song: Option<String>,
    /// Loop-repeat-count override: `loop=1` disables the override (count 0),
    /// any other value forces infinite looping (count -1).
    pub loop_repeat_count: Option<i32>,
}

/// Parses a location fragment, with or without its leading `#`.
pub fn parse_fragment(fragment: &str) -> FragmentRequest {
    let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
    let mut request = FragmentRequest::default();
    if fragment.is_empty() {
        return request;
    }

    let parameters = split_parameters(fragment);
    let has_pairs = parameters.iter().any(|parameter| key_of(parameter).is_some());
    if !has_pairs {
        request.song = Some(fragment.to_string());
        return request;
    }

    for parameter in parameters {
        let Some((key, value)) = key_of(&parameter) else {
            continue;
        };
        match key {
            "song" => request.song = Some(value.to_string()),
            "loop" => {
                request.loop_repeat_count = Some(if value == "1" { 0 } else { -1 });
            }
            // Unrecognised keys are ignored.
            _ => {}
        }
    }

    request
}

/// Splits at `&` only where the next segment starts a `key=` pair.
fn split_parameters(fragment: &str) -> Vec<&str> {
    let bytes = fragment.as_bytes();
    let mut parameters = Vec::new();
    let mut start = 0;
    for (index, &byte) in bytes.iter().enumerate() {
        if byte == b'&' && starts_key(&fragment[index + 1..]) {
            parameters.push(&fragment[start..index]);
            start = index + 1;
        }
    }
    parameters.push(&fragment[start..]);
    parameters
}

fn starts_key(rest: &str) -> bool {
    let key_len = rest.bytes().take_while(u8::is_ascii_lowercase).count();
    key_len > 0 && rest.as_bytes().get(key_len) == Some(&b'=')
}

/// Splits `key=value` when the parameter has a lowercase key.
fn key_of(parameter: &str) -> Option<(&str, &str)> {
    let equals = parameter.find('=')?;
    let (key, value) = parameter.split_at(equals);
    if !key.is_empty() && key.bytes().all(|byte| byte.is_ascii_lowercase()) {
        Some((key, &value[1..]))
    } else {
        None
    }
}
