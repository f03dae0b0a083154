//! Cache-key derivation and configuration signatures.
//!
//! A recording only applies when the instruction, start URL, sanitized
//! options, and agent configuration all match. The first three are
//! structural; the configuration is flattened into a stable string
//! signature first so the final key is a single SHA-256 over a fixed
//! 4-field payload. Key derivation is pure: no clocks, no randomness.

use reprise_types::{AgentOptions, SanitizedOptions};
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Entry file name for a cache key.
pub fn entry_file_name(key: &str) -> String {
    format!("agent-{key}.json")
}

fn is_secret_key(name: &str) -> bool {
    let normalized: String = name
        .chars()
        .filter(|c| *c != '-' && *c != '_')
        .collect::<String>()
        .to_ascii_lowercase();
    normalized == "apikey"
}

/// Recursively remove credential-bearing keys from a JSON value.
///
/// Any object key spelling a variant of `apiKey` (`api_key`, `api-key`,
/// case-insensitive) is dropped, at every nesting depth, descending
/// through arrays. Surviving keys are re-inserted in sorted order so
/// structurally equal inputs serialize identically.
pub fn strip_secret_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().filter(|k| !is_secret_key(k)).collect();
            keys.sort();
            let mut out = Map::new();
            for key in keys {
                out.insert(key.clone(), strip_secret_keys(&map[key]));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(strip_secret_keys).collect()),
        other => other.clone(),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignaturePayload<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model_options: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_prompt: Option<&'a str>,
    tools: Vec<&'a str>,
    integrations: &'a [String],
}

/// Build the stable signature for an agent configuration.
///
/// Serializes model identity and options (secrets stripped), the system
/// prompt, sorted tool names, and integration identifiers. Absent
/// optional fields are omitted entirely, so "unset" and "missing" agree.
pub fn build_config_signature(options: &AgentOptions) -> String {
    let mut tools: Vec<&str> = options.tools.iter().map(String::as_str).collect();
    tools.sort_unstable();
    let payload = SignaturePayload {
        model: &options.model,
        model_options: options.model_options.as_ref().map(strip_secret_keys),
        system_prompt: options.system_prompt.as_deref(),
        tools,
        integrations: &options.integrations,
    };
    // Struct fields serialize in declaration order, keeping the
    // signature byte-stable for equal inputs.
    serde_json::to_string(&payload).unwrap_or_default()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct KeyPayload<'a> {
    instruction: &'a str,
    start_url: &'a str,
    options: &'a SanitizedOptions,
    config_signature: &'a str,
}

/// Derive the cache key for an execution.
///
/// Lowercase hex SHA-256 over the serialized
/// (instruction, startUrl, options, configSignature) tuple.
pub fn cache_key(
    instruction: &str,
    start_url: &str,
    options: &SanitizedOptions,
    config_signature: &str,
) -> String {
    let payload = KeyPayload {
        instruction,
        start_url,
        options,
        config_signature,
    };
    let raw = serde_json::to_string(&payload).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    format!("{:x}", hasher.finalize())
}
