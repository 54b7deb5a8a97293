//! Loading, merging and validation of platform JSON configs.
//!
//! The flattened platform config is a JSON document of the shape
//! `{"unibuild": {"configs": [...]}}` where each element of `configs`
//! describes one device variant. Apart from the `identity` section
//! (see [`crate::identity`]) the per-device payload is schemaless from
//! our point of view, so this module works with [`serde_json::Value`].

use anyhow::{Context, Result};
use camino::Utf8Path;
use fn_error_context::context;
use regex::Regex;
use serde_json::{json, Map, Value};

/// The top-level key of the platform config document.
pub const ROOT_KEY: &str = "unibuild";

/// Wrap a list of device configs into a complete config document.
pub fn wrap_configs(configs: Vec<Value>) -> Value {
    json!({ ROOT_KEY: { "configs": configs } })
}

/// Borrow the list of device configs out of a config document.
pub fn device_configs(root: &Value) -> Result<&Vec<Value>> {
    root.get(ROOT_KEY)
        .and_then(|v| v.get("configs"))
        .and_then(Value::as_array)
        .with_context(|| format!("Config has no {ROOT_KEY}.configs list"))
}

/// Load a config file, accepting JSON or (by file extension) YAML.
#[context("Loading config {path}")]
pub fn load_config(path: &Utf8Path) -> Result<Value> {
    let contents = std::fs::read_to_string(path)?;
    let parsed = match path.extension() {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&contents)?,
        _ => serde_json::from_str(&contents)?,
    };
    Ok(parsed)
}

/// Recursively merge `overlay` into `primary`.
///
/// Objects merge key-wise with the overlay winning on scalar conflicts,
/// arrays append, and anything else is replaced by the overlay value.
pub fn merge_values(primary: &mut Value, overlay: Value) {
    match (primary, overlay) {
        (Value::Object(base), Value::Object(over)) => {
            for (key, value) in over {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (Value::Array(base), Value::Array(over)) => {
            base.extend(over);
        }
        (slot, value) => *slot = value,
    }
}

/// Load and merge a sequence of config files, in order.
pub fn merge_config_files(paths: &[impl AsRef<Utf8Path>]) -> Result<Value> {
    let mut result = Value::Object(Map::new());
    for path in paths {
        merge_values(&mut result, load_config(path.as_ref())?);
    }
    Ok(result)
}

/// Drop device configs whose `name` does not match `filter`.
/// Configs without a name are kept.
pub fn filter_models(root: &mut Value, filter: &Regex) -> Result<()> {
    let configs = root
        .get_mut(ROOT_KEY)
        .and_then(|v| v.get_mut("configs"))
        .and_then(Value::as_array_mut)
        .with_context(|| format!("Config has no {ROOT_KEY}.configs list"))?;
    configs.retain(|config| match config.get("name").and_then(Value::as_str) {
        Some(name) => filter.is_match(name),
        None => true,
    });
    Ok(())
}

/// Produce the minified identity document: each device config reduced
/// to its `identity` section only, order preserved.
pub fn identity_json(root: &Value) -> Result<Value> {
    let minified = device_configs(root)?
        .iter()
        .map(|config| {
            let identity = config.get("identity").cloned().unwrap_or(json!({}));
            json!({ "identity": identity })
        })
        .collect();
    Ok(wrap_configs(minified))
}

/// Render a JSON document the way our build outputs expect it: keys
/// sorted, two space indent, trailing newline.
pub fn format_json(value: &Value) -> Result<String> {
    // serde_json maps are ordered by key already (we do not enable
    // preserve_order), so pretty printing is all that's left.
    let mut out = serde_json::to_string_pretty(value)?;
    out.push('\n');
    Ok(out)
}

/// Targeted semantic checks on a merged config document.
///
/// Verifies that device identities are unique and that at most one
/// distinct `platform-name` is in use across all configs.
#[context("Validating config")]
pub fn validate(root: &Value) -> Result<()> {
    let configs = device_configs(root)?;

    let mut seen: Vec<&Value> = Vec::new();
    let mut platform_name: Option<&str> = None;
    for config in configs {
        if let Some(identity) = config.get("identity") {
            anyhow::ensure!(
                !seen.contains(&identity),
                "Identities are not unique: {identity}"
            );
            seen.push(identity);

            if let Some(name) = identity.get("platform-name").and_then(Value::as_str) {
                match platform_name {
                    None => platform_name = Some(name),
                    Some(existing) if existing != name => anyhow::bail!(
                        "Multiple platform names used: {existing} and {name}"
                    ),
                    Some(_) => {}
                }
            }
        }
    }
    Ok(())
}
