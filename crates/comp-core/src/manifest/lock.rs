//! Lock state: the packages the resolver actually installed

use comp_fs::{NormalizedPath, checksum::md5_hex, io};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Manifest;
use crate::{Error, Result};

/// Manifest keys that feed Composer's lock `content-hash`.
const RELEVANT_KEYS: &[&str] = &[
    "name",
    "version",
    "require",
    "require-dev",
    "conflict",
    "replace",
    "provide",
    "minimum-stability",
    "prefer-stable",
    "repositories",
    "extra",
];

/// A parsed `composer.lock`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LockState {
    #[serde(rename = "content-hash", default)]
    pub content_hash: Option<String>,

    #[serde(default)]
    pub packages: Vec<LockedPackage>,

    #[serde(rename = "packages-dev", default)]
    pub packages_dev: Vec<LockedPackage>,

    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// One resolved package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockedPackage {
    pub name: String,
    pub version: String,
    #[serde(rename = "type", default = "default_package_type")]
    pub package_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub authors: Vec<Author>,
}

fn default_package_type() -> String {
    "library".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
}

impl LockedPackage {
    /// Name without the vendor prefix, which is also the install directory name.
    pub fn short_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    pub fn is_plugin(&self) -> bool {
        self.package_type == "wordpress-plugin"
    }

    pub fn is_theme(&self) -> bool {
        self.package_type == "wordpress-theme"
    }
}

impl LockState {
    /// Parse a lock file.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] when the file is absent
    /// - [`Error::ParseError`] for malformed JSON
    pub fn read(path: &NormalizedPath) -> Result<Self> {
        let content = io::read_text(path).map_err(|e| Error::from_read(path.to_native(), e))?;
        serde_json::from_str(&content).map_err(|e| Error::parse(path.to_native(), &e))
    }

    /// Whether this lock was resolved from `manifest`.
    pub fn is_fresh_for(&self, manifest: &Manifest) -> Result<bool> {
        match &self.content_hash {
            Some(hash) => Ok(*hash == content_hash(manifest)?),
            None => Ok(false),
        }
    }
}

/// Composer-compatible content hash of a manifest.
///
/// md5 over the relevant top-level keys, sorted, encoded the way PHP's
/// `json_encode` does by default (escaped slashes, `\uXXXX` for non-ASCII,
/// empty objects as `[]`).
///
/// Nested object keys are encoded in sorted order, while Composer keeps file
/// order. Manifests written by [`super::ManifestStore`] are always sorted, so
/// the two agree; a hand-edited manifest with unsorted `require` or `extra`
/// keys reads as stale until it is next written, costing one `update` run.
pub fn content_hash(manifest: &Manifest) -> Result<String> {
    let value = manifest.to_value()?;
    let mut relevant: Vec<(&str, &Value)> = RELEVANT_KEYS
        .iter()
        .filter_map(|key| value.get(*key).map(|v| (*key, v)))
        .collect();

    let platform = value
        .get("config")
        .and_then(|config| config.get("platform"))
        .map(|platform| {
            let mut config = Map::new();
            config.insert("platform".to_string(), platform.clone());
            Value::Object(config)
        });
    if let Some(config) = &platform {
        relevant.push(("config", config));
    }
    relevant.sort_by(|a, b| a.0.cmp(b.0));

    let mut encoded = String::from("{");
    for (i, (key, value)) in relevant.iter().enumerate() {
        if i > 0 {
            encoded.push(',');
        }
        php_encode_string(key, &mut encoded);
        encoded.push(':');
        php_encode(value, &mut encoded);
    }
    encoded.push('}');

    Ok(md5_hex(encoded.as_bytes()))
}

fn php_encode(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) if map.is_empty() => out.push_str("[]"),
        Value::Object(map) => {
            out.push('{');
            for (i, (key, value)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                php_encode_string(key, out);
                out.push(':');
                php_encode(value, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                php_encode(item, out);
            }
            out.push(']');
        }
        Value::String(s) => php_encode_string(s, out),
        other => out.push_str(&other.to_string()),
    }
}

fn php_encode_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '/' => out.push_str("\\/"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || !c.is_ascii() => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    out.push_str(&format!("\\u{:04x}", unit));
                }
            }
            c => out.push(c),
        }
    }
    out.push('"');
}
