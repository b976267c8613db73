//! Manifest document and fingerprint

use std::collections::BTreeMap;

use comp_fs::checksum::compute_content_checksum;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Result;

/// `extra` key holding the opaque composition identity.
pub const COMPOSITION_KEY: &str = "composition";
/// `extra` key holding the required-package provenance list.
pub const REQUIRED_KEY: &str = "composition-required";
/// `extra` key holding the schema version.
pub const SPEC_VERSION_KEY: &str = "composition-spec-version";
/// `extra` key holding the tamper-detection fingerprint.
pub const FINGERPRINT_KEY: &str = "composition-fingerprint";

/// A `composer.json` document describing the desired package set.
///
/// Keys this crate does not interpret are kept in `rest` and written back
/// unchanged, so a round trip only normalizes key order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub require: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,

    #[serde(default, skip_serializing_if = "Extra::is_empty")]
    pub extra: Extra,

    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// The `extra` object, with the vendor keys pulled out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extra {
    #[serde(rename = "composition", default, skip_serializing_if = "Option::is_none")]
    pub composition: Option<String>,

    #[serde(
        rename = "composition-required",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub required: Vec<RequiredPackage>,

    #[serde(
        rename = "composition-spec-version",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub spec_version: Option<String>,

    #[serde(
        rename = "composition-fingerprint",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub fingerprint: Option<String>,

    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl Extra {
    pub fn is_empty(&self) -> bool {
        self.composition.is_none()
            && self.required.is_empty()
            && self.spec_version.is_none()
            && self.fingerprint.is_none()
            && self.rest.is_empty()
    }
}

/// Provenance of a top-level package the remote authority requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredPackage {
    pub name: String,
    pub version: String,
    #[serde(rename = "requiredBy", default)]
    pub required_by: String,
}

impl Manifest {
    /// Parse a manifest from JSON text.
    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    /// The manifest as a JSON value.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Canonical body the fingerprint is computed over: compact JSON with
    /// sorted object keys and the fingerprint itself removed.
    pub fn canonical_body(&self) -> Result<String> {
        let mut value = self.to_value()?;
        if let Some(extra) = value.get_mut("extra").and_then(Value::as_object_mut) {
            extra.remove(FINGERPRINT_KEY);
            if extra.is_empty() {
                if let Some(root) = value.as_object_mut() {
                    root.remove("extra");
                }
            }
        }
        Ok(canonical_json(&value))
    }

    /// Recompute the fingerprint of this manifest.
    pub fn compute_fingerprint(&self) -> Result<String> {
        Ok(compute_content_checksum(&self.canonical_body()?))
    }

    /// Whether the embedded fingerprint matches the body.
    ///
    /// A manifest without a fingerprint has nothing to verify and passes.
    pub fn verify_fingerprint(&self) -> Result<bool> {
        match &self.extra.fingerprint {
            Some(expected) => Ok(*expected == self.compute_fingerprint()?),
            None => Ok(true),
        }
    }

    /// Embed a freshly computed fingerprint.
    pub fn seal(&mut self) -> Result<()> {
        self.extra.fingerprint = Some(self.compute_fingerprint()?);
        Ok(())
    }

    /// Short package names the remote authority requires, with provenance.
    pub fn required_packages(&self) -> &[RequiredPackage] {
        &self.extra.required
    }
}

/// Compact JSON with object keys sorted at every level, independent of how
/// the value's maps order their entries.
pub(crate) fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let body: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{}:{}", Value::String(k.clone()), canonical_json(&map[k])))
                .collect();
            format!("{{{}}}", body.join(","))
        }
        Value::Array(items) => {
            let body: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", body.join(","))
        }
        other => other.to_string(),
    }
}
