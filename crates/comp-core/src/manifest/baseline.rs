//! Bare-bones manifest used to reinitialize a site

use serde_json::{Map, Value, json};

use super::Manifest;
use crate::Result;

/// Schema version written into freshly initialized manifests.
pub const SPEC_VERSION: &str = "1.0";

/// A manifest with installer paths and the WordPress Packagist repository but
/// no externally required packages, sealed with a fresh fingerprint.
///
/// `wp_content` is the `wp-content` directory relative to the manifest.
pub fn baseline_manifest(wp_content: &str) -> Result<Manifest> {
    let wp_content = wp_content.trim_end_matches('/');
    let mut manifest = Manifest::default();
    manifest
        .require
        .insert("composer/installers".to_string(), "^2.0".to_string());
    manifest.time = Some(chrono::Utc::now().to_rfc3339());

    manifest.extra.spec_version = Some(SPEC_VERSION.to_string());
    let mut installer_paths = Map::new();
    for (dir, package_type) in [
        ("plugins", "wordpress-plugin"),
        ("themes", "wordpress-theme"),
        ("mu-plugins", "wordpress-muplugin"),
    ] {
        installer_paths.insert(
            format!("{wp_content}/{dir}/{{$name}}/"),
            json!([format!("type:{package_type}")]),
        );
    }
    manifest
        .extra
        .rest
        .insert("installer-paths".to_string(), Value::Object(installer_paths));

    let rest: &mut Map<String, Value> = &mut manifest.rest;
    rest.insert(
        "repositories".to_string(),
        json!([{
            "type": "composer",
            "url": "https://wpackagist.org",
            "only": ["wpackagist-plugin/*", "wpackagist-theme/*"],
        }]),
    );
    rest.insert("minimum-stability".to_string(), json!("stable"));
    rest.insert("prefer-stable".to_string(), json!(true));
    rest.insert(
        "config".to_string(),
        json!({"allow-plugins": {"composer/installers": true}}),
    );

    manifest.seal()?;
    Ok(manifest)
}
