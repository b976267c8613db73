//! [`TestSite`] builder for WordPress site trees.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use tempfile::TempDir;

/// A temporary site root with helpers to lay down plugins, themes, a
/// manifest and a lock file.
pub struct TestSite {
    temp_dir: TempDir,
    packages: Vec<Value>,
}

impl Default for TestSite {
    fn default() -> Self {
        Self::new()
    }
}

impl TestSite {
    /// Empty site with `wp-content/{plugins,themes,mu-plugins}` created.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        for dir in ["plugins", "themes", "mu-plugins"] {
            fs::create_dir_all(temp_dir.path().join("wp-content").join(dir)).unwrap();
        }
        Self {
            temp_dir,
            packages: Vec::new(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    /// Write an arbitrary file below the root.
    pub fn write(&self, relative: &str, content: &str) -> &Self {
        let full = self.path(relative);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, content).unwrap();
        self
    }

    /// Lay down `wp-content/plugins/<slug>/<slug>.php` with a plugin header.
    pub fn plugin_files(&self, slug: &str, name: &str, version: &str) -> &Self {
        self.write(
            &format!("wp-content/plugins/{slug}/{slug}.php"),
            &format!(
                "<?php\n/**\n * Plugin Name: {name}\n * Description: {name} description\n * Version: {version}\n * Author: Test Author\n */\n"
            ),
        )
    }

    /// Lay down `wp-content/themes/<slug>/style.css` with a theme header.
    pub fn theme_files(&self, slug: &str, name: &str, template: Option<&str>) -> &Self {
        let template = template
            .map(|t| format!("Template: {t}\n"))
            .unwrap_or_default();
        self.write(
            &format!("wp-content/themes/{slug}/style.css"),
            &format!("/*\nTheme Name: {name}\n{template}Version: 1.0.0\n*/\n"),
        )
    }

    /// Record a package for the next [`TestSite::write_lock`].
    pub fn lock_package(&mut self, name: &str, version: &str, kind: &str) -> &mut Self {
        self.packages.push(json!({
            "name": name,
            "version": version,
            "type": kind,
            "description": format!("{name} package"),
            "homepage": format!("https://example.org/{name}"),
            "authors": [{"name": "Test Author"}],
        }));
        self
    }

    /// Forget packages recorded so far.
    pub fn clear_lock_packages(&mut self) -> &mut Self {
        self.packages.clear();
        self
    }

    /// Write `composer.lock` with the recorded packages and `content_hash`.
    pub fn write_lock(&self, content_hash: &str) -> &Self {
        let lock = json!({
            "content-hash": content_hash,
            "packages": self.packages,
            "packages-dev": [],
        });
        self.write(
            "composer.lock",
            &serde_json::to_string_pretty(&lock).unwrap(),
        )
    }

    /// Write `composer.json` from a JSON value.
    pub fn write_manifest(&self, manifest: &Value) -> &Self {
        self.write(
            "composer.json",
            &serde_json::to_string_pretty(manifest).unwrap(),
        )
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative)).unwrap()
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.path(relative).exists()
    }
}
