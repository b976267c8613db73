//! WordPress file header parsing
//!
//! Plugins and themes describe themselves in a comment block at the top of
//! their main file (`Plugin Name: ...`, `Theme Name: ...`). Only the first
//! 8 KiB of a file is searched.

use std::fs;

use comp_fs::{NormalizedPath, io};
use regex::Regex;

/// Bytes of a file searched for headers.
const HEADER_SCAN_LIMIT: usize = 8 * 1024;

/// Header fields of a plugin main file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginHeader {
    pub name: String,
    pub version: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
}

/// Header fields of a theme `style.css`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThemeHeader {
    pub name: String,
    pub version: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    /// Parent theme directory for child themes.
    pub template: Option<String>,
}

/// Value of `field` in a header comment block, if present and non-empty.
pub fn header_value(content: &str, field: &str) -> Option<String> {
    let pattern = format!(
        r"(?mi)^(?:[ \t]*<\?php)?[ \t/*#@]*{}:(.*)$",
        regex::escape(field)
    );
    let re = Regex::new(&pattern).ok()?;
    let raw = re.captures(content)?.get(1)?.as_str();
    let cleaned = match raw.find("*/").into_iter().chain(raw.find("?>")).min() {
        Some(end) => &raw[..end],
        None => raw,
    };
    let value = cleaned.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn read_header_block(path: &NormalizedPath) -> Option<String> {
    io::read_head(path, HEADER_SCAN_LIMIT)
        .ok()
        .map(|content| content.replace('\r', "\n"))
}

/// Parse a plugin header, `None` when the file has no `Plugin Name`.
pub fn plugin_header(path: &NormalizedPath) -> Option<PluginHeader> {
    let content = read_header_block(path)?;
    Some(PluginHeader {
        name: header_value(&content, "Plugin Name")?,
        version: header_value(&content, "Version"),
        description: header_value(&content, "Description"),
        author: header_value(&content, "Author"),
    })
}

/// Parse a theme's `style.css`, `None` when it has no `Theme Name`.
pub fn theme_header(style_css: &NormalizedPath) -> Option<ThemeHeader> {
    let content = read_header_block(style_css)?;
    Some(ThemeHeader {
        name: header_value(&content, "Theme Name")?,
        version: header_value(&content, "Version"),
        description: header_value(&content, "Description"),
        author: header_value(&content, "Author"),
        template: header_value(&content, "Template"),
    })
}

/// Find the main file of the plugin installed in `dir`.
///
/// Top-level `.php` files are searched in name order and the first one with a
/// plugin header wins. Returns the file name and its header.
pub fn find_plugin_main_file(dir: &NormalizedPath) -> Option<(String, PluginHeader)> {
    let entries = fs::read_dir(dir.to_native()).ok()?;
    let mut candidates: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .filter(|name| name.to_ascii_lowercase().ends_with(".php"))
        .collect();
    candidates.sort();

    candidates
        .into_iter()
        .find_map(|name| plugin_header(&dir.join(&name)).map(|header| (name, header)))
}
