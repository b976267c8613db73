//! Managed-package entries for the site's `.gitignore`

use comp_fs::SiteLayout;

use crate::cache::{PackageMap, plugin_dir};

/// Id of the marker block holding installer-managed paths.
pub const MANAGED_BLOCK_ID: &str = "managed-packages";

/// Ignore patterns for every cached plugin and theme, relative to the site
/// root and sorted.
///
/// Plugins living in a directory ignore the whole directory; single-file
/// plugins ignore just the file.
pub fn ignore_entries(layout: &SiteLayout, plugins: &PackageMap, themes: &PackageMap) -> Vec<String> {
    let plugins_root = relative_dir(layout, &layout.plugins_dir());
    let themes_root = relative_dir(layout, &layout.themes_dir());

    let mut entries: Vec<String> = plugins
        .keys()
        .map(|key| {
            if key.contains('/') {
                format!("/{plugins_root}/{}/", plugin_dir(key))
            } else {
                format!("/{plugins_root}/{key}")
            }
        })
        .chain(themes.keys().map(|stylesheet| format!("/{themes_root}/{stylesheet}/")))
        .collect();
    entries.sort();
    entries.dedup();
    entries
}

fn relative_dir(layout: &SiteLayout, dir: &comp_fs::NormalizedPath) -> String {
    layout
        .relative(dir)
        .map(|p| p.as_str().trim_matches('/').to_string())
        .unwrap_or_else(|| dir.as_str().trim_matches('/').to_string())
}
