//! Path classification and Git Change Units
//!
//! Every changed path is attributed to the plugin, theme or must-use plugin
//! it belongs to, or to itself when it lives outside those roots. All paths
//! sharing a base are committed together with one message.

use std::collections::BTreeMap;
use std::fmt;

use comp_fs::NormalizedPath;
use comp_git::{ChangeKind, StatusEntry};

use crate::cache::headers::{find_plugin_main_file, plugin_header, theme_header};
use crate::cache::{PackageMap, plugin_dir};

/// What a change unit is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    File,
    Plugin,
    Theme,
    MuPlugin,
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Plugin => write!(f, "plugin"),
            Self::Theme => write!(f, "theme"),
            Self::MuPlugin => write!(f, "mu-plugin"),
        }
    }
}

/// The commit boundary a path belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub kind: ModuleKind,
    /// Repository-relative base path.
    pub base: String,
    pub name: String,
    pub version: Option<String>,
}

/// Uncommitted paths attributed to one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeUnit {
    pub module: Module,
    pub action: ChangeKind,
    pub paths: Vec<String>,
}

impl ChangeUnit {
    pub fn base(&self) -> &str {
        &self.module.base
    }

    /// Commit message, e.g. `Add plugin Akismet 5.3.1`.
    pub fn commit_message(&self) -> String {
        let verb = match self.action {
            ChangeKind::Added => "Add",
            ChangeKind::Modified => "Update",
            ChangeKind::Deleted => "Delete",
        };
        match (&self.module.kind, &self.module.version) {
            (ModuleKind::File, _) => format!("{verb} file {}", self.module.name),
            (kind, Some(version)) => format!("{verb} {kind} {} {version}", self.module.name),
            (kind, None) => format!("{verb} {kind} {}", self.module.name),
        }
    }
}

/// Classifies repository paths using the site layout and cached records.
#[derive(Debug, Clone)]
pub struct ModuleResolver {
    workdir: NormalizedPath,
    plugins_root: NormalizedPath,
    themes_root: NormalizedPath,
    mu_plugins_root: NormalizedPath,
    plugins: PackageMap,
    themes: PackageMap,
}

impl ModuleResolver {
    /// `*_root` are repository-relative directories.
    pub fn new(
        workdir: NormalizedPath,
        plugins_root: NormalizedPath,
        themes_root: NormalizedPath,
        mu_plugins_root: NormalizedPath,
        plugins: PackageMap,
        themes: PackageMap,
    ) -> Self {
        Self {
            workdir,
            plugins_root,
            themes_root,
            mu_plugins_root,
            plugins,
            themes,
        }
    }

    /// Collapse `path` (absolute or repository-relative) to its module.
    pub fn module_by_path(&self, path: &str) -> Module {
        let path = NormalizedPath::new(path);
        let relative = path.strip_prefix(&self.workdir).unwrap_or(path);
        let roots = [
            (ModuleKind::Theme, &self.themes_root),
            (ModuleKind::MuPlugin, &self.mu_plugins_root),
            (ModuleKind::Plugin, &self.plugins_root),
        ];

        for (kind, root) in roots {
            let Some(rest) = relative.strip_prefix(root) else {
                continue;
            };
            let Some(top) = rest.first_segment() else {
                continue;
            };
            let base = root.join(top);
            let is_dir = rest.segments().nth(1).is_some() || self.workdir.join(base.as_str()).is_dir();
            return self.describe(kind, top, base, is_dir);
        }

        Module {
            kind: ModuleKind::File,
            base: relative.as_str().to_string(),
            name: relative.as_str().to_string(),
            version: None,
        }
    }

    fn describe(&self, kind: ModuleKind, top: &str, base: NormalizedPath, is_dir: bool) -> Module {
        let on_disk = self.workdir.join(base.as_str());
        let (name, version) = match kind {
            ModuleKind::Plugin => {
                let cached = self
                    .plugins
                    .iter()
                    .find(|(key, _)| plugin_dir(key) == top)
                    .map(|(_, record)| (record.name.clone(), Some(record.version.clone())));
                cached.or_else(|| {
                    let header = if is_dir {
                        find_plugin_main_file(&on_disk).map(|(_, h)| h)
                    } else {
                        plugin_header(&on_disk)
                    };
                    header.map(|h| (h.name, h.version))
                })
            }
            ModuleKind::Theme => self
                .themes
                .get(top)
                .map(|record| (record.name.clone(), Some(record.version.clone())))
                .or_else(|| theme_header(&on_disk.join("style.css")).map(|h| (h.name, h.version))),
            ModuleKind::MuPlugin => {
                let header = if is_dir {
                    find_plugin_main_file(&on_disk).map(|(_, h)| h)
                } else {
                    plugin_header(&on_disk)
                };
                header.map(|h| (h.name, h.version))
            }
            ModuleKind::File => None,
        }
        .unwrap_or_else(|| (top.to_string(), None));

        Module {
            kind,
            base: base.as_str().to_string(),
            name,
            version,
        }
    }
}

/// Group status entries into change units, ordered by base path.
///
/// Ignored entries, unmerged entries and anything below `exclude` are left out.
pub fn group_changes(entries: &[StatusEntry], resolver: &ModuleResolver, exclude: &[NormalizedPath]) -> Vec<ChangeUnit> {
    let mut grouped: BTreeMap<String, (Module, Vec<(String, ChangeKind)>)> = BTreeMap::new();
    let excluded = |path: &str| {
        let path = NormalizedPath::new(path);
        exclude.iter().any(|e| path == *e || path.strip_prefix(e).is_some())
    };

    for entry in entries {
        if entry.is_ignored() || entry.conflict().is_some() {
            continue;
        }
        let mut changes = vec![(entry.path.clone(), entry.change_kind())];
        if let Some(orig) = &entry.orig_path {
            changes.push((orig.clone(), ChangeKind::Deleted));
        }
        for (path, kind) in changes {
            if excluded(&path) {
                continue;
            }
            let module = resolver.module_by_path(&path);
            grouped
                .entry(module.base.clone())
                .or_insert_with(|| (module, Vec::new()))
                .1
                .push((path, kind));
        }
    }

    grouped
        .into_values()
        .map(|(module, changes)| {
            let action = if changes.iter().all(|(_, k)| *k == ChangeKind::Added) {
                ChangeKind::Added
            } else if changes.iter().all(|(_, k)| *k == ChangeKind::Deleted) {
                ChangeKind::Deleted
            } else {
                ChangeKind::Modified
            };
            ChangeUnit {
                module,
                action,
                paths: changes.into_iter().map(|(p, _)| p).collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PackageRecord;
    use comp_git::parse_porcelain;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn resolver(workdir: &std::path::Path) -> ModuleResolver {
        let mut plugins = PackageMap::new();
        plugins.insert(
            "akismet/akismet.php".to_string(),
            PackageRecord::new("Akismet Anti-spam", "wpackagist-plugin/akismet", "5.3.1"),
        );
        ModuleResolver::new(
            NormalizedPath::new(workdir),
            NormalizedPath::new("wp-content/plugins"),
            NormalizedPath::new("wp-content/themes"),
            NormalizedPath::new("wp-content/mu-plugins"),
            plugins,
            PackageMap::new(),
        )
    }

    #[test]
    fn cached_plugin_collapses_to_directory() {
        let temp = TempDir::new().unwrap();
        let module = resolver(temp.path()).module_by_path("wp-content/plugins/akismet/views/stats.php");
        assert_eq!(
            module,
            Module {
                kind: ModuleKind::Plugin,
                base: "wp-content/plugins/akismet".to_string(),
                name: "Akismet Anti-spam".to_string(),
                version: Some("5.3.1".to_string()),
            }
        );
    }

    #[test]
    fn absolute_paths_are_relativized() {
        let temp = TempDir::new().unwrap();
        let absolute = temp.path().join("wp-content/plugins/akismet/akismet.php");
        let module = resolver(temp.path()).module_by_path(absolute.to_str().unwrap());
        assert_eq!(module.base, "wp-content/plugins/akismet");
    }

    #[test]
    fn uncached_theme_reads_header() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("wp-content/themes/custom");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("style.css"), "/*\nTheme Name: Custom Theme\nVersion: 0.4\n*/").unwrap();

        let module = resolver(temp.path()).module_by_path("wp-content/themes/custom/style.css");
        assert_eq!(module.kind, ModuleKind::Theme);
        assert_eq!(module.name, "Custom Theme");
        assert_eq!(module.version.as_deref(), Some("0.4"));
    }

    #[test]
    fn single_file_mu_plugin_without_header_uses_slug() {
        let temp = TempDir::new().unwrap();
        let module = resolver(temp.path()).module_by_path("wp-content/mu-plugins/loader.php");
        assert_eq!(module.kind, ModuleKind::MuPlugin);
        assert_eq!(module.base, "wp-content/mu-plugins/loader.php");
        assert_eq!(module.name, "loader.php");
        assert_eq!(module.version, None);
    }

    #[test]
    fn other_paths_are_standalone_files() {
        let temp = TempDir::new().unwrap();
        let module = resolver(temp.path()).module_by_path("wp-config.php");
        assert_eq!(module.kind, ModuleKind::File);
        assert_eq!(module.base, "wp-config.php");
        assert_eq!(module.version, None);
    }

    #[test]
    fn groups_by_base_and_derives_action() {
        let temp = TempDir::new().unwrap();
        let entries = parse_porcelain(&[
            "?? wp-content/plugins/akismet/akismet.php",
            "?? wp-content/plugins/akismet/readme.txt",
            " M wp-config.php",
            " D wp-content/themes/old/style.css",
            " D wp-content/themes/old/index.php",
            "?? .composition/options.json",
            "!! wp-content/uploads/a.jpg",
        ]);
        let units = group_changes(&entries, &resolver(temp.path()), &[NormalizedPath::new(".composition")]);

        let summary: Vec<(String, ChangeKind, usize)> = units
            .iter()
            .map(|u| (u.base().to_string(), u.action, u.paths.len()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("wp-config.php".to_string(), ChangeKind::Modified, 1),
                ("wp-content/plugins/akismet".to_string(), ChangeKind::Added, 2),
                ("wp-content/themes/old".to_string(), ChangeKind::Deleted, 2),
            ]
        );
        assert_eq!(units[1].commit_message(), "Add plugin Akismet Anti-spam 5.3.1");
        assert_eq!(units[0].commit_message(), "Update file wp-config.php");
        assert_eq!(units[2].commit_message(), "Delete theme old");
    }
}
