//! Snapshot diffs between cache refreshes

use std::fmt;

use super::record::PackageMap;

/// A record whose version changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionChange {
    pub key: String,
    pub from: String,
    pub to: String,
}

/// Disjoint changes between two snapshots of one record kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheDiff {
    pub removed: Vec<String>,
    pub added: Vec<String>,
    pub updated: Vec<VersionChange>,
}

impl CacheDiff {
    pub fn between(old: &PackageMap, new: &PackageMap) -> Self {
        let removed = old
            .keys()
            .filter(|k| !new.contains_key(*k))
            .cloned()
            .collect();
        let added = new
            .keys()
            .filter(|k| !old.contains_key(*k))
            .cloned()
            .collect();
        let updated = new
            .iter()
            .filter_map(|(key, record)| {
                let previous = old.get(key)?;
                (previous.version != record.version).then(|| VersionChange {
                    key: key.clone(),
                    from: previous.version.clone(),
                    to: record.version.clone(),
                })
            })
            .collect();
        Self {
            removed,
            added,
            updated,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty() && self.updated.is_empty()
    }

    /// Log one line per change.
    pub fn log(&self, kind: &str) {
        for key in &self.removed {
            tracing::info!(kind, key = %key, "Managed package removed");
        }
        for key in &self.added {
            tracing::info!(kind, key = %key, "Managed package added");
        }
        for change in &self.updated {
            tracing::info!(kind, key = %change.key, from = %change.from, to = %change.to, "Managed package updated");
        }
    }
}

/// Diffs for both record kinds from one refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub plugins: CacheDiff,
    pub themes: CacheDiff,
}

impl RefreshReport {
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty() && self.themes.is_empty()
    }
}

impl fmt::Display for RefreshReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "plugins +{} -{} ~{}, themes +{} -{} ~{}",
            self.plugins.added.len(),
            self.plugins.removed.len(),
            self.plugins.updated.len(),
            self.themes.added.len(),
            self.themes.removed.len(),
            self.themes.updated.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PackageRecord;
    use pretty_assertions::assert_eq;

    fn map(entries: &[(&str, &str)]) -> PackageMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), PackageRecord::new(*k, format!("vendor/{k}"), *v)))
            .collect()
    }

    #[test]
    fn classifies_removed_added_updated() {
        let diff = CacheDiff::between(&map(&[("A", "1"), ("B", "2")]), &map(&[("B", "3"), ("C", "1")]));
        assert_eq!(
            diff,
            CacheDiff {
                removed: vec!["A".to_string()],
                added: vec!["C".to_string()],
                updated: vec![VersionChange {
                    key: "B".to_string(),
                    from: "2".to_string(),
                    to: "3".to_string(),
                }],
            }
        );
    }

    #[test]
    fn identical_snapshots_have_empty_diff() {
        let snapshot = map(&[("A", "1")]);
        assert!(CacheDiff::between(&snapshot, &snapshot).is_empty());
    }
}
