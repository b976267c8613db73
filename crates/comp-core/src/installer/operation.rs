//! Package operations reported by the resolver

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// One change the resolver made or, in a dry run, would make.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Install { name: String, version: String },
    Update { name: String, from: String, to: String },
    Uninstall { name: String, version: String },
}

impl Operation {
    pub fn package(&self) -> &str {
        match self {
            Self::Install { name, .. } | Self::Update { name, .. } | Self::Uninstall { name, .. } => name,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Install { name, version } => write!(f, "install {name} ({version})"),
            Self::Update { name, from, to } => write!(f, "update {name} ({from} => {to})"),
            Self::Uninstall { name, version } => write!(f, "uninstall {name} ({version})"),
        }
    }
}

static INSTALL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*-\s+(?:Installing|Locking)\s+(\S+)\s+\(([^)]+)\)").expect("Invalid install regex")
});

static UPDATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*-\s+(?:Upgrading|Downgrading)\s+(\S+)\s+\(([^)]+?)\s+=>\s+([^)]+)\)")
        .expect("Invalid update regex")
});

static REMOVE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*-\s+Removing\s+(\S+)\s+\(([^)]+)\)").expect("Invalid remove regex")
});

/// Parse Composer's operation lines (`- Installing vendor/pkg (1.0.0)`).
///
/// Lock-file operations and package operations describe the same change, so
/// repeated operations are reported once.
pub fn parse_operations(output: &str) -> Vec<Operation> {
    let mut operations = Vec::new();
    for line in output.lines() {
        let operation = if let Some(c) = UPDATE_REGEX.captures(line) {
            Operation::Update {
                name: c[1].to_string(),
                from: c[2].trim().to_string(),
                to: c[3].trim().to_string(),
            }
        } else if let Some(c) = INSTALL_REGEX.captures(line) {
            Operation::Install {
                name: c[1].to_string(),
                version: c[2].trim().to_string(),
            }
        } else if let Some(c) = REMOVE_REGEX.captures(line) {
            Operation::Uninstall {
                name: c[1].to_string(),
                version: c[2].trim().to_string(),
            }
        } else {
            continue;
        };
        if !operations.contains(&operation) {
            operations.push(operation);
        }
    }
    operations
}
