//! Parsing of `git status --porcelain` (v1) output.

use std::fmt;

/// How a path changed relative to HEAD, collapsed to what a commit message needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => write!(f, "add"),
            Self::Modified => write!(f, "modify"),
            Self::Deleted => write!(f, "delete"),
        }
    }
}

/// Unmerged states as reported by the two-letter porcelain code.
///
/// "Us" and "them" follow git's own labels: while replaying a commit with
/// cherry-pick, "us" is the branch being replayed onto and "them" is the
/// commit being replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictState {
    /// `DD`
    BothDeleted,
    /// `AU`
    AddedByUs,
    /// `UD`
    DeletedByThem,
    /// `UA`
    AddedByThem,
    /// `DU`
    DeletedByUs,
    /// `AA`
    BothAdded,
    /// `UU`
    BothModified,
}

impl ConflictState {
    pub fn from_code(index: char, worktree: char) -> Option<Self> {
        match (index, worktree) {
            ('D', 'D') => Some(Self::BothDeleted),
            ('A', 'U') => Some(Self::AddedByUs),
            ('U', 'D') => Some(Self::DeletedByThem),
            ('U', 'A') => Some(Self::AddedByThem),
            ('D', 'U') => Some(Self::DeletedByUs),
            ('A', 'A') => Some(Self::BothAdded),
            ('U', 'U') => Some(Self::BothModified),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::BothDeleted => "DD",
            Self::AddedByUs => "AU",
            Self::DeletedByThem => "UD",
            Self::AddedByThem => "UA",
            Self::DeletedByUs => "DU",
            Self::BothAdded => "AA",
            Self::BothModified => "UU",
        }
    }
}

/// One line of porcelain status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// Index (staged) status letter.
    pub index: char,
    /// Worktree status letter.
    pub worktree: char,
    /// Path relative to the repository root (destination for renames).
    pub path: String,
    /// Source path for renames and copies.
    pub orig_path: Option<String>,
}

impl StatusEntry {
    pub fn is_untracked(&self) -> bool {
        self.index == '?' && self.worktree == '?'
    }

    pub fn is_ignored(&self) -> bool {
        self.index == '!' && self.worktree == '!'
    }

    pub fn conflict(&self) -> Option<ConflictState> {
        ConflictState::from_code(self.index, self.worktree)
    }

    /// Collapse the two status letters into a single change kind.
    pub fn change_kind(&self) -> ChangeKind {
        if self.is_untracked() || self.index == 'A' {
            ChangeKind::Added
        } else if self.index == 'D' || self.worktree == 'D' {
            ChangeKind::Deleted
        } else {
            ChangeKind::Modified
        }
    }
}

/// Parse porcelain v1 lines. Blank and malformed lines are skipped.
pub fn parse_porcelain<S: AsRef<str>>(lines: &[S]) -> Vec<StatusEntry> {
    lines
        .iter()
        .filter_map(|line| parse_line(line.as_ref()))
        .collect()
}

fn parse_line(line: &str) -> Option<StatusEntry> {
    let mut chars = line.chars();
    let index = chars.next()?;
    let worktree = chars.next()?;
    if !index.is_ascii() || !worktree.is_ascii() || chars.next()? != ' ' {
        return None;
    }
    let rest = &line[3..];
    if rest.is_empty() {
        return None;
    }

    let (path, orig_path) = if matches!(index, 'R' | 'C') {
        match split_rename(rest) {
            Some((from, to)) => (to, Some(from)),
            None => (unquote(rest), None),
        }
    } else {
        (unquote(rest), None)
    };

    Some(StatusEntry {
        index,
        worktree,
        path,
        orig_path,
    })
}

fn split_rename(rest: &str) -> Option<(String, String)> {
    if rest.starts_with('"') {
        // `"old path" -> "new path"`: find the end of the first quoted string
        let mut escaped = false;
        for (i, c) in rest.char_indices().skip(1) {
            match c {
                '\\' if !escaped => escaped = true,
                '"' if !escaped => {
                    let from = &rest[..=i];
                    let to = rest[i + 1..].strip_prefix(" -> ")?;
                    return Some((unquote(from), unquote(to)));
                }
                _ => escaped = false,
            }
        }
        None
    } else {
        let (from, to) = rest.split_once(" -> ")?;
        Some((unquote(from), unquote(to)))
    }
}

/// Undo git's C-style quoting of unusual path names.
fn unquote(raw: &str) -> String {
    let Some(inner) = raw.strip_prefix('"').and_then(|s| s.strip_suffix('"')) else {
        return raw.to_string();
    };

    let mut bytes = Vec::with_capacity(inner.len());
    let mut chars = inner.bytes().peekable();
    while let Some(b) = chars.next() {
        if b != b'\\' {
            bytes.push(b);
            continue;
        }
        match chars.next() {
            Some(b'n') => bytes.push(b'\n'),
            Some(b't') => bytes.push(b'\t'),
            Some(b'"') => bytes.push(b'"'),
            Some(b'\\') => bytes.push(b'\\'),
            Some(d @ b'0'..=b'7') => {
                let mut value = (d - b'0') as u32;
                for _ in 0..2 {
                    match chars.peek() {
                        Some(&n) if (b'0'..=b'7').contains(&n) => {
                            value = value * 8 + (n - b'0') as u32;
                            chars.next();
                        }
                        _ => break,
                    }
                }
                bytes.push(value as u8);
            }
            Some(other) => {
                bytes.push(b'\\');
                bytes.push(other);
            }
            None => bytes.push(b'\\'),
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}
