//! Block parsing.

use regex::Regex;
use std::sync::LazyLock;

/// A parsed block with its id, content and position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// The id following `composition:` in the markers.
    pub id: String,
    /// Lines between the markers, joined with `\n`, markers excluded.
    pub content: String,
    /// 1-based line of the opening marker.
    pub start_line: usize,
    /// 1-based line of the closing marker.
    pub end_line: usize,
}

impl Block {
    /// Non-empty lines inside the block.
    pub fn entries(&self) -> Vec<&str> {
        self.content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect()
    }
}

static OPEN_MARKER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^# BEGIN composition:([a-zA-Z0-9_-]+)\s*$").expect("Invalid open marker regex")
});

pub(crate) fn opening_marker(id: &str) -> String {
    format!("# BEGIN composition:{}", id)
}

pub(crate) fn closing_marker(id: &str) -> String {
    format!("# END composition:{}", id)
}

/// Parses all blocks from the given content, in order of appearance.
///
/// An opening marker without a matching closing marker is ignored.
pub fn parse_blocks(content: &str) -> Vec<Block> {
    let lines: Vec<&str> = content.lines().collect();
    let mut blocks = Vec::new();
    let mut idx = 0;

    while idx < lines.len() {
        let Some(caps) = OPEN_MARKER_REGEX.captures(lines[idx]) else {
            idx += 1;
            continue;
        };
        let id = caps[1].to_string();
        let close = closing_marker(&id);

        match lines[idx + 1..].iter().position(|l| l.trim_end() == close) {
            Some(offset) => {
                let end = idx + 1 + offset;
                blocks.push(Block {
                    content: lines[idx + 1..end].join("\n"),
                    id,
                    start_line: idx + 1,
                    end_line: end + 1,
                });
                idx = end + 1;
            }
            None => {
                tracing::warn!(block = %id, line = idx + 1, "Unterminated managed block");
                idx += 1;
            }
        }
    }

    blocks
}

/// Finds a specific block by id.
pub fn find_block(content: &str, id: &str) -> Option<Block> {
    parse_blocks(content).into_iter().find(|b| b.id == id)
}

/// Whether a complete block with this id exists.
pub fn has_block(content: &str, id: &str) -> bool {
    find_block(content, id).is_some()
}
