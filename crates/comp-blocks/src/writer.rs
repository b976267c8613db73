//! Block writing.
//!
//! Writers operate line-wise so that content outside a block, including its
//! trailing newline convention, survives untouched.

use crate::error::{Error, Result};
use crate::parser::{closing_marker, find_block, opening_marker};

fn validate_id(id: &str) -> Result<()> {
    if id.is_empty()
        || !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(Error::InvalidId { id: id.to_string() });
    }
    Ok(())
}

fn format_block(id: &str, block_content: &str) -> String {
    if block_content.is_empty() {
        format!("{}\n{}", opening_marker(id), closing_marker(id))
    } else {
        format!(
            "{}\n{}\n{}",
            opening_marker(id),
            block_content.trim_end_matches('\n'),
            closing_marker(id)
        )
    }
}

/// Appends a new block at the end of the content.
///
/// The result always ends with a newline.
pub fn insert_block(content: &str, id: &str, block_content: &str) -> Result<String> {
    validate_id(id)?;
    let block = format_block(id, block_content);

    if content.trim().is_empty() {
        Ok(format!("{}\n", block))
    } else if content.ends_with('\n') {
        Ok(format!("{}{}\n", content, block))
    } else {
        Ok(format!("{}\n\n{}\n", content, block))
    }
}

/// Replaces the content of an existing block.
///
/// # Errors
/// Returns `Error::BlockNotFound` if no block with the given id exists.
pub fn update_block(content: &str, id: &str, new_content: &str) -> Result<String> {
    validate_id(id)?;
    let block = find_block(content, id).ok_or_else(|| Error::BlockNotFound { id: id.to_string() })?;

    let lines: Vec<&str> = content.lines().collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    out.extend(lines[..block.start_line - 1].iter().map(|l| l.to_string()));
    out.push(format_block(id, new_content));
    out.extend(lines[block.end_line..].iter().map(|l| l.to_string()));

    let mut result = out.join("\n");
    if content.ends_with('\n') {
        result.push('\n');
    }
    Ok(result)
}

/// Removes a block, markers included.
///
/// # Errors
/// Returns `Error::BlockNotFound` if no block with the given id exists.
pub fn remove_block(content: &str, id: &str) -> Result<String> {
    validate_id(id)?;
    let block = find_block(content, id).ok_or_else(|| Error::BlockNotFound { id: id.to_string() })?;

    let lines: Vec<&str> = content.lines().collect();
    let kept: Vec<&str> = lines[..block.start_line - 1]
        .iter()
        .chain(lines[block.end_line..].iter())
        .copied()
        .collect();

    let mut result = kept.join("\n");
    if content.ends_with('\n') && !result.is_empty() {
        result.push('\n');
    }
    Ok(result)
}

/// Inserts a new block or updates an existing one.
pub fn upsert_block(content: &str, id: &str, block_content: &str) -> Result<String> {
    if find_block(content, id).is_some() {
        update_block(content, id, block_content)
    } else {
        insert_block(content, id, block_content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_to_empty() {
        let result = insert_block("", "managed", "/a/").unwrap();
        assert_eq!(result, "# BEGIN composition:managed\n/a/\n# END composition:managed\n");
    }

    #[test]
    fn insert_after_existing_content() {
        let result = insert_block("vendor/\n", "managed", "/a/").unwrap();
        assert_eq!(
            result,
            "vendor/\n# BEGIN composition:managed\n/a/\n# END composition:managed\n"
        );
    }

    #[test]
    fn update_preserves_surroundings() {
        let content = "top\n# BEGIN composition:managed\nold\n# END composition:managed\nbottom\n";
        let result = update_block(content, "managed", "new1\nnew2").unwrap();
        assert_eq!(
            result,
            "top\n# BEGIN composition:managed\nnew1\nnew2\n# END composition:managed\nbottom\n"
        );
    }

    #[test]
    fn update_missing_block_errors() {
        assert!(matches!(
            update_block("nothing", "managed", "x"),
            Err(Error::BlockNotFound { .. })
        ));
    }

    #[test]
    fn rejects_invalid_id() {
        assert!(matches!(
            insert_block("", "bad id", "x"),
            Err(Error::InvalidId { .. })
        ));
    }

    #[test]
    fn remove_keeps_other_lines() {
        let content = "top\n# BEGIN composition:managed\nold\n# END composition:managed\nbottom\n";
        assert_eq!(remove_block(content, "managed").unwrap(), "top\nbottom\n");
    }

    #[test]
    fn upsert_is_stable() {
        let once = upsert_block("vendor/\n", "managed", "/a/").unwrap();
        let twice = upsert_block(&once, "managed", "/a/").unwrap();
        assert_eq!(once, twice);
    }
}
