//! Side-by-side line diff of two stored configurations.

use std::fmt;

use serde::Serialize;
use similar::{Algorithm, DiffTag, capture_diff_slices};

/// Kind of opcode block a diff line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffLineTag {
    Equal,
    Insert,
    Delete,
    Replace,
}

impl From<DiffTag> for DiffLineTag {
    fn from(tag: DiffTag) -> Self {
        match tag {
            DiffTag::Equal => DiffLineTag::Equal,
            DiffTag::Insert => DiffLineTag::Insert,
            DiffTag::Delete => DiffLineTag::Delete,
            DiffTag::Replace => DiffLineTag::Replace,
        }
    }
}

impl fmt::Display for DiffLineTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            DiffLineTag::Equal => "equal",
            DiffLineTag::Insert => "insert",
            DiffLineTag::Delete => "delete",
            DiffLineTag::Replace => "replace",
        };
        f.write_str(tag)
    }
}

/// One row of a side-by-side comparison.
///
/// `None` on a side is padding: that side has no line in this row and its
/// line number does not advance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffLine {
    pub left: Option<String>,
    pub right: Option<String>,
    pub tag: DiffLineTag,
    pub left_no: Option<usize>,
    pub right_no: Option<usize>,
}

/// Align two texts line by line.
///
/// Each text is trimmed before being split into lines. Opcodes come from a
/// Myers shortest edit script, whose cost grows with the number of changed
/// lines rather than with the product of both lengths. Within each opcode
/// block the shorter side is padded so both sides advance together.
pub fn diff(left: &str, right: &str) -> Vec<DiffLine> {
    let old: Vec<&str> = left.trim().lines().collect();
    let new: Vec<&str> = right.trim().lines().collect();

    let mut rows = Vec::with_capacity(old.len().max(new.len()));
    let mut left_no = 1;
    let mut right_no = 1;

    for op in capture_diff_slices(Algorithm::Myers, &old, &new) {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        let height = old_range.len().max(new_range.len());

        for offset in 0..height {
            let l = old.get(old_range.start + offset).filter(|_| offset < old_range.len());
            let r = new.get(new_range.start + offset).filter(|_| offset < new_range.len());

            rows.push(DiffLine {
                left: l.map(|s| s.to_string()),
                right: r.map(|s| s.to_string()),
                tag: tag.into(),
                left_no: l.map(|_| left_no),
                right_no: r.map(|_| right_no),
            });

            if l.is_some() {
                left_no += 1;
            }
            if r.is_some() {
                right_no += 1;
            }
        }
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_input_is_all_equal() {
        let text = "hostname r1\n!\ninterface Gi0/1\n shutdown";
        let rows = diff(text, text);

        assert_eq!(rows.len(), 4);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.tag, DiffLineTag::Equal);
            assert_eq!(row.left_no, row.right_no);
            assert_eq!(row.left_no, Some(i + 1));
        }
    }

    #[test]
    fn test_disjoint_single_lines_replace() {
        let rows = diff("a", "b");
        assert_eq!(
            rows,
            vec![DiffLine {
                left: Some("a".into()),
                right: Some("b".into()),
                tag: DiffLineTag::Replace,
                left_no: Some(1),
                right_no: Some(1),
            }]
        );
    }

    #[test]
    fn test_insert_pads_left_side() {
        let rows = diff("hostname r1\nend", "hostname r1\nntp server 10.0.0.5\nend");

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].tag, DiffLineTag::Insert);
        assert_eq!(rows[1].left, None);
        assert_eq!(rows[1].left_no, None);
        assert_eq!(rows[1].right_no, Some(2));

        // Left numbering resumes where it left off
        assert_eq!(rows[2].left_no, Some(2));
        assert_eq!(rows[2].right_no, Some(3));
    }

    #[test]
    fn test_uneven_replace_block() {
        let rows = diff("a\nx\nz", "a\ny1\ny2\nz");
        let replaced: Vec<_> = rows
            .iter()
            .filter(|r| r.tag == DiffLineTag::Replace)
            .collect();

        assert_eq!(replaced.len(), 2);
        assert_eq!(replaced[0].left.as_deref(), Some("x"));
        assert_eq!(replaced[0].right.as_deref(), Some("y1"));
        assert_eq!(replaced[1].left, None);
        assert_eq!(replaced[1].right.as_deref(), Some("y2"));
        assert_eq!(rows.last().unwrap().left_no, Some(3));
        assert_eq!(rows.last().unwrap().right_no, Some(4));
    }

    #[test]
    fn test_large_config_changed_at_both_ends() {
        let body: Vec<String> = (0..8000).map(|i| format!(" vlan {i}")).collect();
        let left = format!("hostname sw1\n{}\nend", body.join("\n"));
        let right = format!("hostname sw1-new\n{}\nend-of-config", body.join("\n"));

        let rows = diff(&left, &right);

        assert_eq!(rows.len(), 8002);
        assert_eq!(rows[0].tag, DiffLineTag::Replace);
        assert_eq!(rows[8001].tag, DiffLineTag::Replace);
        assert!(rows[1..8001].iter().all(|r| r.tag == DiffLineTag::Equal));
        assert_eq!(rows[8001].left_no, Some(8002));
        assert_eq!(rows[8001].right_no, Some(8002));
    }

    #[test]
    fn test_empty_inputs() {
        assert!(diff("", "").is_empty());

        let rows = diff("", "hostname r1");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].tag, DiffLineTag::Insert);
    }
}
