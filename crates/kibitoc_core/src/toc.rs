use crate::headings::{Heading, extract_headings, parse_atx_heading};

/// Header line written at the top of every generated block.
pub const TOC_HEADER: &str = "## 目次";

/// Header lines accepted when looking for a previously generated block.
pub const RECOGNIZED_TOC_HEADERS: [&str; 3] = ["## 目次", "## Table of Contents", "## TOC"];

/// Line span `[start, end)` of a recognized TOC block, 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TocSpan {
    pub start: usize,
    pub end: usize,
}

impl TocSpan {
    /// Whether a 1-based heading source line falls inside the block.
    pub fn contains_source_line(&self, source_line: usize) -> bool {
        source_line > self.start && source_line <= self.end
    }
}

/// Result of running the whole extract/render/splice pipeline once.
#[derive(Debug, Clone)]
pub struct TocOutcome {
    pub new_content: String,
    pub headings: Vec<Heading>,
}

impl TocOutcome {
    pub fn headings_found(&self) -> usize {
        self.headings.len()
    }
}

/// Render headings as a TOC block, or an empty string for an empty list.
///
/// The block is the `## 目次` header, a blank line, one list item per
/// heading, and a trailing blank line. Indentation is relative to the
/// shallowest listed level (two spaces per level below it), so the entries
/// start at column zero even when the document's title-level headings are
/// not listed.
pub fn render_toc(headings: &[Heading]) -> String {
    if headings.is_empty() {
        return String::new();
    }
    let min_level = headings
        .iter()
        .map(|heading| heading.level)
        .min()
        .unwrap_or(1);
    let mut lines = vec![TOC_HEADER.to_string(), String::new()];
    for heading in headings {
        let indent = "  ".repeat(usize::from(heading.level - min_level));
        lines.push(format!("{indent}- [{}](#{})", heading.text, heading.anchor));
    }
    lines.push(String::new());
    lines.join("\n")
}

enum ScanState {
    SeekingHeader,
    InBlock { start: usize },
}

/// Locate the first recognized TOC block in `content`.
///
/// The block starts at a line whose trimmed text is one of
/// [`RECOGNIZED_TOC_HEADERS`] and ends before the next level-1/2 heading, or
/// one past the last non-blank line before unrelated (non list item) content.
/// Non-list content directly after the header line is absorbed until the next
/// level-1/2 heading. A header followed only by blank lines spans just the
/// header line itself.
pub fn locate_toc_block(content: &str) -> Option<TocSpan> {
    let lines: Vec<&str> = content.split('\n').collect();
    let mut state = ScanState::SeekingHeader;
    for (index, raw) in lines.iter().enumerate() {
        let line = raw.trim();
        match state {
            ScanState::SeekingHeader => {
                if RECOGNIZED_TOC_HEADERS.contains(&line) {
                    state = ScanState::InBlock { start: index };
                }
            }
            ScanState::InBlock { start } => {
                if is_section_heading(line) {
                    return Some(TocSpan { start, end: index });
                }
                if index > start + 1 && !line.is_empty() && !line.starts_with('-') {
                    return Some(TocSpan {
                        start,
                        end: end_after_last_nonblank(&lines, start, index),
                    });
                }
            }
        }
    }
    match state {
        ScanState::SeekingHeader => None,
        ScanState::InBlock { start } => Some(TocSpan {
            start,
            end: end_after_last_nonblank(&lines, start, lines.len()),
        }),
    }
}

/// A level-1 or level-2 heading terminates the block; deeper ones do not.
fn is_section_heading(line: &str) -> bool {
    matches!(parse_atx_heading(line), Some((level, _)) if level <= 2)
}

/// One past the last non-blank line in `(start, until)`, or just the header
/// line when everything after it is blank.
fn end_after_last_nonblank(lines: &[&str], start: usize, until: usize) -> usize {
    for index in (start + 1..until).rev() {
        if !lines[index].trim().is_empty() {
            return index + 1;
        }
    }
    start + 1
}

/// Splice rendered TOC text into `content`, returning the new document.
///
/// An existing recognized block is replaced in place; otherwise the block is
/// inserted at the top, after a leading `# ` title line and any blank lines
/// that follow it. An empty `toc` leaves the document untouched.
pub fn splice_toc(content: &str, toc: &str) -> String {
    if toc.is_empty() {
        return content.to_string();
    }
    let lines: Vec<&str> = content.split('\n').collect();
    let toc_lines: Vec<&str> = toc.split('\n').collect();
    let mut output: Vec<&str> = Vec::with_capacity(lines.len() + toc_lines.len() + 1);
    match locate_toc_block(content) {
        Some(span) => {
            output.extend_from_slice(&lines[..span.start]);
            output.extend_from_slice(&toc_lines);
            output.extend_from_slice(&lines[span.end..]);
        }
        None => {
            let insert_at = insertion_point(&lines);
            output.extend_from_slice(&lines[..insert_at]);
            output.push("");
            output.extend_from_slice(&toc_lines);
            output.extend_from_slice(&lines[insert_at..]);
        }
    }
    output.join("\n")
}

fn insertion_point(lines: &[&str]) -> usize {
    let Some(first) = lines.first() else {
        return 0;
    };
    if !first.starts_with("# ") {
        return 0;
    }
    let mut index = 1;
    while index < lines.len() && lines[index].trim().is_empty() {
        index += 1;
    }
    index
}

/// Run the whole pipeline: extract headings, render, splice.
///
/// Two kinds of headings are left out of the rendered block: headings inside
/// an existing recognized block (so a second run reproduces the block exactly
/// instead of listing its own header), and a level-1 heading on the first
/// line when that line is the leading `# ` title the splicer skips over.
/// With no listable headings the document comes back unchanged and callers
/// must skip any write-back.
pub fn apply_toc(content: &str, max_depth: u8) -> TocOutcome {
    let existing = locate_toc_block(content);
    let leading_title = content
        .split('\n')
        .next()
        .is_some_and(|line| line.starts_with("# "));
    let headings: Vec<Heading> = extract_headings(content, max_depth)
        .into_iter()
        .filter(|heading| {
            if leading_title && heading.source_line == 1 {
                return false;
            }
            !existing.is_some_and(|span| span.contains_source_line(heading.source_line))
        })
        .collect();
    if headings.is_empty() {
        return TocOutcome {
            new_content: content.to_string(),
            headings,
        };
    }
    let toc = render_toc(&headings);
    TocOutcome {
        new_content: splice_toc(content, &toc),
        headings,
    }
}
