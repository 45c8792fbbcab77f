pub const MIN_DEPTH: u8 = 1;
pub const MAX_DEPTH: u8 = 6;

/// A markdown ATX heading in document order.
///
/// `text` keeps inline markdown (links, emphasis) verbatim; only the anchor
/// has emphasis markers stripped. `source_line` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: u8,
    pub text: String,
    pub anchor: String,
    pub source_line: usize,
}

/// Extract all headings with `level <= max_depth` from `content`.
///
/// A heading line is, after trimming: one to six `#` characters, at least one
/// whitespace character, then non-empty text. Anything else (bare `#`,
/// `#no-space`, seven or more hashes) is ignored, never an error.
pub fn extract_headings(content: &str, max_depth: u8) -> Vec<Heading> {
    let mut headings = Vec::new();
    for (index, raw) in content.split('\n').enumerate() {
        let Some((level, text)) = parse_atx_heading(raw.trim()) else {
            continue;
        };
        if level <= max_depth {
            headings.push(Heading {
                level,
                text: text.to_string(),
                anchor: anchor_slug(text),
                source_line: index + 1,
            });
        }
    }
    headings
}

/// Parse an already-trimmed line as an ATX heading, returning `(level, text)`.
pub fn parse_atx_heading(line: &str) -> Option<(u8, &str)> {
    let hashes = line.chars().take_while(|ch| *ch == '#').count();
    if hashes < usize::from(MIN_DEPTH) || hashes > usize::from(MAX_DEPTH) {
        return None;
    }
    let rest = &line[hashes..];
    if !rest.starts_with(|ch: char| ch.is_whitespace()) {
        return None;
    }
    let text = rest.trim();
    if text.is_empty() {
        return None;
    }
    Some((hashes as u8, text))
}

/// Derive a URL-fragment anchor from heading text.
///
/// Strips `*`/`_`/backtick emphasis markers, lowercases, drops everything
/// that is not a word character (Unicode letters and digits), whitespace, or
/// hyphen, collapses separator runs into a single hyphen, and trims boundary
/// hyphens. Headings with identical text produce identical anchors; the
/// output may be empty.
pub fn anchor_slug(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;
    for ch in text.chars() {
        if matches!(ch, '*' | '_' | '`') {
            continue;
        }
        for lowered in ch.to_lowercase() {
            if lowered.is_whitespace() || lowered == '-' {
                if !slug.is_empty() {
                    pending_hyphen = true;
                }
            } else if lowered.is_alphanumeric() {
                if pending_hyphen {
                    slug.push('-');
                    pending_hyphen = false;
                }
                slug.push(lowered);
            }
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::{anchor_slug, extract_headings, parse_atx_heading};

    #[test]
    fn extracts_headings_in_document_order() {
        let content = "# Title\n\n## Intro\nbody\n## Details\n### Sub\n";
        let headings = extract_headings(content, 3);
        assert_eq!(headings.len(), 4);
        assert_eq!(headings[0].level, 1);
        assert_eq!(headings[0].text, "Title");
        assert_eq!(headings[0].source_line, 1);
        assert_eq!(headings[3].text, "Sub");
        assert_eq!(headings[3].source_line, 6);
        assert!(
            headings
                .windows(2)
                .all(|pair| pair[0].source_line < pair[1].source_line)
        );
    }

    #[test]
    fn max_depth_filters_deeper_levels() {
        let content = "# A\n## B\n### C\n#### D\n";
        let headings = extract_headings(content, 2);
        assert_eq!(
            headings
                .iter()
                .map(|heading| heading.level)
                .collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[test]
    fn non_heading_lines_are_ignored() {
        assert_eq!(parse_atx_heading("#"), None);
        assert_eq!(parse_atx_heading("#no-space"), None);
        assert_eq!(parse_atx_heading("####### Seven"), None);
        assert_eq!(parse_atx_heading("## "), None);
        assert_eq!(parse_atx_heading("plain text"), None);
    }

    #[test]
    fn tab_after_hashes_counts_as_whitespace() {
        assert_eq!(parse_atx_heading("##\tTabbed"), Some((2, "Tabbed")));
    }

    #[test]
    fn heading_text_keeps_inline_markdown() {
        let headings = extract_headings("## Setup *Guide*!\n", 6);
        assert_eq!(headings[0].text, "Setup *Guide*!");
        assert_eq!(headings[0].anchor, "setup-guide");
    }

    #[test]
    fn hierarchy_is_not_validated() {
        let headings = extract_headings("# Top\n### Deep\n", 6);
        assert_eq!(headings.len(), 2);
        assert_eq!(headings[1].level, 3);
    }

    #[test]
    fn slug_strips_emphasis_and_punctuation() {
        assert_eq!(anchor_slug("Setup *Guide*!"), "setup-guide");
        assert_eq!(anchor_slug("API `v2` endpoints"), "api-v2-endpoints");
        assert_eq!(anchor_slug("snake_case_name"), "snakecasename");
    }

    #[test]
    fn slug_collapses_separator_runs_and_trims() {
        assert_eq!(anchor_slug("  spaced -- out  "), "spaced-out");
        assert_eq!(anchor_slug("- leading and trailing -"), "leading-and-trailing");
    }

    #[test]
    fn slug_keeps_unicode_word_characters() {
        assert_eq!(anchor_slug("目次"), "目次");
        assert_eq!(anchor_slug("Résumé Tips"), "résumé-tips");
    }

    #[test]
    fn slug_may_be_empty() {
        assert_eq!(anchor_slug("!!!"), "");
    }

    #[test]
    fn slug_is_idempotent_over_its_own_output() {
        for input in ["Setup *Guide*!", "A -- B", "目次", "plain"] {
            let once = anchor_slug(input);
            assert_eq!(anchor_slug(&once), once);
        }
    }
}
