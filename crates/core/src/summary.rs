//! Turning a model reply into the summary section and rewriting the page.

use serde::Serialize;
use tracing::{info, warn};

use crate::{
    error::{Result, SummaryWallError},
    format::{Span, paragraph_blocks, parse_bold_spans, spans_to_rich_text},
    pages::SUMMARY_MARKER,
    store::{BlockContent, MAX_CHILDREN_PER_REQUEST, NotionClient, RichText},
};

pub const SUMMARY_LABEL: &str = "總結：";

const SUMMARY_PREFIXES: &[&str] = &["**總結：**", "**總結:**", "總結：", "總結:"];
const HIGHLIGHTS_LABEL: &str = "重點整理";

/// Highlights and closing paragraph extracted from a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoDigest {
    pub highlights: Vec<Vec<Span>>,
    pub summary: Vec<Span>,
}

fn strip_summary_prefix(line: &str) -> Option<&str> {
    SUMMARY_PREFIXES
        .iter()
        .find_map(|prefix| line.strip_prefix(prefix))
        .map(str::trim)
}

fn strip_list_marker(line: &str) -> &str {
    for bullet in ["- ", "* ", "•"] {
        if let Some(rest) = line.strip_prefix(bullet) {
            return rest.trim_start();
        }
    }

    let digits = line
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(line.len());
    if digits > 0 {
        let rest = &line[digits..];
        for separator in ['、', '．'] {
            if let Some(rest) = rest.strip_prefix(separator) {
                return rest.trim_start();
            }
        }
        // ASCII separators must be followed by a space or bold, so "1.5 倍" stays a number.
        for separator in ['.', ')'] {
            let Some(rest) = rest.strip_prefix(separator) else {
                continue;
            };
            if rest.is_empty() || rest.starts_with(char::is_whitespace) || rest.starts_with("**")
            {
                return rest.trim_start();
            }
        }
    }
    line
}

fn is_section_label(line: &str) -> bool {
    let label = line
        .trim_start_matches('#')
        .trim()
        .trim_matches('*')
        .trim_end_matches([':', '：'])
        .trim();
    label == HIGHLIGHTS_LABEL
}

/// `**A**：B` keeps its own bold; `A：B` gets a bold label.
fn highlight_spans(item: &str) -> Vec<Span> {
    let spans = parse_bold_spans(item);
    if spans.iter().any(Span::is_bold) {
        return spans;
    }

    match item.find(['：', ':']) {
        Some(idx) => {
            let label = item[..idx].trim();
            let separator_len = item[idx..].chars().next().map_or(0, char::len_utf8);
            let description = item[idx + separator_len..].trim();
            if label.is_empty() {
                return spans;
            }
            vec![
                Span::Bold(label.to_string()),
                Span::Plain(format!("：{description}")),
            ]
        }
        None => spans,
    }
}

/// Split a sanitised reply into highlights and the summary paragraph.
///
/// The first line starting with `總結：` (or `總結:`) opens the summary and
/// every later line belongs to it. A reply missing either part is rejected.
pub fn parse_reply(reply: &str) -> Result<VideoDigest> {
    let mut highlights = Vec::new();
    let mut summary_lines: Option<Vec<&str>> = None;

    for line in reply.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(lines) = summary_lines.as_mut() {
            lines.push(line);
            continue;
        }
        if let Some(rest) = strip_summary_prefix(line) {
            summary_lines = Some(vec![rest]);
            continue;
        }
        if is_section_label(line) {
            continue;
        }

        let item = strip_list_marker(line);
        if !item.is_empty() {
            highlights.push(highlight_spans(item));
        }
    }

    let summary = summary_lines
        .unwrap_or_default()
        .into_iter()
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if highlights.is_empty() {
        return Err(SummaryWallError::summary_format("reply has no highlights"));
    }
    if summary.is_empty() {
        return Err(SummaryWallError::summary_format(
            "reply has no 總結 paragraph",
        ));
    }

    Ok(VideoDigest {
        highlights,
        summary: parse_bold_spans(&summary),
    })
}

/// Full replacement body: summary section, divider, then the transcript.
pub fn summary_section_blocks(digest: &VideoDigest, transcript: &str) -> Vec<BlockContent> {
    let mut blocks = vec![BlockContent::heading_2(SUMMARY_MARKER)];

    blocks.extend(
        digest
            .highlights
            .iter()
            .map(|spans| BlockContent::numbered_list_item(spans_to_rich_text(spans))),
    );

    let mut summary = vec![RichText::bold(SUMMARY_LABEL)];
    summary.extend(spans_to_rich_text(&digest.summary));
    blocks.push(BlockContent::paragraph(summary));

    blocks.push(BlockContent::divider());
    blocks.extend(paragraph_blocks(transcript));
    blocks
}

/// What a rebuild managed to do. Nothing is rolled back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RebuildOutcome {
    /// Every pre-existing block was archived.
    pub archived: bool,
    /// The whole new sequence was appended.
    pub appended: bool,
    pub archived_blocks: usize,
    pub failed_archives: Vec<String>,
    pub appended_blocks: usize,
    pub error: Option<String>,
}

impl RebuildOutcome {
    /// Old content is (partly) gone but the new body is incomplete.
    pub fn needs_repair(&self) -> bool {
        self.archived_blocks > 0 && !self.appended
    }

    pub fn is_complete(&self) -> bool {
        self.archived && self.appended
    }
}

/// Archive every current block of the page, then append `sequence`.
pub async fn rebuild_page(
    store: &NotionClient,
    page_id: &str,
    sequence: &[BlockContent],
) -> RebuildOutcome {
    let mut outcome = RebuildOutcome::default();

    let existing = match store.list_children(page_id).await {
        Ok(blocks) => blocks,
        Err(e) => {
            warn!(page_id, error = %e, "Cannot list blocks, leaving page untouched");
            outcome.error = Some(e.to_string());
            return outcome;
        }
    };

    for block in &existing {
        match store.archive_block(&block.id).await {
            Ok(()) => outcome.archived_blocks += 1,
            Err(e) => {
                warn!(page_id, block_id = %block.id, error = %e, "Failed to archive block");
                outcome.failed_archives.push(block.id.clone());
            }
        }
    }
    outcome.archived = outcome.failed_archives.is_empty();

    for batch in sequence.chunks(MAX_CHILDREN_PER_REQUEST) {
        match store.append_children(page_id, batch).await {
            Ok(count) => outcome.appended_blocks += count,
            Err(e) => {
                warn!(
                    page_id,
                    appended = outcome.appended_blocks,
                    total = sequence.len(),
                    error = %e,
                    "Append failed part-way"
                );
                outcome.error = Some(e.to_string());
                break;
            }
        }
    }
    outcome.appended = outcome.error.is_none() && outcome.appended_blocks == sequence.len();

    info!(
        page_id,
        archived = outcome.archived_blocks,
        failed_archives = outcome.failed_archives.len(),
        appended = outcome.appended_blocks,
        "Page rebuilt"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(s: &str) -> Span {
        Span::Plain(s.to_string())
    }

    fn bold(s: &str) -> Span {
        Span::Bold(s.to_string())
    }

    const REPLY: &str = "重點整理：\n\
        1. **NAS 儲存空間**：說明用途\n\
        2、備份策略：定期備份\n\
        - 沒有冒號的重點\n\
        \n\
        總結：這是 **總結** 的第一行\n\
        第二行";

    #[test]
    fn test_parse_reply() {
        let digest = parse_reply(REPLY).unwrap();

        assert_eq!(
            digest.highlights,
            vec![
                vec![bold("NAS 儲存空間"), plain("：說明用途")],
                vec![bold("備份策略"), plain("：定期備份")],
                vec![plain("沒有冒號的重點")],
            ]
        );
        assert_eq!(
            digest.summary,
            vec![plain("這是 "), bold("總結"), plain(" 的第一行 第二行")]
        );
    }

    #[test]
    fn test_ascii_summary_prefix_and_bold_label() {
        let digest = parse_reply("**A**: B\n總結:結論").unwrap();
        assert_eq!(digest.highlights, vec![vec![bold("A"), plain(": B")]]);
        assert_eq!(digest.summary, vec![plain("結論")]);

        let digest = parse_reply("A：B\n**總結：** 結論").unwrap();
        assert_eq!(digest.summary, vec![plain("結論")]);
    }

    #[test]
    fn test_lines_after_summary_never_become_highlights() {
        let digest = parse_reply("1. A：B\n總結：x\n2. C：D").unwrap();
        assert_eq!(digest.highlights.len(), 1);
        assert_eq!(digest.summary, vec![plain("x 2. C：D")]);
    }

    #[test]
    fn test_missing_parts_are_format_errors() {
        assert!(matches!(
            parse_reply("1. A：B\n2. C：D"),
            Err(SummaryWallError::SummaryFormat { .. })
        ));
        assert!(matches!(
            parse_reply("重點整理\n總結：只有總結"),
            Err(SummaryWallError::SummaryFormat { .. })
        ));
        assert!(matches!(
            parse_reply("1. A：B\n總結：   "),
            Err(SummaryWallError::SummaryFormat { .. })
        ));
    }

    #[test]
    fn test_list_markers() {
        assert_eq!(strip_list_marker("10. x"), "x");
        assert_eq!(strip_list_marker("3) x"), "x");
        assert_eq!(strip_list_marker("4．x"), "x");
        assert_eq!(strip_list_marker("• x"), "x");
        assert_eq!(strip_list_marker("2026 年"), "2026 年");
        assert_eq!(strip_list_marker("**x**"), "**x**");
        assert_eq!(strip_list_marker("1.**x**"), "**x**");
    }

    #[test]
    fn test_decimal_numbers_keep_their_digits() {
        assert_eq!(strip_list_marker("1.5 倍成長：說明"), "1.5 倍成長：說明");
        assert_eq!(strip_list_marker("3)x"), "3)x");
        assert_eq!(strip_list_marker("7."), "");

        let digest = parse_reply("1.5 倍成長：營收翻倍
2. 3.2 版更新：新功能
總結：x").unwrap();
        assert_eq!(
            digest.highlights,
            vec![
                vec![bold("1.5 倍成長"), plain("：營收翻倍")],
                vec![bold("3.2 版更新"), plain("：新功能")],
            ]
        );
    }

    #[test]
    fn test_section_sequence() {
        let digest = parse_reply("1. **A**：B\n2. **C**：D\n總結：E").unwrap();
        let blocks = summary_section_blocks(&digest, "para one\n\npara two");

        assert_eq!(blocks.len(), 1 + 2 + 1 + 1 + 2);
        assert_eq!(blocks[0], BlockContent::heading_2("內容摘要"));
        assert_eq!(
            blocks[1],
            BlockContent::numbered_list_item(vec![RichText::bold("A"), RichText::plain("：B")])
        );
        assert_eq!(
            blocks[3],
            BlockContent::paragraph(vec![RichText::bold("總結："), RichText::plain("E")])
        );
        assert_eq!(blocks[4], BlockContent::divider());
        assert_eq!(blocks[5].plain_text().as_deref(), Some("para one"));
        assert_eq!(blocks[6].plain_text().as_deref(), Some("para two"));
    }

    #[test]
    fn test_outcome_flags() {
        let half_done = RebuildOutcome {
            archived: true,
            archived_blocks: 3,
            ..Default::default()
        };
        assert!(half_done.needs_repair());
        assert!(!half_done.is_complete());

        let untouched = RebuildOutcome::default();
        assert!(!untouched.needs_repair());
    }
}
