use crate::store::{BlockContent, RichText};

/// Longest text written into a single block.
pub const BLOCK_CHAR_LIMIT: usize = 1500;

const BOLD_DELIMITER: &str = "**";

/// A run of text that is either plain or bold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    Plain(String),
    Bold(String),
}

impl Span {
    pub fn text(&self) -> &str {
        match self {
            Span::Plain(text) | Span::Bold(text) => text,
        }
    }

    pub fn is_bold(&self) -> bool {
        matches!(self, Span::Bold(_))
    }

    fn to_rich_text(&self) -> RichText {
        match self {
            Span::Plain(text) => RichText::plain(text.as_str()),
            Span::Bold(text) => RichText::bold(text.as_str()),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum BoldState {
    Plain,
    InsideBold,
}

fn push_span(spans: &mut Vec<Span>, span: Span) {
    if span.text().is_empty() {
        return;
    }
    if let Some(last) = spans.last_mut() {
        match (last, &span) {
            (Span::Plain(prev), Span::Plain(next)) | (Span::Bold(prev), Span::Bold(next)) => {
                prev.push_str(next);
                return;
            }
            _ => {}
        }
    }
    spans.push(span);
}

/// Split `text` on paired `**` delimiters.
///
/// Only closed pairs become bold. An opening delimiter without a partner is
/// kept as literal text, and an empty pair produces nothing.
pub fn parse_bold_spans(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut state = BoldState::Plain;
    let mut plain = String::new();
    let mut bold = String::new();
    let mut rest = text;

    loop {
        let buffer = match state {
            BoldState::Plain => &mut plain,
            BoldState::InsideBold => &mut bold,
        };
        let Some(idx) = rest.find(BOLD_DELIMITER) else {
            buffer.push_str(rest);
            break;
        };
        buffer.push_str(&rest[..idx]);
        rest = &rest[idx + BOLD_DELIMITER.len()..];

        state = match state {
            BoldState::Plain => BoldState::InsideBold,
            BoldState::InsideBold => {
                if !bold.is_empty() {
                    push_span(&mut spans, Span::Plain(std::mem::take(&mut plain)));
                    push_span(&mut spans, Span::Bold(std::mem::take(&mut bold)));
                }
                BoldState::Plain
            }
        };
    }

    if state == BoldState::InsideBold {
        plain.push_str(BOLD_DELIMITER);
        plain.push_str(&bold);
    }
    push_span(&mut spans, Span::Plain(plain));

    spans
}

pub fn spans_to_rich_text(spans: &[Span]) -> Vec<RichText> {
    spans.iter().map(Span::to_rich_text).collect()
}

/// Split into pieces of at most `limit` characters.
pub fn chunk_chars(text: &str, limit: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(limit.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Keep the first `limit` characters.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Plain paragraphs holding `text` verbatim, one per chunk.
pub fn plain_paragraph_blocks(text: &str) -> Vec<BlockContent> {
    chunk_chars(text, BLOCK_CHAR_LIMIT)
        .into_iter()
        .map(|chunk| BlockContent::paragraph(vec![RichText::plain(chunk)]))
        .collect()
}

/// Paragraphs split on blank lines, chunked, with `**bold**` honoured.
pub fn paragraph_blocks(text: &str) -> Vec<BlockContent> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|para| !para.is_empty())
        .flat_map(|para| chunk_chars(para, BLOCK_CHAR_LIMIT))
        .map(|chunk| BlockContent::paragraph(spans_to_rich_text(&parse_bold_spans(&chunk))))
        .collect()
}
