//! Prompt construction and reply clean-up.

use crate::format::truncate_chars;

/// Model input is cut at this many characters.
pub const MAX_TRANSCRIPT_CHARS: usize = 60_000;

/// Lines containing any of these (spaces removed, lower-cased) are dropped.
pub const REPLY_DENYLIST: &[&str] = &[
    "如果覺得這個摘要有幫助",
    "如果覺得有幫助",
    "歡迎再提供更多內容",
    "您可以直接提供",
    "後續行動",
    "gemini",
];

static SUMMARY_PROMPT: &str = r#"請根據以下 YouTube 影片《{title}》的逐字稿，進行內容整理與摘要。

請嚴格遵守以下格式與規則：
1. 全程使用繁體中文。
2. 只允許輸出兩個段落區塊，不要有任何其它文字說明：
   (1) 第一部分標題為「重點整理」，底下使用條列式，整理大約 10 點重點。
       - 每一點單獨一行，使用「1. 」這樣的編號開頭。
       - 每一點以 **粗體** 標出關鍵詞或主題，接著用「：」加上說明，例如：
         1. **NAS 儲存空間**：說明其用途與適合族群...
   (2) 第二部分以「總結：」開頭，接著是一段約 300 個字的完整總結段落。
       - 在總結段落中，也請適度將關鍵名詞或重要概念使用 **粗體** 標記。
3. 不要有任何開場白，不要自我介紹，不要寫「如果覺得有幫助」等結語或行動呼籲。
4. 不要提及你是 AI 或模型，不要出現「我認為」「Gemini 說」等主詞。

逐字稿如下：
{transcript}"#;

/// Build the summary request for one page.
///
/// The transcript is cut at [`MAX_TRANSCRIPT_CHARS`] and characters outside
/// the Basic Multilingual Plane are removed from the result.
pub fn build_prompt(title: &str, transcript: &str) -> String {
    let title = if title.trim().is_empty() {
        "(untitled)"
    } else {
        title.trim()
    };
    let prompt = SUMMARY_PROMPT
        .replacen("{title}", title, 1)
        .replacen("{transcript}", truncate_chars(transcript, MAX_TRANSCRIPT_CHARS), 1);

    strip_non_bmp(prompt.trim())
}

pub fn strip_non_bmp(text: &str) -> String {
    text.chars().filter(|c| u32::from(*c) <= 0xFFFF).collect()
}

fn is_denied(line: &str) -> bool {
    let normalized: String = line
        .chars()
        .filter(|c| *c != ' ')
        .flat_map(char::to_lowercase)
        .collect();
    REPLY_DENYLIST
        .iter()
        .any(|phrase| normalized.contains(phrase))
}

/// Drop self-referential or promotional lines, keeping the rest in order.
pub fn sanitize_reply(reply: &str) -> String {
    reply
        .lines()
        .map(str::trim_end)
        .filter(|line| !is_denied(line))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_title_and_transcript() {
        let prompt = build_prompt("影片標題", "逐字稿內容");
        assert!(prompt.contains("《影片標題》"));
        assert!(prompt.ends_with("逐字稿內容"));
        assert!(prompt.contains("總結："));
        assert!(prompt.contains("繁體中文"));
    }

    #[test]
    fn test_prompt_truncates_transcript() {
        let transcript = "字".repeat(70_000);
        let prompt = build_prompt("t", &transcript);
        let embedded = prompt.rsplit("逐字稿如下：\n").next().unwrap();
        assert_eq!(embedded.chars().count(), MAX_TRANSCRIPT_CHARS);
    }

    #[test]
    fn test_prompt_uses_placeholder_title() {
        assert!(build_prompt("  ", "x").contains("《(untitled)》"));
    }

    #[test]
    fn test_strip_non_bmp() {
        assert_eq!(strip_non_bmp("好🎉棒"), "好棒");
    }

    #[test]
    fn test_sanitize_removes_only_denied_lines() {
        let reply = "1. **甲**：說明\n如果 覺得 有幫助，歡迎分享\n2. **乙**：說明\nGemini 產生的內容\n總結：結論";
        assert_eq!(
            sanitize_reply(reply),
            "1. **甲**：說明\n2. **乙**：說明\n總結：結論"
        );
    }

    #[test]
    fn test_sanitize_keeps_clean_reply() {
        let reply = "a\nb\nc";
        assert_eq!(sanitize_reply(reply), reply);
    }
}
