//! Split a finished answer into prose and fenced-code segments

use std::sync::LazyLock;

use regex::Regex;

/// Opening fence with an optional language label, then the body up to the closing fence.
/// An unterminated fence never matches.
static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```([\w+#.-]*)[ \t]*\s(.*?)```").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Text,
    Code,
}

impl SegmentKind {
    pub fn label(&self) -> &'static str {
        match self {
            SegmentKind::Text => "text",
            SegmentKind::Code => "code",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub content: String,
    /// Fence label, for code segments that carried one
    pub language: Option<String>,
}

impl Segment {
    fn text(content: &str) -> Self {
        Self {
            kind: SegmentKind::Text,
            content: content.to_string(),
            language: None,
        }
    }

    fn code(content: &str, language: &str) -> Self {
        Self {
            kind: SegmentKind::Code,
            content: content.to_string(),
            language: (!language.is_empty()).then(|| language.to_string()),
        }
    }
}

/// Segments in encounter order. Empty stretches produce nothing.
pub fn segment(text: &str) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut last = 0;

    for caps in FENCE.captures_iter(text) {
        let (Some(whole), Some(body)) = (caps.get(0), caps.get(2)) else {
            continue;
        };
        push_text(&mut out, &text[last..whole.start()]);
        let code = body.as_str().trim();
        if !code.is_empty() {
            let language = caps.get(1).map_or("", |m| m.as_str());
            out.push(Segment::code(code, language));
        }
        last = whole.end();
    }
    push_text(&mut out, &text[last..]);
    out
}

fn push_text(out: &mut Vec<Segment>, stretch: &str) {
    let trimmed = stretch.trim();
    if !trimmed.is_empty() {
        out.push(Segment::text(trimmed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(text: &str) -> Vec<(&'static str, String)> {
        segment(text)
            .into_iter()
            .map(|s| (s.kind.label(), s.content))
            .collect()
    }

    #[test]
    fn test_empty_answer() {
        assert!(segment("").is_empty());
        assert!(segment("  \n\t ").is_empty());
    }

    #[test]
    fn test_plain_answer_is_one_text_segment() {
        assert_eq!(pairs("plain"), vec![("text", "plain".to_string())]);
        assert_eq!(pairs("  two\nlines \n"), vec![("text", "two\nlines".to_string())]);
    }

    #[test]
    fn test_prose_code_prose() {
        assert_eq!(
            pairs("a ```python\nprint(1)\n``` b"),
            vec![
                ("text", "a".to_string()),
                ("code", "print(1)".to_string()),
                ("text", "b".to_string()),
            ]
        );
    }

    #[test]
    fn test_language_label_is_kept() {
        let segments = segment("```rust\nfn main() {}\n```");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].language.as_deref(), Some("rust"));
        assert_eq!(segments[0].content, "fn main() {}");
    }

    #[test]
    fn test_unlabeled_fence() {
        let segments = segment("see\n```\nls -la\n```");
        assert_eq!(segments[1].kind, SegmentKind::Code);
        assert_eq!(segments[1].content, "ls -la");
        assert_eq!(segments[1].language, None);
    }

    #[test]
    fn test_adjacent_fences_drop_empty_stretches() {
        assert_eq!(
            pairs("```py\na\n```\n\n```py\nb\n```"),
            vec![("code", "a".to_string()), ("code", "b".to_string())]
        );
    }

    #[test]
    fn test_empty_fence_emits_nothing() {
        assert_eq!(pairs("x ```python\n   \n``` y"), vec![
            ("text", "x".to_string()),
            ("text", "y".to_string()),
        ]);
    }

    #[test]
    fn test_unterminated_fence_is_text() {
        let text = "before ```python\nprint(1)";
        assert_eq!(pairs(text), vec![("text", text.to_string())]);
    }

    #[test]
    fn test_terminated_then_unterminated() {
        assert_eq!(
            pairs("```sh\necho hi\n``` then ```js\nlet x"),
            vec![
                ("code", "echo hi".to_string()),
                ("text", "then ```js\nlet x".to_string()),
            ]
        );
    }

    #[test]
    fn test_crlf_fences() {
        assert_eq!(
            pairs("a\r\n```python\r\nprint(1)\r\n```\r\nb"),
            vec![
                ("text", "a".to_string()),
                ("code", "print(1)".to_string()),
                ("text", "b".to_string()),
            ]
        );
    }
}
