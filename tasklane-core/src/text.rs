use regex::Regex;
use std::sync::OnceLock;

fn bold_italic_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*\*(.+?)\*\*\*").expect("valid bold-italic regex"))
}

fn bold_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*(.+?)\*\*").expect("valid bold regex"))
}

fn italic_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*(.+?)\*").expect("valid italic regex"))
}

fn bold_underscore_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"__(.+?)__").expect("valid underscore bold regex"))
}

fn italic_underscore_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"_(.+?)_").expect("valid underscore italic regex"))
}

fn link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[(.+?)\]\(.+?\)").expect("valid link regex"))
}

fn fenced_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```.*?```").expect("valid code fence regex"))
}

fn inline_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"`(.+?)`").expect("valid inline code regex"))
}

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^#{1,6}\s+").expect("valid heading regex"))
}

fn rule_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^[-*_]{3,}$").expect("valid rule regex"))
}

fn blockquote_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^>\s+").expect("valid blockquote regex"))
}

fn bullet_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*[-*+]\s+").expect("valid bullet regex"))
}

fn ordered_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*\d+\.\s+").expect("valid ordered list regex"))
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"))
}

fn glyph_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Emoji blocks, variation selectors, ZWJ, then the glyphs chat UIs sprinkle around.
        Regex::new(concat!(
            r"[\x{1F600}-\x{1F64F}\x{1F300}-\x{1F5FF}\x{1F680}-\x{1F6FF}\x{1F1E0}-\x{1F1FF}",
            r"\x{2600}-\x{26FF}\x{2700}-\x{27BF}\x{1F900}-\x{1F9FF}\x{1FA00}-\x{1FA6F}",
            r"\x{1FA70}-\x{1FAFF}\x{FE00}-\x{FE0F}\x{200D}",
            "✓✗✕✖✔✘➜➤➔→←↑↓★☆⭐♠♣♥♦■□▪▫●○◆◇]"
        ))
        .expect("valid glyph regex")
    })
}

fn collapse_whitespace(text: &str) -> String {
    whitespace_re().replace_all(text, " ").trim().to_string()
}

fn strip_markdown_once(text: &str) -> String {
    let mut out = text.to_string();
    for (re, rep) in [
        (bold_italic_re(), "$1"),
        (bold_re(), "$1"),
        (italic_re(), "$1"),
        (bold_underscore_re(), "$1"),
        (italic_underscore_re(), "$1"),
        (link_re(), "$1"),
        (fenced_code_re(), "code block"),
        (inline_code_re(), "$1"),
        (heading_re(), ""),
        (rule_re(), ""),
        (blockquote_re(), ""),
        (bullet_re(), ""),
        (ordered_re(), ""),
    ] {
        out = re.replace_all(&out, rep).into_owned();
    }
    collapse_whitespace(&out)
}

fn strip_glyphs_once(text: &str) -> String {
    collapse_whitespace(&glyph_re().replace_all(text, ""))
}

/// Removes markdown formatting, keeping the readable text.
pub fn strip_markdown(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    strip_markdown_once(text)
}

/// Removes emoji, variation selectors and decorative UI glyphs.
pub fn strip_emojis_and_icons(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    strip_glyphs_once(text)
}

/// Cleans assistant output before it is handed to a speech synthesizer.
///
/// Dropping a glyph can expose a new markup pair (`*✅*a*`), so the two passes
/// repeat until the text stops changing. This terminates: every pass either
/// shrinks the text or removes backticks, and nothing adds either back.
pub fn prepare_for_speech(text: &str) -> String {
    let mut out = strip_glyphs_once(&strip_markdown(text));
    loop {
        let next = strip_glyphs_once(&strip_markdown_once(&out));
        if next == out {
            return out;
        }
        out = next;
    }
}
