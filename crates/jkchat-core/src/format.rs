//! Reply formatting: raw assistant text in, safe HTML out.
//!
//! Fenced code blocks are lifted out of the text before anything else touches
//! it and are spliced back in as the last step, escaped exactly once. All other
//! text is escaped, so nothing in a reply can turn into live markup. The
//! formatter is called on every prefix of a reply while it is being typed out,
//! so it has to produce well-formed output for truncated input too.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

const FENCE: &str = "```";
const DEFAULT_LANGUAGE: &str = "text";
const PLACEHOLDER_MARK: char = '\u{0}';
const PLACEHOLDER_TAG: &str = "CODE";

static BULLET_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\*\s*\*\*([^*]+?)\*\*\s*:?\s*(.+)$").expect("valid bullet label pattern")
});
static BARE_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\*\*([^*]+?)\*\*:?$").expect("valid bare label pattern"));
static LABEL_WITH_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\*\*([^*]+?)\*\*\s*:?\s*(.+)$").expect("valid label pattern")
});
static INLINE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`\n\x00]+)`").expect("valid inline code pattern"));
static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{2,}").expect("valid paragraph pattern"));

/// A fenced code block pulled out of the reply text
#[derive(Debug, Clone, PartialEq, Eq)]
struct CodeBlock {
    language: String,
    code: String,
}

impl CodeBlock {
    fn to_html(&self) -> String {
        format!(
            "<pre><code class=\"language-{}\">{}</code></pre>",
            self.language,
            escape_html(&self.code)
        )
    }
}

enum Segment<'a> {
    Text(&'a str),
    Code(usize),
}

/// Format a raw reply into HTML.
///
/// Never fails: text that is not valid markdown comes back escaped.
pub fn format_message(text: &str) -> String {
    // A NUL in the input could forge a placeholder; HTML has no use for it anyway.
    let text = text
        .replace(PLACEHOLDER_MARK, "\u{FFFD}")
        .replace("\r\n", "\n");

    let (text, blocks) = extract_code_blocks(&text);
    let text = rewrite_emphasis_lines(&text);
    let text = escape_html(&text);
    let text = INLINE_CODE.replace_all(&text, "<code>${1}</code>");

    let mut html = String::with_capacity(text.len() + 16);
    for segment in split_placeholders(&text, blocks.len()) {
        match segment {
            Segment::Text(run) => push_paragraphs(&mut html, run),
            Segment::Code(index) => html.push_str(&blocks[index].to_html()),
        }
    }

    if html.is_empty() {
        html.push_str("<p></p>");
    }
    html
}

/// Escape the characters that are significant in HTML text and attributes.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn extract_code_blocks(text: &str) -> (String, Vec<CodeBlock>) {
    let mut out = String::with_capacity(text.len());
    let mut blocks = Vec::new();
    let mut copied = 0;
    let mut search = 0;

    while let Some(offset) = text[search..].find(FENCE) {
        let start = search + offset;
        if start > 0 && !text[..start].ends_with('\n') {
            search = start + FENCE.len();
            continue;
        }
        // Later openers start later lines, so if this one has no line break or
        // no closing fence after it, neither do they.
        let Some((block, len)) = parse_fenced_block(&text[start..]) else {
            break;
        };
        out.push_str(&text[copied..start]);
        out.push(PLACEHOLDER_MARK);
        out.push_str(PLACEHOLDER_TAG);
        out.push_str(&blocks.len().to_string());
        out.push(PLACEHOLDER_MARK);
        blocks.push(block);
        copied = start + len;
        search = copied;
    }

    out.push_str(&text[copied..]);
    (out, blocks)
}

/// Parse a block starting at an opening fence. Returns the block and the
/// number of bytes it spans, closing fence included.
///
/// The opening line has to end before the closing fence, so a fence never
/// opens and closes on one line.
fn parse_fenced_block(s: &str) -> Option<(CodeBlock, usize)> {
    let after_fence = &s[FENCE.len()..];
    let line_end = FENCE.len() + after_fence.find('\n')?;
    let tag_len = after_fence
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
        .count();
    let tag = &after_fence[..tag_len];

    // A tag is only a tag when the line ends right after it.
    let (language, body_start) = if FENCE.len() + tag_len == line_end {
        let language = if tag.is_empty() { DEFAULT_LANGUAGE } else { tag };
        (language, line_end + 1)
    } else {
        (DEFAULT_LANGUAGE, FENCE.len())
    };

    let close = line_end + s[line_end..].find(FENCE)?;
    let block = CodeBlock {
        language: language.to_string(),
        code: s[body_start..close].trim().to_string(),
    };
    Some((block, close + FENCE.len()))
}

fn rewrite_emphasis_lines(text: &str) -> String {
    text.split('\n')
        .map(rewrite_emphasis_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn rewrite_emphasis_line(line: &str) -> Cow<'_, str> {
    if let Some(caps) = BULLET_LABEL.captures(line) {
        return Cow::Owned(format!("→ {}: {}", caps[1].trim(), caps[2].trim()));
    }
    if let Some(caps) = BARE_LABEL.captures(line) {
        return Cow::Owned(format!("→ {}", caps[1].trim()));
    }
    if let Some(caps) = LABEL_WITH_TEXT.captures(line) {
        return Cow::Owned(format!("→ {}: {}", caps[1].trim(), caps[2].trim()));
    }
    Cow::Borrowed(line)
}

fn split_placeholders(text: &str, block_count: usize) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find(PLACEHOLDER_MARK) {
        let after = &rest[open + PLACEHOLDER_MARK.len_utf8()..];
        let Some(close) = after.find(PLACEHOLDER_MARK) else {
            break;
        };
        let index = after[..close]
            .strip_prefix(PLACEHOLDER_TAG)
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|i| *i < block_count);
        let Some(index) = index else {
            break;
        };
        segments.push(Segment::Text(&rest[..open]));
        segments.push(Segment::Code(index));
        rest = &after[close + PLACEHOLDER_MARK.len_utf8()..];
    }

    segments.push(Segment::Text(rest));
    segments
}

fn push_paragraphs(html: &mut String, run: &str) {
    let run = run.trim_matches('\n');
    for paragraph in PARAGRAPH_BREAK.split(run) {
        if paragraph.is_empty() {
            continue;
        }
        html.push_str("<p>");
        html.push_str(&paragraph.replace('\n', "<br>"));
        html.push_str("</p>");
    }
}
