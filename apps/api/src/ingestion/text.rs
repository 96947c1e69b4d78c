//! HTML-to-Text Normalizer.
//!
//! One left-to-right pass over the markup with a handful of flags. No regular
//! expressions touch the raw document here, and unbalanced tags are harmless:
//! the scanner only ever looks at the current tag.

use crate::ingestion::models::PlainText;

/// Hard cap on normalized text, in characters.
pub const MAX_TEXT_CHARS: usize = 10_000;

/// Longest tag we bother to inspect. Anything longer is skipped as opaque.
const MAX_TAG_NAME: usize = 16;
/// Longest entity body between `&` and `;`.
const MAX_ENTITY_LEN: usize = 10;

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "li", "ul", "ol", "br", "tr", "table", "section", "article", "header",
    "footer", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre", "dd", "dt",
];

const NAMED_ENTITIES: &[(&str, char)] = &[
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
    ("nbsp", ' '),
    ("ndash", '–'),
    ("mdash", '—'),
    ("hellip", '…'),
    ("lsquo", '‘'),
    ("rsquo", '’'),
    ("ldquo", '“'),
    ("rdquo", '”'),
    ("bull", '•'),
    ("middot", '·'),
    ("copy", '©'),
    ("reg", '®'),
    ("trade", '™'),
    ("euro", '€'),
    ("pound", '£'),
];

#[derive(Debug, Default)]
struct ScanState {
    in_tag: bool,
    in_script: bool,
    in_style: bool,
    in_comment: bool,
    /// Set by `<li>`; the glyph is written before the item's first visible character.
    pending_bullet: bool,
    tag: String,
}

/// Strips tags, drops `<script>`/`<style>` bodies, keeps paragraph breaks,
/// decodes entities, normalizes whitespace and truncates to [`MAX_TEXT_CHARS`].
pub fn to_plain_text(html: &str) -> PlainText {
    let stripped = strip_tags(html);
    let decoded = decode_entities(&stripped);
    let normalized = normalize_whitespace(&decoded);
    PlainText::new(truncate_chars(&normalized, MAX_TEXT_CHARS).to_string())
}

fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len().min(MAX_TEXT_CHARS * 4));
    let mut state = ScanState::default();
    let mut prev3 = ['\0'; 3];
    let mut chars = html.chars().peekable();

    while let Some(c) = chars.next() {
        if state.in_comment {
            if c == '>' && prev3[1] == '-' && prev3[2] == '-' {
                state.in_comment = false;
            }
            prev3 = [prev3[1], prev3[2], c];
            continue;
        }
        prev3 = [prev3[1], prev3[2], c];

        if state.in_tag {
            if c == '>' {
                state.in_tag = false;
                finish_tag(&mut state, &mut out);
            } else if c == '<' && (state.in_script || state.in_style) {
                // "a<b" inside raw text was never a tag; restart at this '<'.
                state.tag.clear();
            } else if state.tag.len() < MAX_TAG_NAME {
                state.tag.push(c);
                if state.tag == "!--" {
                    state.in_tag = false;
                    state.in_comment = true;
                    // The opening "<!--" must not close itself on "<!-->".
                    prev3 = ['\0'; 3];
                }
            }
            continue;
        }

        if c == '<' && chars.peek().is_some_and(|&n| starts_tag(n)) {
            state.in_tag = true;
            state.tag.clear();
            continue;
        }

        if state.in_script || state.in_style {
            continue;
        }
        if state.pending_bullet && !c.is_whitespace() {
            out.push_str("• ");
            state.pending_bullet = false;
        }
        out.push(c);
    }

    out
}

/// A `<` only opens markup when followed by a letter, `/`, `!` or `?`.
fn starts_tag(next: char) -> bool {
    next.is_ascii_alphabetic() || matches!(next, '/' | '!' | '?')
}

fn finish_tag(state: &mut ScanState, out: &mut String) {
    let raw = state.tag.trim_start();
    let (closing, rest) = match raw.strip_prefix('/') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };
    let name: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();

    // Inside a raw-text element only its own closing tag matters.
    if state.in_script {
        if closing && name == "script" {
            state.in_script = false;
        }
        return;
    }
    if state.in_style {
        if closing && name == "style" {
            state.in_style = false;
        }
        return;
    }

    match name.as_str() {
        "script" if !closing && !rest.trim_end().ends_with('/') => state.in_script = true,
        "style" if !closing => state.in_style = true,
        "li" => {
            out.push('\n');
            state.pending_bullet = !closing;
        }
        "br" => out.push('\n'),
        n if closing && BLOCK_TAGS.contains(&n) => out.push('\n'),
        // Inline tags still separate words.
        _ => out.push(' '),
    }
}

/// Decodes the fixed named-entity table plus `&#NN;` and `&#xHH;` references.
/// Unknown or malformed entities are left as written.
pub fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let entity = after
            .char_indices()
            .take(MAX_ENTITY_LEN + 1)
            .find(|(_, c)| *c == ';')
            .map(|(end, _)| &after[..end]);

        match entity.and_then(decode_entity) {
            Some(decoded) => {
                out.push(decoded);
                // entity body plus '&' and ';'
                rest = &after[entity.map_or(0, str::len) + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(body: &str) -> Option<char> {
    if let Some(num) = body.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        if code == 0 {
            return None;
        }
        return char::from_u32(code).map(|c| if c == '\u{a0}' { ' ' } else { c });
    }
    NAMED_ENTITIES
        .iter()
        .find(|(name, _)| *name == body)
        .map(|(_, c)| *c)
}

/// Collapses runs of horizontal whitespace, trims each line and drops blank lines.
fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        let mut collapsed = String::with_capacity(line.len());
        for word in line.split_whitespace() {
            if !collapsed.is_empty() {
                collapsed.push(' ');
            }
            collapsed.push_str(word);
        }
        if collapsed.is_empty() || collapsed == "•" {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&collapsed);
    }
    out
}

/// Cuts `text` to at most `max` characters on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_tags_and_keeps_paragraphs() {
        let html = "<html><body><h1>Senior Engineer</h1><p>Join <b>Acme</b> today.</p><div>Remote</div></body></html>";
        let text = to_plain_text(html);
        assert_eq!(text.as_str(), "Senior Engineer\nJoin Acme today.\nRemote");
    }

    #[test]
    fn test_drops_script_and_style_bodies() {
        let html = r#"<p>Before</p><script>if (a < b) { document.write("<p>x</p>"); }</script><style>p > a { color: red }</style><p>After</p>"#;
        let text = to_plain_text(html);
        assert_eq!(text.as_str(), "Before\nAfter");
    }

    #[test]
    fn test_script_tag_case_insensitive_and_unclosed() {
        let text = to_plain_text("<p>Visible</p><SCRIPT type='x'>secret()</SCRIPT><p>Also</p>");
        assert_eq!(text.as_str(), "Visible\nAlso");

        let text = to_plain_text("<p>Visible</p><script>never closed <p>hidden</p>");
        assert_eq!(text.as_str(), "Visible");
    }

    #[test]
    fn test_less_than_inside_script_does_not_hide_following_content() {
        let text = to_plain_text("<script>if(a<b){}</script><p>Hi</p>");
        assert_eq!(text.as_str(), "Hi");
    }

    #[test]
    fn test_list_items_become_bullets() {
        let html = "<h2>Requirements</h2><ul><li>5 years of Rust</li><li>Kubernetes</li></ul>";
        let text = to_plain_text(html);
        assert_eq!(text.as_str(), "Requirements\n• 5 years of Rust\n• Kubernetes");
    }

    #[test]
    fn test_indented_list_items_keep_their_bullets() {
        let html = "<h3>Requirements</h3>\n<ul>\n  <li>\n    <p>5 years of Rust</p>\n  </li>\n  <li>\n    Kubernetes\n  </li>\n</ul>";
        let text = to_plain_text(html);
        assert_eq!(text.as_str(), "Requirements\n• 5 years of Rust\n• Kubernetes");
    }

    #[test]
    fn test_empty_list_item_does_not_bullet_following_text() {
        let text = to_plain_text("<ul><li></li></ul><p>About us</p>");
        assert_eq!(text.as_str(), "About us");
    }

    #[test]
    fn test_less_than_in_text_is_literal() {
        let html = "<p>Salary: <$120k depending on level.</p><p>Requirements</p><ul><li>Rust</li></ul>";
        let text = to_plain_text(html);
        assert_eq!(
            text.as_str(),
            "Salary: <$120k depending on level.\nRequirements\n• Rust"
        );

        let text = to_plain_text("<p>Experience: < 5 years, <3 teams</p>");
        assert_eq!(text.as_str(), "Experience: < 5 years, <3 teams");
    }

    #[test]
    fn test_br_and_comments() {
        let text = to_plain_text("Line one<br/>Line two<!-- <p>hidden</p> -->!");
        assert_eq!(text.as_str(), "Line one\nLine two!");
    }

    #[test]
    fn test_decodes_entities_after_stripping() {
        let text = to_plain_text("<p>R&amp;D &lt;team&gt; &#8212; &#x2022; caf&eacute; &nbsp;ok</p>");
        assert_eq!(text.as_str(), "R&D <team> — • caf&eacute; ok");
    }

    #[test]
    fn test_encoded_markup_is_not_reinterpreted() {
        let text = to_plain_text("&lt;script&gt;alert(1)&lt;/script&gt;");
        assert_eq!(text.as_str(), "<script>alert(1)</script>");
    }

    #[test]
    fn test_malformed_entities_left_alone() {
        assert_eq!(decode_entities("AT&T & more &#0; &#xZZ;"), "AT&T & more &#0; &#xZZ;");
        assert_eq!(decode_entities("trailing &"), "trailing &");
    }

    #[test]
    fn test_unbalanced_markup() {
        let text = to_plain_text("</div></div>text<p<p>more</span>");
        assert!(text.as_str().contains("text"));
        assert!(text.as_str().contains("more"));
    }

    #[test]
    fn test_truncates_to_cap() {
        let html = format!("<p>{}</p>", "é".repeat(MAX_TEXT_CHARS + 500));
        let text = to_plain_text(&html);
        assert_eq!(text.char_len(), MAX_TEXT_CHARS);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(to_plain_text("").as_str(), "");
        assert_eq!(to_plain_text("<html><head></head></html>").as_str(), "");
    }
}
