use ammonia::Builder;
use once_cell::sync::Lazy;
use pulldown_cmark::{html, Event, Options, Parser, Tag, TagEnd};
use regex::Regex;
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use crate::services::policy::{ContentClass, PolicySet, SanitizePolicy};

/// URL schemes links and images may point at. Relative URLs pass through unchanged.
const URL_SCHEMES: [&str; 3] = ["http", "https", "mailto"];

// Closed script and style elements, content included.
static EXECUTABLE_BLOCK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>")
        .expect("Invalid executable block regex pattern")
});

/// Drop `<script>` and `<style>` elements before parsing. Left in place, an element that
/// opens a line turns the whole line into a raw HTML block and the Markdown after its
/// closing tag is never parsed.
fn strip_executable_blocks(markdown: &str) -> Cow<'_, str> {
    EXECUTABLE_BLOCK_REGEX.replace_all(markdown, "")
}

fn markdown_options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_FOOTNOTES | Options::ENABLE_STRIKETHROUGH
}

/// Render `markdown` to HTML and strip everything `policy` does not allow.
///
/// Never fails: constructs the parser does not understand come out as text, and markup
/// outside the allow-list is removed. The output depends only on the two arguments.
pub fn render(markdown: &str, policy: &SanitizePolicy) -> String {
    let markdown = strip_executable_blocks(markdown);
    let parser = Parser::new_ext(&markdown, markdown_options());
    let mut html_output = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut html_output, parser);

    sanitizer(policy).clean(&html_output).to_string()
}

fn sanitizer(policy: &SanitizePolicy) -> Builder<'_> {
    let tags: HashSet<&str> = policy.tags().collect();
    let attrs: HashMap<&str, HashSet<&str>> = policy
        .tags()
        .map(|tag| (tag, policy.attributes_for(tag).collect::<HashSet<_>>()))
        .filter(|(_, attrs)| !attrs.is_empty())
        .collect();

    let mut sanitizer = Builder::default();
    sanitizer
        .tags(tags)
        .tag_attributes(attrs)
        .generic_attributes(HashSet::new())
        .url_schemes(URL_SCHEMES.iter().copied().collect())
        .link_rel(None)
        .strip_comments(true);
    sanitizer
}

/// Markdown renderer bound to one policy per content class.
#[derive(Debug, Clone, Default)]
pub struct ContentRenderer {
    policies: PolicySet,
}

impl ContentRenderer {
    pub fn new(policies: PolicySet) -> Self {
        Self { policies }
    }

    pub fn policies(&self) -> &PolicySet {
        &self.policies
    }

    pub fn render(&self, markdown: &str, class: ContentClass) -> String {
        render(markdown, self.policies.get(class))
    }

    /// Plain-text excerpt of at most `max_len` characters plus an ellipsis.
    /// Headings, code blocks, images and raw HTML are left out.
    pub fn excerpt(&self, markdown: &str, max_len: usize) -> String {
        let mut text = String::new();
        let mut skip_depth = 0usize;
        let markdown = strip_executable_blocks(markdown);

        for event in Parser::new_ext(&markdown, markdown_options()) {
            match event {
                Event::Start(Tag::Heading { .. } | Tag::CodeBlock(_) | Tag::Image { .. }) => {
                    skip_depth += 1;
                }
                Event::End(TagEnd::Heading(_) | TagEnd::CodeBlock | TagEnd::Image) => {
                    skip_depth = skip_depth.saturating_sub(1);
                }
                Event::Text(t) | Event::Code(t) if skip_depth == 0 => text.push_str(&t),
                Event::SoftBreak | Event::HardBreak => text.push(' '),
                Event::End(TagEnd::Paragraph | TagEnd::Item | TagEnd::TableCell) => {
                    text.push(' ')
                }
                _ => {}
            }
        }

        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.chars().count() <= max_len {
            return text;
        }

        let truncated: String = text.chars().take(max_len).collect();
        match truncated.rfind(' ') {
            Some(pos) if pos > 0 => format!("{}...", &truncated[..pos]),
            _ => format!("{}...", truncated),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_is_deterministic() {
        let input = "# Title\n\nSome *text* with [a link](https://example.com \"t\").\n\n> quote";
        let policy = SanitizePolicy::post();
        assert_eq!(render(input, &policy), render(input, &policy));
    }

    #[test]
    fn test_script_block_is_removed() {
        let html = render("<script>alert(1)</script>**hi**", &SanitizePolicy::post());
        assert_eq!(html.trim(), "<p><strong>hi</strong></p>");
    }

    #[test]
    fn test_markdown_after_style_on_same_line_is_parsed() {
        let html = render(
            "<STYLE type=\"text/css\">p { color: red }</STYLE>*styled*",
            &SanitizePolicy::comment(),
        );
        assert_eq!(html.trim(), "<p><em>styled</em></p>");
    }

    #[test]
    fn test_multiline_script_is_removed() {
        let html = render("<script>\nlet a = 1;\n</script>\n\ntext", &SanitizePolicy::post());
        assert_eq!(html.trim(), "<p>text</p>");
    }

    #[test]
    fn test_unclosed_script_is_still_sanitized() {
        let html = render("<script>alert(1)", &SanitizePolicy::post());
        assert!(!html.contains("<script"), "Output was: {}", html);
        assert!(!html.contains("alert"), "Output was: {}", html);
    }

    #[test]
    fn test_inline_script_is_removed_and_bold_kept() {
        let html = render("**hi** <script>alert(1)</script>", &SanitizePolicy::post());
        assert!(html.contains("<strong>hi</strong>"), "Output was: {}", html);
        assert!(!html.contains("script"), "Output was: {}", html);
        assert!(!html.contains("alert"), "Output was: {}", html);
    }

    #[test]
    fn test_event_handlers_are_stripped() {
        let html = render(
            "<img src=\"x.png\" onerror=\"alert(1)\" class=\"big\">",
            &SanitizePolicy::post(),
        );
        assert!(html.contains("<img src=\"x.png\">"), "Output was: {}", html);
        assert!(!html.contains("onerror"));
        assert!(!html.contains("class"));
    }

    #[test]
    fn test_javascript_links_lose_href() {
        let html = render("[click](javascript:alert(1))", &SanitizePolicy::post());
        assert!(!html.contains("javascript"), "Output was: {}", html);
        assert!(html.contains("click"));
    }

    #[test]
    fn test_links_get_no_rel() {
        let html = render("[Link](https://example.com)", &SanitizePolicy::comment());
        assert!(html.contains("<a href=\"https://example.com\">Link</a>"), "Output was: {}", html);
    }

    #[test]
    fn test_code_block_loses_language_class() {
        let html = render("```rust\nlet x = 5;\n```", &SanitizePolicy::post());
        assert!(html.contains("<pre><code>let x = 5;"), "Output was: {}", html);
        assert!(!html.contains("language-rust"));
    }

    #[test]
    fn test_disallowed_tags_keep_text() {
        let html = render("| a | b |\n|---|---|\n| 1 | 2 |", &SanitizePolicy::post());
        assert!(!html.contains("<table"));
        assert!(html.contains('1') && html.contains('2'));
    }

    #[test]
    fn test_headings_survive_only_in_posts() {
        let post = render("## Section", &SanitizePolicy::post());
        let comment = render("## Section", &SanitizePolicy::comment());
        assert_eq!(post.trim(), "<h2>Section</h2>");
        assert_eq!(comment.trim(), "Section");
    }

    #[test]
    fn test_image_policy_differs() {
        let input = "![pic](/media/pic.png)";
        let post = render(input, &SanitizePolicy::post());
        let comment = render(input, &SanitizePolicy::comment());
        assert!(post.contains("<img src=\"/media/pic.png\" alt=\"pic\">"), "Output was: {}", post);
        assert!(!comment.contains("<img"), "Output was: {}", comment);
    }

    #[test]
    fn test_malformed_markdown_passes_through() {
        let html = render("**unclosed [link](", &SanitizePolicy::comment());
        assert!(html.contains("**unclosed [link]("), "Output was: {}", html);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(render("", &SanitizePolicy::post()), "");
    }

    #[test]
    fn test_excerpt_skips_headings_and_code() {
        let renderer = ContentRenderer::default();
        let md = "# Title\n\nFirst *para*.\n\n```\ncode here\n```\n\n- one\n- two";
        assert_eq!(renderer.excerpt(md, 200), "First para. one two");
    }

    #[test]
    fn test_excerpt_ignores_script_text() {
        let renderer = ContentRenderer::default();
        assert_eq!(renderer.excerpt("<script>alert(1)</script>**hi** there", 200), "hi there");
    }

    #[test]
    fn test_excerpt_truncates_on_word_boundary() {
        let renderer = ContentRenderer::default();
        let excerpt = renderer.excerpt("alpha beta gamma delta", 12);
        assert_eq!(excerpt, "alpha beta...");
    }

    #[test]
    fn test_renderer_uses_class_policy() {
        let renderer = ContentRenderer::default();
        let input = "<u>under</u> <h3>x</h3>";
        assert!(renderer.render(input, ContentClass::Comment).contains("<u>under</u>"));
        assert!(!renderer.render(input, ContentClass::Inline).contains("<h3>"));
    }
}
