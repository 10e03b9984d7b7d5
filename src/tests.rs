#[cfg(test)]
mod tests {

    mod slug_tests {
        use crate::services::slug::{generate_slug, generate_slug_at, validate_slug, SlugKind, SlugScript};
        use chrono::Utc;

        const NAMES: [&str; 14] = [
            "Hello World",
            "  Hello   World!!  ",
            "!!!@@@",
            "",
            "   ",
            "---",
            "C++ & Rust: a love story?",
            "Rust 入门",
            "日本語のタイトル",
            "ÀÉÎÕÜ",
            "emoji 🎉 party",
            "tab\tand\nnewline",
            "under_score",
            "MiXeD CaSe 42",
        ];

        #[test]
        fn test_every_slug_is_valid_and_non_empty() {
            for script in [SlugScript::Ascii, SlugScript::Han] {
                for kind in [SlugKind::Post, SlugKind::Category, SlugKind::Tag] {
                    for name in NAMES {
                        let slug = generate_slug_at(name, kind, script, Utc::now());
                        assert!(!slug.is_empty());
                        assert!(
                            validate_slug(&slug, script),
                            "{:?} -> {:?} is not a valid slug",
                            name,
                            slug
                        );
                    }
                }
            }
        }

        #[test]
        fn test_fallback_prefix() {
            assert!(generate_slug("!!!@@@", SlugKind::Category).starts_with("category-"));
            assert!(generate_slug("!!!@@@", SlugKind::Tag).starts_with("tag-"));
            assert!(generate_slug("!!!@@@", SlugKind::Post).starts_with("post-"));
        }

        #[test]
        fn test_hello_world_tag() {
            assert_eq!(generate_slug("  Hello   World!!  ", SlugKind::Tag), "hello-world");
        }

        #[test]
        fn test_case_folding() {
            assert_eq!(generate_slug("MiXeD CaSe 42", SlugKind::Category), "mixed-case-42");
        }

        #[test]
        fn test_long_category_name_is_capped() {
            let name = "category ".repeat(60);
            assert!(name.trim().len() > 500);
            let slug = generate_slug(&name, SlugKind::Category);
            assert!(slug.chars().count() <= SlugKind::Category.max_len());
            assert!(!slug.ends_with('-'));
        }

        #[test]
        fn test_underscore_is_stripped() {
            assert_eq!(generate_slug("under_score", SlugKind::Tag), "underscore");
        }
    }

    mod markdown_tests {
        use crate::services::markdown::{render, ContentRenderer};
        use crate::services::policy::{ContentClass, SanitizePolicy};
        use once_cell::sync::Lazy;
        use regex::Regex;

        static TAG_RE: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r#"<([a-zA-Z][a-zA-Z0-9]*)((?:\s+[^\s=/>]+(?:="[^"]*")?)*)\s*/?>"#).unwrap()
        });
        static ATTR_RE: Lazy<Regex> =
            Lazy::new(|| Regex::new(r#"\s+([^\s=/>]+)(?:="[^"]*")?"#).unwrap());

        const HOSTILE: [&str; 12] = [
            "<script>alert(1)</script>**hi**",
            "**hi** <script>alert(1)</script>",
            "<img src=x onerror=alert(1)>",
            "<a href=\"javascript:alert(1)\" onclick=\"x()\">click</a>",
            "[click](javascript:alert(1))",
            "<iframe src=\"https://evil.example\"></iframe>",
            "<svg><g onload=\"alert(1)\"></g></svg>",
            "<style>body{display:none}</style>text",
            "<div style=\"position:fixed\" class=\"x\">boxed</div>",
            "<p title=\"t\" lang=\"en\" id=\"i\">para</p>",
            "# Heading\n\n![img](/a.png \"title\")\n\n| a |\n|---|\n| b |",
            "<!-- comment --><u>under</u> <del>gone</del> ~~strike~~",
        ];

        fn assert_closed_under(html: &str, policy: &SanitizePolicy) {
            for caps in TAG_RE.captures_iter(html) {
                let tag = caps[1].to_lowercase();
                assert!(policy.allows_tag(&tag), "<{}> leaked into {}", tag, html);
                for attr in ATTR_RE.captures_iter(&caps[2]) {
                    assert!(
                        policy.allows_attribute(&tag, &attr[1]),
                        "{} on <{}> leaked into {}",
                        &attr[1],
                        tag,
                        html
                    );
                }
            }
            assert!(!html.contains("<!--"));
            assert!(!html.to_lowercase().contains("javascript:"));
        }

        #[test]
        fn test_output_stays_within_policy() {
            let renderer = ContentRenderer::default();
            for class in ContentClass::ALL {
                for input in HOSTILE {
                    let html = renderer.render(input, class);
                    assert_closed_under(&html, renderer.policies().get(class));
                }
            }
        }

        #[test]
        fn test_rendering_is_repeatable() {
            let renderer = ContentRenderer::default();
            for class in ContentClass::ALL {
                for input in HOSTILE {
                    assert_eq!(renderer.render(input, class), renderer.render(input, class));
                }
            }
        }

        #[test]
        fn test_render_basic_markdown() {
            let html = render("# Hello World", &SanitizePolicy::post());
            assert!(html.contains("<h1>Hello World</h1>"));
        }

        #[test]
        fn test_render_bold_italic() {
            let html = render("**bold** and *italic*", &SanitizePolicy::comment());
            assert!(html.contains("<strong>bold</strong>"));
            assert!(html.contains("<em>italic</em>"));
        }

        #[test]
        fn test_render_lists_and_quotes() {
            let html = render("> quoted\n\n1. one\n2. two", &SanitizePolicy::post());
            assert!(html.contains("<blockquote>"));
            assert!(html.contains("<ol>"));
            assert!(html.contains("<li>one</li>"));
        }

        #[test]
        fn test_render_inline_code() {
            let html = render("Use `code` here", &SanitizePolicy::inline());
            assert!(html.contains("<code>code</code>"));
        }

        #[test]
        fn test_img_only_survives_in_posts() {
            let input = "<img src=\"/media/cat.png\" alt=\"cat\">";
            let renderer = ContentRenderer::default();
            assert!(renderer.render(input, ContentClass::Post).contains("<img"));
            assert!(!renderer.render(input, ContentClass::Comment).contains("<img"));
            assert!(!renderer.render(input, ContentClass::Inline).contains("<img"));
        }
    }
}
