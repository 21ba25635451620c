//! Block tree to markdown conversion
//!
//! Pure transform from a page's content blocks to the markdown body of the
//! GitHub issue. No I/O and no failure path: malformed blocks render as
//! placeholders, missing text renders as nothing. Output is deterministic
//! for a given block sequence, and document order is preserved exactly.
//!
//! Spacing convention: every block is followed by a blank line except
//! bulleted/numbered/to-do items, which sit on adjacent lines so lists stay
//! tight. Children render directly beneath their parent line, indented two
//! spaces per nesting level.

use crate::page::{Block, BlockKind};

/// Render a block sequence (with nesting) to markdown
pub fn render_blocks(blocks: &[Block]) -> String {
    let mut out = String::new();
    render_into(&mut out, blocks, 0);
    out.trim().to_string()
}

fn render_into(out: &mut String, blocks: &[Block], depth: usize) {
    for block in blocks {
        render_block(out, block, depth);
    }
}

fn render_block(out: &mut String, block: &Block, depth: usize) {
    let rendered = match &block.kind {
        BlockKind::Paragraph { text } => nonempty(text.as_str()),
        BlockKind::Heading { level, text } => nonempty(text.as_str()).map(|t| {
            let level = (*level).clamp(1, 3) as usize;
            format!("{} {}", "#".repeat(level), t)
        }),
        BlockKind::BulletedItem { text } => nonempty(text.as_str()).map(|t| format!("- {}", t)),
        BlockKind::NumberedItem { text } => nonempty(text.as_str()).map(|t| format!("1. {}", t)),
        BlockKind::ToDo { text, checked } => nonempty(text.as_str())
            .map(|t| format!("- [{}] {}", if *checked { "x" } else { " " }, t)),
        BlockKind::Code { language, text } => {
            nonempty(text.as_str()).map(|t| format!("```{}\n{}\n```", language, t))
        }
        BlockKind::Quote { text } => nonempty(text.as_str()).map(|t| {
            t.lines()
                .map(|line| format!("> {}", line))
                .collect::<Vec<_>>()
                .join("\n")
        }),
        BlockKind::Callout { icon, text } => nonempty(text.as_str())
            .map(|t| format!("> {} **{}**", icon.as_deref().unwrap_or("💡"), t)),
        BlockKind::Image { url, caption } => nonempty(url.as_str())
            .map(|u| format!("![{}]({})", caption.as_deref().unwrap_or("image"), u)),
        BlockKind::File { url, name } => nonempty(url.as_str())
            .map(|u| format!("📎 [{}]({})", name.as_deref().unwrap_or("Attached file"), u)),
        BlockKind::Video { url, caption } => nonempty(url.as_str())
            .map(|u| format!("🎥 [{}]({})", caption.as_deref().unwrap_or("Video"), u)),
        BlockKind::Divider => Some("---".to_string()),
        BlockKind::Unsupported { kind } => Some(format!("<!-- unsupported block: {} -->", kind)),
    };

    // A block that renders nothing and owns nothing disappears entirely
    if rendered.is_none() && block.children.is_empty() {
        return;
    }

    if let Some(text) = rendered {
        push_indented(out, &text, depth);
    }

    render_into(out, &block.children, depth + 1);

    if !is_tight(&block.kind) {
        out.push('\n');
    }
}

/// List items stack on adjacent lines; everything else gets a blank line after
fn is_tight(kind: &BlockKind) -> bool {
    matches!(
        kind,
        BlockKind::BulletedItem { .. } | BlockKind::NumberedItem { .. } | BlockKind::ToDo { .. }
    )
}

/// Write each line of `text` prefixed with the nesting indent
fn push_indented(out: &mut String, text: &str, depth: usize) {
    let indent = "  ".repeat(depth);
    for line in text.lines() {
        out.push_str(&indent);
        out.push_str(line);
        out.push('\n');
    }
}

fn nonempty<S: Into<String> + AsRef<str>>(text: S) -> Option<String> {
    if text.as_ref().trim().is_empty() {
        None
    } else {
        Some(text.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_bullets_and_code() {
        let blocks = vec![
            Block::heading(1, "Title"),
            Block::bulleted("a"),
            Block::bulleted("b"),
            Block::code("python", "x=1"),
        ];

        assert_eq!(
            render_blocks(&blocks),
            "# Title\n\n- a\n- b\n```python\nx=1\n```"
        );
    }

    #[test]
    fn test_output_is_deterministic() {
        let blocks = vec![
            Block::heading(2, "Plan"),
            Block::numbered("first"),
            Block::numbered("second"),
            Block::paragraph("done"),
        ];

        let first = render_blocks(&blocks);
        let second = render_blocks(&blocks);
        assert_eq!(first, second);
    }

    #[test]
    fn test_nested_lists_indent_two_spaces_per_level() {
        let blocks = vec![Block::bulleted("parent").with_children(vec![
            Block::bulleted("child").with_children(vec![Block::bulleted("grandchild")]),
        ])];

        assert_eq!(
            render_blocks(&blocks),
            "- parent\n  - child\n    - grandchild"
        );
    }

    #[test]
    fn test_children_render_under_any_parent() {
        let blocks =
            vec![Block::paragraph("intro").with_children(vec![Block::bulleted("detail")])];

        assert_eq!(render_blocks(&blocks), "intro\n  - detail");
    }

    #[test]
    fn test_document_order_preserved() {
        let blocks = vec![
            Block::paragraph("one"),
            Block::divider(),
            Block::paragraph("two"),
        ];

        assert_eq!(render_blocks(&blocks), "one\n\n---\n\ntwo");
    }

    #[test]
    fn test_to_do_states() {
        let blocks = vec![Block::todo("open item", false), Block::todo("done item", true)];
        assert_eq!(render_blocks(&blocks), "- [ ] open item\n- [x] done item");
    }

    #[test]
    fn test_code_without_language_and_multiline() {
        let blocks = vec![Block::code("", "fn main() {\n    run();\n}")];
        assert_eq!(
            render_blocks(&blocks),
            "```\nfn main() {\n    run();\n}\n```"
        );
    }

    #[test]
    fn test_quote_prefixes_every_line() {
        let blocks = vec![Block::quote("first\nsecond")];
        assert_eq!(render_blocks(&blocks), "> first\n> second");
    }

    #[test]
    fn test_callout_bolds_text_and_defaults_icon() {
        let with_icon = vec![Block::new(BlockKind::Callout {
            icon: Some("⚠️".to_string()),
            text: "careful".to_string(),
        })];
        assert_eq!(render_blocks(&with_icon), "> ⚠️ **careful**");

        let without_icon = vec![Block::new(BlockKind::Callout {
            icon: None,
            text: "note".to_string(),
        })];
        assert_eq!(render_blocks(&without_icon), "> 💡 **note**");
    }

    #[test]
    fn test_media_rendering_and_fallbacks() {
        let blocks = vec![
            Block::new(BlockKind::Image {
                url: "https://example.com/a.png".to_string(),
                caption: Some("diagram".to_string()),
            }),
            Block::new(BlockKind::Image {
                url: "https://example.com/b.png".to_string(),
                caption: None,
            }),
            Block::new(BlockKind::File {
                url: "https://example.com/doc.pdf".to_string(),
                name: None,
            }),
            Block::new(BlockKind::Video {
                url: "https://example.com/demo.mp4".to_string(),
                caption: None,
            }),
        ];

        assert_eq!(
            render_blocks(&blocks),
            "![diagram](https://example.com/a.png)\n\n\
             ![image](https://example.com/b.png)\n\n\
             📎 [Attached file](https://example.com/doc.pdf)\n\n\
             🎥 [Video](https://example.com/demo.mp4)"
        );
    }

    #[test]
    fn test_media_without_url_is_omitted() {
        let blocks = vec![
            Block::new(BlockKind::Image {
                url: String::new(),
                caption: Some("lost".to_string()),
            }),
            Block::paragraph("still here"),
        ];

        assert_eq!(render_blocks(&blocks), "still here");
    }

    #[test]
    fn test_unsupported_block_leaves_visible_placeholder() {
        let blocks = vec![Block::new(BlockKind::Unsupported {
            kind: "synced_block".to_string(),
        })];

        assert_eq!(
            render_blocks(&blocks),
            "<!-- unsupported block: synced_block -->"
        );
    }

    #[test]
    fn test_empty_blocks_are_omitted() {
        let blocks = vec![
            Block::paragraph(""),
            Block::paragraph("   "),
            Block::bulleted(""),
            Block::heading(1, ""),
        ];

        assert_eq!(render_blocks(&blocks), "");
        assert_eq!(render_blocks(&[]), "");
    }

    #[test]
    fn test_empty_parent_with_children_keeps_children() {
        let blocks = vec![Block::paragraph("").with_children(vec![Block::bulleted("orphan")])];
        assert_eq!(render_blocks(&blocks), "- orphan");
    }

    #[test]
    fn test_heading_level_clamped() {
        let blocks = vec![Block::heading(7, "deep")];
        assert_eq!(render_blocks(&blocks), "### deep");
    }

    #[test]
    fn test_mixed_document() {
        let blocks = vec![
            Block::heading(1, "Feature"),
            Block::paragraph("Summary of the request."),
            Block::heading(2, "Steps"),
            Block::numbered("open the app"),
            Block::numbered("click the button").with_children(vec![Block::paragraph(
                "the red one",
            )]),
            Block::divider(),
            Block::code("sh", "cargo run"),
        ];

        assert_eq!(
            render_blocks(&blocks),
            "# Feature\n\n\
             Summary of the request.\n\n\
             ## Steps\n\n\
             1. open the app\n\
             1. click the button\n\
             \x20\x20the red one\n\n\
             ---\n\n\
             ```sh\ncargo run\n```"
        );
    }
}
