//! Content block model
//!
//! One `Block` per unit of rich content in a Notion page, with children
//! nested in document order. `parse_block` folds the wire shape (a type tag
//! plus a payload object keyed by that tag) into the typed variant; anything
//! it does not recognize becomes `Unsupported` so a single odd block never
//! sinks the whole page.

use serde_json::Value;

/// The supported block variants
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph { text: String },
    Heading { level: u8, text: String },
    BulletedItem { text: String },
    NumberedItem { text: String },
    ToDo { text: String, checked: bool },
    Code { language: String, text: String },
    Quote { text: String },
    Callout { icon: Option<String>, text: String },
    Image { url: String, caption: Option<String> },
    File { url: String, name: Option<String> },
    Video { url: String, caption: Option<String> },
    Divider,
    Unsupported { kind: String },
}

/// One block plus its nested children, document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub children: Vec<Block>,
}

impl Block {
    pub fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::new(BlockKind::Paragraph { text: text.into() })
    }

    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Self::new(BlockKind::Heading {
            level,
            text: text.into(),
        })
    }

    pub fn bulleted(text: impl Into<String>) -> Self {
        Self::new(BlockKind::BulletedItem { text: text.into() })
    }

    pub fn numbered(text: impl Into<String>) -> Self {
        Self::new(BlockKind::NumberedItem { text: text.into() })
    }

    pub fn todo(text: impl Into<String>, checked: bool) -> Self {
        Self::new(BlockKind::ToDo {
            text: text.into(),
            checked,
        })
    }

    pub fn code(language: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(BlockKind::Code {
            language: language.into(),
            text: text.into(),
        })
    }

    pub fn quote(text: impl Into<String>) -> Self {
        Self::new(BlockKind::Quote { text: text.into() })
    }

    pub fn divider() -> Self {
        Self::new(BlockKind::Divider)
    }

    /// Attach nested children (builder style, for fixtures and adapters)
    pub fn with_children(mut self, children: Vec<Block>) -> Self {
        self.children = children;
        self
    }
}

/// A block parsed off the wire, before children are fetched
#[derive(Debug, Clone)]
pub struct ParsedBlock {
    pub block: Block,

    /// Block id, needed to fetch children
    pub id: Option<String>,

    /// Whether the source reports nested children under this block
    pub has_children: bool,
}

/// Concatenate the plain text of a Notion rich-text array. Missing or
/// malformed entries contribute nothing.
pub fn plain_text(rich: &Value) -> String {
    rich.as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|t| t.get("plain_text").and_then(Value::as_str))
                .collect::<String>()
        })
        .unwrap_or_default()
}

/// Parse one block object from the wire. Never fails: unknown types become
/// `Unsupported`, missing text fields become empty strings.
pub fn parse_block(value: &Value) -> ParsedBlock {
    let id = value
        .get("id")
        .and_then(Value::as_str)
        .map(|s| s.to_string());
    let has_children = value
        .get("has_children")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let kind_tag = value.get("type").and_then(Value::as_str).unwrap_or("");
    let empty = Value::Object(Default::default());
    let data = value.get(kind_tag).unwrap_or(&empty);
    let text = plain_text(data.get("rich_text").unwrap_or(&Value::Null));

    let kind = match kind_tag {
        "paragraph" => BlockKind::Paragraph { text },
        "heading_1" => BlockKind::Heading { level: 1, text },
        "heading_2" => BlockKind::Heading { level: 2, text },
        "heading_3" => BlockKind::Heading { level: 3, text },
        "bulleted_list_item" => BlockKind::BulletedItem { text },
        "numbered_list_item" => BlockKind::NumberedItem { text },
        "to_do" => BlockKind::ToDo {
            text,
            checked: data.get("checked").and_then(Value::as_bool).unwrap_or(false),
        },
        "code" => BlockKind::Code {
            language: data
                .get("language")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
            text,
        },
        "quote" => BlockKind::Quote { text },
        "callout" => BlockKind::Callout {
            icon: callout_icon(data),
            text,
        },
        "image" => BlockKind::Image {
            url: hosted_url(data).unwrap_or_default(),
            caption: caption_text(data),
        },
        "file" => BlockKind::File {
            url: hosted_url(data).unwrap_or_default(),
            name: data
                .get("name")
                .and_then(Value::as_str)
                .map(|s| s.to_string()),
        },
        "video" => BlockKind::Video {
            url: hosted_url(data).unwrap_or_default(),
            caption: caption_text(data),
        },
        "divider" => BlockKind::Divider,
        other => BlockKind::Unsupported {
            kind: if other.is_empty() {
                "unknown".to_string()
            } else {
                other.to_string()
            },
        },
    };

    ParsedBlock {
        block: Block::new(kind),
        id,
        has_children,
    }
}

/// URL of a hosted asset: Notion nests it under `external` or `file`
/// depending on where the asset lives, tagged by the payload's own `type`.
fn hosted_url(data: &Value) -> Option<String> {
    let hosting = data.get("type").and_then(Value::as_str)?;
    data.get(hosting)?
        .get("url")?
        .as_str()
        .map(|s| s.to_string())
}

fn caption_text(data: &Value) -> Option<String> {
    let caption = plain_text(data.get("caption").unwrap_or(&Value::Null));
    if caption.is_empty() {
        None
    } else {
        Some(caption)
    }
}

fn callout_icon(data: &Value) -> Option<String> {
    data.get("icon")?
        .get("emoji")?
        .as_str()
        .map(|s| s.to_string())
}
