//! Block and rich-text shapes used by the document store.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextContent {
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotations {
    #[serde(default)]
    pub bold: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichText {
    #[serde(rename = "type", default = "text_kind")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Annotations>,
    /// Filled in by the store on reads; never sent.
    #[serde(default, skip_serializing)]
    pub plain_text: String,
}

fn text_kind() -> String {
    "text".to_string()
}

impl RichText {
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            kind: text_kind(),
            text: Some(TextContent {
                content: content.into(),
            }),
            annotations: None,
            plain_text: String::new(),
        }
    }

    pub fn bold(content: impl Into<String>) -> Self {
        Self {
            annotations: Some(Annotations { bold: true }),
            ..Self::plain(content)
        }
    }

    pub fn is_bold(&self) -> bool {
        self.annotations.as_ref().is_some_and(|a| a.bold)
    }

    pub fn plain_text(&self) -> &str {
        if !self.plain_text.is_empty() {
            return &self.plain_text;
        }
        self.text.as_ref().map(|t| t.content.as_str()).unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBody {
    #[serde(default)]
    pub rich_text: Vec<RichText>,
}

impl TextBody {
    pub fn new(rich_text: Vec<RichText>) -> Self {
        Self { rich_text }
    }

    pub fn plain_text(&self) -> String {
        self.rich_text.iter().map(RichText::plain_text).collect()
    }
}

/// Serialises as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmptyObject {}

/// Block payload keyed by its `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockContent {
    Paragraph {
        paragraph: TextBody,
    },
    #[serde(rename = "heading_1")]
    Heading1 {
        heading_1: TextBody,
    },
    #[serde(rename = "heading_2")]
    Heading2 {
        heading_2: TextBody,
    },
    #[serde(rename = "heading_3")]
    Heading3 {
        heading_3: TextBody,
    },
    NumberedListItem {
        numbered_list_item: TextBody,
    },
    Divider {
        divider: EmptyObject,
    },
    #[serde(other)]
    Unsupported,
}

impl BlockContent {
    pub fn paragraph(rich_text: Vec<RichText>) -> Self {
        Self::Paragraph {
            paragraph: TextBody::new(rich_text),
        }
    }

    pub fn heading_2(text: impl Into<String>) -> Self {
        Self::Heading2 {
            heading_2: TextBody::new(vec![RichText::plain(text)]),
        }
    }

    pub fn numbered_list_item(rich_text: Vec<RichText>) -> Self {
        Self::NumberedListItem {
            numbered_list_item: TextBody::new(rich_text),
        }
    }

    pub fn divider() -> Self {
        Self::Divider {
            divider: EmptyObject {},
        }
    }

    pub fn is_heading(&self) -> bool {
        matches!(
            self,
            Self::Heading1 { .. } | Self::Heading2 { .. } | Self::Heading3 { .. }
        )
    }

    pub fn text_body(&self) -> Option<&TextBody> {
        match self {
            Self::Paragraph { paragraph: body }
            | Self::Heading1 { heading_1: body }
            | Self::Heading2 { heading_2: body }
            | Self::Heading3 { heading_3: body }
            | Self::NumberedListItem {
                numbered_list_item: body,
            } => Some(body),
            Self::Divider { .. } | Self::Unsupported => None,
        }
    }

    pub fn plain_text(&self) -> Option<String> {
        self.text_body().map(TextBody::plain_text)
    }
}

/// A block as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Block {
    pub id: String,
    #[serde(flatten)]
    pub content: BlockContent,
}
