// src/model/message.rs
// Conversation message types exchanged with the LLM invoker.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageDetail {
    Auto,
    Low,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Part {
    Text { text: String },
    Image {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<ImageDetail>,
    },
}

/// Message content is either a plain string or an ordered sequence of
/// content parts, mirroring the provider wire format without collapsing
/// multi-part (text + image) turns into a single string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Parts(Vec<Part>),
}

impl Content {
    /// Total character count across text content, used by the token estimator.
    pub fn char_len(&self) -> usize {
        match self {
            Content::Text(s) => s.chars().count(),
            Content::Parts(parts) => parts
                .iter()
                .map(|p| match p {
                    Part::Text { text } => text.chars().count(),
                    Part::Image { .. } => 0,
                })
                .sum(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(s) => Some(s),
            Content::Parts(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Content,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Content::Text(text.into()),
        }
    }

    pub fn user_with_images(text: impl Into<String>, image_urls: &[String]) -> Self {
        let mut parts = vec![Part::Text { text: text.into() }];
        parts.extend(image_urls.iter().map(|url| Part::Image {
            url: url.clone(),
            detail: Some(ImageDetail::Auto),
        }));
        Self {
            role: Role::User,
            content: Content::Parts(parts),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Content::Text(text.into()),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Content::Text(text.into()),
        }
    }

    pub fn char_len(&self) -> usize {
        self.content.char_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_with_images_keeps_text_and_image_parts() {
        let msg = ChatMessage::user_with_images(
            "describe this",
            &["https://example.com/a.png".to_string()],
        );
        match &msg.content {
            Content::Parts(parts) => {
                assert_eq!(parts.len(), 2);
                assert!(matches!(&parts[0], Part::Text { text } if text == "describe this"));
            }
            Content::Text(_) => panic!("expected parts"),
        }
    }

    #[test]
    fn char_len_ignores_image_parts() {
        let msg = ChatMessage::user_with_images("hi", &["https://x/y.png".to_string()]);
        assert_eq!(msg.char_len(), 2);
    }

    #[test]
    fn plain_text_round_trips_through_untagged_content() {
        let msg = ChatMessage::user("hello");
        let json = serde_json::to_string(&msg).unwrap();
        let back: ChatMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, back);
    }
}
