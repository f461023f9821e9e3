use serde::{Deserialize, Serialize};

use crate::auth::Identity;

pub const MAX_COMMENT_CHARS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Genre {
    Programming,
    Dhbw,
    Other,
}

impl std::str::FromStr for Genre {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PROGRAMMING" => Ok(Genre::Programming),
            "DHBW" => Ok(Genre::Dhbw),
            "OTHER" => Ok(Genre::Other),
            other => Err(format!("invalid genre {}", other)),
        }
    }
}

/// The fields of a content item the gateway looks at; everything else the
/// content service returns is ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: i64,
    pub author_name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub author_id: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Option::<Id>::deserialize(deserializer)? {
        Some(Id::Text(id)) => Some(id),
        Some(Id::Number(id)) => Some(id.to_string()),
        None => None,
    })
}

impl ContentItem {
    /// Authorship prefers the author id and falls back to the display name
    /// for items that predate it.
    pub fn is_authored_by(&self, caller: &Identity) -> bool {
        match &self.author_id {
            Some(author_id) => author_id == &caller.id,
            None => self.author_name == caller.username,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub comment: String,
    pub mehm_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentUpdate {
    pub comment_id: i64,
    pub comment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<Genre>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteUserInput {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggedIn {
    pub id: String,
    pub username: String,
    pub email: String,
    pub admin: bool,
    pub token: String,
}

impl LoggedIn {
    pub fn new(identity: &Identity, token: String) -> Self {
        Self {
            id: identity.id.clone(),
            username: identity.username.clone(),
            email: identity.email.clone(),
            admin: identity.admin,
            token,
        }
    }
}

/// Comment text must hold between 1 and [`MAX_COMMENT_CHARS`] characters.
pub fn comment_length_ok(comment: &str) -> bool {
    let len = comment.chars().count();
    (1..=MAX_COMMENT_CHARS).contains(&len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genre_parses_only_known_values() {
        assert_eq!("DHBW".parse::<Genre>().unwrap(), Genre::Dhbw);
        assert_eq!("PROGRAMMING".parse::<Genre>().unwrap(), Genre::Programming);
        assert!("dhbw".parse::<Genre>().is_err());
        assert!("MEMES".parse::<Genre>().is_err());

        let update: ContentUpdate = serde_json::from_str(r#"{"genre":"OTHER"}"#).unwrap();
        assert_eq!(update.genre, Some(Genre::Other));
        assert!(serde_json::from_str::<ContentUpdate>(r#"{"genre":"CATS"}"#).is_err());
    }

    #[test]
    fn content_item_ignores_unknown_fields() {
        let item: ContentItem = serde_json::from_str(
            r#"{"id":42,"authorName":"ada","title":"t","likes":3,"genre":0}"#,
        )
        .unwrap();
        assert_eq!(item.id, 42);
        assert_eq!(item.author_id, None);

        let item: ContentItem =
            serde_json::from_str(r#"{"id":1,"authorName":"ada","authorId":7}"#).unwrap();
        assert_eq!(item.author_id.as_deref(), Some("7"));
    }

    #[test]
    fn authorship_prefers_author_id() {
        let ada = Identity::new("1", "ada", "ada@example.com");

        let by_name = ContentItem {
            id: 1,
            author_name: "ada".to_string(),
            author_id: None,
        };
        assert!(by_name.is_authored_by(&ada));

        let renamed = ContentItem {
            id: 2,
            author_name: "someone-else".to_string(),
            author_id: Some("1".to_string()),
        };
        assert!(renamed.is_authored_by(&ada));

        let impostor = ContentItem {
            id: 3,
            author_name: "ada".to_string(),
            author_id: Some("2".to_string()),
        };
        assert!(!impostor.is_authored_by(&ada));
    }

    #[test]
    fn comment_length_counts_characters() {
        assert!(!comment_length_ok(""));
        assert!(comment_length_ok("x"));
        assert!(comment_length_ok(&"ü".repeat(256)));
        assert!(!comment_length_ok(&"x".repeat(257)));
    }

    #[test]
    fn new_comment_uses_camel_case() {
        let comment: NewComment =
            serde_json::from_str(r#"{"comment":"hi","mehmId":7}"#).unwrap();
        assert_eq!(comment.mehm_id, 7);
        assert_eq!(
            serde_json::to_value(&comment).unwrap(),
            serde_json::json!({"comment": "hi", "mehmId": 7})
        );
    }
}
