use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};

/// Ids arrive from web clients as either `5` or `"5"`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

fn deserialize_id<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    match RawId::deserialize(d)? {
        RawId::Number(n) => Ok(n),
        RawId::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid id '{}'", s))),
    }
}

macro_rules! surrogate_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                deserialize_id(d).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

surrogate_id!(
    /// Store-assigned user id. Monotonic, never reused.
    UserId
);
surrogate_id!(ChannelId);
surrogate_id!(MessageId);
surrogate_id!(ReplyId);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    #[serde(rename = "channel_id")]
    pub id: ChannelId,
    #[serde(rename = "channel_name")]
    pub name: String,
}

/// A reply joined with its author's display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyView {
    pub reply_id: ReplyId,
    #[serde(rename = "user_name")]
    pub author: String,
    #[serde(rename = "reply_body")]
    pub body: String,
    pub sent_time: DateTime<Utc>,
}

/// A message joined with its author's display name, plus the image links found
/// in its body. `replies` is filled in by the timeline read path only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageView {
    #[serde(rename = "msg_id")]
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub author_id: UserId,
    pub author: String,
    pub body: String,
    #[serde(rename = "time")]
    pub sent_time: DateTime<Utc>,
    pub images: Vec<String>,
    pub replies: Vec<ReplyView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_accept_numbers_and_numeric_strings() {
        assert_eq!(serde_json::from_str::<ChannelId>("5").unwrap(), ChannelId(5));
        assert_eq!(serde_json::from_str::<ChannelId>("\"5\"").unwrap(), ChannelId(5));
        assert_eq!(serde_json::from_str::<UserId>("\" 12 \"").unwrap(), UserId(12));
    }

    #[test]
    fn ids_reject_non_numeric_input() {
        assert!(serde_json::from_str::<MessageId>("\"abc\"").is_err());
        assert!(serde_json::from_str::<MessageId>("1.5").is_err());
        assert!(serde_json::from_str::<MessageId>("null").is_err());
    }

    #[test]
    fn ids_serialize_as_numbers() {
        assert_eq!(serde_json::to_string(&ReplyId(7)).unwrap(), "7");
    }
}
