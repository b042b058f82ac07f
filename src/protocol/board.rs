//! Shared game-board types carried inside `state` and `action` envelopes.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// The full shared board, relayed as the payload of a `state` envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    #[serde(default)]
    pub items: Vec<GameItem>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub game_options: Value,
}

/// A movie or person placed on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameItem {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(alias = "tmdbId", deserialize_with = "string_or_number")]
    pub external_id: String,
    pub media_type: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    /// Presentation fields (title, poster, ...) passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One end of a connection: enough of an item to identify it by content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(alias = "tmdbId", deserialize_with = "string_or_number")]
    pub external_id: String,
    pub media_type: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An edge between two board items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub from: ItemRef,
    pub to: ItemRef,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Content-derived identity of an item: normalized (external id, media type).
///
/// Two clients that add the same movie independently produce different transport ids
/// but the same key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemKey {
    pub external_id: String,
    pub media_type: String,
}

impl ItemKey {
    #[must_use]
    pub fn new(external_id: &str, media_type: &str) -> Self {
        Self {
            external_id: external_id.trim().to_string(),
            media_type: media_type.trim().to_ascii_lowercase(),
        }
    }
}

impl GameItem {
    #[must_use]
    pub fn key(&self) -> ItemKey {
        ItemKey::new(&self.external_id, &self.media_type)
    }
}

impl ItemRef {
    #[must_use]
    pub fn key(&self) -> ItemKey {
        ItemKey::new(&self.external_id, &self.media_type)
    }
}

impl Connection {
    /// Order-independent identity of the edge: the two endpoint keys, sorted.
    #[must_use]
    pub fn pair_key(&self) -> (ItemKey, ItemKey) {
        let (a, b) = (self.from.key(), self.to.key());
        if a <= b { (a, b) } else { (b, a) }
    }
}

/// Accept ids sent either as JSON strings or numbers.
pub(super) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrNumber;

    impl Visitor<'_> for StringOrNumber {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string or a number")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
            Ok(v.to_string())
        }
    }

    deserializer.deserialize_any(StringOrNumber)
}
