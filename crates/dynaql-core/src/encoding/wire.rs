use std::collections::BTreeMap;
use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// A map of attribute name to wire value: an item or key as the store sees it.
pub type WireMap = BTreeMap<String, WireValue>;

/// The tagged on-the-wire representation of a value.
///
/// Serializes in the store's externally tagged JSON form, e.g.
/// `{"N": "18"}` or `{"L": [{"S": "a"}, {"BOOL": true}]}`. Binary payloads
/// travel as standard base64 text: `{"B": "3q0="}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WireValue {
    #[serde(rename = "NULL")]
    Null(bool),
    #[serde(rename = "BOOL")]
    Bool(bool),
    N(String),
    S(String),
    #[serde(with = "base64_bytes")]
    B(Vec<u8>),
    #[serde(rename = "NS")]
    Ns(Vec<String>),
    #[serde(rename = "SS")]
    Ss(Vec<String>),
    #[serde(rename = "BS", with = "base64_byte_list")]
    Bs(Vec<Vec<u8>>),
    L(Vec<WireValue>),
    M(WireMap),
}

/// Tag of a scalar value, as assigned by [`classify`](super::classify).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveTag {
    Null,
    Bool,
    N,
    S,
}

/// Every tag a [`WireValue`] can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireTag {
    Null,
    Bool,
    N,
    S,
    B,
    Ns,
    Ss,
    Bs,
    L,
    M,
}

impl WireTag {
    pub const ALL: [WireTag; 10] = [
        WireTag::Null,
        WireTag::Bool,
        WireTag::N,
        WireTag::S,
        WireTag::B,
        WireTag::Ns,
        WireTag::Ss,
        WireTag::Bs,
        WireTag::L,
        WireTag::M,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WireTag::Null => "NULL",
            WireTag::Bool => "BOOL",
            WireTag::N => "N",
            WireTag::S => "S",
            WireTag::B => "B",
            WireTag::Ns => "NS",
            WireTag::Ss => "SS",
            WireTag::Bs => "BS",
            WireTag::L => "L",
            WireTag::M => "M",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        WireTag::ALL.into_iter().find(|tag| tag.as_str() == name)
    }
}

impl fmt::Display for WireTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl WireValue {
    pub fn tag(&self) -> WireTag {
        match self {
            WireValue::Null(_) => WireTag::Null,
            WireValue::Bool(_) => WireTag::Bool,
            WireValue::N(_) => WireTag::N,
            WireValue::S(_) => WireTag::S,
            WireValue::B(_) => WireTag::B,
            WireValue::Ns(_) => WireTag::Ns,
            WireValue::Ss(_) => WireTag::Ss,
            WireValue::Bs(_) => WireTag::Bs,
            WireValue::L(_) => WireTag::L,
            WireValue::M(_) => WireTag::M,
        }
    }

    pub fn n(text: impl Into<String>) -> Self {
        WireValue::N(text.into())
    }

    pub fn s(text: impl Into<String>) -> Self {
        WireValue::S(text.into())
    }
}

/// Decode standard (padded) base64 text.
pub(crate) fn decode_base64(text: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(text)
}

mod base64_bytes {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        decode_base64(&text).map_err(de::Error::custom)
    }
}

mod base64_byte_list {
    use super::*;

    pub fn serialize<S: Serializer>(items: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(items.iter().map(|bytes| STANDARD.encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Vec<u8>>, D::Error> {
        Vec::<String>::deserialize(deserializer)?
            .iter()
            .map(|text| decode_base64(text).map_err(de::Error::custom))
            .collect()
    }
}
