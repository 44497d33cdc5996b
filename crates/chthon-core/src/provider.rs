//! Upstream LLM provider identifiers (`vendor/model`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ProviderParseError;

/// A provider id as understood by the AI gateway, e.g. `openai/gpt-4o-mini`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProviderId {
    raw: String,
    split: usize,
}

impl ProviderId {
    /// The vendor half, e.g. `openai`.
    pub fn vendor(&self) -> &str {
        &self.raw[..self.split]
    }

    /// The model half, e.g. `gpt-4o-mini`.
    pub fn model(&self) -> &str {
        &self.raw[self.split + 1..]
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for ProviderId {
    type Err = ProviderParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let split = raw
            .find('/')
            .ok_or_else(|| ProviderParseError::MissingSeparator(raw.to_owned()))?;
        if split == 0 || split + 1 == raw.len() {
            return Err(ProviderParseError::EmptyComponent(raw.to_owned()));
        }
        Ok(Self { raw: raw.to_owned(), split })
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for ProviderId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for ProviderId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn splits_vendor_and_model() {
        let p: ProviderId = "xai/grok-2-latest".parse().unwrap();
        assert_eq!(p.vendor(), "xai");
        assert_eq!(p.model(), "grok-2-latest");
        assert_eq!(p.to_string(), "xai/grok-2-latest");
    }

    #[test]
    fn model_may_contain_slashes() {
        let p: ProviderId = "meta/llama/3".parse().unwrap();
        assert_eq!(p.vendor(), "meta");
        assert_eq!(p.model(), "llama/3");
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(matches!(
            "openai".parse::<ProviderId>(),
            Err(ProviderParseError::MissingSeparator(_))
        ));
        assert!(matches!(
            "/gpt".parse::<ProviderId>(),
            Err(ProviderParseError::EmptyComponent(_))
        ));
        assert!(matches!(
            "openai/".parse::<ProviderId>(),
            Err(ProviderParseError::EmptyComponent(_))
        ));
    }

    #[test]
    fn deserializes_from_string() {
        let p: ProviderId = serde_json::from_str(r#""google/gemini-1.5-flash""#).unwrap();
        assert_eq!(p.vendor(), "google");
        assert!(serde_json::from_str::<ProviderId>(r#""nope""#).is_err());
    }
}
