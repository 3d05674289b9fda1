use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Kind of media a search result or details record describes.
///
/// Serialised as its ordinal (`0` movie, `1` TV show), which is what the
/// browser UI switches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    Movie,
    TvShow,
}

impl MediaType {
    pub fn ordinal(self) -> u8 {
        match self {
            Self::Movie => 0,
            Self::TvShow => 1,
        }
    }
}

impl Serialize for MediaType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.ordinal())
    }
}

impl<'de> Deserialize<'de> for MediaType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match u8::deserialize(deserializer)? {
            0 => Ok(Self::Movie),
            1 => Ok(Self::TvShow),
            other => Err(serde::de::Error::custom(format!(
                "unknown media type ordinal {other}"
            ))),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MediaIdError {
    #[error("id must be in the form provider:id, got '{0}'")]
    Malformed(String),
    #[error("id '{0}' is not a number")]
    NotNumeric(String),
}

/// Join key between search results and details lookups: `"<provider>:<nativeId>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaId {
    pub provider: String,
    pub native_id: u64,
}

impl MediaId {
    pub fn new(provider: impl Into<String>, native_id: u64) -> Self {
        Self {
            provider: provider.into(),
            native_id,
        }
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.native_id)
    }
}

impl FromStr for MediaId {
    type Err = MediaIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let (Some(provider), Some(native), None) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(MediaIdError::Malformed(s.to_string()));
        };
        if provider.is_empty() {
            return Err(MediaIdError::Malformed(s.to_string()));
        }
        // Digits only; `u64::from_str` would also take a leading `+`.
        if native.is_empty() || !native.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MediaIdError::NotNumeric(native.to_string()));
        }
        let native_id = native
            .parse()
            .map_err(|_| MediaIdError::NotNumeric(native.to_string()))?;

        Ok(Self::new(provider, native_id))
    }
}
