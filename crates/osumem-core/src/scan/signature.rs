use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// A byte pattern with wildcards, written as hex tokens separated by spaces.
///
/// `"F8 01 74 04 83 65"` matches those bytes exactly; `??` (or `?`) matches
/// any byte. At least one byte must be concrete.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Signature {
    bytes: Vec<Option<u8>>,
}

impl Signature {
    pub fn new(bytes: Vec<Option<u8>>) -> Result<Self, ScanError> {
        if bytes.is_empty() {
            return Err(ScanError::InvalidPattern(
                "Signature pattern is empty".to_string(),
            ));
        }
        if bytes.iter().all(Option::is_none) {
            return Err(ScanError::InvalidPattern(
                "Signature pattern has no concrete bytes".to_string(),
            ));
        }
        Ok(Self { bytes })
    }

    /// Pattern without wildcards. `bytes` must not be empty.
    pub(crate) fn exact(bytes: &[u8]) -> Self {
        debug_assert!(!bytes.is_empty());
        Self {
            bytes: bytes.iter().copied().map(Some).collect(),
        }
    }

    /// Pattern with wildcards. At least one byte must be concrete.
    pub(crate) fn masked(bytes: &[Option<u8>]) -> Self {
        debug_assert!(bytes.iter().any(Option::is_some));
        Self {
            bytes: bytes.to_vec(),
        }
    }

    pub fn bytes(&self) -> &[Option<u8>] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether `window` (at least as long as the pattern) starts with a match.
    pub fn matches(&self, window: &[u8]) -> bool {
        window.len() >= self.bytes.len()
            && self
                .bytes
                .iter()
                .zip(window)
                .all(|(expected, actual)| expected.is_none_or(|b| b == *actual))
    }

    /// Index and value of the first non-wildcard byte.
    pub fn first_concrete(&self) -> (usize, u8) {
        self.bytes
            .iter()
            .enumerate()
            .find_map(|(i, b)| b.map(|value| (i, value)))
            .unwrap_or((0, 0))
    }
}

impl FromStr for Signature {
    type Err = ScanError;

    fn from_str(pattern: &str) -> Result<Self, Self::Err> {
        Signature::new(parse_pattern(pattern)?)
    }
}

impl TryFrom<String> for Signature {
    type Error = ScanError;

    fn try_from(pattern: String) -> Result<Self, Self::Error> {
        pattern.parse()
    }
}

impl From<Signature> for String {
    fn from(signature: Signature) -> Self {
        signature.to_string()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_pattern(&self.bytes))
    }
}

pub fn parse_pattern(pattern: &str) -> Result<Vec<Option<u8>>, ScanError> {
    let mut bytes = Vec::new();
    for token in pattern.split_whitespace() {
        if token == "??" || token == "?" {
            bytes.push(None);
            continue;
        }

        if token.len() > 2 {
            return Err(ScanError::InvalidPattern(format!(
                "Invalid signature token '{}'",
                token
            )));
        }
        let value = u8::from_str_radix(token, 16).map_err(|e| {
            ScanError::InvalidPattern(format!("Invalid signature token '{}': {}", token, e))
        })?;
        bytes.push(Some(value));
    }

    if bytes.is_empty() {
        return Err(ScanError::InvalidPattern(
            "Signature pattern is empty".to_string(),
        ));
    }

    Ok(bytes)
}

pub fn format_pattern(bytes: &[Option<u8>]) -> String {
    bytes
        .iter()
        .map(|b| match b {
            Some(value) => format!("{:02X}", value),
            None => "??".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
