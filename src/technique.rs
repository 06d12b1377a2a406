use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A MITRE-style technique identifier: `T` followed by decimal digits.
///
/// Sub-technique suffixes (`T1027.002`) are collapsed onto the parent
/// technique; only the leading `T<digits>` is modeled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(into = "String", try_from = "String")]
pub struct TechniqueId(u64);

impl TechniqueId {
    pub fn new(number: u64) -> Self {
        Self(number)
    }

    pub fn number(&self) -> u64 {
        self.0
    }

    /// Finds the first `T<digits>` pattern anywhere in `text`.
    pub fn find_in(text: &str) -> Option<Self> {
        for (pos, _) in text.match_indices('T') {
            let rest = &text[pos + 1..];
            let end = rest
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(rest.len());
            let digits = &rest[..end];
            if digits.is_empty() {
                continue;
            }
            // parse can only fail on an absurd digit run; treat it as no match
            if let Ok(number) = digits.parse::<u64>() {
                return Some(Self(number));
            }
        }
        None
    }
}

impl Display for TechniqueId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "T{}", self.0)
    }
}

#[derive(Debug, Error)]
#[error("invalid technique id: {0}")]
pub struct TechniqueParseError(pub String);

impl FromStr for TechniqueId {
    type Err = TechniqueParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix('T')
            .ok_or_else(|| TechniqueParseError(s.to_string()))?;
        let digits = digits.split('.').next().unwrap_or(digits);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TechniqueParseError(s.to_string()));
        }
        digits
            .parse::<u64>()
            .map(Self)
            .map_err(|_| TechniqueParseError(s.to_string()))
    }
}

impl From<TechniqueId> for String {
    fn from(id: TechniqueId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for TechniqueId {
    type Error = TechniqueParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::TechniqueId;

    #[test]
    fn parses_plain_and_subtechnique_forms() {
        let id: TechniqueId = "T1027".parse().expect("failed to parse T1027");
        assert_eq!(id.to_string(), "T1027");
        let sub: TechniqueId = "T1027.002".parse().expect("failed to parse subtechnique");
        assert_eq!(sub, id);
    }

    #[test]
    fn rejects_missing_prefix_and_digits() {
        assert!("1027".parse::<TechniqueId>().is_err());
        assert!("T".parse::<TechniqueId>().is_err());
        assert!("Txyz".parse::<TechniqueId>().is_err());
    }

    #[test]
    fn finds_pattern_inside_file_names() {
        let found = TechniqueId::find_in("T1000_macos.csv").expect("no id found");
        assert_eq!(found.to_string(), "T1000");
        assert!(TechniqueId::find_in("readme.md").is_none());
    }

    #[test]
    fn orders_numerically_not_lexically() {
        let a: TechniqueId = "T999".parse().unwrap();
        let b: TechniqueId = "T1000".parse().unwrap();
        assert!(a < b);
    }
}
