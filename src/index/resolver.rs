use thiserror::Error;

use crate::technique::TechniqueId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("malformed range in file name {name:?}: {detail}")]
    MalformedRange { name: String, detail: String },
    #[error("inverted range in file name {name:?}: T{lower} > T{upper}")]
    InvertedRange { name: String, lower: u64, upper: u64 },
    #[error("no technique id found in file name {name:?}")]
    NoTechniqueIdFound { name: String },
}

/// The techniques covered by one remote file: a single id
/// (`T1000_macos.csv`) or an inclusive run of ids (`T1027-T1047.csv`).
///
/// Iteration is lazy and the value is `Clone`, so a range can be walked
/// more than once without re-parsing the file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TechniqueRange {
    next: u64,
    upper: u64,
}

impl TechniqueRange {
    fn new(lower: u64, upper: u64) -> Self {
        Self { next: lower, upper }
    }

    pub fn len(&self) -> usize {
        if self.next > self.upper {
            0
        } else {
            (self.upper - self.next + 1) as usize
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Iterator for TechniqueRange {
    type Item = TechniqueId;

    fn next(&mut self) -> Option<TechniqueId> {
        if self.next > self.upper {
            return None;
        }
        let id = TechniqueId::new(self.next);
        self.next += 1;
        Some(id)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TechniqueRange {}

/// Resolves a remote file name into the techniques it covers.
///
/// A `-` in the name marks a range: the token before it carries the lower
/// bound and the first `T<digits>` in the token after it carries the upper
/// bound, with any extension or platform qualifier discarded. Without a
/// `-`, the first `T<digits>` anywhere in the name is the sole technique.
pub fn resolve_file_name(name: &str) -> Result<TechniqueRange, RangeError> {
    if let Some((lower_token, upper_token)) = name.split_once('-') {
        let lower = parse_bound(lower_token).ok_or_else(|| RangeError::MalformedRange {
            name: name.to_string(),
            detail: format!("lower token {lower_token:?} is not an integer technique"),
        })?;
        let upper = TechniqueId::find_in(upper_token)
            .map(|id| id.number())
            .ok_or_else(|| RangeError::MalformedRange {
                name: name.to_string(),
                detail: format!("upper token {upper_token:?} has no T<digits> pattern"),
            })?;
        if lower > upper {
            return Err(RangeError::InvertedRange {
                name: name.to_string(),
                lower,
                upper,
            });
        }
        return Ok(TechniqueRange::new(lower, upper));
    }

    let single = TechniqueId::find_in(name).ok_or_else(|| RangeError::NoTechniqueIdFound {
        name: name.to_string(),
    })?;
    Ok(TechniqueRange::new(single.number(), single.number()))
}

fn parse_bound(token: &str) -> Option<u64> {
    let digits = token.trim().trim_start_matches('T');
    if digits.is_empty() {
        return None;
    }
    digits.parse::<u64>().ok()
}
