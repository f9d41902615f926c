//! Human-readable order identifiers of the form `A<n>`.

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An order identifier: `A` followed by a positive decimal sequence number.
///
/// Serializes as the formatted string (`"A42"`), which is also the key of
/// the order document in the `orders` collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderId(u64);

impl OrderId {
    pub fn new(sequence: u64) -> Self {
        Self(sequence)
    }

    /// The numeric suffix.
    pub fn sequence(self) -> u64 {
        self.0
    }

    /// Parses an identifier, returning `None` for anything that does not
    /// match the `A<n>` pattern.
    ///
    /// Legacy or manually entered identifiers may not follow the pattern;
    /// they must be skipped, never treated as a parse failure that aborts a
    /// collection scan. The suffix must be a whole base-10 integer: `A12x`
    /// is non-matching, and so is `A0` since sequence numbers start at 1.
    pub fn parse(s: &str) -> Option<Self> {
        let suffix = s.strip_prefix('A')?;
        // u64::from_str tolerates a leading '+'; the identifier format does not.
        if !suffix.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let n = suffix.parse::<u64>().ok()?;
        if n == 0 {
            return None;
        }
        Some(Self(n))
    }

    /// The maximum numeric suffix over a set of candidate identifiers, or 0
    /// when none match.
    ///
    /// Shared by the lazy-init migration fallback and administrative resync
    /// so both compute the counter the same way.
    pub fn max_suffix<I, S>(candidates: I) -> u64
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        candidates
            .into_iter()
            .filter_map(|s| Self::parse(s.as_ref()))
            .map(|id| id.0)
            .max()
            .unwrap_or(0)
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A{}", self.0)
    }
}

impl Serialize for OrderId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for OrderId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s)
            .ok_or_else(|| D::Error::custom(format!("invalid order identifier: {s:?}")))
    }
}
