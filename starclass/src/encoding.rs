//! Label encoding of categorical features.
//!
//! An [`EncodingTable`] is the fit-time vocabulary of one categorical column:
//! category `classes[i]` encodes to `i`. Unlike a fit-time encoder, lookups of
//! unseen categories do not fail incidentally; the caller chooses an
//! [`OovPolicy`] up front.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Errors building an encoding table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingTableError {
    #[error("encoding table has no categories")]
    Empty,
    #[error("category {0:?} appears more than once")]
    Duplicate(String),
}

/// What to do with a category absent from the vocabulary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OovPolicy {
    /// Substitute the table's first category (code 0) and report the substitution.
    ///
    /// Keeps a batch flowing at the cost of a prediction made on a guessed
    /// category; every substitution is surfaced to the caller.
    #[default]
    Fallback,
    /// Fail the record with an unknown-category error.
    Reject,
}

impl fmt::Display for OovPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OovPolicy::Fallback => write!(f, "fallback"),
            OovPolicy::Reject => write!(f, "reject"),
        }
    }
}

impl FromStr for OovPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fallback" => Ok(OovPolicy::Fallback),
            "reject" => Ok(OovPolicy::Reject),
            other => Err(format!(
                "Unknown OOV policy '{other}', expected 'fallback' or 'reject'"
            )),
        }
    }
}

/// Outcome of encoding one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Encoded {
    /// Category found in the vocabulary
    Known(usize),
    /// Category unknown; the default category's code was substituted
    Fallback { code: usize, substituted: String },
}

/// On-disk layout of an encoding table.
#[derive(Serialize, Deserialize)]
struct EncodingTableFile {
    classes: Vec<String>,
}

/// Immutable bijection between category strings and codes `0..len`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EncodingTableFile", into = "EncodingTableFile")]
pub struct EncodingTable {
    classes: Vec<String>,
    codes: HashMap<String, usize>,
}

impl EncodingTable {
    /// Build a table whose codes follow the order of `classes`.
    pub fn new<I, S>(classes: I) -> Result<Self, EncodingTableError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let classes: Vec<String> = classes.into_iter().map(Into::into).collect();
        if classes.is_empty() {
            return Err(EncodingTableError::Empty);
        }

        let mut codes = HashMap::with_capacity(classes.len());
        for (code, class) in classes.iter().enumerate() {
            if codes.insert(class.clone(), code).is_some() {
                return Err(EncodingTableError::Duplicate(class.clone()));
            }
        }

        Ok(Self { classes, codes })
    }

    /// Categories in code order.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Code of a category, if known. Matching is exact.
    pub fn code_of(&self, category: &str) -> Option<usize> {
        self.codes.get(category).copied()
    }

    /// Category substituted for unknown values under [`OovPolicy::Fallback`].
    pub fn default_category(&self) -> &str {
        &self.classes[0]
    }

    /// Encode a category, applying `policy` when it is not in the vocabulary.
    ///
    /// Returns None only for an unknown category under [`OovPolicy::Reject`].
    pub fn encode(&self, category: &str, policy: OovPolicy) -> Option<Encoded> {
        match (self.code_of(category), policy) {
            (Some(code), _) => Some(Encoded::Known(code)),
            (None, OovPolicy::Fallback) => Some(Encoded::Fallback {
                code: 0,
                substituted: self.default_category().to_string(),
            }),
            (None, OovPolicy::Reject) => None,
        }
    }

    /// Categories that differ from their own normalized form and therefore
    /// can never be matched by normalized input.
    pub fn unreachable_classes<'a>(
        &'a self,
        normalize: impl Fn(&str) -> String + 'a,
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.classes
            .iter()
            .filter(move |c| normalize(c.as_str()) != **c)
            .map(String::as_str)
    }
}

impl TryFrom<EncodingTableFile> for EncodingTable {
    type Error = EncodingTableError;

    fn try_from(file: EncodingTableFile) -> Result<Self, Self::Error> {
        Self::new(file.classes)
    }
}

impl From<EncodingTable> for EncodingTableFile {
    fn from(table: EncodingTable) -> Self {
        Self {
            classes: table.classes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::normalize_color;

    fn spectral_table() -> EncodingTable {
        EncodingTable::new(["A", "B", "F", "G", "K", "M", "O"]).unwrap()
    }

    #[test]
    fn test_codes_follow_class_order() {
        let table = spectral_table();
        assert_eq!(table.len(), 7);
        assert_eq!(table.code_of("A"), Some(0));
        assert_eq!(table.code_of("G"), Some(3));
        assert_eq!(table.code_of("O"), Some(6));
        assert_eq!(table.classes()[5], "M");
        assert_eq!(table.code_of("Z"), None);
    }

    #[test]
    fn test_lookup_is_exact() {
        let table = spectral_table();
        assert_eq!(table.code_of("g"), None);
        assert_eq!(table.code_of(" G"), None);
    }

    #[test]
    fn test_empty_and_duplicate_rejected() {
        assert_eq!(
            EncodingTable::new(Vec::<String>::new()),
            Err(EncodingTableError::Empty)
        );
        assert_eq!(
            EncodingTable::new(["Red", "Blue", "Red"]),
            Err(EncodingTableError::Duplicate("Red".to_string()))
        );
    }

    #[test]
    fn test_encode_policies() {
        let table = spectral_table();

        assert_eq!(table.encode("K", OovPolicy::Reject), Some(Encoded::Known(4)));
        assert_eq!(table.encode("Z", OovPolicy::Reject), None);
        assert_eq!(
            table.encode("Z", OovPolicy::Fallback),
            Some(Encoded::Fallback {
                code: 0,
                substituted: "A".to_string()
            })
        );
    }

    #[test]
    fn test_json_layout() {
        let table: EncodingTable =
            serde_json::from_str(r#"{"classes": ["Blue", "Red", "White"]}"#).unwrap();
        assert_eq!(table.code_of("White"), Some(2));

        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"{"classes":["Blue","Red","White"]}"#);

        let dup: Result<EncodingTable, _> = serde_json::from_str(r#"{"classes": ["Red", "Red"]}"#);
        assert!(dup.is_err());
    }

    #[test]
    fn test_unreachable_classes() {
        let table = EncodingTable::new(["Blue", "blue-white", "Red", "Yellow White"]).unwrap();
        let unreachable: Vec<&str> = table.unreachable_classes(normalize_color).collect();
        assert_eq!(unreachable, vec!["blue-white", "Yellow White"]);
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("Fallback".parse::<OovPolicy>(), Ok(OovPolicy::Fallback));
        assert_eq!("reject".parse::<OovPolicy>(), Ok(OovPolicy::Reject));
        assert!("ignore".parse::<OovPolicy>().is_err());
        assert_eq!(OovPolicy::default(), OovPolicy::Fallback);
    }
}
