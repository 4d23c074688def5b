use std::{fmt, str::FromStr};

use non_empty_string::NonEmptyString;

/// A validated distribution name.
///
/// Names may contain ASCII letters, digits, and the separators `-`, `_` and
/// `.`, and must start and end with a letter or digit.
///
/// Two names refer to the same distribution when their normalised forms are
/// equal: lowercase, with every run of separators collapsed to a single `-`.
/// Equality and ordering on this type use the normalised form.
#[derive(Debug, Clone)]
pub struct PackageName {
    raw: NonEmptyString,
    normalised: String,
}

impl PackageName {
    /// Creates a new `PackageName` from a string.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidNameError`] if the string is empty, contains
    /// characters outside `[A-Za-z0-9._-]`, or starts or ends with a
    /// separator.
    pub fn new(s: String) -> Result<Self, InvalidNameError> {
        let raw = NonEmptyString::new(s.clone()).map_err(|_| InvalidNameError(s.clone()))?;

        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(InvalidNameError(s));
        }

        let first = s.chars().next().expect("checked non-empty");
        let last = s.chars().next_back().expect("checked non-empty");
        if !first.is_ascii_alphanumeric() || !last.is_ascii_alphanumeric() {
            return Err(InvalidNameError(s));
        }

        let normalised = normalise(&s);
        Ok(Self { raw, normalised })
    }

    /// Returns the name as originally written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.raw.as_str()
    }

    /// Returns the normalised form of the name.
    #[must_use]
    pub fn normalised(&self) -> &str {
        &self.normalised
    }
}

/// Collapses runs of `-`, `_` and `.` to a single `-` and lowercases.
fn normalise(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_separator = false;
    for c in s.chars() {
        if matches!(c, '-' | '_' | '.') {
            in_separator = true;
        } else {
            if in_separator {
                out.push('-');
                in_separator = false;
            }
            out.push(c.to_ascii_lowercase());
        }
    }
    out
}

impl PartialEq for PackageName {
    fn eq(&self, other: &Self) -> bool {
        self.normalised == other.normalised
    }
}

impl Eq for PackageName {}

impl PartialOrd for PackageName {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackageName {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.normalised.cmp(&other.normalised)
    }
}

impl std::hash::Hash for PackageName {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.normalised.hash(state);
    }
}

impl FromStr for PackageName {
    type Err = InvalidNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<&str> for PackageName {
    type Error = InvalidNameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value.to_string())
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        self.raw.as_str()
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Error returned when a string is not a valid distribution name.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error(
    "Invalid package name '{0}': must contain only letters, digits, '-', '_' or '.', and start \
     and end with a letter or digit"
)]
pub struct InvalidNameError(String);

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("requests"; "plain")]
    #[test_case("ray"; "short")]
    #[test_case("scikit-learn"; "dashed")]
    #[test_case("typing_extensions"; "underscored")]
    #[test_case("zope.interface"; "dotted")]
    #[test_case("A"; "single letter")]
    #[test_case("3to2"; "leading digit")]
    fn valid_names(name: &str) {
        assert!(PackageName::from_str(name).is_ok());
    }

    #[test_case(""; "empty")]
    #[test_case("-requests"; "leading dash")]
    #[test_case("requests-"; "trailing dash")]
    #[test_case(".hidden"; "leading dot")]
    #[test_case("my package"; "space")]
    #[test_case("naïve"; "non ascii")]
    fn invalid_names(name: &str) {
        assert!(PackageName::from_str(name).is_err());
    }

    #[test_case("Requests", "requests"; "case folded")]
    #[test_case("typing_extensions", "typing-extensions"; "underscore to dash")]
    #[test_case("zope.interface", "zope-interface"; "dot to dash")]
    #[test_case("a--_.b", "a-b"; "separator run collapsed")]
    fn normalisation(raw: &str, expected: &str) {
        let name = PackageName::from_str(raw).unwrap();
        assert_eq!(name.normalised(), expected);
    }

    #[test]
    fn equality_uses_normalised_form() {
        let a = PackageName::from_str("Scikit_Learn").unwrap();
        let b = PackageName::from_str("scikit-learn").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn display_preserves_original_spelling() {
        let name = PackageName::from_str("Typing_Extensions").unwrap();
        assert_eq!(name.to_string(), "Typing_Extensions");
    }
}
