use std::{fmt, str::FromStr};

use super::version::{InvalidVersionError, Version};

/// A version comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `<=`
    LessEqual,
    /// `>=`
    GreaterEqual,
    /// `<`
    Less,
    /// `>`
    Greater,
    /// `~=` (compatible release)
    Compatible,
    /// `===` (arbitrary string equality)
    Arbitrary,
}

impl Comparator {
    /// Returns the operator as written in a requirement line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::LessEqual => "<=",
            Self::GreaterEqual => ">=",
            Self::Less => "<",
            Self::Greater => ">",
            Self::Compatible => "~=",
            Self::Arbitrary => "===",
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single comparator-and-version clause, e.g. `>=1.2` or `==1.0.*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSpecifier {
    comparator: Comparator,
    /// The version text as written.
    raw: String,
    /// Parsed version. `None` only for `===`, which compares raw strings.
    version: Option<Version>,
    /// Whether the version ended in `.*` (only valid for `==` and `!=`).
    wildcard: bool,
}

impl VersionSpecifier {
    /// Returns the comparison operator.
    #[must_use]
    pub const fn comparator(&self) -> Comparator {
        self.comparator
    }

    /// Returns the version text as written.
    #[must_use]
    pub fn version_text(&self) -> &str {
        &self.raw
    }

    /// Tests whether a concrete version satisfies this clause.
    #[must_use]
    pub fn contains(&self, candidate: &Version) -> bool {
        match self.comparator {
            Comparator::Arbitrary => candidate.to_string() == self.raw,
            Comparator::Equal => self.matches_equal(candidate),
            Comparator::NotEqual => !self.matches_equal(candidate),
            Comparator::LessEqual => Some(&candidate.without_local()) <= self.version.as_ref(),
            Comparator::GreaterEqual => Some(&candidate.without_local()) >= self.version.as_ref(),
            Comparator::Less => Some(&candidate.without_local()) < self.version.as_ref(),
            Comparator::Greater => Some(&candidate.without_local()) > self.version.as_ref(),
            Comparator::Compatible => {
                let version = self.version.as_ref().expect("~= always has a version");
                let prefix_len = version.release().len() - 1;
                candidate.without_local() >= *version
                    && release_prefix_matches(candidate, version, prefix_len)
            }
        }
    }

    fn matches_equal(&self, candidate: &Version) -> bool {
        let version = self.version.as_ref().expect("==/!= always has a version");
        if self.wildcard {
            candidate.epoch() == version.epoch()
                && release_prefix_matches(candidate, version, version.release().len())
        } else if version.local().is_none() {
            // A bare version matches any local variant of itself.
            candidate.without_local() == *version
        } else {
            candidate == version
        }
    }
}

/// Compares the first `len` release segments, zero-padding the candidate.
fn release_prefix_matches(candidate: &Version, version: &Version, len: usize) -> bool {
    (0..len).all(|i| {
        candidate.release().get(i).copied().unwrap_or(0)
            == version.release().get(i).copied().unwrap_or(0)
    })
}

impl FromStr for VersionSpecifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        // Longest operators first.
        const OPERATORS: [(&str, Comparator); 8] = [
            ("===", Comparator::Arbitrary),
            ("==", Comparator::Equal),
            ("!=", Comparator::NotEqual),
            ("<=", Comparator::LessEqual),
            (">=", Comparator::GreaterEqual),
            ("~=", Comparator::Compatible),
            ("<", Comparator::Less),
            (">", Comparator::Greater),
        ];

        let (comparator, rest) = OPERATORS
            .iter()
            .find_map(|(op, comparator)| s.strip_prefix(op).map(|rest| (*comparator, rest)))
            .ok_or_else(|| Error::MissingOperator(s.to_string()))?;

        let raw = rest.trim().to_string();
        if raw.is_empty() {
            return Err(Error::MissingVersion(s.to_string()));
        }

        if comparator == Comparator::Arbitrary {
            return Ok(Self {
                comparator,
                raw,
                version: None,
                wildcard: false,
            });
        }

        let (text, wildcard) = raw.strip_suffix(".*").map_or((raw.as_str(), false), |prefix| (prefix, true));

        if wildcard && !matches!(comparator, Comparator::Equal | Comparator::NotEqual) {
            return Err(Error::InvalidWildcard(s.to_string()));
        }

        let version: Version = text.parse()?;

        if comparator == Comparator::Compatible && version.release().len() < 2 {
            return Err(Error::CompatibleTooShort(s.to_string()));
        }

        Ok(Self {
            comparator,
            raw,
            version: Some(version),
            wildcard,
        })
    }
}

impl fmt::Display for VersionSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.comparator, self.raw)
    }
}

/// A comma-separated conjunction of version specifiers.
///
/// The empty set matches every version.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecifierSet(Vec<VersionSpecifier>);

impl SpecifierSet {
    /// Returns true when no clauses are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the individual clauses.
    pub fn iter(&self) -> std::slice::Iter<'_, VersionSpecifier> {
        self.0.iter()
    }

    /// Tests whether a concrete version satisfies every clause.
    #[must_use]
    pub fn contains(&self, candidate: &Version) -> bool {
        self.0.iter().all(|spec| spec.contains(candidate))
    }

    /// Returns true when some clause pins an exact version (`==` without a
    /// wildcard, or `===`).
    #[must_use]
    pub fn is_pinned(&self) -> bool {
        self.0.iter().any(|spec| {
            spec.comparator == Comparator::Arbitrary
                || (spec.comparator == Comparator::Equal && !spec.wildcard)
        })
    }
}

impl<'a> IntoIterator for &'a SpecifierSet {
    type Item = &'a VersionSpecifier;
    type IntoIter = std::slice::Iter<'a, VersionSpecifier>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromStr for SpecifierSet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut s = s.trim();

        // Specifiers may be wrapped in parentheses: `name (>=1.0, <2.0)`.
        if let Some(inner) = s.strip_prefix('(') {
            s = inner.strip_suffix(')').ok_or_else(|| Error::UnbalancedParens(s.to_string()))?;
            s = s.trim();
        }

        if s.is_empty() {
            return Ok(Self::default());
        }

        let specs = s
            .split(',')
            .map(str::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(specs))
    }
}

impl fmt::Display for SpecifierSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let clauses = self
            .0
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "{clauses}")
    }
}

/// Errors that can occur parsing a version specifier.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    /// No comparison operator at the start of the clause.
    #[error("Missing comparison operator in '{0}'")]
    MissingOperator(String),

    /// An operator with nothing after it.
    #[error("Missing version after operator in '{0}'")]
    MissingVersion(String),

    /// The version text did not parse.
    #[error(transparent)]
    InvalidVersion(#[from] InvalidVersionError),

    /// `.*` used with an operator other than `==` / `!=`.
    #[error("Wildcard versions are only valid with == and != ('{0}')")]
    InvalidWildcard(String),

    /// `~=` needs at least two release segments.
    #[error("Compatible release clause needs at least two version segments ('{0}')")]
    CompatibleTooShort(String),

    /// An opening parenthesis without a closing one.
    #[error("Unbalanced parentheses in '{0}'")]
    UnbalancedParens(String),
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    #[test_case("==1.0", "1.0", true; "exact match")]
    #[test_case("==1.0", "1.0.0", true; "trailing zeros equal")]
    #[test_case("==1.0", "1.1", false; "exact mismatch")]
    #[test_case("==1.0", "1.0+cu118", true; "bare pin accepts local variant")]
    #[test_case("!=1.0", "1.1", true; "not equal")]
    #[test_case(">=1.0", "1.0", true; "ge boundary")]
    #[test_case(">=1.0", "0.9", false; "ge below")]
    #[test_case("<2.0", "1.9", true; "lt")]
    #[test_case("<=2.0", "2.0", true; "le boundary")]
    #[test_case(">1.0", "1.0", false; "gt boundary excluded")]
    #[test_case("==1.0.*", "1.0.5", true; "wildcard within prefix")]
    #[test_case("==1.0.*", "1.1.0", false; "wildcard outside prefix")]
    #[test_case("!=1.0.*", "1.1.0", true; "negated wildcard")]
    #[test_case("~=2.2", "2.9", true; "compatible minor drift")]
    #[test_case("~=2.2", "3.0", false; "compatible major excluded")]
    #[test_case("~=1.4.5", "1.4.9", true; "compatible patch drift")]
    #[test_case("~=1.4.5", "1.5.0", false; "compatible minor excluded")]
    fn clause_membership(spec: &str, version: &str, expected: bool) {
        let spec: VersionSpecifier = spec.parse().unwrap();
        assert_eq!(spec.contains(&v(version)), expected);
    }

    #[test_case("1.0"; "no operator")]
    #[test_case("=="; "no version")]
    #[test_case(">=1.0.*"; "wildcard with ge")]
    #[test_case("~=1"; "compatible single segment")]
    #[test_case("==not-a-version"; "garbage version")]
    fn clause_rejects(input: &str) {
        assert!(input.parse::<VersionSpecifier>().is_err());
    }

    #[test]
    fn set_is_conjunction() {
        let set: SpecifierSet = ">=1.0,<2.0".parse().unwrap();
        assert!(set.contains(&v("1.5")));
        assert!(!set.contains(&v("2.0")));
        assert!(!set.contains(&v("0.9")));
    }

    #[test]
    fn empty_set_matches_everything() {
        let set: SpecifierSet = "".parse().unwrap();
        assert!(set.is_empty());
        assert!(set.contains(&v("0.0.1")));
    }

    #[test]
    fn parenthesised_set() {
        let set: SpecifierSet = "(>=1.0, <2.0)".parse().unwrap();
        assert!(set.contains(&v("1.2")));
    }

    #[test]
    fn pin_detection() {
        assert!("==2.31.0".parse::<SpecifierSet>().unwrap().is_pinned());
        assert!("===2.31.0".parse::<SpecifierSet>().unwrap().is_pinned());
        assert!(!">=2.0".parse::<SpecifierSet>().unwrap().is_pinned());
        assert!(!"==2.*".parse::<SpecifierSet>().unwrap().is_pinned());
        assert!(!SpecifierSet::default().is_pinned());
    }

    #[test]
    fn display_round_trip() {
        let set: SpecifierSet = ">=1.0, <2.0, !=1.5".parse().unwrap();
        assert_eq!(set.to_string(), ">=1.0,<2.0,!=1.5");
    }

    #[test]
    fn arbitrary_equality_is_textual() {
        let spec: VersionSpecifier = "===1.0".parse().unwrap();
        assert!(spec.contains(&v("1.0")));
        // 1.0.0 is the same version but a different string.
        assert!(!spec.contains(&v("1.0.0")));
    }
}
