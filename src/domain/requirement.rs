use std::{fmt, str::FromStr};

use super::{
    marker::{self, Marker, MarkerEnvironment},
    package::{InvalidNameError, PackageName},
    specifier::{self, SpecifierSet},
};

/// A single requirement specifier.
///
/// Covers the forms found in a manifest line:
///
/// - `requests`
/// - `requests==2.31.0`
/// - `uvicorn[standard]>=0.22,<1.0`
/// - `torch==2.3.0; sys_platform == "linux"`
/// - `mylib @ https://example.com/mylib-1.0.tar.gz`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    name: PackageName,
    extras: Vec<PackageName>,
    specifiers: SpecifierSet,
    url: Option<String>,
    marker: Option<Marker>,
}

impl Requirement {
    /// Returns the package name.
    #[must_use]
    pub const fn name(&self) -> &PackageName {
        &self.name
    }

    /// Returns the requested extras.
    #[must_use]
    pub fn extras(&self) -> &[PackageName] {
        &self.extras
    }

    /// Returns the version specifier set (empty for URL requirements).
    #[must_use]
    pub const fn specifiers(&self) -> &SpecifierSet {
        &self.specifiers
    }

    /// Returns the direct URL, if this is a `name @ url` requirement.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Returns the environment marker, if any.
    #[must_use]
    pub const fn marker(&self) -> Option<&Marker> {
        self.marker.as_ref()
    }

    /// Returns true when the requirement names one exact artifact: an `==`
    /// or `===` pin, or a direct URL.
    #[must_use]
    pub fn is_pinned(&self) -> bool {
        self.url.is_some() || self.specifiers.is_pinned()
    }

    /// Returns true when the requirement applies in the given environment.
    ///
    /// A requirement with no marker applies everywhere.
    #[must_use]
    pub fn applies_to(&self, env: &MarkerEnvironment) -> bool {
        self.marker.as_ref().is_none_or(|marker| marker.evaluate(env))
    }
}

impl FromStr for Requirement {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::Empty);
        }

        // The marker is everything after the first top-level ';'.
        let (spec_part, marker_part) = s.split_once(';').map_or((s, None), |(left, right)| {
            (left.trim_end(), Some(right.trim()))
        });

        let marker = marker_part.map(Marker::from_str).transpose()?;

        // Direct URL reference: `name @ url`.
        if let Some((name_part, url)) = spec_part.split_once('@') {
            let (name, extras) = parse_name_and_extras(name_part.trim())?;
            let url = url.trim();
            if url.is_empty() {
                return Err(Error::MissingUrl(s.to_string()));
            }
            return Ok(Self {
                name,
                extras,
                specifiers: SpecifierSet::default(),
                url: Some(url.to_string()),
                marker,
            });
        }

        // Otherwise the name runs until the first specifier character.
        let split_at = spec_part
            .find(['<', '>', '=', '!', '~', '('])
            .unwrap_or(spec_part.len());
        let (name_part, spec_text) = spec_part.split_at(split_at);

        let (name, extras) = parse_name_and_extras(name_part.trim())?;
        let specifiers = spec_text.trim().parse()?;

        Ok(Self {
            name,
            extras,
            specifiers,
            url: None,
            marker,
        })
    }
}

fn parse_name_and_extras(s: &str) -> Result<(PackageName, Vec<PackageName>), Error> {
    let Some((name_text, rest)) = s.split_once('[') else {
        return Ok((s.parse()?, Vec::new()));
    };

    let extras_text = rest
        .strip_suffix(']')
        .ok_or_else(|| Error::UnclosedExtras(s.to_string()))?;

    let name = name_text.trim().parse()?;
    let extras = extras_text
        .split(',')
        .map(|extra| extra.trim().parse())
        .collect::<Result<Vec<PackageName>, _>>()?;

    Ok((name, extras))
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.extras.is_empty() {
            let extras = self
                .extras
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            write!(f, "[{extras}]")?;
        }
        if let Some(url) = &self.url {
            write!(f, " @ {url}")?;
        } else if !self.specifiers.is_empty() {
            write!(f, "{}", self.specifiers)?;
        }
        if let Some(marker) = &self.marker {
            write!(f, "; {marker}")?;
        }
        Ok(())
    }
}

/// Errors that can occur parsing a requirement specifier.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    /// The line was empty after trimming.
    #[error("Empty requirement")]
    Empty,

    /// Invalid package or extra name.
    #[error(transparent)]
    Name(#[from] InvalidNameError),

    /// Invalid version specifier.
    #[error(transparent)]
    Specifier(#[from] specifier::Error),

    /// Invalid environment marker.
    #[error(transparent)]
    Marker(#[from] marker::Error),

    /// `name @` with nothing after it.
    #[error("Missing URL after '@' in '{0}'")]
    MissingUrl(String),

    /// `[` without a matching `]`.
    #[error("Unclosed extras bracket in '{0}'")]
    UnclosedExtras(String),
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn r(s: &str) -> Requirement {
        s.parse().unwrap()
    }

    #[test]
    fn bare_name() {
        let req = r("requests");
        assert_eq!(req.name().as_str(), "requests");
        assert!(req.specifiers().is_empty());
        assert!(req.extras().is_empty());
        assert!(req.url().is_none());
        assert!(req.marker().is_none());
        assert!(!req.is_pinned());
    }

    #[test]
    fn pinned_requirement() {
        let req = r("requests==2.31.0");
        assert!(req.is_pinned());
        assert_eq!(req.specifiers().to_string(), "==2.31.0");
    }

    #[test]
    fn extras_and_range() {
        let req = r("uvicorn[standard]>=0.22,<1.0");
        assert_eq!(req.name().as_str(), "uvicorn");
        assert_eq!(req.extras().len(), 1);
        assert_eq!(req.extras()[0].as_str(), "standard");
        assert!(!req.is_pinned());
    }

    #[test]
    fn multiple_extras() {
        let req = r("dask[array,dataframe]==2023.5.0");
        let extras: Vec<_> = req.extras().iter().map(|e| e.as_str()).collect();
        assert_eq!(extras, ["array", "dataframe"]);
    }

    #[test]
    fn marker_requirement() {
        let req = r(r#"torch==2.3.0; sys_platform == "linux""#);
        assert!(req.marker().is_some());
        assert!(req.applies_to(&MarkerEnvironment::linux()));
        assert!(!req.applies_to(&MarkerEnvironment::windows()));
    }

    #[test]
    fn url_requirement() {
        let req = r("mylib @ https://example.com/mylib-1.0.tar.gz");
        assert_eq!(req.url(), Some("https://example.com/mylib-1.0.tar.gz"));
        assert!(req.specifiers().is_empty());
        assert!(req.is_pinned());
    }

    #[test]
    fn url_with_marker() {
        let req = r(r#"mylib @ https://example.com/mylib.whl ; os_name == "posix""#);
        assert_eq!(req.url(), Some("https://example.com/mylib.whl"));
        assert!(req.applies_to(&MarkerEnvironment::linux()));
    }

    #[test]
    fn parenthesised_specifier() {
        let req = r("requests (>=2.0, <3.0)");
        assert_eq!(req.specifiers().to_string(), ">=2.0,<3.0");
    }

    #[test]
    fn whitespace_tolerated() {
        let req = r("  numpy >= 1.24 , < 2.0  ");
        assert_eq!(req.name().as_str(), "numpy");
        assert_eq!(req.specifiers().to_string(), ">=1.24,<2.0");
    }

    #[test_case(""; "empty")]
    #[test_case("=="; "operator only")]
    #[test_case("foo[bar"; "unclosed extras")]
    #[test_case("foo @"; "missing url")]
    #[test_case("foo==1.0; bogus_var == 'x'"; "bad marker")]
    #[test_case("-requests==1.0"; "bad name")]
    fn rejects(input: &str) {
        assert!(input.parse::<Requirement>().is_err(), "should reject: {input}");
    }

    #[test_case("requests==2.31.0"; "pin")]
    #[test_case("uvicorn[standard]>=0.22,<1.0"; "extras range")]
    #[test_case("mylib @ https://example.com/mylib.whl"; "url")]
    fn display_round_trips(input: &str) {
        let req = r(input);
        let reparsed: Requirement = req.to_string().parse().unwrap();
        assert_eq!(req, reparsed);
    }
}
