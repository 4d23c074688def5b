use std::{cmp::Ordering, fmt, str::FromStr, sync::LazyLock};

use regex::Regex;

/// A parsed version number.
///
/// Versions consist of an optional epoch (`1!`), dotted release segments,
/// and optional pre-release (`a1`/`b2`/`rc3`), post-release (`.post1`),
/// development (`.dev2`) and local (`+cpu`) components.
///
/// Ordering follows the usual packaging rules: within one release,
/// development releases sort first, then pre-releases, then the final
/// release, then post-releases. Trailing zero segments are insignificant
/// (`1.0` sorts equal to `1`).
#[derive(Debug, Clone)]
pub struct Version {
    epoch: u64,
    release: Vec<u64>,
    pre: Option<(PreRelease, u64)>,
    post: Option<u64>,
    dev: Option<u64>,
    local: Option<String>,
}

/// Pre-release category, in sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PreRelease {
    /// Alpha (`a` / `alpha`).
    Alpha,
    /// Beta (`b` / `beta`).
    Beta,
    /// Release candidate (`rc` / `c` / `pre` / `preview`).
    Rc,
}

impl fmt::Display for PreRelease {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self {
            Self::Alpha => "a",
            Self::Beta => "b",
            Self::Rc => "rc",
        };
        write!(f, "{label}")
    }
}

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)^
        (?:(?P<epoch>[0-9]+)!)?
        (?P<release>[0-9]+(?:\.[0-9]+)*)
        (?:[._-]?(?P<pre_l>a|b|c|rc|alpha|beta|pre|preview)[._-]?(?P<pre_n>[0-9]+)?)?
        (?:
            -(?P<post_n1>[0-9]+)
            |
            [._-]?(?P<post_l>post|rev|r)[._-]?(?P<post_n2>[0-9]+)?
        )?
        (?:[._-]?(?P<dev_l>dev)[._-]?(?P<dev_n>[0-9]+)?)?
        (?:\+(?P<local>[a-z0-9]+(?:[._-][a-z0-9]+)*))?
        $",
    )
    .expect("version regex is valid")
});

impl Version {
    /// Returns the epoch (0 unless written explicitly).
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Returns the dotted release segments.
    #[must_use]
    pub fn release(&self) -> &[u64] {
        &self.release
    }

    /// Returns the pre-release component, if any.
    #[must_use]
    pub const fn pre(&self) -> Option<(PreRelease, u64)> {
        self.pre
    }

    /// Returns true when this is a pre-release or development release.
    #[must_use]
    pub const fn is_prerelease(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    /// Returns the local version label, if any.
    #[must_use]
    pub fn local(&self) -> Option<&str> {
        self.local.as_deref()
    }

    /// Returns a copy of this version with the local label removed.
    #[must_use]
    pub fn without_local(&self) -> Self {
        Self {
            local: None,
            ..self.clone()
        }
    }

    fn pre_key(&self) -> Bound<(PreRelease, u64)> {
        match self.pre {
            Some(pre) => Bound::Value(pre),
            // A dev release with no pre/post segment sorts before everything
            // else within the same release.
            None if self.post.is_none() && self.dev.is_some() => Bound::Min,
            None => Bound::Max,
        }
    }

    fn post_key(&self) -> Bound<u64> {
        self.post.map_or(Bound::Min, Bound::Value)
    }

    fn dev_key(&self) -> Bound<u64> {
        self.dev.map_or(Bound::Max, Bound::Value)
    }

    fn local_key(&self) -> Vec<LocalSegment> {
        self.local.as_deref().map_or_else(Vec::new, |local| {
            local
                .split(['.', '_', '-'])
                .map(|segment| {
                    segment
                        .parse::<u64>()
                        .map_or_else(|_| LocalSegment::Text(segment.to_string()), LocalSegment::Number)
                })
                .collect()
        })
    }
}

/// Comparison key helper: a value bounded below and above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Bound<T> {
    Min,
    Value(T),
    Max,
}

/// Local version segment. Numeric segments compare greater than text ones.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum LocalSegment {
    Text(String),
    Number(u64),
}

fn cmp_release(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => {}
            other => return other,
        }
    }
    Ordering::Equal
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| cmp_release(&self.release, &other.release))
            .then_with(|| self.pre_key().cmp(&other.pre_key()))
            .then_with(|| self.post_key().cmp(&other.post_key()))
            .then_with(|| self.dev_key().cmp(&other.dev_key()))
            .then_with(|| self.local_key().cmp(&other.local_key()))
    }
}

impl FromStr for Version {
    type Err = InvalidVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        let candidate = lowered.strip_prefix('v').unwrap_or(&lowered);

        let captures = VERSION_RE
            .captures(candidate)
            .ok_or_else(|| InvalidVersionError(s.to_string()))?;

        let parse_num = |name: &str| -> u64 {
            captures
                .name(name)
                .map_or(0, |m| m.as_str().parse().expect("digits only"))
        };

        let epoch = parse_num("epoch");

        let release = captures["release"]
            .split('.')
            .map(str::parse)
            .collect::<Result<Vec<u64>, _>>()
            .map_err(|_| InvalidVersionError(s.to_string()))?;

        let pre = captures.name("pre_l").map(|label| {
            let kind = match label.as_str() {
                "a" | "alpha" => PreRelease::Alpha,
                "b" | "beta" => PreRelease::Beta,
                _ => PreRelease::Rc,
            };
            (kind, parse_num("pre_n"))
        });

        let post = if captures.name("post_n1").is_some() {
            Some(parse_num("post_n1"))
        } else {
            captures.name("post_l").map(|_| parse_num("post_n2"))
        };

        let dev = captures.name("dev_l").map(|_| parse_num("dev_n"));

        let local = captures.name("local").map(|m| m.as_str().to_string());

        Ok(Self {
            epoch,
            release,
            pre,
            post,
            dev,
            local,
        })
    }
}

impl TryFrom<&str> for Version {
    type Error = InvalidVersionError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::from_str(value)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.epoch != 0 {
            write!(f, "{}!", self.epoch)?;
        }
        let release = self
            .release
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".");
        write!(f, "{release}")?;
        if let Some((kind, n)) = self.pre {
            write!(f, "{kind}{n}")?;
        }
        if let Some(n) = self.post {
            write!(f, ".post{n}")?;
        }
        if let Some(n) = self.dev {
            write!(f, ".dev{n}")?;
        }
        if let Some(local) = &self.local {
            write!(f, "+{local}")?;
        }
        Ok(())
    }
}

/// Error returned when a string is not a valid version.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("Invalid version: '{0}'")]
pub struct InvalidVersionError(String);

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("1.0"; "simple")]
    #[test_case("2.31.0"; "three segments")]
    #[test_case("1.0a1"; "alpha")]
    #[test_case("1.0b2"; "beta")]
    #[test_case("1.0rc1"; "release candidate")]
    #[test_case("1.0.post1"; "post release")]
    #[test_case("1.0.dev3"; "dev release")]
    #[test_case("1!2.0"; "epoch")]
    #[test_case("1.0+cu118"; "local label")]
    #[test_case("v1.0"; "v prefix")]
    #[test_case("1.0.alpha.2"; "spelled out alpha")]
    fn parses(input: &str) {
        assert!(Version::from_str(input).is_ok(), "should parse: {input}");
    }

    #[test_case(""; "empty")]
    #[test_case("abc"; "letters")]
    #[test_case("1.0.x"; "wildcard segment")]
    #[test_case("1..0"; "double dot")]
    #[test_case("1.0+"; "empty local")]
    fn rejects(input: &str) {
        assert!(Version::from_str(input).is_err(), "should reject: {input}");
    }

    fn v(s: &str) -> Version {
        Version::from_str(s).unwrap()
    }

    #[test_case("1.0", "2.0"; "major")]
    #[test_case("1.0", "1.0.1"; "extra segment")]
    #[test_case("1.0a1", "1.0"; "pre before final")]
    #[test_case("1.0a1", "1.0b1"; "alpha before beta")]
    #[test_case("1.0b1", "1.0rc1"; "beta before rc")]
    #[test_case("1.0.dev1", "1.0a1"; "dev before pre")]
    #[test_case("1.0", "1.0.post1"; "final before post")]
    #[test_case("1.0a1.dev1", "1.0a1"; "dev of pre before pre")]
    #[test_case("2.0", "1!1.0"; "epoch dominates")]
    #[test_case("1.0", "1.0+local"; "local sorts after bare")]
    fn ordering(lower: &str, higher: &str) {
        assert!(v(lower) < v(higher), "{lower} should sort below {higher}");
    }

    #[test]
    fn trailing_zeros_are_insignificant() {
        assert_eq!(v("1.0"), v("1"));
        assert_eq!(v("1.0.0"), v("1.0"));
    }

    #[test]
    fn pre_release_detection() {
        assert!(v("1.0a1").is_prerelease());
        assert!(v("1.0.dev1").is_prerelease());
        assert!(!v("1.0.post1").is_prerelease());
        assert!(!v("1.0").is_prerelease());
    }

    #[test_case("1.0", "1.0"; "plain")]
    #[test_case("1.0A1", "1.0a1"; "case folded pre")]
    #[test_case("1.0-post1", "1.0.post1"; "post separator")]
    #[test_case("2!1.0rc2+cpu", "2!1.0rc2+cpu"; "kitchen sink")]
    fn display_is_canonical(input: &str, expected: &str) {
        assert_eq!(v(input).to_string(), expected);
    }

    #[test]
    fn without_local_drops_label() {
        let version = v("1.0+cu118");
        assert_eq!(version.without_local(), v("1.0"));
        assert!(version.without_local().local().is_none());
    }
}
