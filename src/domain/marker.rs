use std::{collections::BTreeMap, fmt, str::FromStr};

use super::version::Version;

/// A known environment-marker variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MarkerVar {
    /// `python_version` — major.minor of the interpreter.
    PythonVersion,
    /// `python_full_version` — full interpreter version.
    PythonFullVersion,
    /// `os_name` — e.g. `posix`, `nt`.
    OsName,
    /// `sys_platform` — e.g. `linux`, `darwin`, `win32`.
    SysPlatform,
    /// `platform_system` — e.g. `Linux`, `Darwin`, `Windows`.
    PlatformSystem,
    /// `platform_machine` — e.g. `x86_64`, `arm64`.
    PlatformMachine,
    /// `platform_release` — kernel release string.
    PlatformRelease,
    /// `platform_version` — verbose platform version.
    PlatformVersion,
    /// `platform_python_implementation` — e.g. `CPython`.
    PlatformPythonImplementation,
    /// `implementation_name` — e.g. `cpython`.
    ImplementationName,
    /// `implementation_version` — implementation version.
    ImplementationVersion,
    /// `extra` — the extra being evaluated, if any.
    Extra,
}

impl MarkerVar {
    /// Returns the canonical variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PythonVersion => "python_version",
            Self::PythonFullVersion => "python_full_version",
            Self::OsName => "os_name",
            Self::SysPlatform => "sys_platform",
            Self::PlatformSystem => "platform_system",
            Self::PlatformMachine => "platform_machine",
            Self::PlatformRelease => "platform_release",
            Self::PlatformVersion => "platform_version",
            Self::PlatformPythonImplementation => "platform_python_implementation",
            Self::ImplementationName => "implementation_name",
            Self::ImplementationVersion => "implementation_version",
            Self::Extra => "extra",
        }
    }
}

impl FromStr for MarkerVar {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // The dotted spellings are deprecated aliases that still appear in
        // older manifests.
        Ok(match s {
            "python_version" => Self::PythonVersion,
            "python_full_version" => Self::PythonFullVersion,
            "os_name" | "os.name" => Self::OsName,
            "sys_platform" | "sys.platform" => Self::SysPlatform,
            "platform_system" => Self::PlatformSystem,
            "platform_machine" | "platform.machine" => Self::PlatformMachine,
            "platform_release" => Self::PlatformRelease,
            "platform_version" | "platform.version" => Self::PlatformVersion,
            "platform_python_implementation" | "platform.python_implementation" => {
                Self::PlatformPythonImplementation
            }
            "implementation_name" => Self::ImplementationName,
            "implementation_version" => Self::ImplementationVersion,
            "extra" => Self::Extra,
            _ => return Err(Error::UnknownVariable(s.to_string())),
        })
    }
}

impl fmt::Display for MarkerVar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A comparison operator inside a marker expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerOp {
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
    /// `~=`
    Compatible,
    /// `===`
    Arbitrary,
    /// `in`
    In,
    /// `not in`
    NotIn,
}

impl MarkerOp {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::LessEqual => "<=",
            Self::GreaterEqual => ">=",
            Self::Less => "<",
            Self::Greater => ">",
            Self::Compatible => "~=",
            Self::Arbitrary => "===",
            Self::In => "in",
            Self::NotIn => "not in",
        }
    }
}

impl fmt::Display for MarkerOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One side of a marker comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerValue {
    /// An environment variable reference.
    Variable(MarkerVar),
    /// A quoted string literal.
    Literal(String),
}

impl MarkerValue {
    fn resolve<'a>(&'a self, env: &'a MarkerEnvironment) -> &'a str {
        match self {
            Self::Variable(var) => env.get(*var),
            Self::Literal(s) => s,
        }
    }
}

impl fmt::Display for MarkerValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Variable(var) => write!(f, "{var}"),
            Self::Literal(s) => write!(f, "\"{s}\""),
        }
    }
}

/// A parsed environment-marker expression.
///
/// Markers restrict when a requirement applies: the text after `;` on a
/// requirement line, e.g. `python_version < "3.10" and sys_platform ==
/// "linux"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    /// Conjunction of sub-expressions.
    And(Vec<Marker>),
    /// Disjunction of sub-expressions.
    Or(Vec<Marker>),
    /// A single comparison.
    Comparison {
        /// Left operand.
        lhs: MarkerValue,
        /// Operator.
        op: MarkerOp,
        /// Right operand.
        rhs: MarkerValue,
    },
}

impl Marker {
    /// Evaluates the marker against an environment.
    ///
    /// Comparisons between two version-shaped strings use version ordering;
    /// anything else falls back to string comparison, matching how the
    /// consuming package tool behaves.
    #[must_use]
    pub fn evaluate(&self, env: &MarkerEnvironment) -> bool {
        match self {
            Self::And(terms) => terms.iter().all(|term| term.evaluate(env)),
            Self::Or(terms) => terms.iter().any(|term| term.evaluate(env)),
            Self::Comparison { lhs, op, rhs } => compare(lhs.resolve(env), *op, rhs.resolve(env)),
        }
    }
}

fn compare(lhs: &str, op: MarkerOp, rhs: &str) -> bool {
    match op {
        MarkerOp::In => rhs.contains(lhs),
        MarkerOp::NotIn => !rhs.contains(lhs),
        MarkerOp::Arbitrary => lhs == rhs,
        _ => match (Version::from_str(lhs), Version::from_str(rhs)) {
            (Ok(left), Ok(right)) => compare_versions(&left, op, &right),
            _ => compare_strings(lhs, op, rhs),
        },
    }
}

fn compare_versions(lhs: &Version, op: MarkerOp, rhs: &Version) -> bool {
    match op {
        MarkerOp::Equal => lhs == rhs,
        MarkerOp::NotEqual => lhs != rhs,
        MarkerOp::LessEqual => lhs <= rhs,
        MarkerOp::GreaterEqual => lhs >= rhs,
        MarkerOp::Less => lhs < rhs,
        MarkerOp::Greater => lhs > rhs,
        MarkerOp::Compatible => {
            let prefix = rhs.release().len().saturating_sub(1);
            lhs >= rhs
                && (0..prefix).all(|i| {
                    lhs.release().get(i).copied().unwrap_or(0)
                        == rhs.release().get(i).copied().unwrap_or(0)
                })
        }
        MarkerOp::Arbitrary | MarkerOp::In | MarkerOp::NotIn => unreachable!("handled by caller"),
    }
}

fn compare_strings(lhs: &str, op: MarkerOp, rhs: &str) -> bool {
    match op {
        MarkerOp::Equal | MarkerOp::Compatible => lhs == rhs,
        MarkerOp::NotEqual => lhs != rhs,
        MarkerOp::LessEqual => lhs <= rhs,
        MarkerOp::GreaterEqual => lhs >= rhs,
        MarkerOp::Less => lhs < rhs,
        MarkerOp::Greater => lhs > rhs,
        MarkerOp::Arbitrary | MarkerOp::In | MarkerOp::NotIn => unreachable!("handled by caller"),
    }
}

impl FromStr for Marker {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens = tokenize(s)?;
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
        };
        let marker = parser.parse_or()?;
        if parser.pos != tokens.len() {
            return Err(Error::TrailingTokens(s.to_string()));
        }
        Ok(marker)
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::And(terms) => {
                let parts = terms
                    .iter()
                    .map(|term| match term {
                        // `or` binds looser, so nested disjunctions need parens.
                        Self::Or(_) => format!("({term})"),
                        _ => term.to_string(),
                    })
                    .collect::<Vec<_>>();
                write!(f, "{}", parts.join(" and "))
            }
            Self::Or(terms) => {
                let parts = terms.iter().map(ToString::to_string).collect::<Vec<_>>();
                write!(f, "{}", parts.join(" or "))
            }
            Self::Comparison { lhs, op, rhs } => write!(f, "{lhs} {op} {rhs}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    LParen,
    RParen,
    Op(MarkerOp),
    Ident(String),
    Literal(String),
}

fn tokenize(s: &str) -> Result<Vec<Token>, Error> {
    let mut tokens = Vec::new();
    let mut chars = s.char_indices().peekable();

    while let Some(&(i, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '\'' | '"' => {
                chars.next();
                let quote = c;
                let mut literal = String::new();
                loop {
                    match chars.next() {
                        Some((_, ch)) if ch == quote => break,
                        Some((_, ch)) => literal.push(ch),
                        None => return Err(Error::UnterminatedString(s.to_string())),
                    }
                }
                tokens.push(Token::Literal(literal));
            }
            '=' | '!' | '<' | '>' | '~' => {
                let rest = &s[i..];
                let (op, len) = if rest.starts_with("===") {
                    (MarkerOp::Arbitrary, 3)
                } else if rest.starts_with("==") {
                    (MarkerOp::Equal, 2)
                } else if rest.starts_with("!=") {
                    (MarkerOp::NotEqual, 2)
                } else if rest.starts_with("<=") {
                    (MarkerOp::LessEqual, 2)
                } else if rest.starts_with(">=") {
                    (MarkerOp::GreaterEqual, 2)
                } else if rest.starts_with("~=") {
                    (MarkerOp::Compatible, 2)
                } else if rest.starts_with('<') {
                    (MarkerOp::Less, 1)
                } else if rest.starts_with('>') {
                    (MarkerOp::Greater, 1)
                } else {
                    return Err(Error::UnexpectedCharacter(c, s.to_string()));
                };
                for _ in 0..len {
                    chars.next();
                }
                tokens.push(Token::Op(op));
            }
            c if c.is_ascii_alphanumeric() || c == '_' => {
                let mut ident = String::new();
                while let Some(&(_, ch)) = chars.peek() {
                    if ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.') {
                        ident.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            _ => return Err(Error::UnexpectedCharacter(c, s.to_string())),
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<Token, Error> {
        let token = self.tokens.get(self.pos).cloned().ok_or(Error::UnexpectedEnd)?;
        self.pos += 1;
        Ok(token)
    }

    fn parse_or(&mut self) -> Result<Marker, Error> {
        let mut terms = vec![self.parse_and()?];
        while matches!(self.peek(), Some(Token::Ident(word)) if word == "or") {
            self.pos += 1;
            terms.push(self.parse_and()?);
        }
        if terms.len() == 1 {
            Ok(terms.pop().expect("one term"))
        } else {
            Ok(Marker::Or(terms))
        }
    }

    fn parse_and(&mut self) -> Result<Marker, Error> {
        let mut terms = vec![self.parse_atom()?];
        while matches!(self.peek(), Some(Token::Ident(word)) if word == "and") {
            self.pos += 1;
            terms.push(self.parse_atom()?);
        }
        if terms.len() == 1 {
            Ok(terms.pop().expect("one term"))
        } else {
            Ok(Marker::And(terms))
        }
    }

    fn parse_atom(&mut self) -> Result<Marker, Error> {
        if matches!(self.peek(), Some(Token::LParen)) {
            self.pos += 1;
            let inner = self.parse_or()?;
            match self.next()? {
                Token::RParen => return Ok(inner),
                _ => return Err(Error::ExpectedCloseParen),
            }
        }

        let lhs = self.parse_value()?;
        let op = self.parse_op()?;
        let rhs = self.parse_value()?;
        Ok(Marker::Comparison { lhs, op, rhs })
    }

    fn parse_value(&mut self) -> Result<MarkerValue, Error> {
        match self.next()? {
            Token::Literal(s) => Ok(MarkerValue::Literal(s)),
            Token::Ident(name) => Ok(MarkerValue::Variable(name.parse()?)),
            token => Err(Error::ExpectedValue(format!("{token:?}"))),
        }
    }

    fn parse_op(&mut self) -> Result<MarkerOp, Error> {
        match self.next()? {
            Token::Op(op) => Ok(op),
            Token::Ident(word) if word == "in" => Ok(MarkerOp::In),
            Token::Ident(word) if word == "not" => match self.next()? {
                Token::Ident(word) if word == "in" => Ok(MarkerOp::NotIn),
                _ => Err(Error::ExpectedIn),
            },
            token => Err(Error::ExpectedOperator(format!("{token:?}"))),
        }
    }
}

/// An evaluation environment: marker variable values for a target platform.
///
/// Built from a named profile (`linux`, `macos`, `windows`) with optional
/// per-variable overrides. Unset variables resolve to the empty string.
#[derive(Debug, Clone, Default)]
pub struct MarkerEnvironment {
    values: BTreeMap<MarkerVar, String>,
}

impl MarkerEnvironment {
    /// A typical Linux x86-64 environment.
    #[must_use]
    pub fn linux() -> Self {
        Self::base("posix", "linux", "Linux", "x86_64")
    }

    /// A typical macOS arm64 environment.
    #[must_use]
    pub fn macos() -> Self {
        Self::base("posix", "darwin", "Darwin", "arm64")
    }

    /// A typical Windows x86-64 environment.
    #[must_use]
    pub fn windows() -> Self {
        Self::base("nt", "win32", "Windows", "AMD64")
    }

    fn base(os_name: &str, sys_platform: &str, system: &str, machine: &str) -> Self {
        let mut env = Self::default();
        env.set(MarkerVar::OsName, os_name);
        env.set(MarkerVar::SysPlatform, sys_platform);
        env.set(MarkerVar::PlatformSystem, system);
        env.set(MarkerVar::PlatformMachine, machine);
        env.set(MarkerVar::PythonVersion, "3.11");
        env.set(MarkerVar::PythonFullVersion, "3.11.9");
        env.set(MarkerVar::ImplementationName, "cpython");
        env.set(MarkerVar::ImplementationVersion, "3.11.9");
        env.set(MarkerVar::PlatformPythonImplementation, "CPython");
        env
    }

    /// Looks up a variable, returning the empty string when unset.
    #[must_use]
    pub fn get(&self, var: MarkerVar) -> &str {
        self.values.get(&var).map_or("", String::as_str)
    }

    /// Sets a variable value.
    pub fn set(&mut self, var: MarkerVar, value: impl Into<String>) {
        self.values.insert(var, value.into());
    }

    /// Returns a copy with one variable overridden.
    #[must_use]
    pub fn with(mut self, var: MarkerVar, value: impl Into<String>) -> Self {
        self.set(var, value);
        self
    }
}

/// Errors that can occur parsing a marker expression.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    /// The expression ended mid-construct.
    #[error("Marker expression ended unexpectedly")]
    UnexpectedEnd,

    /// A character with no meaning in marker syntax.
    #[error("Unexpected character '{0}' in marker '{1}'")]
    UnexpectedCharacter(char, String),

    /// A quoted string with no closing quote.
    #[error("Unterminated string literal in marker '{0}'")]
    UnterminatedString(String),

    /// An identifier that is not a known marker variable.
    #[error("Unknown marker variable '{0}'")]
    UnknownVariable(String),

    /// Expected a variable or string literal.
    #[error("Expected a marker variable or string literal, found {0}")]
    ExpectedValue(String),

    /// Expected a comparison operator.
    #[error("Expected a comparison operator, found {0}")]
    ExpectedOperator(String),

    /// `not` without a following `in`.
    #[error("Expected 'in' after 'not'")]
    ExpectedIn,

    /// A parenthesised group with no closing parenthesis.
    #[error("Expected ')'")]
    ExpectedCloseParen,

    /// Leftover tokens after a complete expression.
    #[error("Unexpected trailing tokens in marker '{0}'")]
    TrailingTokens(String),
}
