use std::{borrow::Cow, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// One-time confirmation token presented by a user to resume a deferred action.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for Token {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s.to_owned()))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Alphabet/length pair a token is drawn from. Configurable per action kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenFormat {
    alphabet: Cow<'static, str>,
    length: usize,
}

/// Mixed-case alphanumeric alphabet without glyphs that are easily misread
/// in common fonts (no `i j l I J O 0 1`).
pub const SAFE_ALPHABET: &str = "abcdefghkmnopqrstuvwxyzABCDEFGHKLMNPQRSTUVWXYZ23456789";

/// Uppercase-only variant of [`SAFE_ALPHABET`].
pub const SAFE_ALPHABET_UPPER: &str = "ABCDEFGHKLMNPQRSTUVWXYZ23456789";

impl TokenFormat {
    /// 24 characters from the safe mixed-case alphabet; for email links.
    pub const LONG: TokenFormat = TokenFormat {
        alphabet: Cow::Borrowed(SAFE_ALPHABET),
        length: 24,
    };

    /// 6 characters from the safe mixed-case alphabet.
    pub const SHORT: TokenFormat = TokenFormat {
        alphabet: Cow::Borrowed(SAFE_ALPHABET),
        length: 6,
    };

    /// 6 uppercase characters; for codes typed from an SMS.
    pub const SHORT_UPPER: TokenFormat = TokenFormat {
        alphabet: Cow::Borrowed(SAFE_ALPHABET_UPPER),
        length: 6,
    };

    pub fn custom(alphabet: impl Into<String>, length: usize) -> Self {
        Self {
            alphabet: Cow::Owned(alphabet.into()),
            length,
        }
    }

    pub fn alphabet(&self) -> &str {
        &self.alphabet
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Whether `token` could have been produced from this format.
    pub fn matches(&self, token: &Token) -> bool {
        token.len() == self.length && token.as_str().chars().all(|c| self.alphabet.contains(c))
    }
}
