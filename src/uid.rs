//! Message identifiers
//!
//! A [`Uid`] is the IMAP UID the server assigned to a message in the
//! watched folder. It is unique within the folder and never reused
//! while the folder exists, but carries no meaning beyond identity and
//! rough recency.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prefix of the opaque token attached to "read" buttons.
pub const READ_ACTION_PREFIX: &str = "read_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(pub u32);

impl Uid {
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// The button token that asks for this message's full content.
    ///
    /// ```
    /// use inbox_relay::Uid;
    ///
    /// assert_eq!(Uid(101).read_action(), "read_101");
    /// ```
    #[must_use]
    pub fn read_action(self) -> String {
        format!("{READ_ACTION_PREFIX}{self}")
    }

    /// Decode a button token produced by [`Uid::read_action`].
    ///
    /// Returns `None` for tokens of any other shape.
    #[must_use]
    pub fn from_read_action(token: &str) -> Option<Self> {
        token.strip_prefix(READ_ACTION_PREFIX)?.parse().ok()
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Uid {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}
