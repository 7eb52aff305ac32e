//! Team identity.
//!
//! Units are assigned to a team at spawn from a category tag such as
//! `"blue_archer"` or `"red"`. Only the recognised prefixes are accepted.

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::unit::UnitError;

/// Side a unit fights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    /// Blue side.
    Blue,
    /// Red side.
    Red,
}

impl Team {
    /// All teams, in tag-matching order.
    pub const ALL: [Self; 2] = [Self::Blue, Self::Red];

    /// Tag prefix identifying this team.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Blue => "blue",
            Self::Red => "red",
        }
    }

    /// The opposing team.
    #[must_use]
    pub const fn enemy(self) -> Self {
        match self {
            Self::Blue => Self::Red,
            Self::Red => Self::Blue,
        }
    }

    /// Resolves a team from a spawn tag.
    ///
    /// The tag must start with one of the known prefixes. Anything else is
    /// logged and rejected; there is no fallback team.
    pub fn from_tag(tag: &str) -> Result<Self, UnitError> {
        Self::ALL
            .into_iter()
            .find(|team| tag.starts_with(team.prefix()))
            .ok_or_else(|| {
                error!("Invalid team tag on unit: {tag:?}");
                UnitError::UnknownTeamTag(tag.to_owned())
            })
    }
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.prefix())
    }
}
