use std::fmt::{Display, Formatter};

use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// States in the election lifecycle. States only ever advance, in declaration order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElectionStatus {
    /// Under construction; the ballot may be freely edited.
    Draft,
    /// Open to voters.
    Launched,
    /// Results published. Terminal.
    Published,
}

impl ElectionStatus {
    /// The state this one advances to, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Draft => Some(Self::Launched),
            Self::Launched => Some(Self::Published),
            Self::Published => None,
        }
    }

    /// Whether the election details and ballot may still be changed.
    pub fn is_editable(self) -> bool {
        self != Self::Published
    }

    /// Whether results may be made visible in this state.
    pub fn allows_results(self) -> bool {
        self >= Self::Launched
    }

    /// Every state, in lifecycle order.
    pub const ALL: &'static [Self] = &[Self::Draft, Self::Launched, Self::Published];

    /// The states satisfying `pred`, as a filter for conditional writes.
    pub fn all_where(pred: impl Fn(Self) -> bool) -> Vec<Self> {
        Self::ALL.iter().copied().filter(|status| pred(*status)).collect()
    }
}

impl Display for ElectionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Draft => "draft",
            Self::Launched => "launched",
            Self::Published => "published",
        };
        write!(f, "{name}")
    }
}

impl From<ElectionStatus> for Bson {
    fn from(status: ElectionStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_only_advance() {
        let mut status = ElectionStatus::Draft;
        let mut visited = vec![status];
        while let Some(next) = status.next() {
            assert!(next > status);
            status = next;
            visited.push(status);
        }
        assert_eq!(visited, ElectionStatus::ALL);
        assert_eq!(status, ElectionStatus::Published);
    }

    #[test]
    fn editable_and_results() {
        assert_eq!(
            ElectionStatus::all_where(ElectionStatus::is_editable),
            vec![ElectionStatus::Draft, ElectionStatus::Launched]
        );
        assert_eq!(
            ElectionStatus::all_where(ElectionStatus::allows_results),
            vec![ElectionStatus::Launched, ElectionStatus::Published]
        );
        assert_eq!(ElectionStatus::all_where(|_| true), ElectionStatus::ALL);
    }

    #[test]
    fn serialised_lowercase() {
        assert_eq!(
            Bson::from(ElectionStatus::Launched),
            Bson::String("launched".to_string())
        );
    }
}
