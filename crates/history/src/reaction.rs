use serde::{Deserialize, Serialize};

/// The six native reactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tapback {
    Love,
    Like,
    Dislike,
    Laugh,
    Emphasize,
    Question,
}

impl Tapback {
    const ALL: [Self; 6] = [
        Self::Love,
        Self::Like,
        Self::Dislike,
        Self::Laugh,
        Self::Emphasize,
        Self::Question,
    ];

    fn offset(self) -> i64 {
        match self {
            Self::Love => 0,
            Self::Like => 1,
            Self::Dislike => 2,
            Self::Laugh => 3,
            Self::Emphasize => 4,
            Self::Question => 5,
        }
    }

    fn from_offset(offset: i64) -> Option<Self> {
        usize::try_from(offset)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }
}

const ADD_BASE: i64 = 2000;
const REMOVE_BASE: i64 = 3000;

/// Decoded reaction kind. Codes outside the known ranges pass through
/// untouched as `Opaque`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionCode {
    Add(Tapback),
    Remove(Tapback),
    Opaque(i64),
}

impl ReactionCode {
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            ADD_BASE..=2005 => Tapback::from_offset(raw - ADD_BASE).map_or(Self::Opaque(raw), Self::Add),
            REMOVE_BASE..=3005 => {
                Tapback::from_offset(raw - REMOVE_BASE).map_or(Self::Opaque(raw), Self::Remove)
            },
            _ => Self::Opaque(raw),
        }
    }

    pub fn raw(self) -> i64 {
        match self {
            Self::Add(tapback) => ADD_BASE + tapback.offset(),
            Self::Remove(tapback) => REMOVE_BASE + tapback.offset(),
            Self::Opaque(raw) => raw,
        }
    }

    pub fn is_removal(self) -> bool {
        matches!(self, Self::Remove(_))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case(2000, ReactionCode::Add(Tapback::Love))]
    #[case(2003, ReactionCode::Add(Tapback::Laugh))]
    #[case(2005, ReactionCode::Add(Tapback::Question))]
    #[case(3001, ReactionCode::Remove(Tapback::Like))]
    #[case(3004, ReactionCode::Remove(Tapback::Emphasize))]
    #[case(2006, ReactionCode::Opaque(2006))]
    #[case(3999, ReactionCode::Opaque(3999))]
    #[case(1000, ReactionCode::Opaque(1000))]
    #[case(-1, ReactionCode::Opaque(-1))]
    fn decodes(#[case] raw: i64, #[case] expected: ReactionCode) {
        let code = ReactionCode::from_raw(raw);
        assert_eq!(code, expected);
        assert_eq!(code.raw(), raw);
    }

    #[test]
    fn removal() {
        assert!(ReactionCode::from_raw(3002).is_removal());
        assert!(!ReactionCode::from_raw(2002).is_removal());
    }
}
