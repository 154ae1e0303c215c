use std::fmt;

/// Backing transport of a conversation.
///
/// `Primary` and `Fallback` form the equivalence set used for direct
/// conversation fallback. Unknown tags are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Service {
    /// `iMessage`
    Primary,
    /// `SMS`
    Fallback,
    Other(String),
}

impl Service {
    pub const PRIMARY_TAG: &'static str = "iMessage";
    pub const FALLBACK_TAG: &'static str = "SMS";

    /// Exact tag match; anything else becomes `Other`.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            Self::PRIMARY_TAG => Self::Primary,
            Self::FALLBACK_TAG => Self::Fallback,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            Self::Primary => Self::PRIMARY_TAG,
            Self::Fallback => Self::FALLBACK_TAG,
            Self::Other(tag) => tag,
        }
    }

    /// The other member of the equivalence set.
    pub fn alternate(&self) -> Option<Self> {
        match self {
            Self::Primary => Some(Self::Fallback),
            Self::Fallback => Some(Self::Primary),
            Self::Other(_) => None,
        }
    }

    /// Service used when opening a direct conversation for this tag.
    ///
    /// Absent tags default to primary; anything that is not primary is
    /// treated as the fallback service.
    pub fn normalize_direct(service: Option<&Self>) -> Self {
        match service {
            None | Some(Self::Primary) => Self::Primary,
            Some(_) => Self::Fallback,
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// True only for the two interchangeable services, in either order.
pub fn is_equivalent_service(a: &Service, b: &Service) -> bool {
    matches!(
        (a, b),
        (Service::Primary, Service::Fallback) | (Service::Fallback, Service::Primary)
    )
}

/// Conversation kind carried in the second GUID segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Style {
    /// `-`: one-to-one conversation.
    Direct,
    /// `+`: group conversation.
    Group,
    Other(String),
}

impl Style {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "-" => Self::Direct,
            "+" => Self::Group,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            Self::Direct => "-",
            Self::Group => "+",
            Self::Other(tag) => tag,
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
