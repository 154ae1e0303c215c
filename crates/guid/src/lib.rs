//! Composite conversation / participant identifiers.
//!
//! A GUID is `service;style;local` when fully qualified, or just `local`.
//! Parsing never fails: anything that is not exactly three non-empty
//! `;`-separated segments is kept as a bare local identifier.

pub mod handle;
pub mod service;

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub use {
    handle::{HandleKind, normalized_handle_id},
    service::{Service, Style, is_equivalent_service},
};

/// Parsed composite identifier.
///
/// `service` and `style` are either both present or both absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Guid {
    qualifier: Option<(Service, Style)>,
    local: String,
}

impl Guid {
    /// A bare identifier with no service or style.
    pub fn bare(local: impl Into<String>) -> Self {
        Self {
            qualifier: None,
            local: local.into(),
        }
    }

    pub fn new(service: Service, style: Style, local: impl Into<String>) -> Self {
        Self {
            qualifier: Some((service, style)),
            local: local.into(),
        }
    }

    pub fn direct(service: Service, local: impl Into<String>) -> Self {
        Self::new(service, Style::Direct, local)
    }

    pub fn group(service: Service, local: impl Into<String>) -> Self {
        Self::new(service, Style::Group, local)
    }

    /// Parse a raw identifier. Never fails.
    pub fn parse(raw: &str) -> Self {
        let segments: Vec<&str> = raw.split(';').collect();
        match segments.as_slice() {
            [service, style, local]
                if !service.is_empty() && !style.is_empty() && !local.is_empty() =>
            {
                Self::new(Service::from_tag(service), Style::from_tag(style), *local)
            },
            _ => Self::bare(raw),
        }
    }

    pub fn service(&self) -> Option<&Service> {
        self.qualifier.as_ref().map(|(service, _)| service)
    }

    pub fn style(&self) -> Option<&Style> {
        self.qualifier.as_ref().map(|(_, style)| style)
    }

    pub fn local(&self) -> &str {
        &self.local
    }

    pub fn is_qualified(&self) -> bool {
        self.qualifier.is_some()
    }

    pub fn is_group(&self) -> bool {
        matches!(self.style(), Some(Style::Group))
    }

    /// Same style and local part on another service. Bare identifiers have
    /// no service to replace and stay bare.
    pub fn with_service(&self, service: Service) -> Self {
        match &self.qualifier {
            Some((_, style)) => Self::new(service, style.clone(), self.local.clone()),
            None => self.clone(),
        }
    }

    /// The same conversation on the other member of the service
    /// equivalence set, if this identifier names one of the two.
    pub fn alternate(&self) -> Option<Self> {
        let alternate = self.service()?.alternate()?;
        Some(self.with_service(alternate))
    }

    /// Serialized form; `parse(format(g)) == g` for every parsed `g`.
    pub fn format(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some((service, style)) => write!(f, "{service};{style};{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

impl FromStr for Guid {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for Guid {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl Serialize for Guid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Guid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[test]
    fn parses_fully_qualified() {
        let guid = Guid::parse("iMessage;-;+15551234567");
        assert_eq!(guid.service(), Some(&Service::Primary));
        assert_eq!(guid.style(), Some(&Style::Direct));
        assert_eq!(guid.local(), "+15551234567");
    }

    #[test]
    fn parses_bare() {
        let guid = Guid::parse("+15551234567");
        assert_eq!(guid.service(), None);
        assert_eq!(guid.style(), None);
        assert_eq!(guid.local(), "+15551234567");
    }

    #[rstest]
    #[case("iMessage;-")]
    #[case("iMessage;-;a;b")]
    #[case("a;;b")]
    #[case(";-;local")]
    #[case(";;;")]
    #[case("iMessage;-;x;")]
    #[case("iMessage;;-;x")]
    #[case("")]
    fn malformed_degrades_to_bare(#[case] raw: &str) {
        let guid = Guid::parse(raw);
        assert!(!guid.is_qualified());
        assert_eq!(guid.local(), raw);
        assert_eq!(guid.format(), raw);
    }

    #[rstest]
    #[case("iMessage;-;+15551234567")]
    #[case("SMS;+;chat123456789")]
    #[case("RCS;-;user@example.com")]
    #[case("iMessage;?;odd-style")]
    #[case("user@example.com")]
    #[case("iMessage;-;a;b")]
    #[case("iMessage;-;x;")]
    #[case("iMessage;;-;x")]
    fn format_round_trips(#[case] raw: &str) {
        assert_eq!(Guid::parse(raw).format(), raw);
        let reparsed = Guid::parse(&Guid::parse(raw).format());
        assert_eq!(reparsed, Guid::parse(raw));
    }

    #[test]
    fn bare_with_separators_survives_format() {
        let guid = Guid::bare("iMessage;-;x;");
        assert_eq!(Guid::parse(&guid.format()), guid);
    }

    #[test]
    fn alternate_swaps_within_equivalence_set() {
        let primary = Guid::parse("iMessage;-;+15551234567");
        let fallback = primary.alternate().unwrap();
        assert_eq!(fallback.format(), "SMS;-;+15551234567");
        assert_eq!(fallback.alternate().unwrap(), primary);
    }

    #[test]
    fn no_alternate_for_bare_or_unknown_service() {
        assert!(Guid::parse("+15551234567").alternate().is_none());
        assert!(Guid::parse("RCS;-;+15551234567").alternate().is_none());
    }

    #[test]
    fn group_detection() {
        assert!(Guid::parse("iMessage;+;chat42").is_group());
        assert!(!Guid::parse("iMessage;-;chat42").is_group());
        assert!(!Guid::parse("chat42").is_group());
    }

    #[test]
    fn serde_uses_formatted_string() {
        let guid = Guid::group(Service::Fallback, "chat99");
        let json = serde_json::to_string(&guid).unwrap();
        assert_eq!(json, "\"SMS;+;chat99\"");
        let back: Guid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, guid);
    }
}
