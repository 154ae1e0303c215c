use std::sync::LazyLock;

use regex::Regex;

static EMAIL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$").ok());

/// What kind of address a local identifier is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    Email,
    PhoneNumber,
    BusinessId,
    /// Chat identifiers, group keys and anything unrecognised.
    Opaque,
}

impl HandleKind {
    /// Classify a local identifier. Checked as email, phone, business id.
    pub fn classify(local: &str) -> Self {
        if is_email(local) {
            Self::Email
        } else if is_phone_number(local) {
            Self::PhoneNumber
        } else if is_business_id(local) {
            Self::BusinessId
        } else {
            Self::Opaque
        }
    }

    /// Whether a direct conversation can be opened with this handle.
    pub fn is_addressable(self) -> bool {
        !matches!(self, Self::Opaque)
    }
}

fn is_email(local: &str) -> bool {
    EMAIL.as_ref().is_some_and(|re| re.is_match(local))
}

fn is_phone_number(local: &str) -> bool {
    let trimmed = local.strip_prefix('+').unwrap_or(local);
    let mut digits = 0usize;
    for ch in trimmed.chars() {
        match ch {
            '0'..='9' => digits += 1,
            ' ' | '-' | '(' | ')' | '.' => {},
            _ => return false,
        }
    }
    (3..=15).contains(&digits)
}

fn is_business_id(local: &str) -> bool {
    local
        .strip_prefix("urn:biz:")
        .is_some_and(|rest| !rest.is_empty())
}

/// Local part of a participant id that may or may not be qualified.
pub fn normalized_handle_id(raw: &str) -> &str {
    if !raw.contains(';') {
        return raw;
    }
    raw.rsplit(';').next().unwrap_or(raw)
}
