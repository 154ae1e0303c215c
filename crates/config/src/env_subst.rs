use std::sync::LazyLock;

use regex::{Captures, Regex};

static PLACEHOLDER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").ok());

/// Replace `${ENV_VAR}` placeholders with values from the process
/// environment. Unknown variables are left untouched.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

/// Same as [`substitute_env`] with an injectable lookup.
pub fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let Some(re) = PLACEHOLDER.as_ref() else {
        return input.to_string();
    };
    re.replace_all(input, |caps: &Captures<'_>| {
        lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn lookup(name: &str) -> Option<String> {
        match name {
            "IMBRIDGE_TIMEOUT" => Some("1500".into()),
            "IMBRIDGE_SNAPSHOT" => Some("/tmp/snap.json".into()),
            _ => None,
        }
    }

    #[rstest]
    #[case("timeout = ${IMBRIDGE_TIMEOUT}", "timeout = 1500")]
    #[case("path = \"${IMBRIDGE_SNAPSHOT}\"", "path = \"/tmp/snap.json\"")]
    #[case("${IMBRIDGE_MISSING}", "${IMBRIDGE_MISSING}")]
    #[case("${unterminated", "${unterminated")]
    #[case("no placeholders", "no placeholders")]
    fn substitutes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(substitute_env_with(input, lookup), expected);
    }
}
