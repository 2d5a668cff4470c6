//! Phase classification by keyword.

use std::fmt;

use serde::Serialize;

/// Kind of work a todo belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Writing code.
    Implementation,
    /// Writing or running tests.
    Testing,
    /// Checking results.
    Verification,
    /// Compiling or packaging.
    Build,
    /// Releasing.
    Deploy,
    /// Reviewing or merging.
    Review,
    /// No keyword matched.
    Unknown,
}

impl Phase {
    /// Lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Implementation => "implementation",
            Self::Testing => "testing",
            Self::Verification => "verification",
            Self::Build => "build",
            Self::Deploy => "deploy",
            Self::Review => "review",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phases in tie-break order: the first phase with a matching keyword wins.
const PHASE_KEYWORDS: &[(Phase, &[&str])] = &[
    (Phase::Verification, &["verify", "check", "validate", "confirm"]),
    (Phase::Deploy, &["deploy", "release", "publish", "ship"]),
    (Phase::Build, &["build", "compile", "bundle", "package"]),
    (Phase::Testing, &["test", "spec", "unit", "integration", "e2e"]),
    (Phase::Review, &["review", "pr", "merge", "commit"]),
    (Phase::Implementation, &["implement", "create", "add", "write", "code", "develop"]),
];

/// Words whose completion warrants a look at the result.
pub(crate) const VERIFICATION_KEYWORDS: &[&str] = &[
    "verify", "test", "check", "validate", "confirm", "ensure", "build", "run", "deploy",
    "launch", "render", "display", "ui", "visual", "screenshot", "appearance", "layout",
];

/// Lowercase alphanumeric tokens of `text`.
pub(crate) fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Whole-token match; keywords of four or more characters also match as a
/// token prefix (`render` matches `renders`).
pub(crate) fn matches_keyword(token: &str, keyword: &str) -> bool {
    token == keyword || (keyword.len() >= 4 && token.starts_with(keyword))
}

/// First keyword from `keywords` found in `tokens`.
pub(crate) fn find_keyword<'k>(tokens: &[String], keywords: &[&'k str]) -> Option<&'k str> {
    keywords.iter().copied().find(|kw| tokens.iter().any(|t| matches_keyword(t, kw)))
}

/// Classify one todo's content.
#[must_use]
pub fn classify(content: &str) -> Phase {
    let tokens = tokens(content);
    PHASE_KEYWORDS
        .iter()
        .find(|(_, keywords)| find_keyword(&tokens, keywords).is_some())
        .map_or(Phase::Unknown, |(phase, _)| *phase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_keyword() {
        assert_eq!(classify("Implement login form"), Phase::Implementation);
        assert_eq!(classify("Deploying to staging"), Phase::Deploy);
        assert_eq!(classify("Bundle assets"), Phase::Build);
        assert_eq!(classify("Refactor"), Phase::Unknown);
    }

    #[test]
    fn ties_resolve_by_priority() {
        assert_eq!(classify("Write unit tests and verify output"), Phase::Verification);
        assert_eq!(classify("Build and test"), Phase::Build);
        assert_eq!(classify("Add tests"), Phase::Testing);
    }

    #[test]
    fn short_keywords_need_whole_tokens() {
        // "pr" must not match "prepare" or "print".
        assert_eq!(classify("Prepare print view"), Phase::Unknown);
        assert_eq!(classify("Open a PR"), Phase::Review);
        assert!(matches_keyword("renders", "render"));
        assert!(!matches_keyword("uikit", "ui"));
    }
}
