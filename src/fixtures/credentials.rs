//! User credentials and personas
//!
//! Credentials come from a versioned YAML fixture, or from the credential
//! listing the login page renders for its demo users.

use scraper::Html;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::common::{Error, Result};

use super::read_fixture;

/// Credential fixture format understood by this build
pub const CREDENTIAL_FILE_VERSION: u32 = 1;

/// Category of demo user whose expected behavior deviates from baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    /// Baseline user
    Standard,
    /// Cannot log in; sees a lockout error
    LockedOut,
    /// Every product image is broken
    Problem,
    /// Slow responses, otherwise baseline
    PerformanceGlitch,
    /// Errors on cart actions, baseline on the pages checked here
    Error,
    /// One product image is broken
    Visual,
    /// Unrecognized username, treated as baseline
    Other,
}

impl Persona {
    /// Derive the persona from a demo username
    pub fn from_username(username: &str) -> Self {
        match username {
            "standard_user" => Persona::Standard,
            "locked_out_user" => Persona::LockedOut,
            "problem_user" => Persona::Problem,
            "performance_glitch_user" => Persona::PerformanceGlitch,
            "error_user" => Persona::Error,
            "visual_user" => Persona::Visual,
            _ => Persona::Other,
        }
    }

    pub fn is_locked_out(self) -> bool {
        self == Persona::LockedOut
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Persona::Standard => "standard",
            Persona::LockedOut => "locked_out",
            Persona::Problem => "problem",
            Persona::PerformanceGlitch => "performance_glitch",
            Persona::Error => "error",
            Persona::Visual => "visual",
            Persona::Other => "other",
        };
        f.write_str(name)
    }
}

/// A demo user account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserCredential {
    pub username: String,
    pub persona: Persona,
}

impl UserCredential {
    /// Create a credential, deriving the persona from the username
    pub fn new(username: impl Into<String>) -> Self {
        let username = username.into();
        let persona = Persona::from_username(&username);
        Self { username, persona }
    }
}

#[derive(Deserialize)]
struct CredentialFile {
    version: u32,
    #[serde(default)]
    users: Vec<CredentialEntry>,
}

#[derive(Deserialize)]
struct CredentialEntry {
    username: String,
    /// Overrides the persona derived from the username
    persona: Option<Persona>,
}

/// Load credentials from a YAML fixture file
pub fn load_credentials(path: &Path) -> Result<Vec<UserCredential>> {
    let content = read_fixture(path)?;
    parse_credentials(&content, &path.display().to_string())
}

/// Parse the YAML credential fixture format
pub fn parse_credentials(content: &str, origin: &str) -> Result<Vec<UserCredential>> {
    let file: CredentialFile = serde_yaml::from_str(content)
        .map_err(|e| Error::fixture_malformed(origin, e.to_string()))?;

    if file.version != CREDENTIAL_FILE_VERSION {
        return Err(Error::fixture_malformed(
            origin,
            format!(
                "unsupported credential file version {} (expected {})",
                file.version, CREDENTIAL_FILE_VERSION
            ),
        ));
    }

    let users: Vec<UserCredential> = file
        .users
        .into_iter()
        .filter_map(|entry| {
            let username = entry.username.trim();
            if username.is_empty() {
                return None;
            }
            let mut credential = UserCredential::new(username);
            if let Some(persona) = entry.persona {
                credential.persona = persona;
            }
            Some(credential)
        })
        .collect();

    if users.is_empty() {
        return Err(Error::fixture_malformed(origin, "no usable credentials"));
    }
    Ok(users)
}

/// A run of text between two tags, with whether a heading encloses it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFragment {
    pub text: String,
    pub under_heading: bool,
}

/// Extract credentials from the login page's credential listing markup
///
/// Each text fragment that is non-empty after trimming and not nested
/// under a heading is one username.
pub fn credentials_from_listing(html: &str) -> Result<Vec<UserCredential>> {
    let users: Vec<UserCredential> = text_fragments(html)
        .into_iter()
        .filter(|fragment| !fragment.under_heading)
        .filter_map(|fragment| {
            let username = fragment.text.trim();
            (!username.is_empty()).then(|| UserCredential::new(username))
        })
        .collect();

    if users.is_empty() {
        return Err(Error::fixture_malformed(
            "login page credential listing",
            "no usable credentials",
        ));
    }
    Ok(users)
}

fn is_heading(tag: &str) -> bool {
    matches!(tag, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

/// Split markup into text fragments, one per text node
pub fn text_fragments(html: &str) -> Vec<TextFragment> {
    let fragment = Html::parse_fragment(html);
    fragment
        .root_element()
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let under_heading = node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .map_or(false, |e| is_heading(e.name()))
            });
            Some(TextFragment {
                text: text.replace('\u{a0}', " "),
                under_heading,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "<h4>Accepted usernames are:</h4>standard_user<br>locked_out_user<br>\
        problem_user<br>performance_glitch_user<br>error_user<br>visual_user<br>";

    #[test]
    fn test_listing_skips_heading_text() {
        let users = credentials_from_listing(LISTING).unwrap();
        let names: Vec<&str> = users.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "standard_user",
                "locked_out_user",
                "problem_user",
                "performance_glitch_user",
                "error_user",
                "visual_user"
            ]
        );
        assert_eq!(users[1].persona, Persona::LockedOut);
        assert_eq!(users[5].persona, Persona::Visual);
    }

    #[test]
    fn test_listing_ignores_whitespace_fragments() {
        let html = "<div>\n  <h4>Users</h4>\n  alice\n  <br/>\n  <br>\n</div>";
        let users = credentials_from_listing(html).unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, "alice");
        assert_eq!(users[0].persona, Persona::Other);
    }

    #[test]
    fn test_listing_with_only_heading_is_malformed() {
        let err = credentials_from_listing("<h4>Accepted usernames are:</h4>  ").unwrap_err();
        assert!(matches!(err, Error::FixtureMalformed { .. }));
    }

    #[test]
    fn test_nested_heading_content_is_excluded() {
        let fragments = text_fragments("<h4><span>head</span> tail</h4>body");
        assert_eq!(fragments.len(), 3);
        assert!(fragments[0].under_heading);
        assert!(fragments[1].under_heading);
        assert!(!fragments[2].under_heading);
    }

    #[test]
    fn test_comments_are_not_text() {
        let html = "<h4>Accepted usernames are:</h4><!-- users > 1 -->standard_user<br>";
        let users = credentials_from_listing(html).unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, "standard_user");
    }

    #[test]
    fn test_entities_decoded() {
        let fragments = text_fragments("a&amp;b&nbsp;c");
        assert_eq!(fragments[0].text, "a&b c");
    }

    #[test]
    fn test_parse_fixture_file() {
        let users = parse_credentials(
            "version: 1\nusers:\n  - username: standard_user\n  - username: '  '\n  - username: qa_user\n    persona: problem\n",
            "inline",
        )
        .unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].persona, Persona::Standard);
        assert_eq!(users[1].persona, Persona::Problem);
    }

    #[test]
    fn test_parse_rejects_unknown_version() {
        let err = parse_credentials("version: 2\nusers: []\n", "inline").unwrap_err();
        assert!(err.to_string().contains("version 2"));
    }

    #[test]
    fn test_parse_rejects_empty_user_list() {
        let err = parse_credentials("version: 1\nusers: []\n", "inline").unwrap_err();
        assert!(matches!(err, Error::FixtureMalformed { .. }));
    }
}
