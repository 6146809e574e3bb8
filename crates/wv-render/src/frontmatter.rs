//! YAML frontmatter support.
//!
//! Vault documents may open with a YAML block delimited by `---` lines. The
//! renderer reads title, aliases, tags, and the publish flag from it; unknown
//! keys are ignored. A malformed block is treated as absent (with a warning
//! at the call site), never as a render failure.

use serde::{Deserialize, Deserializer};

/// Frontmatter fields the renderer understands.
///
/// All fields are optional. `aliases` and `tags` accept both a single string
/// and a list of strings, matching how vault authors actually write them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Frontmatter {
    /// Explicit title, preferred over the first H1 in the body.
    #[serde(default)]
    pub title: Option<String>,

    /// Alternative names for search.
    #[serde(default, deserialize_with = "string_or_seq")]
    pub aliases: Vec<String>,

    /// Tags for search.
    #[serde(default, deserialize_with = "string_or_seq")]
    pub tags: Vec<String>,

    /// Publish flag. `publish: false` removes the page from navigation.
    #[serde(default)]
    pub publish: Option<bool>,
}

impl Frontmatter {
    /// Parse frontmatter from a YAML block body.
    ///
    /// Empty content returns a default instance.
    ///
    /// # Errors
    ///
    /// Returns the underlying YAML error if the block is malformed.
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(trimmed)
    }

    /// Check if the frontmatter has any non-default values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.aliases.is_empty()
            && self.tags.is_empty()
            && self.publish.is_none()
    }
}

/// Split a document into its frontmatter block body and remaining content.
///
/// The block must start on the first line. Returns `(None, content)` when no
/// well-formed block is present.
#[must_use]
pub fn split(content: &str) -> (Option<&str>, &str) {
    let Some(rest) = content.strip_prefix("---") else {
        return (None, content);
    };
    if !rest.starts_with('\n') && !rest.starts_with("\r\n") {
        return (None, content);
    }

    for marker in ["\n---\n", "\n---\r\n"] {
        if let Some(end) = rest.find(marker) {
            return (Some(&rest[..end]), &rest[end + marker.len()..]);
        }
    }
    // Closing fence at end of file without trailing newline
    if let Some(body) = rest.strip_suffix("\n---") {
        return (Some(body), "");
    }

    (None, content)
}

/// Accept either a YAML scalar or a sequence of scalars as `Vec<String>`.
fn string_or_seq<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<Option<String>>),
    }

    match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Ok(Vec::new()),
        Some(OneOrMany::One(s)) => Ok(vec![s]),
        Some(OneOrMany::Many(items)) => Ok(items.into_iter().flatten().collect()),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_split_extracts_block() {
        let content = "---\ntitle: Hello\n---\n# Body\n";

        let (block, body) = split(content);

        assert_eq!(block, Some("\ntitle: Hello"));
        assert_eq!(body, "# Body\n");
    }

    #[test]
    fn test_split_without_block() {
        let content = "# Just a heading\n";

        let (block, body) = split(content);

        assert_eq!(block, None);
        assert_eq!(body, content);
    }

    #[test]
    fn test_split_requires_first_line() {
        let content = "text\n---\ntitle: X\n---\n";

        let (block, _) = split(content);

        assert_eq!(block, None);
    }

    #[test]
    fn test_split_unterminated_block() {
        let content = "---\ntitle: X\nno closing fence";

        let (block, body) = split(content);

        assert_eq!(block, None);
        assert_eq!(body, content);
    }

    #[test]
    fn test_frontmatter_basic_fields() {
        let fm = Frontmatter::from_yaml("title: Guide\npublish: false").unwrap();

        assert_eq!(fm.title.as_deref(), Some("Guide"));
        assert_eq!(fm.publish, Some(false));
    }

    #[test]
    fn test_frontmatter_aliases_as_list() {
        let fm = Frontmatter::from_yaml("aliases:\n  - First\n  - Second").unwrap();

        assert_eq!(fm.aliases, vec!["First", "Second"]);
    }

    #[test]
    fn test_frontmatter_aliases_as_scalar() {
        let fm = Frontmatter::from_yaml("aliases: Only One").unwrap();

        assert_eq!(fm.aliases, vec!["Only One"]);
    }

    #[test]
    fn test_frontmatter_tags_skip_null_entries() {
        let fm = Frontmatter::from_yaml("tags:\n  - alpha\n  -\n  - beta").unwrap();

        assert_eq!(fm.tags, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_frontmatter_empty_is_default() {
        let fm = Frontmatter::from_yaml("   \n").unwrap();

        assert!(fm.is_empty());
    }

    #[test]
    fn test_frontmatter_unknown_keys_ignored() {
        let fm = Frontmatter::from_yaml("cssclass: wide\ntitle: T").unwrap();

        assert_eq!(fm.title.as_deref(), Some("T"));
    }
}
