//! Output path computation.
//!
//! A document's target location is its vault-relative path with the global
//! root prefix stripped, every segment slugged, and the `.md` extension
//! swapped for `.html`. Attachments keep their extension. Slugging is
//! deterministic so chunked and unchunked builds land files identically.

use crate::roots::PathRoot;

/// Output path for a rendered page.
#[must_use]
pub fn page_output_path(root: &PathRoot, source_path: &str) -> String {
    let mut slugged = slug_path(root.strip(source_path));
    if let Some(stem) = slugged.strip_suffix(".md") {
        slugged = format!("{stem}.html");
    } else {
        slugged.push_str(".html");
    }
    slugged
}

/// Output path for a collected attachment.
#[must_use]
pub fn attachment_output_path(root: &PathRoot, source_path: &str) -> String {
    slug_path(root.strip(source_path))
}

fn slug_path(path: &str) -> String {
    path.split('/')
        .map(slug_segment)
        .collect::<Vec<_>>()
        .join("/")
}

/// Lowercase a path segment and turn whitespace runs into single dashes.
fn slug_segment(segment: &str) -> String {
    let joined = segment
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-");

    let mut out = String::with_capacity(joined.len());
    let mut prev_dash = false;
    for c in joined.chars() {
        if c == '-' {
            if !prev_dash {
                out.push(c);
            }
            prev_dash = true;
        } else {
            out.push(c);
            prev_dash = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_page_path_strips_root_and_slugs() {
        let root = PathRoot::from_recorded("Vault");

        assert_eq!(page_output_path(&root, "Vault/A/x.md"), "a/x.html");
    }

    #[test]
    fn test_page_path_empty_root_keeps_structure() {
        let root = PathRoot::empty();

        assert_eq!(
            page_output_path(&root, "Korean/A/x.md"),
            "korean/a/x.html"
        );
        assert_eq!(
            page_output_path(&root, "English/B/y.md"),
            "english/b/y.html"
        );
    }

    #[test]
    fn test_page_path_slugs_spaces() {
        let root = PathRoot::empty();

        assert_eq!(
            page_output_path(&root, "My Notes/Daily  Log.md"),
            "my-notes/daily-log.html"
        );
    }

    #[test]
    fn test_page_path_collapses_dash_runs() {
        let root = PathRoot::empty();

        assert_eq!(
            page_output_path(&root, "notes/a - b.md"),
            "notes/a-b.html"
        );
    }

    #[test]
    fn test_page_path_uppercase_extension() {
        let root = PathRoot::empty();

        assert_eq!(page_output_path(&root, "Notes/README.MD"), "notes/readme.html");
    }

    #[test]
    fn test_page_path_keeps_nonlatin_segments() {
        let root = PathRoot::empty();

        assert_eq!(
            page_output_path(&root, "한국어/노트.md"),
            "한국어/노트.html"
        );
    }

    #[test]
    fn test_attachment_path_keeps_extension() {
        let root = PathRoot::from_recorded("Vault");

        assert_eq!(
            attachment_output_path(&root, "Vault/Media/My Image.PNG"),
            "media/my-image.png"
        );
    }

    #[test]
    fn test_attachment_path_outside_root_preserved() {
        let root = PathRoot::from_recorded("Vault/Notes");

        assert_eq!(
            attachment_output_path(&root, "Attachments/img.png"),
            "attachments/img.png"
        );
    }
}
