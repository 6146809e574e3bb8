//! Default markdown renderer over `pulldown-cmark`.
//!
//! Handles the vault dialect: YAML frontmatter, `![[file]]` embeds, and
//! `[[page]]` wiki links. Embeds are normalized to standard image syntax
//! before parsing so attachment references surface as image events.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use regex::{Captures, Regex};
use tracing::{debug, warn};
use wv_storage::{Document, VaultStorage};

use crate::frontmatter::{self, Frontmatter};
use crate::{Attachment, DocumentRenderer, RenderError, RenderedPage};

/// Default markdown renderer.
///
/// Reads document sources from a [`VaultStorage`], renders HTML, and resolves
/// attachment references against the vault (document-relative first, then
/// vault-root-relative).
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use wv_render::{DocumentRenderer, MarkdownRenderer};
/// use wv_storage::FsVault;
///
/// let vault = Arc::new(FsVault::new("vault".into()));
/// let renderer = MarkdownRenderer::new(vault);
/// let page = renderer.render(&document)?;
/// ```
pub struct MarkdownRenderer {
    vault: Arc<dyn VaultStorage>,
    embed_regex: Regex,
    link_regex: Regex,
    gfm: bool,
}

impl MarkdownRenderer {
    /// Build a renderer over `vault` with GFM enabled.
    ///
    /// # Panics
    ///
    /// Panics if the internal wiki-syntax regexes fail to compile. This should
    /// never happen as the patterns are compile-time constants.
    #[must_use]
    pub fn new(vault: Arc<dyn VaultStorage>) -> Self {
        Self {
            vault,
            embed_regex: Regex::new(r"!\[\[([^\[\]|]+?)(?:\|([^\[\]]*?))?\]\]").unwrap(),
            link_regex: Regex::new(r"\[\[([^\[\]|]+?)(?:\|([^\[\]]*?))?\]\]").unwrap(),
            gfm: true,
        }
    }

    /// Toggle GitHub Flavored Markdown extensions.
    ///
    /// On by default. Covers tables, strikethrough, and task lists.
    #[must_use]
    pub fn with_gfm(mut self, enabled: bool) -> Self {
        self.gfm = enabled;
        self
    }

    /// Parser options for the current GFM setting.
    fn parser_options(&self) -> Options {
        if self.gfm {
            Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_GFM
        } else {
            Options::empty()
        }
    }

    /// Rewrite `![[target|alt]]` and `[[target|label]]` into standard syntax.
    ///
    /// Embeds become images so downstream event processing sees one reference
    /// shape. Targets keep their anchors; spaces are percent-encoded so the
    /// parser accepts them as destinations.
    fn normalize_wiki_syntax(&self, content: &str) -> String {
        let content = self.embed_regex.replace_all(content, |caps: &Captures<'_>| {
            let target = caps[1].trim();
            let alt = caps.get(2).map_or("", |m| m.as_str().trim());
            format!("![{alt}]({})", encode_dest(target))
        });
        let content = self.link_regex.replace_all(&content, |caps: &Captures<'_>| {
            let target = caps[1].trim();
            let label = caps.get(2).map_or("", |m| m.as_str().trim());
            let label = if label.is_empty() { target } else { label };
            format!("[{label}]({})", encode_dest(target))
        });
        content.into_owned()
    }

    /// Resolve an image/embed destination to a vault-relative path.
    ///
    /// External and anchor-only destinations resolve to `None` silently;
    /// local-looking destinations that match no vault file resolve to `None`
    /// with a warning at the call site.
    fn resolve_ref(&self, doc_dir: &Path, raw: &str) -> Option<PathBuf> {
        if raw.is_empty() || is_external_dest(raw) {
            return None;
        }

        let decoded = raw.replace("%20", " ");
        let target = decoded.split('#').next().unwrap_or_default();
        if target.is_empty() {
            return None;
        }

        if let Some(candidate) = lexical_join(doc_dir, target)
            && self.vault.exists(&candidate)
        {
            return Some(candidate);
        }

        let from_root = PathBuf::from(target);
        if self.vault.exists(&from_root) {
            return Some(from_root);
        }

        None
    }
}

impl DocumentRenderer for MarkdownRenderer {
    fn render(&self, document: &Document) -> Result<RenderedPage, RenderError> {
        let content = self.vault.read(&document.path)?;
        let (block, body) = frontmatter::split(&content);
        let fm = block.map_or_else(Frontmatter::default, |block| {
            Frontmatter::from_yaml(block).unwrap_or_else(|err| {
                warn!(
                    path = %document.path.display(),
                    error = %err,
                    "ignoring malformed frontmatter"
                );
                Frontmatter::default()
            })
        });

        let doc_dir = document.path.parent().unwrap_or(Path::new(""));
        let normalized = self.normalize_wiki_syntax(body);
        let events: Vec<Event<'_>> = Parser::new_ext(&normalized, self.parser_options()).collect();

        let mut headings = Vec::new();
        let mut first_h1: Option<String> = None;
        let mut plain_text = String::new();
        let mut attachment_refs = Vec::new();
        let mut heading_buf: Option<(HeadingLevel, String)> = None;

        for event in &events {
            match event {
                Event::Start(Tag::Heading { level, .. }) => {
                    heading_buf = Some((*level, String::new()));
                }
                Event::End(TagEnd::Heading(_)) => {
                    if let Some((level, text)) = heading_buf.take() {
                        let text = text.trim().to_owned();
                        if !text.is_empty() {
                            if level == HeadingLevel::H1 && first_h1.is_none() {
                                first_h1 = Some(text.clone());
                            }
                            headings.push(text);
                        }
                    }
                }
                Event::Start(Tag::Image { dest_url, .. }) => {
                    if let Some(resolved) = self.resolve_ref(doc_dir, dest_url) {
                        attachment_refs.push(resolved);
                    } else if !is_external_dest(dest_url) {
                        debug!(
                            path = %document.path.display(),
                            dest = %dest_url,
                            "embed target not found in vault"
                        );
                    }
                }
                Event::Text(text) | Event::Code(text) => {
                    if let Some((_, buf)) = heading_buf.as_mut() {
                        buf.push_str(text);
                    }
                    plain_text.push_str(text);
                    plain_text.push(' ');
                }
                Event::SoftBreak | Event::HardBreak => plain_text.push(' '),
                _ => {}
            }
        }

        attachment_refs.sort();
        attachment_refs.dedup();

        let mut html = String::with_capacity(normalized.len() * 2);
        pulldown_cmark::html::push_html(&mut html, events.into_iter());

        let title = fm
            .title
            .clone()
            .or(first_h1)
            .unwrap_or_else(|| document.title.clone());

        Ok(RenderedPage {
            source: document.path.clone(),
            html,
            title,
            headings,
            aliases: fm.aliases,
            tags: fm.tags,
            plain_text: plain_text.trim().to_owned(),
            show_in_nav: fm.publish != Some(false),
            attachment_refs,
        })
    }

    fn collect_attachments(&self, page: &RenderedPage) -> Result<Vec<Attachment>, RenderError> {
        let mut attachments = Vec::with_capacity(page.attachment_refs.len());
        for source in &page.attachment_refs {
            let bytes = match self.vault.read_bytes(source) {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!(
                        path = %source.display(),
                        error = %err,
                        "skipping unreadable attachment"
                    );
                    continue;
                }
            };
            let (size, mtime) = match self.vault.stat(source) {
                Ok(stat) => (stat.size, stat.mtime),
                Err(_) => (bytes.len() as u64, 0.0),
            };
            attachments.push(Attachment {
                source: source.clone(),
                bytes,
                size,
                mtime,
            });
        }
        Ok(attachments)
    }
}

/// Check for destinations that can never be vault files.
fn is_external_dest(dest: &str) -> bool {
    dest.starts_with('#')
        || dest.contains("://")
        || dest.starts_with("data:")
        || dest.starts_with("mailto:")
}

/// Percent-encode spaces so targets survive markdown destination parsing.
fn encode_dest(target: &str) -> String {
    target.replace(' ', "%20")
}

/// Join a reference onto a directory, resolving `.` and `..` lexically.
///
/// Returns `None` when `..` would escape the vault root.
fn lexical_join(dir: &Path, reference: &str) -> Option<PathBuf> {
    let mut parts: Vec<_> = dir
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_owned()),
            _ => None,
        })
        .collect();

    for component in Path::new(reference).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_owned()),
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::CurDir => {}
            _ => return None,
        }
    }

    Some(parts.iter().collect())
}
