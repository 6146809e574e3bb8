//! Navigation tree rebuild.
//!
//! The tree is regenerated once, after every batch has merged, from the
//! complete deduplicated candidate set. Per-batch tree building is not
//! possible: depth-first ordering and folder nesting depend on the whole
//! path set, and a folder discovered in a late batch may need to become a
//! sibling of an entry placed in an early one.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::entry::NavCandidate;

/// One node of the navigation tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavNode {
    /// Display title.
    pub title: String,
    /// Link target path (empty for folders).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    /// True for folder nodes.
    #[serde(rename = "isFolder")]
    pub is_folder: bool,
    /// Depth-first position in the rebuilt tree.
    pub order: usize,
    /// Child nodes, folders before files, alphabetical within each.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NavNode>,
}

/// Intermediate folder contents keyed by child name.
#[derive(Default)]
struct Folder {
    subfolders: BTreeMap<String, Folder>,
    files: Vec<(String, String)>,
}

impl Folder {
    fn descend(&mut self, segments: &[&str]) -> &mut Self {
        let mut node = self;
        for segment in segments {
            node = node.subfolders.entry((*segment).to_owned()).or_default();
        }
        node
    }
}

/// Rebuild the navigation tree from the final candidate union.
///
/// Clears nothing itself; callers own any per-batch state. Returns the root
/// nodes plus the order index assigned to every candidate path, so manifest
/// records can be updated in place.
#[must_use]
pub fn rebuild(candidates: &[NavCandidate]) -> (Vec<NavNode>, HashMap<String, usize>) {
    let mut root = Folder::default();
    for candidate in candidates {
        let mut segments: Vec<&str> = candidate.path.split('/').collect();
        let Some(file) = segments.pop() else {
            continue;
        };
        let folder = root.descend(&segments);
        folder.files.push((file.to_owned(), candidate.path.clone()));
    }

    let mut orders = HashMap::new();
    let mut counter = 0;
    let titles: HashMap<&str, &str> = candidates
        .iter()
        .map(|c| (c.path.as_str(), c.title.as_str()))
        .collect();
    let roots = build_children(&root, &titles, &mut counter, &mut orders);
    (roots, orders)
}

/// Build the sorted child list of one folder, folders first.
fn build_children(
    folder: &Folder,
    titles: &HashMap<&str, &str>,
    counter: &mut usize,
    orders: &mut HashMap<String, usize>,
) -> Vec<NavNode> {
    let mut children = Vec::with_capacity(folder.subfolders.len() + folder.files.len());

    // BTreeMap iteration gives alphabetical folder order for free.
    for (name, sub) in &folder.subfolders {
        let order = *counter;
        *counter += 1;
        let sub_children = build_children(sub, titles, counter, orders);
        children.push(NavNode {
            title: folder_title(name),
            path: String::new(),
            is_folder: true,
            order,
            children: sub_children,
        });
    }

    let mut files = folder.files.clone();
    files.sort_by(|(a, _), (b, _)| a.cmp(b));
    for (_, path) in files {
        let order = *counter;
        *counter += 1;
        orders.insert(path.clone(), order);
        let title = titles
            .get(path.as_str())
            .map_or_else(|| path.clone(), |t| (*t).to_owned());
        children.push(NavNode {
            title,
            path,
            is_folder: false,
            order,
            children: Vec::new(),
        });
    }

    children
}

/// Display title for a folder segment ("user-guides" -> "User Guides").
fn folder_title(segment: &str) -> String {
    segment
        .replace(['-', '_'], " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
