//! Folder path resolution
//!
//! Paths are resolved by walking the parent chain iteratively, then
//! memoized per listing from the top of the chain down. A parent id
//! that does not name a known folder resolves to an empty prefix. A
//! parent chain that loops back onto a folder still being resolved is
//! cut at that point, also as an empty prefix.

use std::collections::{HashMap, HashSet};

use super::{DriveNode, NodeKind};

pub const PATH_SEPARATOR: char = '/';

/// Placeholder for names that sanitize to nothing
pub const UNNAMED: &str = "unnamed";

/// Strip characters that are illegal in file paths on common platforms
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .filter(|c| !c.is_control())
        .collect();
    let cleaned = cleaned.trim().trim_end_matches('.').trim();
    if cleaned.is_empty() {
        UNNAMED.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Memoized resolver from folder id to slash-delimited path
pub struct PathResolver<'a> {
    folders: HashMap<&'a str, &'a DriveNode>,
    cache: HashMap<String, String>,
}

impl<'a> PathResolver<'a> {
    pub fn new(nodes: &'a [DriveNode]) -> Self {
        let folders = nodes
            .iter()
            .filter(|node| node.kind == NodeKind::Folder)
            .map(|node| (node.id.as_str(), node))
            .collect();
        Self {
            folders,
            cache: HashMap::new(),
        }
    }

    /// Full path of a folder; empty for unknown ids
    pub fn resolve(&mut self, folder_id: &str) -> String {
        if let Some(path) = self.cache.get(folder_id) {
            return path.clone();
        }

        // walk up until a cached folder, the drive root, or a repeat
        let mut chain: Vec<&'a DriveNode> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut current = folder_id;
        let mut prefix = String::new();
        loop {
            if let Some(path) = self.cache.get(current) {
                prefix = path.clone();
                break;
            }
            let Some(node) = self.folders.get(current).copied() else {
                break;
            };
            if !seen.insert(node.id.as_str()) {
                break;
            }
            chain.push(node);
            match node.parent_folder.as_deref() {
                Some(parent) if !parent.is_empty() => current = parent,
                _ => break,
            }
        }

        for node in chain.iter().rev() {
            prefix = join(&prefix, &sanitize_name(&node.name));
            self.cache.insert(node.id.clone(), prefix.clone());
        }

        prefix
    }

    /// Path of the folder containing `node`; empty at the drive root
    pub fn parent_path(&mut self, node: &DriveNode) -> String {
        match node.parent_folder.as_deref() {
            Some(parent) if !parent.is_empty() => self.resolve(parent),
            _ => String::new(),
        }
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

fn join(prefix: &str, own: &str) -> String {
    if prefix.is_empty() {
        own.to_string()
    } else {
        format!("{}{}{}", prefix, PATH_SEPARATOR, own)
    }
}
