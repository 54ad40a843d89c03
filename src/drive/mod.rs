//! Drives: containers of documents organized in folders
//!
//! A drive lists its nodes flat; hierarchy is expressed through
//! `parent_folder` references and resolved by [`PathResolver`].

mod path;

pub use path::{sanitize_name, PathResolver, PATH_SEPARATOR, UNNAMED};

use serde::{Deserialize, Serialize};

/// Node kind within a drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Folder,
}

/// One file or folder in a drive listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveNode {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub parent_folder: Option<String>,
    /// Declared document type, files only
    #[serde(default)]
    pub document_type: Option<String>,
}

impl DriveNode {
    pub fn folder(id: &str, name: &str, parent: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind: NodeKind::Folder,
            parent_folder: parent.map(str::to_string),
            document_type: None,
        }
    }

    pub fn file(id: &str, name: &str, parent: Option<&str>, document_type: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind: NodeKind::File,
            parent_folder: parent.map(str::to_string),
            document_type: Some(document_type.to_string()),
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }
}

/// Drive details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drive {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub nodes: Vec<DriveNode>,
}

impl Drive {
    pub fn files(&self) -> impl Iterator<Item = &DriveNode> {
        self.nodes.iter().filter(|node| node.is_file())
    }
}
