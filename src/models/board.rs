// src/models/board.rs

//! Board taxonomy data structures.
//!
//! The taxonomy is produced out-of-process (a boards index JSON file) and
//! loaded once at startup; see `taxonomy` for the resolver built on top.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One static taxonomy node: a board with its category path and the
/// alternate names it can be found under.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoardEntry {
    /// Stable board identifier (the forum `fid`)
    pub board_id: String,

    /// Board display name
    pub display_name: String,

    /// Category path, e.g. "游戏综合 / 网络游戏" (empty if uncategorized)
    #[serde(default)]
    pub category: String,

    /// Alternate names: child sub-forum and collection names
    #[serde(default)]
    pub aliases: Vec<String>,

    /// Board URL
    #[serde(default)]
    pub url: String,

    /// Short board description
    #[serde(default)]
    pub description: String,
}

/// A resolver hit: a board entry plus its match score and the candidate
/// string that produced the score.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionCandidate {
    pub entry: BoardEntry,
    pub score: f64,
    pub matched: String,
}

/// On-disk shape of the boards index file.
#[derive(Debug, Clone, Deserialize)]
pub struct BoardsIndexFile {
    #[serde(default)]
    pub generated_at: String,
    #[serde(default)]
    pub boards: Vec<IndexedBoard>,
}

/// One board as stored in the index file, with raw child links.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexedBoard {
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub fid: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category_l1: String,
    #[serde(default)]
    pub category_l2: String,
    #[serde(default)]
    pub forums: Vec<ChildLink>,
    #[serde(default)]
    pub collections: Vec<ChildLink>,
}

/// A named child link under a board (sub-forum or collection).
#[derive(Debug, Clone, Deserialize)]
pub struct ChildLink {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
}

impl BoardsIndexFile {
    /// Load the boards index from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Flatten the file into taxonomy entries.
    ///
    /// Child sub-forum and collection names become aliases; the two
    /// category levels collapse into one path string.
    pub fn into_entries(self) -> Vec<BoardEntry> {
        self.boards
            .into_iter()
            .map(|b| {
                let category = match (b.category_l1.trim(), b.category_l2.trim()) {
                    ("", _) => String::new(),
                    (l1, "") => l1.to_string(),
                    (l1, l2) => format!("{l1} / {l2}"),
                };
                let aliases = b
                    .forums
                    .iter()
                    .chain(b.collections.iter())
                    .map(|c| c.name.trim().to_string())
                    .filter(|n| !n.is_empty())
                    .collect();
                BoardEntry {
                    board_id: b.fid,
                    display_name: b.name,
                    category,
                    aliases,
                    url: b.url,
                    description: b.description,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_entries_flattens_children_and_categories() {
        let file: BoardsIndexFile = serde_json::from_str(
            r#"{
                "generated_at": "2026-01-01T00:00:00Z",
                "boards": [{
                    "name": "魔兽世界",
                    "url": "https://bbs.nga.cn/thread.php?fid=7",
                    "fid": "7",
                    "category_l1": "游戏综合",
                    "category_l2": "网络游戏",
                    "forums": [{"name": "职业讨论", "url": "u1"}],
                    "collections": [{"name": "怀旧服", "url": "u2"}, {"name": "  ", "url": "u3"}]
                }]
            }"#,
        )
        .unwrap();

        let entries = file.into_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].board_id, "7");
        assert_eq!(entries[0].category, "游戏综合 / 网络游戏");
        assert_eq!(entries[0].aliases, vec!["职业讨论", "怀旧服"]);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("boards_index.json");
        std::fs::write(
            &path,
            r#"{"generated_at": "", "boards": [{"name": "艾泽拉斯议事厅", "fid": "310"}]}"#,
        )
        .unwrap();

        let file = BoardsIndexFile::load(&path).unwrap();
        assert_eq!(file.boards.len(), 1);
        assert_eq!(file.boards[0].fid, "310");
    }

    #[test]
    fn test_load_rejects_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("boards_index.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(BoardsIndexFile::load(&path).is_err());
    }

    #[test]
    fn test_into_entries_single_level_category() {
        let file: BoardsIndexFile = serde_json::from_str(
            r#"{"boards": [{"name": "b", "fid": "1", "category_l1": "综合"}]}"#,
        )
        .unwrap();
        assert_eq!(file.into_entries()[0].category, "综合");
    }
}
