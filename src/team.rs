use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    pub name: String,
    pub initials: String,
}

/// Read-only user-id → member mapping, loaded once from a JSON side file and
/// passed explicitly to whatever needs it. Unknown ids fall back to the raw
/// user id so a missing roster entry never blocks the pipeline.
#[derive(Debug, Clone, Default)]
pub struct TeamDirectory {
    members: HashMap<String, Member>,
}

impl TeamDirectory {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(TeamDirectory::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read team file {}", path.display()))?;
        let members: HashMap<String, Member> = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid team file {}", path.display()))?;
        Ok(TeamDirectory { members })
    }

    pub fn name(&self, user_id: &str) -> String {
        self.members
            .get(user_id)
            .map(|m| m.name.clone())
            .unwrap_or_else(|| user_id.to_string())
    }

    pub fn initials(&self, user_id: &str) -> String {
        self.members
            .get(user_id)
            .map(|m| m.initials.clone())
            .unwrap_or_else(|| user_id.to_string())
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> TeamDirectory {
        let raw = r#"{"U01": {"name": "alice", "initials": "AL"}}"#;
        TeamDirectory {
            members: serde_json::from_str(raw).unwrap(),
        }
    }

    #[test]
    fn known_member() {
        let dir = directory();
        assert_eq!(dir.name("U01"), "alice");
        assert_eq!(dir.initials("U01"), "AL");
    }

    #[test]
    fn unknown_member_falls_back_to_id() {
        let dir = directory();
        assert_eq!(dir.name("U99"), "U99");
        assert_eq!(dir.initials("U99"), "U99");
    }

    #[test]
    fn missing_file_yields_empty_directory() {
        let dir = TeamDirectory::load(Path::new("does/not/exist.json")).unwrap();
        assert_eq!(dir.name("U01"), "U01");
    }
}
