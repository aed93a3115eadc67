//! Synced table identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// One of the fixed set of tables that take part in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTable {
    Projects,
    ProjectFiles,
    ProjectConversations,
    ProjectTasks,
    ProjectCollaborators,
    ProjectComments,
}

impl SyncTable {
    /// Every synced table, in status-report order.
    pub const ALL: [Self; 6] = [
        Self::Projects,
        Self::ProjectFiles,
        Self::ProjectConversations,
        Self::ProjectTasks,
        Self::ProjectCollaborators,
        Self::ProjectComments,
    ];

    /// Wire identifier, which is also the `SQLite` table name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Projects => "projects",
            Self::ProjectFiles => "project_files",
            Self::ProjectConversations => "project_conversations",
            Self::ProjectTasks => "project_tasks",
            Self::ProjectCollaborators => "project_collaborators",
            Self::ProjectComments => "project_comments",
        }
    }
}

impl fmt::Display for SyncTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncTable {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|table| table.as_str() == s)
            .ok_or_else(|| Error::UnknownTable(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_known_table() {
        for table in SyncTable::ALL {
            assert_eq!(table.as_str().parse::<SyncTable>().unwrap(), table);
        }
    }

    #[test]
    fn rejects_unknown_table() {
        let err = "forum_posts".parse::<SyncTable>().unwrap_err();
        assert!(matches!(err, Error::UnknownTable(name) if name == "forum_posts"));
    }

    #[test]
    fn table_names_are_case_sensitive() {
        assert!("Projects".parse::<SyncTable>().is_err());
    }

    #[test]
    fn serializes_as_wire_identifier() {
        let json = serde_json::to_string(&SyncTable::ProjectTasks).unwrap();
        assert_eq!(json, "\"project_tasks\"");
    }
}
