//! Static descriptions of the synced tables' business columns

use crate::models::SyncTable;

/// Storage and wire type of a business column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Real,
    Bool,
    /// Epoch milliseconds on the wire and in storage
    Timestamp,
    /// Arbitrary JSON, stored as text
    Json,
}

impl ColumnKind {
    /// Human-readable expectation used in decode errors.
    pub const fn expected(self) -> &'static str {
        match self {
            Self::Text => "a string",
            Self::Integer => "an integer",
            Self::Real => "a number",
            Self::Bool => "a boolean",
            Self::Timestamp => "a timestamp",
            Self::Json => "JSON",
        }
    }
}

/// One business column: wire field name, `SQLite` column name, kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub field: &'static str,
    pub column: &'static str,
    pub kind: ColumnKind,
    /// Must be present on every upload that is not a tombstone
    pub required: bool,
}

impl ColumnSpec {
    const fn required(field: &'static str, column: &'static str, kind: ColumnKind) -> Self {
        Self {
            field,
            column,
            kind,
            required: true,
        }
    }

    const fn optional(field: &'static str, column: &'static str, kind: ColumnKind) -> Self {
        Self {
            field,
            column,
            kind,
            required: false,
        }
    }
}

/// How an upload of an id that already exists is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Device-aware last-write-wins with conflict detection
    LastWriteWins,
    /// Existing ids are never edited; re-submission is a no-op
    AppendOnly,
}

/// Business schema of one synced table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    pub table: SyncTable,
    pub columns: &'static [ColumnSpec],
    pub policy: ConflictPolicy,
}

impl TableSchema {
    /// Static schema for a table.
    pub fn of(table: SyncTable) -> &'static Self {
        match table {
            SyncTable::Projects => &PROJECTS,
            SyncTable::ProjectFiles => &PROJECT_FILES,
            SyncTable::ProjectConversations => &PROJECT_CONVERSATIONS,
            SyncTable::ProjectTasks => &PROJECT_TASKS,
            SyncTable::ProjectCollaborators => &PROJECT_COLLABORATORS,
            SyncTable::ProjectComments => &PROJECT_COMMENTS,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.table.as_str()
    }
}

use ColumnKind::{Bool, Integer, Json, Text, Timestamp};

static PROJECTS: TableSchema = TableSchema {
    table: SyncTable::Projects,
    columns: &[
        ColumnSpec::required("name", "name", Text),
        ColumnSpec::optional("description", "description", Text),
        ColumnSpec::optional("ownerId", "owner_id", Text),
        ColumnSpec::optional("status", "status", Text),
        ColumnSpec::optional("settings", "settings", Json),
    ],
    policy: ConflictPolicy::LastWriteWins,
};

static PROJECT_FILES: TableSchema = TableSchema {
    table: SyncTable::ProjectFiles,
    columns: &[
        ColumnSpec::required("projectId", "project_id", Text),
        ColumnSpec::required("path", "path", Text),
        ColumnSpec::optional("content", "content", Text),
        ColumnSpec::optional("mimeType", "mime_type", Text),
        ColumnSpec::optional("sizeBytes", "size_bytes", Integer),
    ],
    policy: ConflictPolicy::LastWriteWins,
};

static PROJECT_CONVERSATIONS: TableSchema = TableSchema {
    table: SyncTable::ProjectConversations,
    columns: &[
        ColumnSpec::required("projectId", "project_id", Text),
        ColumnSpec::required("role", "role", Text),
        ColumnSpec::required("content", "content", Text),
        ColumnSpec::optional("model", "model", Text),
    ],
    policy: ConflictPolicy::AppendOnly,
};

static PROJECT_TASKS: TableSchema = TableSchema {
    table: SyncTable::ProjectTasks,
    columns: &[
        ColumnSpec::required("projectId", "project_id", Text),
        ColumnSpec::required("title", "title", Text),
        ColumnSpec::optional("description", "description", Text),
        ColumnSpec::optional("status", "status", Text),
        ColumnSpec::optional("priority", "priority", Integer),
        ColumnSpec::optional("dueAt", "due_at", Timestamp),
        ColumnSpec::optional("completed", "completed", Bool),
    ],
    policy: ConflictPolicy::LastWriteWins,
};

static PROJECT_COLLABORATORS: TableSchema = TableSchema {
    table: SyncTable::ProjectCollaborators,
    columns: &[
        ColumnSpec::required("projectId", "project_id", Text),
        ColumnSpec::required("userId", "user_id", Text),
        ColumnSpec::required("role", "role", Text),
        ColumnSpec::optional("invitedBy", "invited_by", Text),
    ],
    policy: ConflictPolicy::LastWriteWins,
};

static PROJECT_COMMENTS: TableSchema = TableSchema {
    table: SyncTable::ProjectComments,
    columns: &[
        ColumnSpec::required("projectId", "project_id", Text),
        ColumnSpec::required("authorId", "author_id", Text),
        ColumnSpec::required("content", "content", Text),
        ColumnSpec::optional("targetId", "target_id", Text),
    ],
    policy: ConflictPolicy::LastWriteWins,
};
