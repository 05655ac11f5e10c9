// legal-backend/src/features/gdpr/models/user_data.rs
//! ユーザーが所有するデータのテーブルカタログと削除計画
//!
//! audit_logs と user_consents は [`UserTable`] に含めない。
//! そのため削除計画がこの2テーブルを指すことは型の上で起こりえない。

use serde::Serialize;
use serde_json::{Map, Value};

/// テーブルの1行（カラム名 → 値）
pub type Row = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UserTable {
    Users,
    Cases,
    Evidence,
    LegalIssues,
    TimelineEvents,
    Actions,
    Notes,
    ChatConversations,
    ChatMessages,
    UserFacts,
    CaseFacts,
    Sessions,
}

/// 行の所有者の辿り方
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// column = user_id
    Direct { column: &'static str },
    /// column が親テーブルの id を指し、親がユーザーに属する
    ViaParent {
        column: &'static str,
        parent: UserTable,
    },
}

impl UserTable {
    pub const ALL: [UserTable; 12] = [
        UserTable::Users,
        UserTable::Cases,
        UserTable::Evidence,
        UserTable::LegalIssues,
        UserTable::TimelineEvents,
        UserTable::Actions,
        UserTable::Notes,
        UserTable::ChatConversations,
        UserTable::ChatMessages,
        UserTable::UserFacts,
        UserTable::CaseFacts,
        UserTable::Sessions,
    ];

    pub fn table_name(self) -> &'static str {
        match self {
            UserTable::Users => "users",
            UserTable::Cases => "cases",
            UserTable::Evidence => "evidence",
            UserTable::LegalIssues => "legal_issues",
            UserTable::TimelineEvents => "timeline_events",
            UserTable::Actions => "actions",
            UserTable::Notes => "notes",
            UserTable::ChatConversations => "chat_conversations",
            UserTable::ChatMessages => "chat_messages",
            UserTable::UserFacts => "user_facts",
            UserTable::CaseFacts => "case_facts",
            UserTable::Sessions => "sessions",
        }
    }

    pub fn ownership(self) -> Ownership {
        match self {
            UserTable::Users => Ownership::Direct { column: "id" },
            UserTable::Cases
            | UserTable::Notes
            | UserTable::ChatConversations
            | UserTable::UserFacts
            | UserTable::Sessions => Ownership::Direct { column: "user_id" },
            UserTable::Evidence
            | UserTable::LegalIssues
            | UserTable::TimelineEvents
            | UserTable::Actions
            | UserTable::CaseFacts => Ownership::ViaParent {
                column: "case_id",
                parent: UserTable::Cases,
            },
            UserTable::ChatMessages => Ownership::ViaParent {
                column: "conversation_id",
                parent: UserTable::ChatConversations,
            },
        }
    }

    /// 暗号化エンベロープで保存されるカラム
    pub fn encrypted_columns(self) -> &'static [&'static str] {
        match self {
            UserTable::Cases
            | UserTable::LegalIssues
            | UserTable::TimelineEvents
            | UserTable::Actions => &["description"],
            UserTable::Evidence | UserTable::Notes => &["content"],
            UserTable::ChatMessages => &["content", "thinking_content"],
            UserTable::UserFacts | UserTable::CaseFacts => &["fact_content"],
            UserTable::Users | UserTable::ChatConversations | UserTable::Sessions => &[],
        }
    }

    /// `_at` で終わらない日時カラム
    pub fn extra_timestamp_columns(self) -> &'static [&'static str] {
        match self {
            UserTable::TimelineEvents => &["event_date"],
            _ => &[],
        }
    }

    /// 日時カラムかどうか
    pub fn is_timestamp_column(self, column: &str) -> bool {
        column.ends_with("_at") || self.extra_timestamp_columns().contains(&column)
    }

    /// エクスポートに含めない秘密情報
    pub fn redacted_columns(self) -> &'static [&'static str] {
        match self {
            UserTable::Users => &["password_hash", "password_salt"],
            UserTable::Sessions => &["token"],
            _ => &[],
        }
    }
}

/// エクスポートのデータ取得元
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportSource {
    Table(UserTable),
    Consents,
}

/// エクスポートの1カテゴリ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportCategory {
    pub key: &'static str,
    pub source: ExportSource,
}

impl ExportCategory {
    const fn table(key: &'static str, table: UserTable) -> Self {
        Self {
            key,
            source: ExportSource::Table(table),
        }
    }

    pub fn table_name(&self) -> &'static str {
        match self.source {
            ExportSource::Table(table) => table.table_name(),
            ExportSource::Consents => "user_consents",
        }
    }
}

pub const EXPORT_CATEGORIES: [ExportCategory; 13] = [
    ExportCategory::table("profile", UserTable::Users),
    ExportCategory::table("cases", UserTable::Cases),
    ExportCategory::table("evidence", UserTable::Evidence),
    ExportCategory::table("legalIssues", UserTable::LegalIssues),
    ExportCategory::table("timelineEvents", UserTable::TimelineEvents),
    ExportCategory::table("actions", UserTable::Actions),
    ExportCategory::table("notes", UserTable::Notes),
    ExportCategory::table("chatConversations", UserTable::ChatConversations),
    ExportCategory::table("chatMessages", UserTable::ChatMessages),
    ExportCategory::table("userFacts", UserTable::UserFacts),
    ExportCategory::table("caseFacts", UserTable::CaseFacts),
    ExportCategory::table("sessions", UserTable::Sessions),
    ExportCategory {
        key: "consents",
        source: ExportSource::Consents,
    },
];

/// 削除計画の1ステップ。table から scope に一致する行を削除する
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletionStep {
    pub table: UserTable,
    pub scope: Ownership,
}

impl DeletionStep {
    fn of(table: UserTable) -> Self {
        Self {
            table,
            scope: table.ownership(),
        }
    }
}

/// 外部キーの依存順（子テーブルが先）に並んだ削除ステップ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionPlan {
    steps: Vec<DeletionStep>,
}

impl DeletionPlan {
    pub fn standard() -> Self {
        let order = [
            UserTable::ChatMessages,
            UserTable::ChatConversations,
            UserTable::CaseFacts,
            UserTable::Actions,
            UserTable::TimelineEvents,
            UserTable::LegalIssues,
            UserTable::Evidence,
            UserTable::Notes,
            UserTable::UserFacts,
            UserTable::Cases,
            UserTable::Sessions,
            UserTable::Users,
        ];
        Self {
            steps: order.into_iter().map(DeletionStep::of).collect(),
        }
    }

    pub fn steps(&self) -> &[DeletionStep] {
        &self.steps
    }

    pub fn position(&self, table: UserTable) -> Option<usize> {
        self.steps.iter().position(|step| step.table == table)
    }
}

impl Default for DeletionPlan {
    fn default() -> Self {
        Self::standard()
    }
}
