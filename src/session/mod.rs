
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::indexer::SessionIndex;
use crate::table::Table;

/// One question/answer exchange. Appended in issuance order and never
/// edited or removed afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationRecord {
    pub prompt: String,
    pub answer: String,
    pub model: String,
    pub temperature: f32,
    pub created_at: DateTime<Utc>,
}

/// Mutable state scoped to one interactive session: the cleaned table, the
/// index derived from it, and the conversation history. Created when the
/// session starts and dropped when it ends; nothing here survives the
/// process.
#[derive(Default)]
pub struct Session {
    table: Option<Table>,
    index: Option<SessionIndex>,
    history: Vec<ConversationRecord>,
}

impl Session {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn table(&self) -> Option<&Table> {
        self.table.as_ref()
    }

    /// Install a (cleaned) table. The index is derived from the table, so
    /// any existing index is discarded rather than reused.
    #[inline]
    pub fn set_table(&mut self, table: Table) {
        if self.index.is_some() {
            debug!("Table replaced; discarding the index built from the previous table");
        }
        self.index = None;
        self.table = Some(table);
    }

    #[inline]
    pub fn index(&self) -> Option<&SessionIndex> {
        self.index.as_ref()
    }

    #[inline]
    pub fn set_index(&mut self, index: SessionIndex) {
        self.index = Some(index);
    }

    #[inline]
    pub fn history(&self) -> &[ConversationRecord] {
        &self.history
    }

    #[inline]
    pub fn record_exchange(
        &mut self,
        prompt: impl Into<String>,
        answer: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
    ) {
        self.history.push(ConversationRecord {
            prompt: prompt.into(),
            answer: answer.into(),
            model: model.into(),
            temperature,
            created_at: Utc::now(),
        });
    }
}
