//! Message sources
//!
//! A [`MessageSource`] yields [`RawMessageRecord`]s in timestamp order,
//! optionally restricted to one sender. The analysis core never touches the
//! storage format directly.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rusqlite::{params_from_iter, Connection, OpenFlags};
use tracing::{debug, info};

use crate::error::{AnalysisError, Result};
use crate::models::{RawMessageRecord, SenderFilter};
use crate::schema::{handle, message};
use crate::validation::normalize_contact_identifier;

/// Read-only row source
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Load every row that passes `filter`, oldest first
    async fn load(&self, filter: SenderFilter) -> Result<Vec<RawMessageRecord>>;
}

/// Rows held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    rows: Vec<RawMessageRecord>,
}

impl InMemorySource {
    /// Source over the given rows, which must already be in timestamp order
    #[must_use]
    pub const fn new(rows: Vec<RawMessageRecord>) -> Self {
        Self { rows }
    }
}

#[async_trait]
impl MessageSource for InMemorySource {
    async fn load(&self, filter: SenderFilter) -> Result<Vec<RawMessageRecord>> {
        Ok(self
            .rows
            .iter()
            .filter(|row| filter.accepts(row.is_from_me))
            .cloned()
            .collect())
    }
}

/// Reads one contact's messages from a Messages `chat.db`
#[derive(Debug, Clone)]
pub struct ChatDbSource {
    path: PathBuf,
    contact: String,
}

impl ChatDbSource {
    /// Source for `contact` (phone number or email) in the archive at `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, contact: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contact: contact.into(),
        }
    }
}

#[async_trait]
impl MessageSource for ChatDbSource {
    async fn load(&self, filter: SenderFilter) -> Result<Vec<RawMessageRecord>> {
        let path = self.path.clone();
        let contact = self.contact.clone();
        tokio::task::spawn_blocking(move || read_chat_db(&path, &contact, filter)).await?
    }
}

fn unavailable(context: &str, err: impl std::fmt::Display) -> AnalysisError {
    AnalysisError::SourceUnavailable(format!("{context}: {err}"))
}

fn read_chat_db(path: &Path, contact: &str, filter: SenderFilter) -> Result<Vec<RawMessageRecord>> {
    if !path.exists() {
        return Err(AnalysisError::SourceUnavailable(format!(
            "database not found at {}",
            path.display()
        )));
    }

    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| unavailable("failed to open database", e))?;

    let identifier = normalize_contact_identifier(contact);
    let handles = resolve_handles(&conn, &identifier)?;
    if handles.is_empty() {
        return Err(AnalysisError::SourceUnavailable(format!(
            "no handle matches contact {identifier}"
        )));
    }
    debug!(contact = %identifier, handles = handles.len(), "Resolved handles");

    let rows = load_rows(&conn, &handles, filter)?;
    info!(rows = rows.len(), path = %path.display(), "Loaded message rows");
    Ok(rows)
}

fn resolve_handles(conn: &Connection, identifier: &str) -> Result<Vec<i64>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE {} LIKE ?1",
        handle::ROWID,
        handle::TABLE,
        handle::ID
    );
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| unavailable("failed to prepare handle query", e))?;
    let ids = stmt
        .query_map([format!("%{identifier}%")], |row| row.get::<_, i64>(0))
        .map_err(|e| unavailable("failed to query handles", e))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| unavailable("failed to read handle row", e))?;
    Ok(ids)
}

fn load_rows(conn: &Connection, handles: &[i64], filter: SenderFilter) -> Result<Vec<RawMessageRecord>> {
    let placeholders = vec!["?"; handles.len()].join(", ");
    let sender_clause = match filter {
        SenderFilter::All => String::new(),
        SenderFilter::Me => format!(" AND {} = 1", message::IS_FROM_ME),
        SenderFilter::Them => format!(" AND {} = 0", message::IS_FROM_ME),
    };
    let sql = format!(
        "SELECT {date}, {text}, {from_me}, {body} FROM {table} \
         WHERE {handle} IN ({placeholders}){sender_clause} ORDER BY {date}",
        date = message::DATE,
        text = message::TEXT,
        from_me = message::IS_FROM_ME,
        body = message::ATTRIBUTED_BODY,
        table = message::TABLE,
        handle = message::HANDLE_ID,
    );

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| unavailable("failed to prepare message query", e))?;
    let rows = stmt
        .query_map(params_from_iter(handles.iter()), |row| {
            Ok(RawMessageRecord {
                timestamp: row.get::<_, Option<i64>>(0)?.unwrap_or_default(),
                text: row.get(1)?,
                is_from_me: row.get::<_, Option<i64>>(2)?.unwrap_or_default() != 0,
                payload: row.get(3)?,
            })
        })
        .map_err(|e| unavailable("failed to query messages", e))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| unavailable("failed to read message row", e))?;

    Ok(rows)
}
