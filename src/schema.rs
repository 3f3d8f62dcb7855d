//! chat.db schema definitions
//!
//! Table and column names of the macOS Messages archive that the SQLite
//! adapter reads. Only the columns the adapter touches are listed.

/// Handles (phone numbers and email addresses of participants)
pub mod handle {
    /// Table name
    pub const TABLE: &str = "handle";
    /// Primary key column
    pub const ROWID: &str = "ROWID";
    /// Phone number or email address
    pub const ID: &str = "id";
}

/// Messages
pub mod message {
    /// Table name
    pub const TABLE: &str = "message";
    /// Nanoseconds (seconds on old archives) since 2001-01-01 UTC
    pub const DATE: &str = "date";
    /// Plain text body, often NULL on recent archives
    pub const TEXT: &str = "text";
    /// 1 when the archive owner sent the message
    pub const IS_FROM_ME: &str = "is_from_me";
    /// Serialized attributed-string body
    pub const ATTRIBUTED_BODY: &str = "attributedBody";
    /// Foreign key to the handle table
    pub const HANDLE_ID: &str = "handle_id";
}
