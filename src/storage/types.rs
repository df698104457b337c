use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A titled, persisted text record
///
/// The title is the note's identity; it is unique and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Unique title
    pub title: String,
    /// Body text (a URL for notes saved with `save url`)
    pub content: String,
    /// When the note was first saved; never changes afterwards
    pub created_at: DateTime<Utc>,
    /// When the note was last written
    pub updated_at: DateTime<Utc>,
}

/// Whether a save created a new note or overwrote an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// No note had this title before
    Created,
    /// An existing note's content was replaced
    Updated,
}
