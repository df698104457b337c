//! Note-taking tool
//!
//! [`NoteCommandInterpreter`] turns a free-text command such as
//! `save note Meeting: call Bob at 3pm` into a [`NoteStore`] operation and a
//! spoken reply. Commands are matched case-insensitively, but titles and
//! contents keep the casing the user gave them.
//!
//! Command forms, in matching priority:
//!
//! | Triggers | Action |
//! |---|---|
//! | `save note`, `create note`, `add note` | create or overwrite |
//! | `get note`, `show note`, `read note` | read by title |
//! | `list notes`, `show all notes`, `what notes` | list all |
//! | `update note`, `edit note` | replace content of an existing note |
//! | `delete note`, `remove note` | delete by title |
//! | `search notes`, `find notes` | substring search |
//! | `save url` | save a URL under a title |
//!
//! Anything else gets the help text.

use super::{query_arg, query_parameters, ToolExecutor, ToolResult};
use crate::error::{MelissaError, Result};
use crate::storage::{Note, NoteStore, SaveOutcome};
use async_trait::async_trait;
use chrono::Local;

/// Reply for input that matches no command
pub const HELP_TEXT: &str = "I can help you manage notes. You can:\n\
- Save a note: 'save note [title]: [content]'\n\
- Save a URL: 'save url [title]: [url]'\n\
- Get a note: 'get note [title]'\n\
- List all notes: 'list notes'\n\
- Update a note: 'update note [title]: [new content]'\n\
- Delete a note: 'delete note [title]'\n\
- Search notes: 'search notes [query]'";

const SAVE_GUIDANCE: &str = "Please provide both a title and content for the note.";
const GET_GUIDANCE: &str = "Please specify which note to retrieve.";
const UPDATE_GUIDANCE: &str = "Please provide both a title and new content for the note. \
Format: update note [title]: [new content]";
const DELETE_GUIDANCE: &str = "Please specify which note to delete.";
const SEARCH_GUIDANCE: &str = "Please provide a search term.";
const SAVE_URL_GUIDANCE: &str =
    "Please provide both a title and URL. Format: save url [title]: [url]";

type Handler = fn(&NoteCommandInterpreter, &str) -> Result<String>;

struct CommandRule {
    triggers: &'static [&'static str],
    handler: Handler,
}

/// First rule with a trigger present in the query wins
const RULES: &[CommandRule] = &[
    CommandRule {
        triggers: &["save note", "create note", "add note"],
        handler: NoteCommandInterpreter::save,
    },
    CommandRule {
        triggers: &["get note", "show note", "read note"],
        handler: NoteCommandInterpreter::get,
    },
    CommandRule {
        triggers: &["list notes", "show all notes", "what notes"],
        handler: NoteCommandInterpreter::list,
    },
    CommandRule {
        triggers: &["update note", "edit note"],
        handler: NoteCommandInterpreter::update,
    },
    CommandRule {
        triggers: &["delete note", "remove note"],
        handler: NoteCommandInterpreter::delete,
    },
    CommandRule {
        triggers: &["search notes", "find notes"],
        handler: NoteCommandInterpreter::search,
    },
    CommandRule {
        triggers: &["save url"],
        handler: NoteCommandInterpreter::save_url,
    },
];

/// Classifies note commands and runs them against a [`NoteStore`]
///
/// Malformed commands produce guidance text, not errors. Only storage
/// failures are returned as `Err`.
///
/// # Examples
///
/// ```
/// use melissa::storage::NoteStore;
/// use melissa::tools::NoteCommandInterpreter;
///
/// let dir = tempfile::tempdir().unwrap();
/// let store = NoteStore::new_with_path(dir.path().join("notes.db")).unwrap();
/// let notes = NoteCommandInterpreter::new(store);
///
/// let reply = notes.handle("save note Meeting: call Bob at 3pm").unwrap();
/// assert_eq!(reply, "Note 'Meeting' saved successfully.");
/// assert!(notes.handle("get note Meeting").unwrap().ends_with("call Bob at 3pm"));
/// ```
#[derive(Debug, Clone)]
pub struct NoteCommandInterpreter {
    store: NoteStore,
}

impl NoteCommandInterpreter {
    /// Create an interpreter over `store`
    pub fn new(store: NoteStore) -> Self {
        Self { store }
    }

    /// The underlying store
    pub fn store(&self) -> &NoteStore {
        &self.store
    }

    /// Interpret one command and return the reply text
    pub fn handle(&self, query: &str) -> Result<String> {
        // ASCII lowercasing keeps byte offsets identical to `query`
        let lowered = query.to_ascii_lowercase();

        for rule in RULES {
            for trigger in rule.triggers {
                if let Some(pos) = lowered.find(trigger) {
                    let argument = query[pos + trigger.len()..].trim();
                    tracing::debug!("Note command '{}' with argument '{}'", trigger, argument);
                    return (rule.handler)(self, argument);
                }
            }
        }

        Ok(HELP_TEXT.to_string())
    }

    fn save(&self, argument: &str) -> Result<String> {
        let Some((title, content)) = split_title_and_content(argument) else {
            return Ok(SAVE_GUIDANCE.to_string());
        };
        self.store_note(title, content)
    }

    fn get(&self, title: &str) -> Result<String> {
        if title.is_empty() {
            return Ok(GET_GUIDANCE.to_string());
        }
        Ok(match self.store.get(title)? {
            Some(note) => format_note(&note),
            None => not_found(title),
        })
    }

    fn list(&self, _argument: &str) -> Result<String> {
        let notes = self.store.list()?;
        if notes.is_empty() {
            return Ok("No notes found.".to_string());
        }
        Ok(format!("Available notes:\n{}", format_listing(&notes)))
    }

    fn update(&self, argument: &str) -> Result<String> {
        let Some((title, content)) = split_on_colon(argument) else {
            return Ok(UPDATE_GUIDANCE.to_string());
        };
        Ok(if self.store.update(title, content)? {
            format!("Note '{}' updated successfully.", title)
        } else {
            not_found(title)
        })
    }

    fn delete(&self, title: &str) -> Result<String> {
        if title.is_empty() {
            return Ok(DELETE_GUIDANCE.to_string());
        }
        Ok(if self.store.delete(title)? {
            format!("Note '{}' deleted successfully.", title)
        } else {
            not_found(title)
        })
    }

    fn search(&self, term: &str) -> Result<String> {
        if term.is_empty() {
            return Ok(SEARCH_GUIDANCE.to_string());
        }
        let notes = self.store.search(term)?;
        if notes.is_empty() {
            return Ok(format!("No notes found matching '{}'.", term));
        }
        Ok(format!(
            "Notes matching '{}':\n{}",
            term,
            format_listing(&notes)
        ))
    }

    fn save_url(&self, argument: &str) -> Result<String> {
        match split_on_colon(argument) {
            // "save url https://..." has no title; the first colon is the scheme's
            Some((title, url)) if !url.starts_with("//") => self.store_note(title, url),
            _ => Ok(SAVE_URL_GUIDANCE.to_string()),
        }
    }

    fn store_note(&self, title: &str, content: &str) -> Result<String> {
        Ok(match self.store.save(title, content)? {
            SaveOutcome::Created => format!("Note '{}' saved successfully.", title),
            SaveOutcome::Updated => format!("Note '{}' updated successfully.", title),
        })
    }
}

/// Split on the first colon; both sides must be non-empty after trimming
fn split_on_colon(text: &str) -> Option<(&str, &str)> {
    let (title, content) = text.split_once(':')?;
    let (title, content) = (title.trim(), content.trim());
    (!title.is_empty() && !content.is_empty()).then_some((title, content))
}

/// `title: content`, or first line as title and the rest as content
fn split_title_and_content(text: &str) -> Option<(&str, &str)> {
    if text.contains(':') {
        return split_on_colon(text);
    }
    let (title, content) = text.split_once('\n')?;
    let (title, content) = (title.trim(), content.trim());
    (!title.is_empty() && !content.is_empty()).then_some((title, content))
}

fn not_found(title: &str) -> String {
    format!("No note found with title '{}'.", title)
}

fn format_note(note: &Note) -> String {
    format!(
        "Note: {}\nCreated: {}\n\n{}",
        note.title,
        note.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
        note.content
    )
}

fn format_listing(notes: &[Note]) -> String {
    notes
        .iter()
        .map(|n| {
            format!(
                "- {} (created: {})",
                n.title,
                n.created_at.with_timezone(&Local).format("%Y-%m-%d")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Exposes the interpreter to the model as the `manage_notes` tool
#[derive(Debug, Clone)]
pub struct NotesTool {
    interpreter: NoteCommandInterpreter,
}

impl NotesTool {
    /// Create the tool over a shared store
    pub fn new(store: NoteStore) -> Self {
        Self {
            interpreter: NoteCommandInterpreter::new(store),
        }
    }
}

#[async_trait]
impl ToolExecutor for NotesTool {
    fn tool_definition(&self) -> serde_json::Value {
        serde_json::json!({
            "name": "manage_notes",
            "description": "Save, read, list, update, delete, and search the user's notes. \
                Pass the user's request as the query, e.g. 'save note Groceries: milk, eggs', \
                'get note Groceries', 'list notes', 'update note Groceries: bread', \
                'delete note Groceries', 'search notes milk', 'save url Docs: https://docs.rs'.",
            "parameters": query_parameters("The note command in the user's own words")
        })
    }

    async fn execute(&self, args: serde_json::Value) -> Result<ToolResult> {
        let query = query_arg(&args).to_string();
        let interpreter = self.interpreter.clone();

        let reply = tokio::task::spawn_blocking(move || interpreter.handle(&query))
            .await
            .map_err(|e| MelissaError::Tool(format!("Note command task failed: {}", e)))??;

        Ok(ToolResult::success(reply))
    }
}
