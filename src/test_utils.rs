//! Test utilities for Melissa
//!
//! Shared helpers for unit tests: throwaway note stores, scratch files, and
//! error assertions.

use crate::storage::NoteStore;
use std::path::PathBuf;
use tempfile::TempDir;

/// Create a temporary directory for testing
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Create a note store backed by a database in a fresh temporary directory
///
/// Keep the returned `TempDir` alive for as long as the store is used.
pub fn temp_note_store() -> (NoteStore, TempDir) {
    let dir = temp_dir();
    let store =
        NoteStore::new_with_path(dir.path().join("notes.db")).expect("Failed to open note store");
    (store, dir)
}

/// Create a test file with the given content
///
/// # Panics
///
/// Panics if file creation or writing fails
pub fn create_test_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Assert that an error contains the expected message
///
/// # Panics
///
/// Panics if the result is Ok or if the error doesn't contain the expected message
pub fn assert_error_contains<T: std::fmt::Debug>(result: crate::error::Result<T>, expected: &str) {
    match result {
        Ok(value) => panic!("Expected error containing '{}', got Ok({:?})", expected, value),
        Err(e) => {
            let message = format!("{:#}", e);
            assert!(
                message.contains(expected),
                "Expected error containing '{}', got '{}'",
                expected,
                message
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MelissaError;

    #[test]
    fn test_temp_note_store_is_empty() {
        let (store, _dir) = temp_note_store();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_create_test_file() {
        let dir = temp_dir();
        let path = create_test_file(&dir, "profile.json", r#"{"name": "Ada"}"#);
        assert_eq!(std::fs::read_to_string(path).unwrap(), r#"{"name": "Ada"}"#);
    }

    #[test]
    fn test_assert_error_contains() {
        let result: crate::error::Result<()> =
            Err(MelissaError::Config("invalid host".to_string()).into());
        assert_error_contains(result, "invalid host");
    }

    #[test]
    #[should_panic(expected = "Expected error containing")]
    fn test_assert_error_contains_panics_on_ok() {
        assert_error_contains(Ok(1), "anything");
    }
}
