//! Removal of reasoning markup from model replies
//!
//! Some local models wrap their deliberation in delimiters such as
//! `<think>...</think>`. That text must never be shown or spoken.

use crate::config::ReasoningConfig;
use crate::error::{MelissaError, Result};
use regex::Regex;

/// Strips delimited reasoning blocks from reply text
#[derive(Debug, Clone)]
pub struct ReasoningStripper {
    block: Regex,
    open_tag: String,
}

impl ReasoningStripper {
    /// Build a stripper for the given delimiters
    ///
    /// # Errors
    ///
    /// Returns `MelissaError::Config` if a delimiter is empty
    ///
    /// # Examples
    ///
    /// ```
    /// use melissa::agent::reasoning::ReasoningStripper;
    ///
    /// let stripper = ReasoningStripper::new("<think>", "</think>").unwrap();
    /// assert_eq!(stripper.strip("<think>hmm</think> It is 9:05."), "It is 9:05.");
    /// ```
    pub fn new(open_tag: &str, close_tag: &str) -> Result<Self> {
        if open_tag.is_empty() || close_tag.is_empty() {
            return Err(
                MelissaError::Config("Reasoning delimiters cannot be empty".to_string()).into(),
            );
        }

        let pattern = format!(
            "(?s){}.*?{}",
            regex::escape(open_tag),
            regex::escape(close_tag)
        );
        let block = Regex::new(&pattern)
            .map_err(|e| MelissaError::Config(format!("Invalid reasoning delimiters: {}", e)))?;

        Ok(Self {
            block,
            open_tag: open_tag.to_string(),
        })
    }

    /// Build a stripper from configuration
    pub fn from_config(config: &ReasoningConfig) -> Result<Self> {
        Self::new(&config.open_tag, &config.close_tag)
    }

    /// Remove every complete block, then anything after an unclosed opener,
    /// and trim the result
    pub fn strip(&self, content: &str) -> String {
        let without_blocks = self.block.replace_all(content, "");
        let visible = match without_blocks.find(&self.open_tag) {
            Some(pos) => &without_blocks[..pos],
            None => &without_blocks[..],
        };
        visible.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stripper() -> ReasoningStripper {
        ReasoningStripper::new("<think>", "</think>").unwrap()
    }

    #[test]
    fn test_strip_single_block() {
        assert_eq!(
            stripper().strip("<think>\nThe user wants the time.\n</think>\n\nIt is 09:05."),
            "It is 09:05."
        );
    }

    #[test]
    fn test_strip_block_between_text() {
        assert_eq!(
            stripper().strip("Sure. <think>check notes</think> Done."),
            "Sure.  Done."
        );
    }

    #[test]
    fn test_strip_multiple_blocks() {
        assert_eq!(
            stripper().strip("<think>a</think>One<think>b</think> two"),
            "One two"
        );
    }

    #[test]
    fn test_strip_without_block_only_trims() {
        assert_eq!(stripper().strip("  plain answer \n"), "plain answer");
    }

    #[test]
    fn test_strip_unterminated_block_drops_rest() {
        assert_eq!(
            stripper().strip("Partial answer <think>still thinking"),
            "Partial answer"
        );
        assert_eq!(stripper().strip("<think>never closed"), "");
    }

    #[test]
    fn test_custom_delimiters_are_literal() {
        let s = ReasoningStripper::new("[[", "]]").unwrap();
        assert_eq!(s.strip("[[x.*y]] ok"), "ok");
    }

    #[test]
    fn test_empty_delimiter_rejected() {
        assert!(ReasoningStripper::new("", "</think>").is_err());
        assert!(ReasoningStripper::new("<think>", "").is_err());
    }
}
