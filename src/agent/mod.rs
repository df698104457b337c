//! Agent module for Melissa
//!
//! This module contains the conversation orchestrator, the session
//! transcript, tool dispatch, and reasoning-markup removal.

pub mod conversation;
pub mod core;
pub mod dispatcher;
pub mod reasoning;

pub use conversation::Conversation;
pub use core::Agent;
pub use dispatcher::{
    DispatchObserver, FailureReason, ToolDispatcher, ToolFailure, ToolOutput, TracingObserver,
};
pub use reasoning::ReasoningStripper;
