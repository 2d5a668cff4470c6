//! Verification triggers.
//!
//! Classifies an agent's todo list into work phases and decides whether a
//! verification should run now, and decides whether an edited file touches
//! UI code. Nothing here writes: the todo list is a one-way snapshot and
//! files are only read through the `FileSystem` port.

pub mod files;
pub mod phase;
pub mod policy;
pub mod todo;

pub use files::{
    auto_verify_config, should_auto_verify, AutoVerifyConfig, FileClassifier, FileMatch, UiCategory,
};
pub use phase::{classify, Phase};
pub use policy::{evaluate, render_prompt, Priority, Trigger, TodoCounts, VerificationContext};
pub use todo::{parse_todos, Todo, TodoStatus};
