//! Checklist task documents.
//!
//! A task document is a markdown file with a `# Title`, optional target
//! markers (`[webapp]: http://localhost:3000`), an optional acceptance
//! criteria section and a checklist. Parsing keeps the original text so an
//! unmodified document renders back byte-for-byte, and marking an item
//! complete changes exactly one byte.

pub mod discover;
pub mod document;
pub mod item;
pub mod target;

pub use discover::discover;
pub use document::{load, save, TaskDocument, TaskStatus};
pub use item::{ChecklistItem, ItemKind};
pub use target::{TargetKind, TargetSpec};
