//! Live adapters for real external interactions.

pub mod clock;
pub mod driver;
pub mod filesystem;
pub mod headless;
pub mod id_gen;
pub mod oracle;
pub(crate) mod process;
pub mod shell;
pub mod terminal;
pub mod window;
