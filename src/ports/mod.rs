//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the verification core and an
//! external system (time, filesystem, IDs, subprocesses, browser automation,
//! terminal hosts, window capture, the verification oracle).
//! Implementations live in `src/adapters/`.

pub mod clock;
pub mod driver;
pub mod filesystem;
pub mod headless;
pub mod id_gen;
pub mod oracle;
pub mod shell;
pub mod terminal;
pub mod window;

pub use clock::Clock;
pub use driver::{BrowserDriver, DriverAction, DriverFuture};
pub use filesystem::FileSystem;
pub use headless::{HeadlessBrowser, HeadlessFuture};
pub use id_gen::IdGenerator;
pub use oracle::{Attachment, OracleClient, OracleFuture, OracleRequest, OracleResponse};
pub use shell::{ShellExecutor, ShellFuture, ShellOutput};
pub use terminal::{TerminalFuture, TerminalHost};
pub use window::{WindowCapture, WindowFuture};
