//! packferry-exec: session-scoped executors
//!
//! The `Executor` capability trait and its implementations: `SshExecutor`
//! for remote hosts (russh + sftp) and `LocalExecutor` for the agent's own
//! machine.

pub mod backup;
pub mod error;
pub mod local;
pub mod result;
pub mod ssh;
pub mod traits;

pub use error::ExecError;
pub use local::LocalExecutor;
pub use result::CommandResult;
pub use ssh::{SshExecutor, SshExecutorFactory};
pub use traits::{Executor, ExecutorFactory};
