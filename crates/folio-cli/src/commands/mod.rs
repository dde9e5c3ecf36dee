//! Command implementations.

pub mod import;
pub mod reprocess;
pub mod run;
pub mod sessions;
pub mod stats;

pub use self::import::execute_import;
pub use self::reprocess::execute_reprocess;
pub use self::run::execute_run;
pub use self::sessions::{execute_resume, execute_session, execute_sessions};
pub use self::stats::execute_stats;
