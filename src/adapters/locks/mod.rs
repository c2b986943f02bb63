//! Lock adapters implementing the `ProcessingLock` port.

mod in_process;

pub use in_process::InProcessLockMap;
