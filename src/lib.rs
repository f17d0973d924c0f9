// EMOS Simulator
//
// Teaching model of an operating system's resource managers: a process table,
// a three-level MLFQ scheduler driven one tick at a time, and contiguous
// first-fit memory with coalescing. Each simulation is an owned
// `ProcessService`; nothing in the core is global.
extern crate alloc;

pub mod config;
pub mod console;
pub mod process;
pub mod services;
pub mod shell;
pub mod syscalls;

pub use config::SimConfig;
pub use process::{EventKind, ProcessId, ProcessState, SchedulerEvent};
pub use services::{MemoryRegion, ProcessService, ServiceError};
