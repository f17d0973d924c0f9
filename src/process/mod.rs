// Process Management Module for the EMOS simulator
pub mod pcb;
pub mod scheduler;

pub use pcb::{ProcessControlBlock, ProcessError, ProcessId, ProcessState, ProcessTable};
pub use scheduler::{EventKind, MlfqScheduler, SchedulerEvent, SchedulerStats};
