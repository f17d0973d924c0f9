// Process Control Block (PCB) and process table for the EMOS simulator
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::config::MAX_LEVEL;
use crate::services::memory_service::MemoryRegion;

/// Process ID type
pub type ProcessId = u64;

/// Process state enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Ready,      // Waiting in a ready queue
    Running,    // Currently dispatched
    Blocked,    // Waiting for I/O
    Terminated, // Finished or killed
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ProcessState::Ready => "READY",
            ProcessState::Running => "RUNNING",
            ProcessState::Blocked => "BLOCKED",
            ProcessState::Terminated => "TERMINATED",
        };
        f.pad(name)
    }
}

/// Process Control Block (PCB)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessControlBlock {
    pub pid: ProcessId,
    pub name: String,
    pub state: ProcessState,
    /// CPU ticks still needed
    pub remaining: u64,
    pub original_burst: u64,
    /// Creation-time priority hint, clamped to the valid level range
    pub priority: usize,
    /// Current MLFQ level (0 = highest)
    pub level: usize,
    pub memory: Option<MemoryRegion>,
    pub arrived_at: u64,
    pub finished_at: Option<u64>,
    pub cpu_time: u64,
    pub dispatches: u64,
}

impl ProcessControlBlock {
    pub fn is_terminated(&self) -> bool {
        self.state == ProcessState::Terminated
    }

    /// Ticks between arrival and termination
    pub fn turnaround(&self) -> Option<u64> {
        self.finished_at.map(|done| done - self.arrived_at)
    }
}

/// Process management errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessError {
    InvalidBurst,
    ProcessNotFound,
    AlreadyTerminated,
    NotRunnable,
    NotBlocked,
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProcessError::InvalidBurst => write!(f, "CPU burst must be greater than zero"),
            ProcessError::ProcessNotFound => write!(f, "No such process"),
            ProcessError::AlreadyTerminated => write!(f, "Process already terminated"),
            ProcessError::NotRunnable => write!(f, "Process is not runnable"),
            ProcessError::NotBlocked => write!(f, "Process is not blocked"),
        }
    }
}

impl std::error::Error for ProcessError {}

/// Process table - owns every PCB and hands out PIDs
#[derive(Debug, Clone)]
pub struct ProcessTable {
    processes: BTreeMap<ProcessId, ProcessControlBlock>,
    next_pid: ProcessId,
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable {
    pub fn new() -> Self {
        Self {
            processes: BTreeMap::new(),
            next_pid: 1, // Start from PID 1
        }
    }

    /// Create a new READY process at level 0
    pub fn create(
        &mut self,
        name: &str,
        burst: u64,
        priority: i64,
        arrived_at: u64,
    ) -> Result<ProcessId, ProcessError> {
        if burst == 0 {
            return Err(ProcessError::InvalidBurst);
        }

        let pid = self.next_pid;
        self.next_pid += 1;

        let pcb = ProcessControlBlock {
            pid,
            name: String::from(name),
            state: ProcessState::Ready,
            remaining: burst,
            original_burst: burst,
            priority: priority.clamp(0, MAX_LEVEL as i64) as usize,
            level: 0,
            memory: None,
            arrived_at,
            finished_at: None,
            cpu_time: 0,
            dispatches: 0,
        };

        self.processes.insert(pid, pcb);
        log::info!("Created process '{}' with PID {} (burst {})", name, pid, burst);
        Ok(pid)
    }

    pub fn get(&self, pid: ProcessId) -> Result<&ProcessControlBlock, ProcessError> {
        self.processes.get(&pid).ok_or(ProcessError::ProcessNotFound)
    }

    pub fn get_mut(&mut self, pid: ProcessId) -> Result<&mut ProcessControlBlock, ProcessError> {
        self.processes.get_mut(&pid).ok_or(ProcessError::ProcessNotFound)
    }

    /// Look up a process that has not terminated yet
    pub fn get_live(&self, pid: ProcessId) -> Result<&ProcessControlBlock, ProcessError> {
        let pcb = self.get(pid)?;
        if pcb.is_terminated() {
            return Err(ProcessError::AlreadyTerminated);
        }
        Ok(pcb)
    }

    /// Mark a process TERMINATED at `tick`; its memory must already be released
    pub fn terminate(&mut self, pid: ProcessId, tick: u64) -> Result<(), ProcessError> {
        let pcb = self.get_mut(pid)?;
        if pcb.is_terminated() {
            return Err(ProcessError::AlreadyTerminated);
        }
        pcb.state = ProcessState::Terminated;
        pcb.finished_at = Some(tick);
        pcb.memory = None;
        Ok(())
    }

    /// All processes in ascending PID order
    pub fn all(&self) -> impl Iterator<Item = &ProcessControlBlock> {
        self.processes.values()
    }

    /// PIDs of processes that have not terminated
    pub fn live(&self) -> Vec<ProcessId> {
        self.processes
            .values()
            .filter(|pcb| !pcb.is_terminated())
            .map(|pcb| pcb.pid)
            .collect()
    }

    pub fn count_in(&self, state: ProcessState) -> usize {
        self.processes.values().filter(|pcb| pcb.state == state).count()
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pids_are_monotonic() {
        let mut table = ProcessTable::new();
        let a = table.create("a", 5, 0, 0).unwrap();
        let b = table.create("b", 5, 0, 0).unwrap();
        table.terminate(a, 3).unwrap();
        let c = table.create("c", 5, 0, 3).unwrap();
        assert_eq!((a, b, c), (1, 2, 3));
    }

    #[test]
    fn new_process_is_ready_at_top_level() {
        let mut table = ProcessTable::new();
        let pid = table.create("editor", 10, 2, 7).unwrap();
        let pcb = table.get(pid).unwrap();
        assert_eq!(pcb.state, ProcessState::Ready);
        assert_eq!(pcb.level, 0);
        assert_eq!(pcb.priority, 2);
        assert_eq!(pcb.remaining, 10);
        assert_eq!(pcb.original_burst, 10);
        assert_eq!(pcb.arrived_at, 7);
    }

    #[test]
    fn priority_hint_is_clamped() {
        let mut table = ProcessTable::new();
        let high = table.create("h", 1, -4, 0).unwrap();
        let low = table.create("l", 1, 99, 0).unwrap();
        assert_eq!(table.get(high).unwrap().priority, 0);
        assert_eq!(table.get(low).unwrap().priority, MAX_LEVEL);
    }

    #[test]
    fn zero_burst_is_rejected() {
        let mut table = ProcessTable::new();
        assert_eq!(table.create("idle", 0, 0, 0), Err(ProcessError::InvalidBurst));
        assert!(table.is_empty());
        // A rejected create does not consume a PID
        assert_eq!(table.create("next", 1, 0, 0), Ok(1));
    }

    #[test]
    fn terminate_twice_fails() {
        let mut table = ProcessTable::new();
        let pid = table.create("job", 3, 0, 0).unwrap();
        table.terminate(pid, 4).unwrap();
        assert_eq!(table.terminate(pid, 5), Err(ProcessError::AlreadyTerminated));
        assert_eq!(table.get(pid).unwrap().finished_at, Some(4));
        assert_eq!(table.get(pid).unwrap().turnaround(), Some(4));
        assert_eq!(table.get_live(pid), Err(ProcessError::AlreadyTerminated));
        assert_eq!(table.terminate(42, 5), Err(ProcessError::ProcessNotFound));
    }

    #[test]
    fn all_is_ordered_by_pid() {
        let mut table = ProcessTable::new();
        for name in ["x", "y", "z"] {
            table.create(name, 2, 0, 0).unwrap();
        }
        let pids: Vec<_> = table.all().map(|pcb| pcb.pid).collect();
        assert_eq!(pids, vec![1, 2, 3]);
        assert_eq!(table.count_in(ProcessState::Ready), 3);
    }
}
