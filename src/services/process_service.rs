// Process Management Service for the EMOS simulator
use alloc::string::String;
use alloc::vec::Vec;

use crate::config::{ConfigError, SimConfig, LEVELS};
use crate::process::pcb::{ProcessControlBlock, ProcessId, ProcessState, ProcessTable};
use crate::process::scheduler::{MlfqScheduler, SchedulerEvent, SchedulerStats};
use crate::services::memory_service::{MemoryRegion, MemoryService};
use crate::services::ServiceError;

/// Process Management Service - one simulation instance.
///
/// Coordinates the process table, the MLFQ scheduler and the memory service.
/// Every operation validates first and mutates only once it cannot fail, so a
/// rejected request leaves the whole simulation untouched.
#[derive(Debug, Clone)]
pub struct ProcessService {
    config: SimConfig,
    table: ProcessTable,
    scheduler: MlfqScheduler,
    memory: MemoryService,
}

impl ProcessService {
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            table: ProcessTable::new(),
            scheduler: MlfqScheduler::new(config.quanta),
            memory: MemoryService::new(config.memory_size),
            config,
        })
    }

    /// Create a process and queue it for scheduling
    pub fn create_process(
        &mut self,
        name: &str,
        burst: u64,
        priority: i64,
    ) -> Result<ProcessId, ServiceError> {
        let pid = self.table.create(name, burst, priority, self.scheduler.clock())?;

        let pcb = self.table.get_mut(pid)?;
        if self.config.honor_priority_hint {
            pcb.level = pcb.priority;
        }
        self.scheduler.admit(pid, pcb.level);
        Ok(pid)
    }

    /// Terminate a process and release everything it holds
    pub fn kill_process(&mut self, pid: ProcessId) -> Result<(), ServiceError> {
        self.table.get_live(pid)?;

        self.scheduler.remove(pid);
        if self.memory.region_of(pid).is_some() {
            self.memory.free(pid)?;
        }
        self.table.terminate(pid, self.scheduler.clock())?;

        log::info!("Killed process PID {}; resources freed", pid);
        Ok(())
    }

    pub fn block_process(&mut self, pid: ProcessId) -> Result<(), ServiceError> {
        Ok(self.scheduler.block(&mut self.table, pid)?)
    }

    /// Signal I/O completion for a blocked process
    pub fn unblock_process(&mut self, pid: ProcessId) -> Result<(), ServiceError> {
        Ok(self.scheduler.unblock(&mut self.table, pid)?)
    }

    /// Give a live process one contiguous region
    pub fn allocate_memory(&mut self, pid: ProcessId, size: usize) -> Result<MemoryRegion, ServiceError> {
        let pcb = self.table.get_live(pid)?;
        if size == 0 {
            return Err(ServiceError::InvalidSize);
        }
        if pcb.memory.is_some() {
            return Err(ServiceError::AlreadyOwnsMemory);
        }

        let region = self.memory.allocate(pid, size)?;
        self.table.get_mut(pid)?.memory = Some(region);
        Ok(region)
    }

    pub fn free_memory(&mut self, pid: ProcessId) -> Result<MemoryRegion, ServiceError> {
        if self.table.get(pid)?.memory.is_none() {
            return Err(ServiceError::NotOwned);
        }

        let region = self.memory.free(pid)?;
        self.table.get_mut(pid)?.memory = None;
        Ok(region)
    }

    /// Run the scheduler for at most `max_ticks` ticks
    pub fn run_scheduler(&mut self, max_ticks: u64) -> Result<Vec<SchedulerEvent>, ServiceError> {
        if max_ticks == 0 {
            return Err(ServiceError::InvalidTicks);
        }
        Ok(self.scheduler.run(&mut self.table, &mut self.memory, max_ticks))
    }

    /// Read-only copy of processes, queues and memory
    pub fn snapshot(&self) -> SystemSnapshot {
        SystemSnapshot {
            clock: self.scheduler.clock(),
            processes: self.table.all().cloned().collect(),
            regions: self.memory.regions().to_vec(),
            ready: core::array::from_fn(|level| self.scheduler.ready_queue(level)),
            blocked: self.scheduler.blocked().to_vec(),
            running: self.scheduler.running(),
            capacity: self.memory.capacity(),
            free_total: self.memory.free_total(),
            largest_free: self.memory.largest_free(),
        }
    }

    /// Turnaround and waiting time of every terminated process
    pub fn turnaround_report(&self) -> Vec<TurnaroundStats> {
        self.table
            .all()
            .filter_map(|pcb| {
                let turnaround = pcb.turnaround()?;
                Some(TurnaroundStats {
                    pid: pcb.pid,
                    name: pcb.name.clone(),
                    original_burst: pcb.original_burst,
                    executed: pcb.cpu_time,
                    turnaround,
                    waiting: turnaround.saturating_sub(pcb.cpu_time),
                    completed: pcb.remaining == 0,
                })
            })
            .collect()
    }

    /// Get system statistics
    pub fn system_stats(&self) -> SystemStats {
        SystemStats {
            total_processes: self.table.len(),
            running_processes: self.table.count_in(ProcessState::Running),
            ready_processes: self.table.count_in(ProcessState::Ready),
            blocked_processes: self.table.count_in(ProcessState::Blocked),
            terminated_processes: self.table.count_in(ProcessState::Terminated),
            scheduler: self.scheduler.stats(),
            memory_used: self.memory.used_total(),
            memory_free: self.memory.free_total(),
            free_fragments: self.memory.fragment_count(),
        }
    }

    /// Check the memory layout, queue membership and process/region agreement
    pub fn check_invariants(&self) -> Result<(), String> {
        self.memory.check_layout()?;
        self.scheduler.check_membership(&self.table)?;

        for pcb in self.table.all() {
            let owned = self.memory.region_of(pcb.pid);
            if pcb.memory != owned {
                return Err(format!(
                    "PID {} records {:?} but the memory map says {:?}",
                    pcb.pid, pcb.memory, owned
                ));
            }
            if pcb.is_terminated() && pcb.memory.is_some() {
                return Err(format!("terminated PID {} still owns memory", pcb.pid));
            }
        }
        Ok(())
    }

    pub fn process(&self, pid: ProcessId) -> Result<&ProcessControlBlock, ServiceError> {
        Ok(self.table.get(pid)?)
    }

    pub fn clock(&self) -> u64 {
        self.scheduler.clock()
    }

    pub fn memory(&self) -> &MemoryService {
        &self.memory
    }

    pub fn scheduler(&self) -> &MlfqScheduler {
        &self.scheduler
    }
}

/// Read-only view of a simulation, for reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemSnapshot {
    pub clock: u64,
    pub processes: Vec<ProcessControlBlock>,
    pub regions: Vec<MemoryRegion>,
    pub ready: [Vec<ProcessId>; LEVELS],
    pub blocked: Vec<ProcessId>,
    pub running: Option<ProcessId>,
    pub capacity: usize,
    pub free_total: usize,
    pub largest_free: usize,
}

/// Per-process timing once terminated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnaroundStats {
    pub pid: ProcessId,
    pub name: String,
    pub original_burst: u64,
    pub executed: u64,
    pub turnaround: u64,
    pub waiting: u64,
    /// False when the process was killed before finishing its burst
    pub completed: bool,
}

/// System statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemStats {
    pub total_processes: usize,
    pub running_processes: usize,
    pub ready_processes: usize,
    pub blocked_processes: usize,
    pub terminated_processes: usize,
    pub scheduler: SchedulerStats,
    pub memory_used: usize,
    pub memory_free: usize,
    pub free_fragments: usize,
}
