// MLFQ Process Scheduler for the EMOS simulator
//
// Three FIFO ready levels with growing quanta. Only the highest non-empty
// level gets the CPU; a process that uses its whole quantum drops one level,
// and a process coming back from I/O re-enters at level 0.
use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::fmt;

use crate::config::{LEVELS, MAX_LEVEL};
use crate::process::pcb::{ProcessError, ProcessId, ProcessState, ProcessTable};
use crate::services::memory_service::MemoryService;

/// What happened on a scheduler tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Dispatched { pid: ProcessId, level: usize },
    QuantumExpired { pid: ProcessId, from: usize, to: usize },
    Completed { pid: ProcessId, level: usize },
    Idle,
}

/// Timestamped scheduler event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerEvent {
    pub tick: u64,
    pub kind: EventKind,
}

impl fmt::Display for SchedulerEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[TICK {}] ", self.tick)?;
        match self.kind {
            EventKind::Dispatched { pid, level } => {
                write!(f, "PID={} dispatched at level {}", pid, level)
            }
            EventKind::QuantumExpired { pid, from, to } => {
                write!(f, "PID={} quantum expired at level {}; demoted to level {}", pid, from, to)
            }
            EventKind::Completed { pid, level } => {
                write!(f, "PID={} finished execution at level {}", pid, level)
            }
            EventKind::Idle => write!(f, "No ready processes. Scheduler idle."),
        }
    }
}

/// The dispatched process and how much of its quantum it has used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slice {
    pid: ProcessId,
    level: usize,
    used: u32,
}

/// Multi-level feedback queue scheduler
#[derive(Debug, Clone)]
pub struct MlfqScheduler {
    quanta: [u32; LEVELS],
    ready: [VecDeque<ProcessId>; LEVELS],
    blocked: Vec<ProcessId>,
    current: Option<Slice>,
    clock: u64,
    dispatches: u64,
    demotions: u64,
    completions: u64,
    idle_events: u64,
}

impl MlfqScheduler {
    pub fn new(quanta: [u32; LEVELS]) -> Self {
        Self {
            quanta,
            ready: Default::default(),
            blocked: Vec::new(),
            current: None,
            clock: 0,
            dispatches: 0,
            demotions: 0,
            completions: 0,
            idle_events: 0,
        }
    }

    /// Queue a READY process at the tail of `level`
    pub fn admit(&mut self, pid: ProcessId, level: usize) {
        let level = level.min(MAX_LEVEL);
        self.ready[level].push_back(pid);
        log::debug!("PID {} queued at level {}", pid, level);
    }

    /// Move a READY or RUNNING process to the blocked set
    pub fn block(&mut self, table: &mut ProcessTable, pid: ProcessId) -> Result<(), ProcessError> {
        let pcb = table.get_mut(pid)?;
        match pcb.state {
            ProcessState::Running => {
                // Interrupts the rest of the quantum
                if self.running() == Some(pid) {
                    self.current = None;
                }
            }
            ProcessState::Ready => {
                self.remove_from_ready(pid);
            }
            ProcessState::Blocked | ProcessState::Terminated => {
                return Err(ProcessError::NotRunnable);
            }
        }

        pcb.state = ProcessState::Blocked;
        self.blocked.push(pid);
        log::info!("Blocked process PID {} at tick {} (level {})", pid, self.clock, pcb.level);
        Ok(())
    }

    /// I/O completion: BLOCKED -> READY at level 0, tail of the queue
    pub fn unblock(&mut self, table: &mut ProcessTable, pid: ProcessId) -> Result<(), ProcessError> {
        let pcb = table.get_mut(pid)?;
        if pcb.state != ProcessState::Blocked {
            return Err(ProcessError::NotBlocked);
        }

        self.blocked.retain(|&p| p != pid);
        pcb.state = ProcessState::Ready;
        pcb.level = 0;
        self.ready[0].push_back(pid);
        log::info!("Unblocked process PID {} at tick {}, moved to level 0", pid, self.clock);
        Ok(())
    }

    /// Drop `pid` from every scheduler structure; returns whether it was present
    pub fn remove(&mut self, pid: ProcessId) -> bool {
        let mut found = false;
        if self.running() == Some(pid) {
            self.current = None;
            found = true;
        }
        found |= self.remove_from_ready(pid);
        let before = self.blocked.len();
        self.blocked.retain(|&p| p != pid);
        found || self.blocked.len() != before
    }

    fn remove_from_ready(&mut self, pid: ProcessId) -> bool {
        let mut found = false;
        for queue in self.ready.iter_mut() {
            let before = queue.len();
            queue.retain(|&p| p != pid);
            found |= queue.len() != before;
        }
        found
    }

    /// Simulate up to `max_ticks` ticks.
    ///
    /// Stops early with an `Idle` event when nothing is dispatched and every
    /// ready queue is empty. A slice still running when the tick budget runs
    /// out stays dispatched for the next call.
    pub fn run(
        &mut self,
        table: &mut ProcessTable,
        memory: &mut MemoryService,
        max_ticks: u64,
    ) -> Vec<SchedulerEvent> {
        let mut events = Vec::new();

        for _ in 0..max_ticks {
            let slice = match self.current {
                Some(slice) => slice,
                None => match self.dispatch_next(table) {
                    Some(slice) => {
                        events.push(SchedulerEvent {
                            tick: self.clock,
                            kind: EventKind::Dispatched { pid: slice.pid, level: slice.level },
                        });
                        slice
                    }
                    None => {
                        self.idle_events += 1;
                        log::debug!("[TICK {}] No ready processes, scheduler idle", self.clock);
                        events.push(SchedulerEvent { tick: self.clock, kind: EventKind::Idle });
                        break;
                    }
                },
            };

            if let Some(event) = self.execute_tick(table, memory, slice) {
                events.push(event);
            }
        }

        events
    }

    /// Pop the head of the highest non-empty ready level and mark it RUNNING
    fn dispatch_next(&mut self, table: &mut ProcessTable) -> Option<Slice> {
        for level in 0..LEVELS {
            while let Some(pid) = self.ready[level].pop_front() {
                let Ok(pcb) = table.get_mut(pid) else {
                    log::warn!("Dropping unknown PID {} from level {}", pid, level);
                    continue;
                };
                if pcb.state != ProcessState::Ready {
                    log::warn!("Dropping PID {} in state {} from level {}", pid, pcb.state, level);
                    continue;
                }

                pcb.state = ProcessState::Running;
                pcb.level = level;
                pcb.dispatches += 1;
                self.dispatches += 1;

                let slice = Slice { pid, level, used: 0 };
                self.current = Some(slice);
                log::debug!(
                    "[TICK {}] Running PID={} at level={} (quantum={}, remaining={})",
                    self.clock,
                    pid,
                    level,
                    self.quanta[level],
                    pcb.remaining
                );
                return Some(slice);
            }
        }
        None
    }

    /// Consume one tick for the dispatched slice
    fn execute_tick(
        &mut self,
        table: &mut ProcessTable,
        memory: &mut MemoryService,
        slice: Slice,
    ) -> Option<SchedulerEvent> {
        let Ok(pcb) = table.get_mut(slice.pid) else {
            self.current = None;
            return None;
        };

        self.clock += 1;
        pcb.remaining -= 1;
        pcb.cpu_time += 1;
        let used = slice.used + 1;
        log::trace!("[TICK {}] PID={} remaining={}", self.clock, slice.pid, pcb.remaining);

        if pcb.remaining == 0 {
            let owns_memory = pcb.memory.is_some();
            self.current = None;
            self.completions += 1;

            if owns_memory {
                if let Err(e) = memory.free(slice.pid) {
                    log::warn!("PID {} finished but its memory could not be freed: {}", slice.pid, e);
                }
            }
            if let Err(e) = table.terminate(slice.pid, self.clock) {
                log::warn!("PID {} finished but could not be terminated: {}", slice.pid, e);
            }

            log::info!("[TICK {}] PID={} finished execution", self.clock, slice.pid);
            return Some(SchedulerEvent {
                tick: self.clock,
                kind: EventKind::Completed { pid: slice.pid, level: slice.level },
            });
        }

        if used >= self.quanta[slice.level] {
            let to = (slice.level + 1).min(MAX_LEVEL);
            pcb.state = ProcessState::Ready;
            pcb.level = to;
            self.ready[to].push_back(slice.pid);
            self.current = None;
            self.demotions += 1;

            log::debug!(
                "[TICK {}] PID={} quantum expired; demoted to level {}",
                self.clock,
                slice.pid,
                to
            );
            return Some(SchedulerEvent {
                tick: self.clock,
                kind: EventKind::QuantumExpired { pid: slice.pid, from: slice.level, to },
            });
        }

        self.current = Some(Slice { used, ..slice });
        None
    }

    /// Current simulated time
    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// PID of the dispatched process, if any
    pub fn running(&self) -> Option<ProcessId> {
        self.current.map(|slice| slice.pid)
    }

    /// Ticks the dispatched process has used of its current quantum
    pub fn quantum_used(&self) -> Option<u32> {
        self.current.map(|slice| slice.used)
    }

    pub fn ready_queue(&self, level: usize) -> Vec<ProcessId> {
        self.ready[level.min(MAX_LEVEL)].iter().copied().collect()
    }

    pub fn blocked(&self) -> &[ProcessId] {
        &self.blocked
    }

    /// Check that every live process sits in exactly the place its state says
    pub fn check_membership(&self, table: &ProcessTable) -> Result<(), String> {
        let mut seen: Vec<ProcessId> = Vec::new();
        let mut record = |pid: ProcessId, place: &str| -> Result<(), String> {
            if seen.contains(&pid) {
                return Err(format!("PID {} appears twice (again in {})", pid, place));
            }
            seen.push(pid);
            Ok(())
        };

        for (level, queue) in self.ready.iter().enumerate() {
            for &pid in queue {
                record(pid, "ready queue")?;
                let pcb = table.get(pid).map_err(|e| format!("PID {}: {}", pid, e))?;
                if pcb.state != ProcessState::Ready || pcb.level != level {
                    return Err(format!(
                        "PID {} in ready level {} but is {} at level {}",
                        pid, level, pcb.state, pcb.level
                    ));
                }
            }
        }
        for &pid in &self.blocked {
            record(pid, "blocked set")?;
            let pcb = table.get(pid).map_err(|e| format!("PID {}: {}", pid, e))?;
            if pcb.state != ProcessState::Blocked {
                return Err(format!("PID {} in blocked set but is {}", pid, pcb.state));
            }
        }
        if let Some(slice) = self.current {
            record(slice.pid, "dispatch slot")?;
            let pcb = table.get(slice.pid).map_err(|e| format!("PID {}: {}", slice.pid, e))?;
            if pcb.state != ProcessState::Running {
                return Err(format!("PID {} dispatched but is {}", slice.pid, pcb.state));
            }
        }

        for pid in table.live() {
            if !seen.contains(&pid) {
                return Err(format!("live PID {} is not queued, blocked or dispatched", pid));
            }
        }
        Ok(())
    }

    /// Get scheduler statistics
    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            clock: self.clock,
            running: self.running(),
            ready_lengths: core::array::from_fn(|level| self.ready[level].len()),
            blocked: self.blocked.len(),
            dispatches: self.dispatches,
            demotions: self.demotions,
            completions: self.completions,
            idle_events: self.idle_events,
        }
    }
}

/// Scheduler statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerStats {
    pub clock: u64,
    pub running: Option<ProcessId>,
    pub ready_lengths: [usize; LEVELS],
    pub blocked: usize,
    pub dispatches: u64,
    pub demotions: u64,
    pub completions: u64,
    pub idle_events: u64,
}
