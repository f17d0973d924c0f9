// Interactive shell for the EMOS simulator
use alloc::string::String;
use core::fmt::Write as _;
use std::io::{self, BufRead, Write};

use crate::config::{ConfigError, SimConfig, LEVELS};
use crate::process::pcb::ProcessId;
use crate::services::file_system_service::FileSystemService;
use crate::services::process_service::{ProcessService, SystemSnapshot, SystemStats, TurnaroundStats};
use crate::services::RegionTag;
use crate::syscalls::{handle_request, Request, Response, SyscallError, USAGE};

const PROMPT: &str = "emos> ";

/// A simulation plus its file store, driven one command line at a time
pub struct Shell {
    sim: ProcessService,
    fs: FileSystemService,
}

impl Shell {
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            sim: ProcessService::new(config)?,
            fs: FileSystemService::new(),
        })
    }

    pub fn simulation(&self) -> &ProcessService {
        &self.sim
    }

    /// Parse and handle one command line
    pub fn execute(&mut self, line: &str) -> Result<Response, SyscallError> {
        let request = Request::parse(line)?;
        handle_request(&mut self.sim, &mut self.fs, request)
    }

    /// Read commands until `exit` or end of input
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> io::Result<()> {
        writeln!(output, "=== EMOS Simulator === (type 'help' for commands)")?;
        write!(output, "{}", PROMPT)?;
        output.flush()?;

        for line in input.lines() {
            let line = line?;
            if !line.trim().is_empty() {
                match self.execute(&line) {
                    Ok(Response::Exit) => {
                        writeln!(output, "Exiting simulator.")?;
                        return Ok(());
                    }
                    Ok(response) => output.write_all(render(&response).as_bytes())?,
                    Err(err) => {
                        log::debug!("Rejected '{}': {:?}", line.trim(), err);
                        writeln!(output, "Error: {}", err)?;
                    }
                }
            }
            write!(output, "{}", PROMPT)?;
            output.flush()?;
        }

        writeln!(output)?;
        Ok(())
    }
}

/// Format a response for the terminal
pub fn render(response: &Response) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = write_response(&mut out, response);
    out
}

fn write_response(out: &mut String, response: &Response) -> core::fmt::Result {
    match response {
        Response::Created(pid) => writeln!(out, "[CREATE] PID={}", pid),
        Response::Killed(pid) => writeln!(out, "[KILL] PID={} terminated and resources freed.", pid),
        Response::State(snapshot) => render_state(out, snapshot),
        Response::Ran { events, finished } => {
            for event in events {
                writeln!(out, "{}", event)?;
            }
            render_turnaround(out, "Finished this run:", finished)
        }
        Response::Blocked(pid) => writeln!(out, "[BLOCK] PID={} blocked for I/O.", pid),
        Response::Unblocked(pid) => {
            writeln!(out, "[IO] PID={} I/O complete, moved to ready (level 0).", pid)
        }
        Response::Allocated { pid, region } => {
            writeln!(out, "[ALLOC] PID={} allocated memory {}", pid, region)
        }
        Response::Freed { pid, region } => {
            writeln!(out, "[FREE] Freed memory {} of PID={}", region, pid)
        }
        Response::FileWritten { name, bytes, replaced } => {
            let verb = if *replaced { "Overwrote" } else { "Created" };
            writeln!(out, "[FS] {} file '{}' ({} bytes)", verb, name, bytes)
        }
        Response::FileContents { name, data } => writeln!(
            out,
            "[FS] {} ({} bytes):\n{}",
            name,
            data.len(),
            String::from_utf8_lossy(data)
        ),
        Response::FileDeleted(name) => writeln!(out, "[FS] Deleted file '{}'", name),
        Response::Files(files) => render_files(out, files),
        Response::Stats(stats) => render_stats(out, stats),
        Response::Report(report) => render_turnaround(out, "Terminated processes:", report),
        Response::Help => {
            for line in USAGE {
                writeln!(out, "  {}", line)?;
            }
            Ok(())
        }
        Response::Exit => Ok(()),
    }
}

fn render_files(out: &mut String, files: &[(String, usize)]) -> core::fmt::Result {
    if files.is_empty() {
        return writeln!(out, "[FS] No files");
    }
    for (name, size) in files {
        writeln!(out, "{:<16} {:>6} bytes", name, size)?;
    }
    Ok(())
}

fn pid_list(pids: &[ProcessId]) -> String {
    let items: Vec<String> = pids.iter().map(|pid| pid.to_string()).collect();
    format!("[{}]", items.join(", "))
}

fn render_state(out: &mut String, snapshot: &SystemSnapshot) -> core::fmt::Result {
    writeln!(out, "Clock: tick {}", snapshot.clock)?;
    writeln!(
        out,
        "PID | Name     | State      | Remaining | Burst | Level | Priority | MemBlock"
    )?;
    for pcb in &snapshot.processes {
        let block = match pcb.memory {
            Some(region) => region.to_string(),
            None => String::from("-"),
        };
        writeln!(
            out,
            "{:3} | {:8} | {:10} | {:9} | {:5} | {:5} | {:8} | {}",
            pcb.pid, pcb.name, pcb.state, pcb.remaining, pcb.original_burst, pcb.level, pcb.priority, block
        )?;
    }

    for level in 0..LEVELS {
        writeln!(out, "Ready L{}: {}", level, pid_list(&snapshot.ready[level]))?;
    }
    writeln!(out, "Blocked: {}", pid_list(&snapshot.blocked))?;
    match snapshot.running {
        Some(pid) => writeln!(out, "Running: PID {}", pid)?,
        None => writeln!(out, "Running: none")?,
    }

    writeln!(
        out,
        "Memory: {} of {} free, largest free block {}",
        snapshot.free_total, snapshot.capacity, snapshot.largest_free
    )?;
    for region in &snapshot.regions {
        match region.tag {
            RegionTag::Free => writeln!(out, "  {:>12}  free", region.to_string())?,
            RegionTag::Owned(pid) => writeln!(out, "  {:>12}  PID {}", region.to_string(), pid)?,
        }
    }
    Ok(())
}

fn render_turnaround(out: &mut String, title: &str, report: &[TurnaroundStats]) -> core::fmt::Result {
    if report.is_empty() {
        return Ok(());
    }
    writeln!(out, "{}", title)?;
    for stats in report {
        let how = if stats.completed { "" } else { " (killed)" };
        writeln!(
            out,
            "PID={} Name={} Burst={} Executed={} Turnaround={} Waiting={}{}",
            stats.pid, stats.name, stats.original_burst, stats.executed, stats.turnaround, stats.waiting, how
        )?;
    }
    Ok(())
}

fn render_stats(out: &mut String, stats: &SystemStats) -> core::fmt::Result {
    let sched = &stats.scheduler;
    writeln!(out, "Processes: {} total", stats.total_processes)?;
    writeln!(
        out,
        "  Running: {}, Ready: {}, Blocked: {}, Terminated: {}",
        stats.running_processes, stats.ready_processes, stats.blocked_processes, stats.terminated_processes
    )?;
    writeln!(
        out,
        "Scheduler: tick {}, {} dispatches, {} demotions, {} completions, {} idle",
        sched.clock, sched.dispatches, sched.demotions, sched.completions, sched.idle_events
    )?;
    writeln!(
        out,
        "Memory: {} used, {} free in {} fragment(s)",
        stats.memory_used, stats.memory_free, stats.free_fragments
    )
}
