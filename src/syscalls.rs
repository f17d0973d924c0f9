// src/syscalls.rs
//
// Driver requests: parsed from a command line, dispatched onto a simulation
// and the file store, answered with a typed response.
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use crate::config::DEFAULT_RUN_TICKS;
use crate::process::pcb::ProcessId;
use crate::process::scheduler::{EventKind, SchedulerEvent};
use crate::services::file_system_service::{FileSystemError, FileSystemService};
use crate::services::memory_service::MemoryRegion;
use crate::services::process_service::{ProcessService, SystemSnapshot, SystemStats, TurnaroundStats};
use crate::services::ServiceError;

/// A driver request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    CreateProcess { name: String, burst: u64, priority: i64 },
    KillProcess { pid: ProcessId },
    ShowState,
    RunScheduler { max_ticks: u64 },
    BlockProcess { pid: ProcessId },
    UnblockProcess { pid: ProcessId },
    AllocateMemory { pid: ProcessId, size: usize },
    FreeMemory { pid: ProcessId },
    WriteFile { name: String, content: String },
    ReadFile { name: String },
    DeleteFile { name: String },
    ListFiles,
    Stats,
    Report,
    Help,
    Exit,
}

/// Result of a successful request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Created(ProcessId),
    Killed(ProcessId),
    State(SystemSnapshot),
    Ran {
        events: Vec<SchedulerEvent>,
        finished: Vec<TurnaroundStats>,
    },
    Blocked(ProcessId),
    Unblocked(ProcessId),
    Allocated { pid: ProcessId, region: MemoryRegion },
    Freed { pid: ProcessId, region: MemoryRegion },
    FileWritten { name: String, bytes: usize, replaced: bool },
    FileContents { name: String, data: Vec<u8> },
    FileDeleted(String),
    Files(Vec<(String, usize)>),
    Stats(SystemStats),
    Report(Vec<TurnaroundStats>),
    Help,
    Exit,
}

/// Request errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyscallError {
    InvalidCommand(String),
    Service(ServiceError),
    FileSystem(FileSystemError),
}

impl fmt::Display for SyscallError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SyscallError::InvalidCommand(reason) => write!(f, "Invalid command: {}", reason),
            SyscallError::Service(err) => write!(f, "{}", err),
            SyscallError::FileSystem(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for SyscallError {}

impl From<ServiceError> for SyscallError {
    fn from(err: ServiceError) -> Self {
        SyscallError::Service(err)
    }
}

impl From<FileSystemError> for SyscallError {
    fn from(err: FileSystemError) -> Self {
        SyscallError::FileSystem(err)
    }
}

/// One line of usage per command
pub const USAGE: &[&str] = &[
    "create <name> <burst> [priority]  create a process",
    "kill <pid>                        terminate a process",
    "show                              process table and memory map",
    "run [ticks]                       run the MLFQ scheduler",
    "block <pid>                       block a process on I/O",
    "unblock <pid>                     complete a process's I/O",
    "alloc <pid> <size>                allocate memory to a process",
    "free <pid>                        free a process's memory",
    "write <file> <content...>         create or overwrite a file",
    "read <file>                       print a file",
    "rm <file>                         delete a file",
    "files                             list files",
    "stats                             system statistics",
    "report                            turnaround of finished processes",
    "help                              this text",
    "exit                              leave the simulator",
];

impl Request {
    /// Parse a whitespace-separated command line
    pub fn parse(line: &str) -> Result<Request, SyscallError> {
        let mut words = line.split_whitespace();
        let command = words
            .next()
            .ok_or_else(|| invalid("empty command"))?
            .to_ascii_lowercase();
        let args: Vec<&str> = words.collect();

        let request = match command.as_str() {
            "create" | "new" => {
                expect_args(&args, 2, 3, "create <name> <burst> [priority]")?;
                Request::CreateProcess {
                    name: args[0].to_string(),
                    burst: number(args[1], "burst")?,
                    priority: match args.get(2) {
                        Some(value) => number(value, "priority")?,
                        None => 0,
                    },
                }
            }
            "kill" => Request::KillProcess { pid: pid_arg(&args, "kill <pid>")? },
            "show" | "ps" => {
                expect_args(&args, 0, 0, "show")?;
                Request::ShowState
            }
            "run" => {
                expect_args(&args, 0, 1, "run [ticks]")?;
                Request::RunScheduler {
                    max_ticks: match args.first() {
                        Some(value) => number(value, "ticks")?,
                        None => DEFAULT_RUN_TICKS,
                    },
                }
            }
            "block" => Request::BlockProcess { pid: pid_arg(&args, "block <pid>")? },
            "unblock" => Request::UnblockProcess { pid: pid_arg(&args, "unblock <pid>")? },
            "alloc" => {
                expect_args(&args, 2, 2, "alloc <pid> <size>")?;
                Request::AllocateMemory {
                    pid: number(args[0], "pid")?,
                    size: number(args[1], "size")?,
                }
            }
            "free" => Request::FreeMemory { pid: pid_arg(&args, "free <pid>")? },
            "write" => {
                if args.is_empty() {
                    return Err(invalid("usage: write <file> <content...>"));
                }
                Request::WriteFile {
                    name: args[0].to_string(),
                    content: after_words(line, 2).to_string(),
                }
            }
            "read" => Request::ReadFile { name: name_arg(&args, "read <file>")? },
            "rm" => Request::DeleteFile { name: name_arg(&args, "rm <file>")? },
            "files" | "ls" => Request::ListFiles,
            "stats" => Request::Stats,
            "report" => Request::Report,
            "help" | "?" => Request::Help,
            "exit" | "quit" => Request::Exit,
            other => return Err(invalid(&format!("unknown command '{}'", other))),
        };
        Ok(request)
    }
}

/// The raw text following the first `count` words, inner spacing kept
fn after_words(line: &str, count: usize) -> &str {
    let mut rest = line.trim_start();
    for _ in 0..count {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        rest = rest[end..].trim_start();
    }
    rest
}

fn invalid(reason: &str) -> SyscallError {
    SyscallError::InvalidCommand(reason.to_string())
}

fn expect_args(args: &[&str], min: usize, max: usize, usage: &str) -> Result<(), SyscallError> {
    if args.len() < min || args.len() > max {
        return Err(invalid(&format!("usage: {}", usage)));
    }
    Ok(())
}

fn number<T: core::str::FromStr>(value: &str, what: &str) -> Result<T, SyscallError> {
    value
        .parse()
        .map_err(|_| invalid(&format!("{} must be a number, got '{}'", what, value)))
}

fn pid_arg(args: &[&str], usage: &str) -> Result<ProcessId, SyscallError> {
    expect_args(args, 1, 1, usage)?;
    number(args[0], "pid")
}

fn name_arg(args: &[&str], usage: &str) -> Result<String, SyscallError> {
    expect_args(args, 1, 1, usage)?;
    Ok(args[0].to_string())
}

/// Handle a request against a simulation and its file store
pub fn handle_request(
    sim: &mut ProcessService,
    fs: &mut FileSystemService,
    request: Request,
) -> Result<Response, SyscallError> {
    match request {
        Request::CreateProcess { name, burst, priority } => {
            Ok(Response::Created(sim.create_process(&name, burst, priority)?))
        }
        Request::KillProcess { pid } => {
            sim.kill_process(pid)?;
            Ok(Response::Killed(pid))
        }
        Request::ShowState => Ok(Response::State(sim.snapshot())),
        Request::RunScheduler { max_ticks } => sys_run_scheduler(sim, max_ticks),
        Request::BlockProcess { pid } => {
            sim.block_process(pid)?;
            Ok(Response::Blocked(pid))
        }
        Request::UnblockProcess { pid } => {
            sim.unblock_process(pid)?;
            Ok(Response::Unblocked(pid))
        }
        Request::AllocateMemory { pid, size } => {
            let region = sim.allocate_memory(pid, size)?;
            Ok(Response::Allocated { pid, region })
        }
        Request::FreeMemory { pid } => {
            let region = sim.free_memory(pid)?;
            Ok(Response::Freed { pid, region })
        }
        Request::WriteFile { name, content } => {
            let replaced = fs.create_file(&name, content.as_bytes())?;
            Ok(Response::FileWritten { name, bytes: content.len(), replaced })
        }
        Request::ReadFile { name } => {
            let data = fs.read_file(&name)?.to_vec();
            Ok(Response::FileContents { name, data })
        }
        Request::DeleteFile { name } => {
            fs.delete_file(&name)?;
            Ok(Response::FileDeleted(name))
        }
        Request::ListFiles => Ok(Response::Files(
            fs.list_files()
                .into_iter()
                .map(|entry| (entry.name.clone(), entry.size()))
                .collect(),
        )),
        Request::Stats => Ok(Response::Stats(sim.system_stats())),
        Request::Report => Ok(Response::Report(sim.turnaround_report())),
        Request::Help => Ok(Response::Help),
        Request::Exit => Ok(Response::Exit),
    }
}

fn sys_run_scheduler(sim: &mut ProcessService, max_ticks: u64) -> Result<Response, SyscallError> {
    let events = sim.run_scheduler(max_ticks)?;

    let completed: Vec<ProcessId> = events
        .iter()
        .filter_map(|event| match event.kind {
            EventKind::Completed { pid, .. } => Some(pid),
            _ => None,
        })
        .collect();
    let finished = sim
        .turnaround_report()
        .into_iter()
        .filter(|stats| completed.contains(&stats.pid))
        .collect();

    Ok(Response::Ran { events, finished })
}
