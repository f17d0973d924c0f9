// Simulator services
pub mod file_system_service;
pub mod memory_service;
pub mod process_service;

use core::fmt;

use crate::process::pcb::ProcessError;
use self::memory_service::MemoryError;

pub use file_system_service::{FileSystemError, FileSystemService};
pub use memory_service::{MemoryRegion, MemoryService, RegionTag};
pub use process_service::{ProcessService, SystemSnapshot, SystemStats, TurnaroundStats};

/// Failure of a driver-level operation on a simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceError {
    InvalidBurst,
    InvalidSize,
    InvalidTicks,
    NoSuchProcess,
    AlreadyTerminated,
    NotRunnable,
    NotBlocked,
    AlreadyOwnsMemory,
    NotOwned,
    OutOfMemory,
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ServiceError::InvalidBurst => write!(f, "CPU burst must be greater than zero"),
            ServiceError::InvalidSize => write!(f, "Size must be greater than zero"),
            ServiceError::InvalidTicks => write!(f, "Tick count must be greater than zero"),
            ServiceError::NoSuchProcess => write!(f, "No such process"),
            ServiceError::AlreadyTerminated => write!(f, "Process already terminated"),
            ServiceError::NotRunnable => write!(f, "Process is not runnable"),
            ServiceError::NotBlocked => write!(f, "Process is not blocked"),
            ServiceError::AlreadyOwnsMemory => write!(f, "Process already has memory allocated"),
            ServiceError::NotOwned => write!(f, "Process has no memory allocated"),
            ServiceError::OutOfMemory => write!(f, "Not enough memory"),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<ProcessError> for ServiceError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::InvalidBurst => ServiceError::InvalidBurst,
            ProcessError::ProcessNotFound => ServiceError::NoSuchProcess,
            ProcessError::AlreadyTerminated => ServiceError::AlreadyTerminated,
            ProcessError::NotRunnable => ServiceError::NotRunnable,
            ProcessError::NotBlocked => ServiceError::NotBlocked,
        }
    }
}

impl From<MemoryError> for ServiceError {
    fn from(err: MemoryError) -> Self {
        match err {
            MemoryError::InvalidSize => ServiceError::InvalidSize,
            MemoryError::OutOfMemory => ServiceError::OutOfMemory,
            MemoryError::AlreadyOwned => ServiceError::AlreadyOwnsMemory,
            MemoryError::NotOwned => ServiceError::NotOwned,
        }
    }
}
