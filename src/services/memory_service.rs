// Memory Management Service for the EMOS simulator
//
// Contiguous first-fit allocation over a single physical extent. The region
// list is ordered by address, always tiles [0, capacity) exactly and never
// holds two touching free regions.
use alloc::vec::Vec;
use core::fmt;

use crate::process::pcb::ProcessId;

/// Owner tag of a region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionTag {
    Free,
    Owned(ProcessId),
}

/// Half-open interval [start, start + size) of simulated physical memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRegion {
    pub start: usize,
    pub size: usize,
    pub tag: RegionTag,
}

impl MemoryRegion {
    pub fn end(&self) -> usize {
        self.start + self.size
    }

    pub fn is_free(&self) -> bool {
        self.tag == RegionTag::Free
    }

    pub fn owner(&self) -> Option<ProcessId> {
        match self.tag {
            RegionTag::Owned(pid) => Some(pid),
            RegionTag::Free => None,
        }
    }
}

impl fmt::Display for MemoryRegion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    InvalidSize,
    OutOfMemory,
    AlreadyOwned,
    NotOwned,
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MemoryError::InvalidSize => write!(f, "Allocation size must be greater than zero"),
            MemoryError::OutOfMemory => write!(f, "Out of memory"),
            MemoryError::AlreadyOwned => write!(f, "Process already owns a memory region"),
            MemoryError::NotOwned => write!(f, "Process owns no memory region"),
        }
    }
}

impl std::error::Error for MemoryError {}

/// Memory Service - owns the physical extent and its region list
#[derive(Debug, Clone)]
pub struct MemoryService {
    capacity: usize,
    regions: Vec<MemoryRegion>,
}

impl MemoryService {
    pub fn new(capacity: usize) -> Self {
        let regions = if capacity == 0 {
            Vec::new()
        } else {
            vec![MemoryRegion { start: 0, size: capacity, tag: RegionTag::Free }]
        };
        Self { capacity, regions }
    }

    /// Allocate `size` units to `pid` from the first free region that fits
    pub fn allocate(&mut self, pid: ProcessId, size: usize) -> Result<MemoryRegion, MemoryError> {
        if size == 0 {
            return Err(MemoryError::InvalidSize);
        }
        if self.region_of(pid).is_some() {
            return Err(MemoryError::AlreadyOwned);
        }

        let index = self
            .regions
            .iter()
            .position(|region| region.is_free() && region.size >= size)
            .ok_or(MemoryError::OutOfMemory)?;

        let found = self.regions[index];
        let owned = MemoryRegion { start: found.start, size, tag: RegionTag::Owned(pid) };
        self.regions[index] = owned;

        // Split off the unused tail
        if found.size > size {
            let remainder = MemoryRegion {
                start: found.start + size,
                size: found.size - size,
                tag: RegionTag::Free,
            };
            self.regions.insert(index + 1, remainder);
        }

        log::info!("Allocated {} to PID {} ({} units)", owned, pid, size);
        Ok(owned)
    }

    /// Release the region owned by `pid` and merge it with free neighbours
    pub fn free(&mut self, pid: ProcessId) -> Result<MemoryRegion, MemoryError> {
        let index = self
            .regions
            .iter()
            .position(|region| region.tag == RegionTag::Owned(pid))
            .ok_or(MemoryError::NotOwned)?;

        let released = self.regions[index];
        self.regions[index].tag = RegionTag::Free;
        self.coalesce_at(index);

        log::info!("Freed {} of PID {}", released, pid);
        Ok(released)
    }

    // Only the freed slot can create a new touching pair, so merging it with
    // its two neighbours restores the invariant.
    fn coalesce_at(&mut self, mut index: usize) {
        if index + 1 < self.regions.len() && self.regions[index + 1].is_free() {
            let next = self.regions.remove(index + 1);
            self.regions[index].size += next.size;
        }
        if index > 0 && self.regions[index - 1].is_free() {
            let current = self.regions.remove(index);
            index -= 1;
            self.regions[index].size += current.size;
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// All regions in address order
    pub fn regions(&self) -> &[MemoryRegion] {
        &self.regions
    }

    pub fn free_regions(&self) -> Vec<MemoryRegion> {
        self.regions.iter().filter(|r| r.is_free()).copied().collect()
    }

    pub fn region_of(&self, pid: ProcessId) -> Option<MemoryRegion> {
        self.regions
            .iter()
            .find(|region| region.tag == RegionTag::Owned(pid))
            .copied()
    }

    /// Total free memory
    pub fn free_total(&self) -> usize {
        self.regions.iter().filter(|r| r.is_free()).map(|r| r.size).sum()
    }

    pub fn used_total(&self) -> usize {
        self.capacity - self.free_total()
    }

    pub fn largest_free(&self) -> usize {
        self.regions
            .iter()
            .filter(|r| r.is_free())
            .map(|r| r.size)
            .max()
            .unwrap_or(0)
    }

    /// Number of free holes; more than one means external fragmentation
    pub fn fragment_count(&self) -> usize {
        self.regions.iter().filter(|r| r.is_free()).count()
    }

    /// Verify that the regions tile [0, capacity) with no empty or touching free regions
    pub fn check_layout(&self) -> Result<(), String> {
        let mut cursor = 0;
        let mut previous_free = false;
        let mut owners: Vec<ProcessId> = Vec::new();

        for region in &self.regions {
            if region.start != cursor {
                return Err(format!("region {} does not start at {}", region, cursor));
            }
            if region.size == 0 {
                return Err(format!("empty region at {}", region.start));
            }
            if region.is_free() && previous_free {
                return Err(format!("free region {} touches another free region", region));
            }
            if let Some(pid) = region.owner() {
                if owners.contains(&pid) {
                    return Err(format!("PID {} owns more than one region", pid));
                }
                owners.push(pid);
            }
            previous_free = region.is_free();
            cursor = region.end();
        }

        if cursor != self.capacity {
            return Err(format!("regions end at {} instead of {}", cursor, self.capacity));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn free_list(memory: &MemoryService) -> Vec<(usize, usize)> {
        memory.free_regions().iter().map(|r| (r.start, r.end())).collect()
    }

    #[test]
    fn first_fit_reuses_earliest_hole() {
        let mut memory = MemoryService::new(1024);
        let a = memory.allocate(1, 64).unwrap();
        let b = memory.allocate(2, 100).unwrap();
        assert_eq!((a.start, a.end()), (0, 64));
        assert_eq!((b.start, b.end()), (64, 164));

        memory.free(1).unwrap();
        assert_eq!(free_list(&memory), vec![(0, 64), (164, 1024)]);

        let c = memory.allocate(3, 64).unwrap();
        assert_eq!((c.start, c.end()), (0, 64));
        assert_eq!(free_list(&memory), vec![(164, 1024)]);
        memory.check_layout().unwrap();
    }

    #[test]
    fn free_merges_both_neighbours() {
        let mut memory = MemoryService::new(300);
        memory.allocate(1, 100).unwrap();
        memory.allocate(2, 100).unwrap();
        memory.allocate(3, 100).unwrap();
        memory.free(1).unwrap();
        memory.free(3).unwrap();
        assert_eq!(memory.fragment_count(), 2);

        memory.free(2).unwrap();
        assert_eq!(free_list(&memory), vec![(0, 300)]);
        memory.check_layout().unwrap();
    }

    #[test]
    fn exact_fit_relabels_without_split() {
        let mut memory = MemoryService::new(128);
        let region = memory.allocate(1, 128).unwrap();
        assert_eq!(region.size, 128);
        assert_eq!(memory.regions().len(), 1);
        assert_eq!(memory.free_total(), 0);
        assert!(memory.free_regions().is_empty());
        assert_eq!(memory.allocate(2, 1), Err(MemoryError::OutOfMemory));
    }

    #[test]
    fn rejects_invalid_requests_without_change() {
        let mut memory = MemoryService::new(64);
        memory.allocate(1, 16).unwrap();
        let before = memory.regions().to_vec();

        assert_eq!(memory.allocate(2, 0), Err(MemoryError::InvalidSize));
        assert_eq!(memory.allocate(1, 8), Err(MemoryError::AlreadyOwned));
        assert_eq!(memory.allocate(2, 49), Err(MemoryError::OutOfMemory));
        assert_eq!(memory.free(9), Err(MemoryError::NotOwned));
        assert_eq!(memory.regions(), &before[..]);
    }

    #[test]
    fn fragmented_space_is_not_combined() {
        let mut memory = MemoryService::new(100);
        memory.allocate(1, 30).unwrap();
        memory.allocate(2, 40).unwrap();
        memory.allocate(3, 30).unwrap();
        memory.free(1).unwrap();
        memory.free(3).unwrap();

        assert_eq!(memory.free_total(), 60);
        assert_eq!(memory.largest_free(), 30);
        assert_eq!(memory.allocate(4, 31), Err(MemoryError::OutOfMemory));
    }

    #[test]
    fn allocate_then_free_restores_shape() {
        let mut memory = MemoryService::new(256);
        memory.allocate(1, 32).unwrap();
        memory.allocate(2, 32).unwrap();
        memory.free(1).unwrap();
        let before = memory.regions().to_vec();

        memory.allocate(7, 20).unwrap();
        memory.free(7).unwrap();
        assert_eq!(memory.regions(), &before[..]);
    }
}
