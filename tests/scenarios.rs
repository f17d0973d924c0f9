mod common;

use common::reference_sim;
use emos_sim::services::{MemoryRegion, RegionTag};
use emos_sim::{EventKind, ProcessState, SchedulerEvent, ServiceError};

fn event(tick: u64, kind: EventKind) -> SchedulerEvent {
    SchedulerEvent { tick, kind }
}

fn extent(region: MemoryRegion) -> (usize, usize) {
    (region.start, region.end())
}

#[test]
fn first_fit_reuses_freed_prefix() {
    let mut sim = reference_sim();
    let p1 = sim.create_process("p1", 10, 0).unwrap();
    let p2 = sim.create_process("p2", 10, 0).unwrap();
    let p3 = sim.create_process("p3", 10, 0).unwrap();

    assert_eq!(extent(sim.allocate_memory(p1, 64).unwrap()), (0, 64));
    assert_eq!(extent(sim.allocate_memory(p2, 100).unwrap()), (64, 164));

    sim.free_memory(p1).unwrap();
    let free: Vec<_> = sim.memory().free_regions().into_iter().map(extent).collect();
    assert_eq!(free, vec![(0, 64), (164, 1024)]);

    assert_eq!(extent(sim.allocate_memory(p3, 64).unwrap()), (0, 64));
    sim.check_invariants().unwrap();
}

#[test]
fn single_process_demotes_once_then_completes() {
    let mut sim = reference_sim();
    let pid = sim.create_process("cpu", 10, 0).unwrap();

    let events = sim.run_scheduler(50).unwrap();
    assert_eq!(
        events,
        vec![
            event(0, EventKind::Dispatched { pid, level: 0 }),
            event(4, EventKind::QuantumExpired { pid, from: 0, to: 1 }),
            event(4, EventKind::Dispatched { pid, level: 1 }),
            event(10, EventKind::Completed { pid, level: 1 }),
            event(10, EventKind::Idle),
        ]
    );
    assert_eq!(sim.process(pid).unwrap().state, ProcessState::Terminated);
}

#[test]
fn level_zero_work_runs_before_demoted_work() {
    let mut sim = reference_sim();
    let p1 = sim.create_process("long", 6, 0).unwrap();
    let p2 = sim.create_process("short", 3, 0).unwrap();

    let events = sim.run_scheduler(100).unwrap();
    assert_eq!(
        events,
        vec![
            event(0, EventKind::Dispatched { pid: p1, level: 0 }),
            event(4, EventKind::QuantumExpired { pid: p1, from: 0, to: 1 }),
            event(4, EventKind::Dispatched { pid: p2, level: 0 }),
            event(7, EventKind::Completed { pid: p2, level: 0 }),
            event(7, EventKind::Dispatched { pid: p1, level: 1 }),
            event(9, EventKind::Completed { pid: p1, level: 1 }),
            event(9, EventKind::Idle),
        ]
    );
}

#[test]
fn unblocked_process_returns_at_level_zero_tail() {
    let mut sim = reference_sim();
    let io = sim.create_process("io", 30, 0).unwrap();
    let other = sim.create_process("other", 30, 0).unwrap();

    // io: level 0 for ticks 0..4, other: level 0 for 4..8, io: level 1 from 8
    sim.run_scheduler(10).unwrap();
    assert_eq!(sim.scheduler().running(), Some(io));
    assert_eq!(sim.process(io).unwrap().level, 1);
    assert_eq!(sim.scheduler().quantum_used(), Some(2));

    sim.block_process(io).unwrap();
    assert_eq!(sim.process(io).unwrap().state, ProcessState::Blocked);
    assert_eq!(sim.scheduler().running(), None);
    sim.check_invariants().unwrap();

    let newcomer = sim.create_process("newcomer", 2, 0).unwrap();
    sim.run_scheduler(1).unwrap();
    assert_eq!(sim.scheduler().running(), Some(newcomer));

    sim.unblock_process(io).unwrap();
    let pcb = sim.process(io).unwrap();
    assert_eq!(pcb.state, ProcessState::Ready);
    assert_eq!(pcb.level, 0);
    assert_eq!(sim.scheduler().ready_queue(0), vec![io]);
    assert_eq!(sim.scheduler().ready_queue(1), vec![other]);

    // newcomer finishes, then io gets a fresh level-0 quantum
    let events = sim.run_scheduler(5).unwrap();
    assert_eq!(
        events,
        vec![
            event(12, EventKind::Completed { pid: newcomer, level: 0 }),
            event(12, EventKind::Dispatched { pid: io, level: 0 }),
            event(16, EventKind::QuantumExpired { pid: io, from: 0, to: 1 }),
        ]
    );
    sim.check_invariants().unwrap();
}

#[test]
fn allocating_all_free_space_leaves_no_free_region() {
    let mut sim = reference_sim();
    let a = sim.create_process("a", 5, 0).unwrap();
    let b = sim.create_process("b", 5, 0).unwrap();

    let region = sim.allocate_memory(a, 1024).unwrap();
    assert_eq!(extent(region), (0, 1024));
    assert!(sim.memory().free_regions().is_empty());
    assert_eq!(sim.allocate_memory(b, 1), Err(ServiceError::OutOfMemory));
    sim.check_invariants().unwrap();
}

#[test]
fn allocate_then_free_restores_free_list() {
    let mut sim = reference_sim();
    let pids: Vec<_> = (0..4).map(|i| sim.create_process(&format!("p{}", i), 9, 0).unwrap()).collect();
    sim.allocate_memory(pids[0], 100).unwrap();
    sim.allocate_memory(pids[1], 50).unwrap();
    sim.allocate_memory(pids[2], 200).unwrap();
    sim.free_memory(pids[1]).unwrap();
    let before = sim.memory().regions().to_vec();

    sim.allocate_memory(pids[3], 30).unwrap();
    sim.free_memory(pids[3]).unwrap();
    assert_eq!(sim.memory().regions(), &before[..]);
}

#[test]
fn double_kill_leaves_state_unchanged() {
    let mut sim = reference_sim();
    let pid = sim.create_process("victim", 12, 0).unwrap();
    sim.allocate_memory(pid, 128).unwrap();
    sim.run_scheduler(3).unwrap();

    sim.kill_process(pid).unwrap();
    let after_first = sim.snapshot();
    assert_eq!(sim.kill_process(pid), Err(ServiceError::AlreadyTerminated));
    assert_eq!(sim.snapshot(), after_first);
    assert!(after_first.regions.iter().all(|r| r.tag == RegionTag::Free));
}

#[test]
fn rejected_requests_do_not_mutate() {
    let mut sim = reference_sim();
    let pid = sim.create_process("steady", 20, 0).unwrap();
    sim.allocate_memory(pid, 10).unwrap();
    sim.run_scheduler(2).unwrap();
    let before = sim.snapshot();

    assert_eq!(sim.create_process("bad", 0, 0), Err(ServiceError::InvalidBurst));
    assert_eq!(sim.block_process(99), Err(ServiceError::NoSuchProcess));
    assert_eq!(sim.unblock_process(pid), Err(ServiceError::NotBlocked));
    assert_eq!(sim.allocate_memory(pid, 5), Err(ServiceError::AlreadyOwnsMemory));
    assert_eq!(sim.free_memory(42), Err(ServiceError::NoSuchProcess));
    assert_eq!(sim.run_scheduler(0), Err(ServiceError::InvalidTicks));
    assert_eq!(sim.snapshot(), before);

    sim.kill_process(pid).unwrap();
    assert_eq!(sim.block_process(pid), Err(ServiceError::NotRunnable));
    assert_eq!(sim.free_memory(pid), Err(ServiceError::NotOwned));
}

#[test]
fn identical_inputs_give_identical_events() {
    fn script() -> Vec<SchedulerEvent> {
        let mut sim = reference_sim();
        let mut events = Vec::new();
        let a = sim.create_process("a", 25, 0).unwrap();
        sim.create_process("b", 7, 1).unwrap();
        events.extend(sim.run_scheduler(6).unwrap());

        // tick 6: b is mid-slice at level 0, a waits at level 1
        sim.block_process(a).unwrap();
        let c = sim.create_process("c", 13, 0).unwrap();
        events.extend(sim.run_scheduler(9).unwrap());

        // tick 15: b has finished, c waits at level 1
        assert_eq!(sim.clock(), 15);
        sim.unblock_process(a).unwrap();
        sim.kill_process(c).unwrap();
        events.extend(sim.run_scheduler(40).unwrap());
        events.extend(sim.run_scheduler(40).unwrap());
        events
    }

    let (a, b, c) = (1, 2, 3);
    let expected = vec![
        event(0, EventKind::Dispatched { pid: a, level: 0 }),
        event(4, EventKind::QuantumExpired { pid: a, from: 0, to: 1 }),
        event(4, EventKind::Dispatched { pid: b, level: 0 }),
        event(8, EventKind::QuantumExpired { pid: b, from: 0, to: 1 }),
        event(8, EventKind::Dispatched { pid: c, level: 0 }),
        event(12, EventKind::QuantumExpired { pid: c, from: 0, to: 1 }),
        event(12, EventKind::Dispatched { pid: b, level: 1 }),
        event(15, EventKind::Completed { pid: b, level: 1 }),
        event(15, EventKind::Dispatched { pid: a, level: 0 }),
        event(19, EventKind::QuantumExpired { pid: a, from: 0, to: 1 }),
        event(19, EventKind::Dispatched { pid: a, level: 1 }),
        event(27, EventKind::QuantumExpired { pid: a, from: 1, to: 2 }),
        event(27, EventKind::Dispatched { pid: a, level: 2 }),
        event(36, EventKind::Completed { pid: a, level: 2 }),
        event(36, EventKind::Idle),
        event(36, EventKind::Idle),
    ];

    let first = script();
    assert_eq!(first, expected);
    assert_eq!(script(), first);
}
