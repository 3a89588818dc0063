// ============================================================
//  CPU and I/O device pools.
//
//  Each unit owns at most one process at a time (by value, not
//  by reference — see sim-process's design note on avoiding
//  cyclic references). A unit never decides where a finished
//  process goes next; it just ticks its burst and hands the
//  process back to the scheduler, which does the routing.
// ============================================================

use sim_process::Process;

pub struct Cpu {
    cid: usize,
    current: Option<Process>,
    busy_ticks: u64,
}

impl Cpu {
    pub fn new(cid: usize) -> Self {
        Self { cid, current: None, busy_ticks: 0 }
    }

    /// Total number of ticks this unit has held a process. Used for
    /// utilization metrics; never consulted by the scheduling logic.
    pub fn busy_ticks(&self) -> u64 {
        self.busy_ticks
    }

    pub fn id(&self) -> usize {
        self.cid
    }

    pub fn label(&self) -> String {
        format!("CPU{}", self.cid)
    }

    pub fn is_busy(&self) -> bool {
        self.current.is_some()
    }

    pub fn current(&self) -> Option<&Process> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut Process> {
        self.current.as_mut()
    }

    /// Place a process on this unit. Precondition: the unit is idle.
    pub fn assign(&mut self, process: Process) {
        assert!(self.current.is_none(), "CPU{} assigned while busy", self.cid);
        self.current = Some(process);
    }

    /// Forcibly remove the running process without advancing its cursor
    /// (used for preemption — the process goes back to ready, not finished).
    pub fn preempt(&mut self) -> Process {
        self.current.take().expect("preempt called on an idle CPU")
    }

    /// Decrement the current burst by one tick. If the burst completes,
    /// advances the cursor, clears the unit, and returns the process so
    /// the scheduler can route it to its next state.
    pub fn tick(&mut self) -> Option<Process> {
        if self.current.is_none() {
            return None;
        }
        self.busy_ticks += 1;
        let done = self.current.as_mut()?.tick_cpu();
        if done {
            let mut process = self.current.take().expect("just ticked a process");
            process.advance_cursor();
            Some(process)
        } else {
            None
        }
    }
}

pub struct IoDevice {
    did: usize,
    current: Option<Process>,
    busy_ticks: u64,
}

impl IoDevice {
    pub fn new(did: usize) -> Self {
        Self { did, current: None, busy_ticks: 0 }
    }

    pub fn busy_ticks(&self) -> u64 {
        self.busy_ticks
    }

    pub fn id(&self) -> usize {
        self.did
    }

    pub fn label(&self) -> String {
        format!("IO{}", self.did)
    }

    pub fn is_busy(&self) -> bool {
        self.current.is_some()
    }

    pub fn current(&self) -> Option<&Process> {
        self.current.as_ref()
    }

    pub fn assign(&mut self, process: Process) {
        assert!(self.current.is_none(), "IO{} assigned while busy", self.did);
        self.current = Some(process);
    }

    /// Symmetric to `Cpu::tick`, but ticks the current burst's I/O duration.
    pub fn tick(&mut self) -> Option<Process> {
        if self.current.is_none() {
            return None;
        }
        self.busy_ticks += 1;
        let done = self.current.as_mut()?.tick_io();
        if done {
            let mut process = self.current.take().expect("just ticked a process");
            process.advance_cursor();
            Some(process)
        } else {
            None
        }
    }
}
