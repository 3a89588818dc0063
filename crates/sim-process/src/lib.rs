// ============================================================
//  Process control block.
//
//  A process owns nothing but its own bookkeeping: bursts, a
//  cursor into them, and the counters the scheduler needs to
//  compute queue-insertion keys and metrics. It never points
//  back at the resource it's running on — CPU/IO units hold the
//  process, not the other way around (see sim-resources).
// ============================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque process identifier. The wire format allows either a JSON string
/// or a JSON integer; both are normalised to a string internally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Pid(pub String);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Pid {
    fn from(s: &str) -> Self {
        Pid(s.to_string())
    }
}

impl From<String> for Pid {
    fn from(s: String) -> Self {
        Pid(s)
    }
}

impl<'de> Deserialize<'de> for Pid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Str(String),
            Int(i64),
        }
        match Repr::deserialize(deserializer)? {
            Repr::Str(s) => Ok(Pid(s)),
            Repr::Int(n) => Ok(Pid(n.to_string())),
        }
    }
}

/// A single I/O burst: a device type tag plus a duration in ticks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoBurst {
    #[serde(rename = "type")]
    pub kind: String,
    pub duration: u32,
}

/// One entry in a process's burst sequence. The schema is `{"cpu": n}` or
/// `{"io": {...}}`; bursts need not strictly alternate (see spec §4.6 note
/// and §9 design note — the scheduler must not assume alternation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Burst {
    Cpu { cpu: u32 },
    Io { io: IoBurst },
}

impl Burst {
    pub fn cpu_len(&self) -> Option<u32> {
        match self {
            Burst::Cpu { cpu } => Some(*cpu),
            Burst::Io { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    New,
    Ready,
    Running,
    Waiting,
    Finished,
}

/// Wire-format record as produced by the workload generator and accepted
/// as simulator input (spec §6). `cpu_used` is carried for round-tripping
/// but is never read by the scheduler (spec §9 open question).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub pid: Pid,
    #[serde(default)]
    pub class_id: Option<String>,
    pub priority: i64,
    pub quantum: u32,
    #[serde(default)]
    pub cpu_budget: Option<u64>,
    #[serde(default)]
    pub cpu_used: Option<u64>,
    pub arrival_time: u64,
    pub bursts: Vec<Burst>,
}

#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("process {pid}: burst list is empty")]
    EmptyBurstList { pid: String },
    #[error("process {pid}: burst {index} has non-positive duration {value}")]
    NonPositiveDuration { pid: String, index: usize, value: i64 },
    #[error("process {pid}: quantum must be positive, got {quantum}")]
    NonPositiveQuantum { pid: String, quantum: u32 },
}

/// A process's run-time state: the PCB proper.
#[derive(Debug, Clone)]
pub struct Process {
    pub pid: Pid,
    pub class_id: Option<String>,
    pub arrival_time: u64,
    pub priority: i64,
    pub quantum: u32,
    pub remaining_quantum: u32,
    pub cpu_budget: Option<u64>,
    pub cpu_used: Option<u64>,
    pub bursts: Vec<Burst>,
    pub cursor: usize,
    pub state: ProcessState,
    pub ready_wait_time: u64,
    pub io_wait_time: u64,
    pub running_time: u64,
    pub first_dispatch_tick: Option<u64>,
    pub finish_tick: Option<u64>,
}

impl Process {
    /// Validate and build a PCB from a wire record. Rejects malformed
    /// records per spec §7 ("input errors") rather than panicking.
    pub fn from_record(record: ProcessRecord) -> Result<Self, InputError> {
        let pid = record.pid.0.clone();

        if record.bursts.is_empty() {
            return Err(InputError::EmptyBurstList { pid });
        }
        if record.quantum == 0 {
            return Err(InputError::NonPositiveQuantum {
                pid,
                quantum: record.quantum,
            });
        }
        for (index, burst) in record.bursts.iter().enumerate() {
            let value = match burst {
                Burst::Cpu { cpu } => *cpu as i64,
                Burst::Io { io } => io.duration as i64,
            };
            if value <= 0 {
                return Err(InputError::NonPositiveDuration { pid, index, value });
            }
        }

        Ok(Process {
            pid: record.pid,
            class_id: record.class_id,
            arrival_time: record.arrival_time,
            priority: record.priority,
            quantum: record.quantum,
            remaining_quantum: record.quantum,
            cpu_budget: record.cpu_budget,
            cpu_used: record.cpu_used,
            bursts: record.bursts,
            cursor: 0,
            state: ProcessState::New,
            ready_wait_time: 0,
            io_wait_time: 0,
            running_time: 0,
            first_dispatch_tick: None,
            finish_tick: None,
        })
    }

    pub fn current_burst(&self) -> Option<&Burst> {
        self.bursts.get(self.cursor)
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.bursts.len()
    }

    /// Advance past the current burst. Never moves the cursor backwards.
    pub fn advance_cursor(&mut self) {
        debug_assert!(self.cursor < self.bursts.len(), "advancing past a finished process");
        self.cursor += 1;
    }

    /// Sum of CPU burst durations from the cursor onward, inclusive.
    /// Non-CPU bursts between cursor and the next CPU burst don't
    /// interrupt the sum — this mirrors `remaining_burst_time()` in the
    /// original scheduler, which only ever looked at CPU bursts for SRTF.
    pub fn remaining_burst_time(&self) -> u64 {
        self.bursts[self.cursor..]
            .iter()
            .filter_map(Burst::cpu_len)
            .map(u64::from)
            .sum()
    }

    /// CPU burst length of the *current* burst, or `u64::MAX` if the
    /// current burst is I/O or the process is finished (spec §4.4 SJF key).
    pub fn current_cpu_burst_len(&self) -> u64 {
        match self.current_burst() {
            Some(Burst::Cpu { cpu }) => u64::from(*cpu),
            _ => u64::MAX,
        }
    }

    /// Decrement the current CPU burst's remaining count by one tick.
    /// Returns `true` once the burst reaches zero. Panics if the current
    /// burst isn't CPU or is already exhausted — both are invariant
    /// violations the resource pool must never trigger (spec §7).
    pub fn tick_cpu(&mut self) -> bool {
        match self.bursts.get_mut(self.cursor) {
            Some(Burst::Cpu { cpu }) => {
                assert!(*cpu > 0, "cpu burst remaining count would go negative");
                *cpu -= 1;
                self.running_time += 1;
                *cpu == 0
            }
            other => panic!("tick_cpu called with current burst {other:?}"),
        }
    }

    /// Decrement the current I/O burst's remaining duration by one tick.
    /// Returns `true` once the burst reaches zero.
    pub fn tick_io(&mut self) -> bool {
        match self.bursts.get_mut(self.cursor) {
            Some(Burst::Io { io }) => {
                assert!(io.duration > 0, "io burst remaining count would go negative");
                io.duration -= 1;
                self.io_wait_time += 1;
                io.duration == 0
            }
            other => panic!("tick_io called with current burst {other:?}"),
        }
    }
}
