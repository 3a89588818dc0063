// ============================================================
//  Workload generator.
//
//  Draws a class per preset's weighted mix, then greedily builds
//  a burst sequence until the sampled CPU budget is exhausted or
//  20 bursts are reached. All randomness comes from one seeded
//  PRNG so a run is fully reproducible given the seed.
// ============================================================

use rand::distributions::WeightedIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sim_process::{Burst, IoBurst, Pid, ProcessRecord};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IoProfile {
    pub io_types: Vec<String>,
    pub io_ratio: f64,
    pub io_duration_mean: f64,
    pub io_duration_stddev: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassProfile {
    pub class_id: String,
    pub priority_range: [i64; 2],
    pub cpu_burst_mean: f64,
    pub cpu_burst_stddev: f64,
    pub cpu_budget_mean: f64,
    pub cpu_budget_stddev: f64,
    pub io_profile: IoProfile,
}

/// Compiled-in class catalog, used when no `--classes` file is supplied.
/// Class A is disk-heavy, B interactive, C network-bound, D batch/mixed —
/// matching the class roles implied by the quantum choice table.
pub fn default_class_catalog() -> Vec<ClassProfile> {
    vec![
        ClassProfile {
            class_id: "A".into(),
            priority_range: [3, 6],
            cpu_burst_mean: 6.0,
            cpu_burst_stddev: 2.0,
            cpu_budget_mean: 50.0,
            cpu_budget_stddev: 10.0,
            io_profile: IoProfile {
                io_types: vec!["disk".into()],
                io_ratio: 0.5,
                io_duration_mean: 4.0,
                io_duration_stddev: 1.5,
            },
        },
        ClassProfile {
            class_id: "B".into(),
            priority_range: [0, 2],
            cpu_burst_mean: 2.0,
            cpu_burst_stddev: 1.0,
            cpu_budget_mean: 20.0,
            cpu_budget_stddev: 5.0,
            io_profile: IoProfile {
                io_types: vec!["keyboard".into(), "network".into()],
                io_ratio: 0.7,
                io_duration_mean: 2.0,
                io_duration_stddev: 1.0,
            },
        },
        ClassProfile {
            class_id: "C".into(),
            priority_range: [2, 5],
            cpu_burst_mean: 4.0,
            cpu_burst_stddev: 1.5,
            cpu_budget_mean: 35.0,
            cpu_budget_stddev: 8.0,
            io_profile: IoProfile {
                io_types: vec!["network".into()],
                io_ratio: 0.6,
                io_duration_mean: 3.0,
                io_duration_stddev: 1.0,
            },
        },
        ClassProfile {
            class_id: "D".into(),
            priority_range: [4, 8],
            cpu_burst_mean: 8.0,
            cpu_burst_stddev: 3.0,
            cpu_budget_mean: 80.0,
            cpu_budget_stddev: 15.0,
            io_profile: IoProfile {
                io_types: vec!["disk".into(), "tape".into()],
                io_ratio: 0.3,
                io_duration_mean: 5.0,
                io_duration_stddev: 2.0,
            },
        },
    ]
}

#[derive(Debug)]
pub struct WorkloadPreset {
    pub name: &'static str,
    pub description: &'static str,
    pub burst_length_mult: f64,
    pub io_ratio_mult: f64,
    pub arrival_spacing: f64,
    pub class_mix: &'static [(&'static str, f64)],
}

const PRESETS: &[WorkloadPreset] = &[
    WorkloadPreset {
        name: "cpu_heavy",
        description: "CPU-bound workload (lots of computation, little IO)",
        burst_length_mult: 1.5,
        io_ratio_mult: 0.3,
        arrival_spacing: 8.0,
        class_mix: &[("A", 0.3), ("D", 0.4), ("C", 0.2), ("B", 0.1)],
    },
    WorkloadPreset {
        name: "io_heavy",
        description: "IO-bound workload (lots of disk/network operations)",
        burst_length_mult: 0.7,
        io_ratio_mult: 1.5,
        arrival_spacing: 3.0,
        class_mix: &[("B", 0.4), ("C", 0.3), ("A", 0.2), ("D", 0.1)],
    },
    WorkloadPreset {
        name: "standard",
        description: "Balanced workload",
        burst_length_mult: 1.0,
        io_ratio_mult: 1.0,
        arrival_spacing: 5.0,
        class_mix: &[("A", 0.25), ("B", 0.4), ("C", 0.3), ("D", 0.2)],
    },
    WorkloadPreset {
        name: "interactive",
        description: "Interactive workload (short bursts, frequent IO)",
        burst_length_mult: 0.5,
        io_ratio_mult: 2.0,
        arrival_spacing: 2.0,
        class_mix: &[("B", 0.7), ("C", 0.3)],
    },
    WorkloadPreset {
        name: "batch",
        description: "Batch workload (long running, minimal IO)",
        burst_length_mult: 2.0,
        io_ratio_mult: 0.2,
        arrival_spacing: 15.0,
        class_mix: &[("D", 0.6), ("A", 0.4)],
    },
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkloadError {
    #[error("unknown workload preset '{0}'")]
    UnknownPreset(String),
    #[error("class catalog is missing class '{class}' required by preset '{preset}'")]
    MissingClass { class: String, preset: String },
}

pub fn lookup_preset(name: &str) -> Result<&'static WorkloadPreset, WorkloadError> {
    PRESETS
        .iter()
        .find(|p| p.name == name)
        .ok_or_else(|| WorkloadError::UnknownPreset(name.to_string()))
}

pub fn preset_names() -> Vec<&'static str> {
    PRESETS.iter().map(|p| p.name).collect()
}

fn choose_class<'a>(
    preset: &WorkloadPreset,
    catalog: &'a [ClassProfile],
    rng: &mut StdRng,
) -> Result<&'a ClassProfile, WorkloadError> {
    let weights: Vec<f64> = preset.class_mix.iter().map(|(_, w)| *w).collect();
    let dist = WeightedIndex::new(&weights).expect("preset class weights must be positive");
    let idx = dist.sample(rng);
    let class_id = preset.class_mix[idx].0;
    catalog
        .iter()
        .find(|c| c.class_id == class_id)
        .ok_or_else(|| WorkloadError::MissingClass {
            class: class_id.to_string(),
            preset: preset.name.to_string(),
        })
}

fn generate_quantum(class_id: &str, rng: &mut StdRng) -> u32 {
    let choices: &[u32] = match class_id {
        "A" => &[4, 5, 6],
        "B" => &[2, 3, 4],
        "C" => &[3, 4, 5],
        "D" => &[5, 6, 7, 8],
        _ => &[4],
    };
    choices[rng.gen_range(0..choices.len())]
}

fn round_clamped(value: f64, min: f64) -> f64 {
    value.round().max(min)
}

fn generate_process(
    class: &ClassProfile,
    preset: &WorkloadPreset,
    pid_num: u64,
    rng: &mut StdRng,
) -> ProcessRecord {
    let priority = rng.gen_range(class.priority_range[0]..=class.priority_range[1]);
    let quantum = generate_quantum(&class.class_id, rng);

    let budget_mean = class.cpu_budget_mean * preset.burst_length_mult;
    let budget_normal = Normal::new(budget_mean, class.cpu_budget_stddev.max(f64::EPSILON))
        .expect("valid budget distribution parameters");
    let cpu_budget = round_clamped(budget_normal.sample(rng), 5.0) as u64;

    let burst_normal = Normal::new(class.cpu_burst_mean, class.cpu_burst_stddev.max(f64::EPSILON))
        .expect("valid burst distribution parameters");
    let io_normal = Normal::new(
        class.io_profile.io_duration_mean,
        class.io_profile.io_duration_stddev.max(f64::EPSILON),
    )
    .expect("valid io distribution parameters");

    let mut bursts = Vec::new();
    let mut cpu_used: u64 = 0;
    let mut burst_count = 0usize;

    while cpu_used < cpu_budget && burst_count < 20 {
        let mut amount = round_clamped(burst_normal.sample(rng) * preset.burst_length_mult, 1.0) as u64;
        if cpu_used + amount > cpu_budget {
            amount = cpu_budget - cpu_used;
        }
        bursts.push(Burst::Cpu { cpu: amount as u32 });
        cpu_used += amount;
        burst_count += 1;

        if cpu_used < cpu_budget && burst_count < 20 {
            let adjusted_ratio = (class.io_profile.io_ratio * preset.io_ratio_mult).min(0.95);
            if rng.gen::<f64>() < adjusted_ratio {
                let kind = class.io_profile.io_types[rng.gen_range(0..class.io_profile.io_types.len())].clone();
                let duration = round_clamped(io_normal.sample(rng), 1.0) as u32;
                bursts.push(Burst::Io { io: IoBurst { kind, duration } });
            }
            burst_count += 1;
        }
    }

    ProcessRecord {
        pid: Pid::from(pid_num.to_string()),
        class_id: Some(class.class_id.clone()),
        priority,
        quantum,
        cpu_budget: Some(cpu_budget),
        cpu_used: Some(cpu_used),
        arrival_time: 0,
        bursts,
    }
}

/// Generate `n` processes under `preset_name`. Returns the records (sorted
/// ascending by arrival time, per spec §4.6 step 7) and the preset applied.
pub fn generate_processes(
    catalog: &[ClassProfile],
    preset_name: &str,
    n: usize,
    arrival_spacing: Option<f64>,
    seed: u64,
) -> Result<(Vec<ProcessRecord>, &'static WorkloadPreset), WorkloadError> {
    let preset = lookup_preset(preset_name)?;
    let spacing = arrival_spacing.unwrap_or(preset.arrival_spacing);
    let mut rng = StdRng::seed_from_u64(seed);

    let mut processes = Vec::with_capacity(n);
    let mut current_time: f64 = 0.0;
    let gap_normal = Normal::new(spacing, (spacing * 0.3).max(f64::EPSILON))
        .expect("valid arrival spacing distribution");

    for i in 0..n {
        let class = choose_class(preset, catalog, &mut rng)?;
        let mut record = generate_process(class, preset, (i + 1) as u64, &mut rng);
        record.arrival_time = current_time.round().max(0.0) as u64;
        processes.push(record);
        current_time += round_clamped(gap_normal.sample(&mut rng), 0.0);
    }

    processes.sort_by_key(|p| p.arrival_time);
    tracing::info!(count = processes.len(), preset = preset.name, "generated workload");
    Ok((processes, preset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_preset_is_rejected() {
        let catalog = default_class_catalog();
        let err = generate_processes(&catalog, "nonexistent", 5, None, 1).unwrap_err();
        assert_eq!(err, WorkloadError::UnknownPreset("nonexistent".into()));
    }

    #[test]
    fn generates_requested_count_sorted_by_arrival() {
        let catalog = default_class_catalog();
        let (processes, preset) = generate_processes(&catalog, "standard", 25, None, 7).unwrap();
        assert_eq!(processes.len(), 25);
        assert_eq!(preset.name, "standard");
        let arrivals: Vec<u64> = processes.iter().map(|p| p.arrival_time).collect();
        let mut sorted = arrivals.clone();
        sorted.sort();
        assert_eq!(arrivals, sorted);
    }

    #[test]
    fn cpu_budget_never_below_five() {
        let catalog = default_class_catalog();
        let (processes, _) = generate_processes(&catalog, "interactive", 50, None, 3).unwrap();
        for p in &processes {
            assert!(p.cpu_budget.unwrap() >= 5);
        }
    }

    #[test]
    fn burst_count_never_exceeds_twenty() {
        let catalog = default_class_catalog();
        let (processes, _) = generate_processes(&catalog, "batch", 50, None, 9).unwrap();
        for p in &processes {
            assert!(p.bursts.len() <= 20);
        }
    }

    #[test]
    fn same_seed_is_fully_reproducible() {
        let catalog = default_class_catalog();
        let (a, _) = generate_processes(&catalog, "standard", 30, None, 123).unwrap();
        let (b, _) = generate_processes(&catalog, "standard", 30, None, 123).unwrap();
        assert_eq!(
            a.iter().map(|p| p.arrival_time).collect::<Vec<_>>(),
            b.iter().map(|p| p.arrival_time).collect::<Vec<_>>()
        );
    }

    #[test]
    fn class_mix_roughly_matches_preset_weights() {
        let catalog = default_class_catalog();
        let (processes, _) = generate_processes(&catalog, "interactive", 2000, None, 11).unwrap();
        let b_count = processes.iter().filter(|p| p.class_id.as_deref() == Some("B")).count();
        let ratio = b_count as f64 / processes.len() as f64;
        assert!((ratio - 0.7).abs() < 0.07, "expected ~0.7 B-class ratio, got {ratio}");
    }

    #[test]
    fn every_burst_has_a_positive_duration() {
        let catalog = default_class_catalog();
        let (processes, _) = generate_processes(&catalog, "cpu_heavy", 40, None, 5).unwrap();
        for p in &processes {
            for b in &p.bursts {
                match b {
                    Burst::Cpu { cpu } => assert!(*cpu >= 1),
                    Burst::Io { io } => assert!(io.duration >= 1),
                }
            }
        }
    }
}
