// ============================================================
//  Orchestrator binary.
//
//  Loads processes from disk or generates them, runs the chosen
//  algorithm to completion, prints a summary, and exports the
//  timeline + metrics. Same flag names as the original key=value
//  surface, reshaped onto clap's `--flag value` grammar.
// ============================================================

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use sim_export::{export_csv, export_json, export_metrics};
use sim_process::{InputError, Process, ProcessRecord};
use sim_scheduler::{compute_metrics, Algorithm, Scheduler};
use sim_workload::{default_class_catalog, generate_processes};

/// Discrete-time multi-resource process scheduler simulator.
#[derive(Parser, Debug)]
#[command(name = "sim-cli", about = "Run a scheduling simulation over a process workload")]
struct Args {
    /// Load processes from ./job_jsons/process_file_<NNNN>.json instead of generating them.
    #[arg(long)]
    file_num: Option<u32>,

    /// Generate a workload from this preset instead of loading a file.
    #[arg(long)]
    workload: Option<String>,

    /// Cap the number of processes loaded from a file.
    #[arg(long)]
    limit: Option<usize>,

    #[arg(long, default_value_t = 1)]
    cpus: usize,

    #[arg(long, default_value_t = 1)]
    ios: usize,

    #[arg(long, default_value = "RR")]
    algorithm: String,

    #[arg(long, default_value_t = 10)]
    generate_num: usize,

    #[arg(long)]
    arrival_spacing: Option<f64>,

    /// Persist a generated workload under ./job_jsons/ instead of discarding it.
    #[arg(long, default_value_t = false)]
    save_temp: bool,

    /// Seed for workload generation. Not part of the original flag set; added for reproducible runs.
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Suppress info-level logging (errors still print).
    #[arg(long, default_value_t = false)]
    quiet: bool,
}

fn init_logging(quiet: bool) {
    let default_level = if quiet { "error" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn zero_padded(n: u32) -> String {
    format!("{:04}", n)
}

fn next_fid(counter_path: &Path) -> u32 {
    let current = fs::read_to_string(counter_path)
        .ok()
        .and_then(|s| s.trim().parse::<u32>().ok())
        .unwrap_or(0);
    let next = current + 1;
    let _ = fs::write(counter_path, next.to_string());
    next
}

fn load_processes_from_file(file_num: u32, limit: Option<usize>) -> Result<Vec<ProcessRecord>, String> {
    let filename = format!("process_file_{}.json", zero_padded(file_num));
    let candidates = [
        PathBuf::from(&filename),
        PathBuf::from("job_jsons").join(&filename),
    ];
    let body = candidates
        .iter()
        .find_map(|p| fs::read_to_string(p).ok())
        .ok_or_else(|| format!("generator: could not find file {filename}"))?;

    let mut records: Vec<ProcessRecord> =
        serde_json::from_str(&body).map_err(|e| format!("generator: malformed workload file: {e}"))?;
    if let Some(limit) = limit {
        records.truncate(limit);
    }
    Ok(records)
}

fn generate_and_maybe_save(
    workload: &str,
    count: usize,
    arrival_spacing: Option<f64>,
    seed: u64,
    save_temp: bool,
) -> Result<Vec<ProcessRecord>, String> {
    let catalog = default_class_catalog();
    let (records, preset) = generate_processes(&catalog, workload, count, arrival_spacing, seed)
        .map_err(|e| format!("generator: {e}"))?;
    tracing::info!(preset = preset.name, description = preset.description, count = records.len(), "generated workload");

    if save_temp {
        fs::create_dir_all("job_jsons").map_err(|e| format!("generator: {e}"))?;
        let fid = next_fid(Path::new("job_jsons/fid"));
        let path = PathBuf::from("job_jsons").join(format!("process_file_{}.json", zero_padded(fid)));
        let body = serde_json::to_string_pretty(&records).map_err(|e| format!("generator: {e}"))?;
        fs::write(&path, body).map_err(|e| format!("generator: {e}"))?;
        tracing::info!(path = %path.display(), "saved generated workload");
    }

    Ok(records)
}

fn build_processes(records: Vec<ProcessRecord>) -> Vec<Process> {
    let mut processes = Vec::with_capacity(records.len());
    for record in records {
        let pid = record.pid.to_string();
        match Process::from_record(record) {
            Ok(p) => processes.push(p),
            Err(e) => report_input_error(&pid, e),
        }
    }
    processes
}

fn report_input_error(pid: &str, err: InputError) {
    eprintln!("scheduler: rejecting process {pid}: {err}");
}

fn print_summary(processes: &[Process], algorithm: Algorithm, cpus: usize, ios: usize) {
    println!("{}", "=".repeat(60));
    println!("Simulation Configuration:");
    println!("  Algorithm: {algorithm}");
    println!("  CPUs: {cpus}");
    println!("  IO Devices: {ios}");
    println!("  Processes: {}", processes.len());

    let total_cpu: u64 = processes.iter().map(|p| p.remaining_burst_time()).sum();
    let total_io: usize = processes
        .iter()
        .flat_map(|p| p.bursts.iter())
        .filter(|b| matches!(b, sim_process::Burst::Io { .. }))
        .count();
    println!("  Total CPU time needed: {total_cpu}");
    println!("  Total IO bursts: {total_io}");
    println!("{}", "=".repeat(60));
}

fn file_id(file_num: Option<u32>, workload: Option<&str>, generate_num: usize) -> String {
    match (file_num, workload) {
        (Some(n), _) => zero_padded(n),
        (None, Some(w)) => format!("{w}_{generate_num}"),
        (None, None) => "generated".to_string(),
    }
}

fn run() -> Result<(), String> {
    let args = Args::parse();
    init_logging(args.quiet);

    let algorithm: Algorithm = args.algorithm.parse().unwrap_or_else(|_| {
        eprintln!("scheduler: unknown algorithm '{}', falling back to RR", args.algorithm);
        Algorithm::RoundRobin
    });

    let records = if let Some(workload) = &args.workload {
        generate_and_maybe_save(workload, args.generate_num, args.arrival_spacing, args.seed, args.save_temp)?
    } else if let Some(file_num) = args.file_num {
        load_processes_from_file(file_num, args.limit)?
    } else {
        println!("No file or workload specified. Generating standard processes...");
        generate_and_maybe_save("standard", args.generate_num, args.arrival_spacing, args.seed, args.save_temp)?
    };

    let processes = build_processes(records);
    if processes.is_empty() {
        return Err("scheduler: no processes to simulate".to_string());
    }

    print_summary(&processes, algorithm, args.cpus, args.ios);

    let mut scheduler = Scheduler::new(args.cpus, args.ios, algorithm);
    for p in processes {
        scheduler.add_process(p);
    }
    scheduler.run();

    println!("\n--- Simulation Complete ---");
    println!("Time elapsed: {}", scheduler.now());
    println!("Finished processes: {}", scheduler.finished().len());

    let metrics = compute_metrics(&scheduler);
    println!("\nPerformance Metrics:");
    println!("  Mean turnaround: {:.2}", metrics.mean_turnaround);
    println!("  Max turnaround:  {}", metrics.max_turnaround);
    println!("  Mean waiting:    {:.2}", metrics.mean_waiting);

    fs::create_dir_all("timelines").map_err(|e| format!("scheduler: {e}"))?;
    let id = file_id(args.file_num, args.workload.as_deref(), args.generate_num);
    let json_path = PathBuf::from("timelines").join(format!("timeline_{algorithm}_{id}.json"));
    let csv_path = PathBuf::from("timelines").join(format!("timeline_{algorithm}_{id}.csv"));
    let metrics_path = PathBuf::from("timelines").join(format!("timeline_{algorithm}_{id}.metrics.json"));

    export_json(scheduler.events(), &json_path).map_err(|e| format!("scheduler: {e}"))?;
    export_csv(scheduler.events(), &csv_path).map_err(|e| format!("scheduler: {e}"))?;
    export_metrics(&metrics, &metrics_path).map_err(|e| format!("scheduler: {e}"))?;

    println!("\nTimeline exported to:");
    println!("  {}", json_path.display());
    println!("  {}", csv_path.display());
    println!("  {}", metrics_path.display());

    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}
