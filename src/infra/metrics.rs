// ============================================================
// Layer 6 - Experiment Trackers
// ============================================================
// Two ExperimentTracker sinks:
//
//   FileTracker    → <output_dir>/runs/<run_name>/
//                      config.json     written by log_config
//                      metrics.jsonl   one line per log_metrics
//                      summary.json    written by finish
//   TracingTracker → everything goes through tracing::info!
//                    (selected with --no-track)
//
// Example metrics.jsonl:
//   {"step":0,"eval_accuracy":0.125}
//   {"step":400,"loss":1.93}
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use serde::Serialize;
use std::{
    fs::{self, File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use crate::domain::record::Metrics;
use crate::domain::traits::{ExperimentTracker, RunStatus};

#[derive(Debug, Serialize)]
struct RunSummary<'a> {
    project:       &'a str,
    run_name:      &'a str,
    status:        &'a str,
    steps_logged:  usize,
    last_step:     Option<usize>,
}

// ─── FileTracker ─────────────────────────────────────────────────────────────
pub struct FileTracker {
    project:      String,
    run_name:     String,
    run_dir:      PathBuf,
    metrics_path: PathBuf,
    steps_logged: usize,
    last_step:    Option<usize>,
}

impl FileTracker {
    /// Create the run directory and start an empty metrics log.
    pub fn new(output_dir: &Path, project: &str, run_name: &str) -> Result<Self> {
        let run_dir = output_dir.join("runs").join(run_name);
        fs::create_dir_all(&run_dir)
            .with_context(|| format!("Cannot create run directory '{}'", run_dir.display()))?;

        let metrics_path = run_dir.join("metrics.jsonl");
        File::create(&metrics_path)
            .with_context(|| format!("Cannot create '{}'", metrics_path.display()))?;

        tracing::info!("Tracking run '{}/{}' in '{}'", project, run_name, run_dir.display());
        Ok(Self {
            project: project.to_string(),
            run_name: run_name.to_string(),
            run_dir,
            metrics_path,
            steps_logged: 0,
            last_step: None,
        })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    fn write_json<T: Serialize + ?Sized>(&self, file: &str, value: &T) -> Result<()> {
        let path = self.run_dir.join(file);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json).with_context(|| format!("Cannot write '{}'", path.display()))
    }
}

impl ExperimentTracker for FileTracker {
    fn name(&self) -> &str {
        "file"
    }

    fn log_config(&mut self, config: &serde_json::Value) -> Result<()> {
        self.write_json("config.json", config)
    }

    fn log_metrics(&mut self, step: usize, metrics: &Metrics) -> Result<()> {
        let mut row = serde_json::Map::new();
        row.insert("step".into(), step.into());
        for (k, v) in metrics {
            row.insert(k.clone(), (*v).into());
        }

        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.metrics_path)
            .with_context(|| format!("Cannot open '{}'", self.metrics_path.display()))?;
        writeln!(f, "{}", serde_json::Value::Object(row))?;

        self.steps_logged += 1;
        self.last_step = Some(step);
        tracing::debug!("Logged {} metrics at step {}", metrics.len(), step);
        Ok(())
    }

    fn finish(&mut self, status: RunStatus) -> Result<()> {
        self.write_json("summary.json", &RunSummary {
            project:      &self.project,
            run_name:     &self.run_name,
            status:       status.as_str(),
            steps_logged: self.steps_logged,
            last_step:    self.last_step,
        })?;
        tracing::info!("Run '{}' finished: {}", self.run_name, status.as_str());
        Ok(())
    }
}

// ─── TracingTracker ──────────────────────────────────────────────────────────
pub struct TracingTracker {
    run_name: String,
}

impl TracingTracker {
    pub fn new(run_name: &str) -> Self {
        Self { run_name: run_name.to_string() }
    }
}

impl ExperimentTracker for TracingTracker {
    fn name(&self) -> &str {
        "tracing"
    }

    fn log_config(&mut self, config: &serde_json::Value) -> Result<()> {
        tracing::info!(run = %self.run_name, "config: {}", config);
        Ok(())
    }

    fn log_metrics(&mut self, step: usize, metrics: &Metrics) -> Result<()> {
        for (k, v) in metrics {
            tracing::info!(run = %self.run_name, step, "{k} = {v:.6}");
        }
        Ok(())
    }

    fn finish(&mut self, status: RunStatus) -> Result<()> {
        tracing::info!(run = %self.run_name, "finished: {}", status.as_str());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(path: &Path) -> serde_json::Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_file_tracker_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let mut t = FileTracker::new(dir.path(), "Instruction Tuning Exploration", "test").unwrap();

        t.log_config(&serde_json::json!({ "seed": 0 })).unwrap();
        t.log_metrics(0, &Metrics::from([("eval_accuracy".to_string(), 0.25)])).unwrap();
        t.log_metrics(400, &Metrics::from([("loss".to_string(), 1.5)])).unwrap();
        t.finish(RunStatus::Succeeded).unwrap();

        let run = dir.path().join("runs").join("test");
        assert_eq!(read(&run.join("config.json"))["seed"], 0);

        let lines: Vec<serde_json::Value> = fs::read_to_string(run.join("metrics.jsonl"))
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["step"], 0);
        assert_eq!(lines[0]["eval_accuracy"], 0.25);
        assert_eq!(lines[1]["step"], 400);

        let summary = read(&run.join("summary.json"));
        assert_eq!(summary["status"], "succeeded");
        assert_eq!(summary["project"], "Instruction Tuning Exploration");
        assert_eq!(summary["steps_logged"], 2);
        assert_eq!(summary["last_step"], 400);
    }

    #[test]
    fn test_new_run_starts_empty_log() {
        let dir = tempfile::tempdir().unwrap();
        let mut first = FileTracker::new(dir.path(), "p", "r").unwrap();
        first.log_metrics(1, &Metrics::new()).unwrap();

        let second = FileTracker::new(dir.path(), "p", "r").unwrap();
        let log = fs::read_to_string(second.run_dir().join("metrics.jsonl")).unwrap();
        assert!(log.is_empty());
    }

    #[test]
    fn test_failed_status_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let mut t = FileTracker::new(dir.path(), "p", "r").unwrap();
        t.finish(RunStatus::Failed).unwrap();
        assert_eq!(read(&t.run_dir().join("summary.json"))["status"], "failed");
    }

    #[test]
    fn test_tracing_tracker_accepts_everything() {
        let mut t = TracingTracker::new("test");
        assert_eq!(t.name(), "tracing");
        t.log_config(&serde_json::json!({})).unwrap();
        t.log_metrics(3, &Metrics::from([("loss".to_string(), 0.1)])).unwrap();
        t.finish(RunStatus::Succeeded).unwrap();
    }
}
