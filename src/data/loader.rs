// ============================================================
// Layer 4 - Dataset Loaders
// ============================================================
// Three corpora, three raw shapes, one output shape:
//
//   Source       File layout                   Raw keys
//   ─────────    ───────────────────────────   ───────────────────────────
//   math         one JSONL file                question, answer
//   bbh          directory of *.json tasks     examples[].input / .target
//   dolly        one JSONL file                instruction, context, response
//
// Every loader returns a QaDataset of {question, answer} rows
// in file order. Malformed input (bad JSON, missing keys) stops
// the load with the file and line in the error; nothing is
// skipped or default-filled.
//
// The two loaders that use randomness (BBH sampling, the Dolly
// coin flip) take an explicit seed and build their own StdRng.
//
// Reference: serde_json documentation
//            rand crate documentation
//            Rust Book §9 (Error Handling)

use anyhow::{bail, Context, Result};
use rand::{rngs::StdRng, seq::index, Rng, SeedableRng};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::{
    fs::{self, File},
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use crate::data::cleaner::clean_answer;
use crate::data::dataset::QaDataset;
use crate::domain::record::QaRecord;
use crate::domain::traits::RecordSource;

/// Parse every non-blank line of a JSONL file as `T`.
pub(crate) fn read_json_lines<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path)
        .with_context(|| format!("Cannot open '{}'", path.display()))?;

    let mut rows = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line_no = idx + 1;
        let line = line
            .with_context(|| format!("Cannot read '{}' line {}", path.display(), line_no))?;
        if line.trim().is_empty() {
            continue;
        }
        let row = serde_json::from_str(&line)
            .with_context(|| format!("Malformed record at '{}' line {}", path.display(), line_no))?;
        rows.push(row);
    }
    Ok(rows)
}

// ─── Math (grade-school math) ────────────────────────────────────────────────
#[derive(Debug, Deserialize)]
struct MathRaw {
    question: String,
    answer:   String,
}

/// Loads a grade-school math JSONL file and cleans each answer.
pub struct MathLoader {
    path: PathBuf,
}

impl MathLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordSource for MathLoader {
    fn name(&self) -> &str {
        "math"
    }

    fn load(&self) -> Result<QaDataset> {
        let raw: Vec<MathRaw> = read_json_lines(&self.path)?;
        let records: Vec<QaRecord> = raw
            .into_iter()
            .map(|r| QaRecord::new(r.question, clean_answer(&r.answer)))
            .collect();

        tracing::info!("Loaded {} math records from '{}'", records.len(), self.path.display());
        Ok(QaDataset::new(records))
    }
}

/// Load the math train and test splits.
pub fn load_math_data(train: &Path, test: &Path) -> Result<(QaDataset, QaDataset)> {
    let train_data = MathLoader::new(train).load()?;
    let test_data  = MathLoader::new(test).load()?;
    Ok((train_data, test_data))
}

// ─── Big-Bench-Hard ──────────────────────────────────────────────────────────
#[derive(Debug, Clone, Deserialize)]
struct BbhExample {
    input:  String,
    target: String,
}

#[derive(Debug, Deserialize)]
struct BbhTask {
    examples: Vec<BbhExample>,
}

/// Loads every `*.json` task file in a directory.
///
/// Task files are read in sorted path order. When `sample` is set,
/// that many examples are drawn without replacement from the pooled
/// tasks.
pub struct BbhLoader {
    dir:    PathBuf,
    sample: Option<usize>,
    seed:   u64,
}

impl BbhLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), sample: None, seed: 0 }
    }

    /// Draw `n` examples. Non-positive values keep every example,
    /// so the conventional `-1` disables sampling.
    pub fn with_sample(mut self, n: i64) -> Self {
        self.sample = usize::try_from(n).ok().filter(|&n| n > 0);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn task_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Cannot read directory '{}'", self.dir.display()))?
        {
            let path = entry?.path();
            if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("json") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

impl RecordSource for BbhLoader {
    fn name(&self) -> &str {
        "bbh"
    }

    fn load(&self) -> Result<QaDataset> {
        let mut pool: Vec<BbhExample> = Vec::new();

        for path in self.task_files()? {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("Cannot read '{}'", path.display()))?;
            let task: BbhTask = serde_json::from_str(&text)
                .with_context(|| format!("Malformed task file '{}'", path.display()))?;

            tracing::debug!("{}: {} examples", path.display(), task.examples.len());
            pool.extend(task.examples);
        }

        let examples = match self.sample {
            Some(n) if n > pool.len() => bail!(
                "Cannot sample {} examples from '{}': only {} available",
                n,
                self.dir.display(),
                pool.len()
            ),
            Some(n) => {
                let mut rng = StdRng::seed_from_u64(self.seed);
                index::sample(&mut rng, pool.len(), n)
                    .iter()
                    .map(|i| pool[i].clone())
                    .collect()
            }
            None => pool,
        };

        let records: Vec<QaRecord> = examples
            .into_iter()
            .map(|e| QaRecord::new(e.input, e.target))
            .collect();

        tracing::info!("Loaded {} BBH records from '{}'", records.len(), self.dir.display());
        Ok(QaDataset::new(records))
    }
}

// ─── Dolly ───────────────────────────────────────────────────────────────────
#[derive(Debug, Deserialize)]
struct DollyRaw {
    instruction: Option<String>,
    context:     Option<String>,
    response:    String,
}

/// Joins instruction and context with one space, in an order picked
/// by a fair coin per record.
pub fn format_dolly<R: Rng>(instruction: &str, context: &str, rng: &mut R) -> String {
    if rng.gen_bool(0.5) {
        format!("{context} {instruction}")
    } else {
        format!("{instruction} {context}")
    }
}

/// Loads the Dolly instruction JSONL file.
pub struct DollyLoader {
    path: PathBuf,
    seed: u64,
}

impl DollyLoader {
    pub fn new(path: impl Into<PathBuf>, seed: u64) -> Self {
        Self { path: path.into(), seed }
    }
}

impl RecordSource for DollyLoader {
    fn name(&self) -> &str {
        "dolly"
    }

    fn load(&self) -> Result<QaDataset> {
        let file = File::open(&self.path)
            .with_context(|| format!("Cannot open '{}'", self.path.display()))?;
        let mut rng     = StdRng::seed_from_u64(self.seed);
        let mut records = Vec::new();

        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line_no = idx + 1;
            let line = line.with_context(|| {
                format!("Cannot read '{}' line {}", self.path.display(), line_no)
            })?;
            if line.trim().is_empty() {
                continue;
            }

            let raw: DollyRaw = serde_json::from_str(&line).with_context(|| {
                format!("Malformed record at '{}' line {}", self.path.display(), line_no)
            })?;
            let (Some(instruction), Some(context)) = (raw.instruction, raw.context) else {
                bail!(
                    "Record at '{}' line {} needs both `instruction` and `context`",
                    self.path.display(),
                    line_no
                );
            };

            let question = format_dolly(&instruction, &context, &mut rng);
            records.push(QaRecord::new(question, raw.response));
        }

        tracing::info!("Loaded {} Dolly records from '{}'", records.len(), self.path.display());
        Ok(QaDataset::new(records))
    }
}
