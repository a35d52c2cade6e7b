// ============================================================
// Layer 6 - Prepared Data Export
// ============================================================
// Writes everything an out-of-process trainer needs into the
// output directory:
//
//   <output_dir>/
//     train.jsonl           ← one TokenizedSample per line
//     eval.jsonl            ← one TokenizedSample per line
//     training_args.json    ← TrainingArguments
//
// Reference: serde_json documentation
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::data::dataset::TokenizedDataset;
use crate::ml::trainer::TrainingArguments;

/// Where each exported file ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub train: PathBuf,
    pub eval:  PathBuf,
    pub args:  PathBuf,
}

/// Write one JSON object per sample.
pub fn write_samples(path: &Path, dataset: &TokenizedDataset) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Cannot create '{}'", path.display()))?;
    let mut out = BufWriter::new(file);
    for sample in dataset.samples() {
        serde_json::to_writer(&mut out, sample)?;
        out.write_all(b"\n")?;
    }
    out.flush()
        .with_context(|| format!("Cannot write '{}'", path.display()))?;

    tracing::debug!("Wrote {} samples to '{}'", dataset.num_rows(), path.display());
    Ok(())
}

/// Export both datasets and the trainer arguments into `dir`.
pub fn export_prepared(
    dir:   &Path,
    train: &TokenizedDataset,
    eval:  &TokenizedDataset,
    args:  &TrainingArguments,
) -> Result<ExportPaths> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Cannot create output directory '{}'", dir.display()))?;

    let paths = ExportPaths {
        train: dir.join("train.jsonl"),
        eval:  dir.join("eval.jsonl"),
        args:  dir.join("training_args.json"),
    };

    write_samples(&paths.train, train)?;
    write_samples(&paths.eval, eval)?;
    fs::write(&paths.args, serde_json::to_string_pretty(args)?)
        .with_context(|| format!("Cannot write '{}'", paths.args.display()))?;

    tracing::info!("Exported prepared data to '{}'", dir.display());
    Ok(paths)
}
