//! Batch denoise + evaluation CLI.
//!
//! Usage:
//!   denoise_eval <noisy_dir> <output_dir> [clean_dir] [weights.bin]
//!
//! Denoises every WAV in `noisy_dir` into `output_dir`. When `clean_dir`
//! holds files of the same names, objective metrics are computed and
//! aggregated. With a weights blob the learned mask net runs; otherwise
//! the spectral-subtraction fallback.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use vxenhance::{
    is_pesq_available, BatchItem, BatchRunner, Denoiser, EnhanceConfig, EnhancementModel, MaskNet,
    SpectralSubtraction,
};

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let noisy_dir = args
        .next()
        .map(PathBuf::from)
        .context("usage: denoise_eval <noisy_dir> <output_dir> [clean_dir] [weights.bin]")?;
    let output_dir = args
        .next()
        .map(PathBuf::from)
        .context("missing output directory argument")?;
    let clean_dir = args.next().map(PathBuf::from);
    let weights = args.next().map(PathBuf::from);

    let config = EnhanceConfig::default();
    let model: Arc<dyn EnhancementModel> = match &weights {
        Some(path) => Arc::new(MaskNet::load(path)?),
        None => Arc::new(SpectralSubtraction::default()),
    };

    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("creating '{}'", output_dir.display()))?;

    let mut items = Vec::new();
    let mut entries: Vec<PathBuf> = std::fs::read_dir(&noisy_dir)
        .with_context(|| format!("reading '{}'", noisy_dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().map_or(false, |ext| ext == "wav"))
        .collect();
    entries.sort();
    for path in entries {
        let name = path.file_name().expect("wav path has a file name");
        let mut item = BatchItem::new(&path).output(output_dir.join(name));
        if let Some(clean_dir) = &clean_dir {
            let clean = clean_dir.join(name);
            if clean.exists() {
                item = item.reference(clean);
            }
        }
        items.push(item);
    }
    if items.is_empty() {
        anyhow::bail!("no WAV files found in '{}'", noisy_dir.display());
    }

    let runner = BatchRunner::new(Denoiser::new(config, model)?).parallel(true);
    let summary = runner.run(&items);

    println!("Batch summary:");
    println!("  files processed : {}", summary.succeeded);
    println!("  files failed    : {}", summary.failed);
    for failure in &summary.failures {
        println!(
            "    {} [{}] {}",
            failure.input.display(),
            failure.kind,
            failure.message
        );
    }
    if !summary.aggregate.is_empty() {
        println!("  metrics (mean / median over {} pairs):", {
            summary
                .aggregate
                .values()
                .map(|s| s.count)
                .max()
                .unwrap_or(0)
        });
        for (name, stats) in &summary.aggregate {
            println!("    {:<7} {:>8.3} / {:>8.3}", name, stats.mean, stats.median);
        }
        if !is_pesq_available() {
            println!("  (PESQ not computed: no backend available)");
        }
    }
    Ok(())
}
