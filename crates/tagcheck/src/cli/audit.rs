//! The `tagcheck audit` command.

use clap::{Args, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use tagcheck_core::pipeline::{audit_directory, AuditReport};
use tagcheck_core::{Config, OutputFormat, OutputWriter};

/// Report formats for `audit`.
#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum ReportFormat {
    /// Human-readable summary
    Text,
    /// Single pretty-printed JSON document
    Json,
}

/// Arguments for the `audit` command.
#[derive(Args, Debug)]
pub struct AuditArgs {
    /// Image directory to scan
    #[arg(required = true)]
    pub dir: PathBuf,

    /// Size threshold in MB for the large-file list [default: from config]
    #[arg(long)]
    pub large_mb: Option<f64>,

    /// How many images to list by pixel count [default: from config]
    #[arg(long)]
    pub top: Option<usize>,

    /// Report format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: ReportFormat,
}

pub fn execute(args: AuditArgs, config: &Config) -> anyhow::Result<()> {
    let dir = super::expand_path(&args.dir);
    super::require_exists(&dir)?;
    if !dir.is_dir() {
        anyhow::bail!("Not a directory: {:?}", dir);
    }

    let mut audit = config.audit.clone();
    if let Some(mb) = args.large_mb {
        if mb <= 0.0 {
            anyhow::bail!("--large-mb must be > 0");
        }
        audit.large_file_mb = mb;
    }
    if let Some(top) = args.top {
        audit.top_dimensions = top;
    }

    let report = audit_directory(&dir, &audit);

    let stdout = std::io::stdout();
    match args.format {
        ReportFormat::Json => {
            let mut writer = OutputWriter::new(stdout.lock(), OutputFormat::Json, true);
            writer.write(&report)?;
            writer.finish()?;
        }
        ReportFormat::Text => render_text(&report, &mut stdout.lock())?,
    }
    Ok(())
}

fn render_text<W: Write>(report: &AuditReport, out: &mut W) -> std::io::Result<()> {
    writeln!(out)?;
    writeln!(out, "  Audit of {}", report.root.display())?;
    writeln!(out, "  ───────────────────────────")?;
    writeln!(
        out,
        "  Files scanned:   {} ({:.1} MB)",
        report.files_scanned,
        report.total_bytes as f64 / (1024.0 * 1024.0)
    )?;

    writeln!(out, "\n  .jpg files that are not JPEG: {}", report.mismatches.len())?;
    for m in &report.mismatches {
        match (&m.actual_format, &m.error) {
            (Some(format), _) => writeln!(out, "    {}  (actually {})", m.path.display(), format)?,
            (None, Some(error)) => writeln!(out, "    {}  ({})", m.path.display(), error)?,
            (None, None) => writeln!(out, "    {}", m.path.display())?,
        }
    }

    writeln!(
        out,
        "\n  Files over {} MB: {}",
        report.large_file_mb,
        report.sizes.large_files.len()
    )?;
    for f in &report.sizes.large_files {
        writeln!(out, "    {}  {:.2} MB", f.path.display(), f.size_mb)?;
    }

    writeln!(out, "\n  Largest by pixel count:")?;
    for (rank, d) in report.sizes.largest_by_pixels.iter().enumerate() {
        writeln!(
            out,
            "    {:>3}. {}  {}x{} ({} px)",
            rank + 1,
            d.path.display(),
            d.width,
            d.height,
            d.pixels
        )?;
    }
    if report.sizes.unreadable > 0 {
        writeln!(out, "\n  Unreadable images: {}", report.sizes.unreadable)?;
    }
    writeln!(out)
}
