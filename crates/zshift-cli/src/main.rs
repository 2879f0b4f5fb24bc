//! zshift CLI - G-code Z-shift post-processor
//!
//! Rewrites internal perimeter moves of a sliced G-code file in place.

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use zshift_gcode::{
    process_text, split_lines, AuditTrail, RewriteConfig, RewriteEvent, RewriteOutput,
    RewriteReport, SlicerDialect, TracingSink,
};

mod logging;

#[derive(Parser)]
#[command(name = "zshift")]
#[command(
    about = "Post-process G-code for Z-shifting and extrusion adjustments",
    long_about = None
)]
struct Cli {
    /// Path to the input G-code file (overwritten unless --output is given)
    input: PathBuf,

    /// Nominal layer height in mm [default: 0.2]
    #[arg(long, alias = "layerHeight")]
    layer_height: Option<f64>,

    /// Extrusion multiplier (accepted for compatibility, currently has no effect)
    #[arg(long, alias = "extrusionMultiplier")]
    extrusion_multiplier: Option<f64>,

    /// TOML file with rewrite settings; flags take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the result here instead of overwriting the input
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Copy the original to <input>.bak before overwriting it
    #[arg(long, conflicts_with = "output")]
    backup: bool,

    /// Write every rewrite event as JSON to this file
    #[arg(long)]
    audit: Option<PathBuf>,

    /// Write the log to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Rewrite input that was already processed
    #[arg(long)]
    force: bool,

    /// Run the rewrite and print the summary without writing the G-code
    #[arg(long)]
    dry_run: bool,
}

#[derive(Serialize)]
struct AuditFile<'a> {
    input: &'a Path,
    config: &'a RewriteConfig,
    report: &'a RewriteReport,
    events: &'a [RewriteEvent],
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_file.as_deref())?;
    run(&cli)
}

fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    config.validate()?;
    if config.extrusion_multiplier != 1.0 {
        tracing::warn!(
            "Extrusion multiplier {} has no effect on the rewrite",
            config.extrusion_multiplier
        );
    }

    tracing::info!("Starting G-code processing");
    tracing::info!("Input file: {}", cli.input.display());

    let text = fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read G-code from {}", cli.input.display()))?;

    match SlicerDialect::detect(&split_lines(&text)) {
        Some(dialect) => tracing::info!("Detected {} perimeter markers", dialect.name()),
        None => tracing::warn!("No perimeter markers found; nothing will be rewritten"),
    }

    let out = match &cli.audit {
        Some(audit_path) => {
            let mut sinks = (TracingSink, AuditTrail::new());
            let out = process_text(&text, &config, &mut sinks)?;
            write_audit(audit_path, cli, &config, &out, sinks.1.events())?;
            out
        }
        None => process_text(&text, &config, &mut TracingSink)?,
    };
    tracing::info!("Total layers: {}", out.report.total_layers);

    if cli.dry_run {
        print_summary(&out.report, None);
        return Ok(());
    }

    let target = cli.output.as_deref().unwrap_or(&cli.input);
    if cli.backup {
        let backup = backup_path(&cli.input);
        fs::copy(&cli.input, &backup)
            .with_context(|| format!("failed to write backup {}", backup.display()))?;
        tracing::info!("Backup saved at {}", backup.display());
    }
    fs::write(target, &out.text)
        .with_context(|| format!("failed to write G-code to {}", target.display()))?;

    tracing::info!("G-code processing completed");
    if let Some(log_file) = &cli.log_file {
        tracing::info!("Log file saved at {}", log_file.display());
    }
    print_summary(&out.report, Some(target));
    Ok(())
}

fn load_config(cli: &Cli) -> Result<RewriteConfig> {
    let mut config: RewriteConfig = match &cli.config {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            toml::from_str(&raw)
                .with_context(|| format!("invalid config file {}", path.display()))?
        }
        None => RewriteConfig::default(),
    };

    if let Some(layer_height) = cli.layer_height {
        config.nominal_layer_height = layer_height;
    }
    if let Some(multiplier) = cli.extrusion_multiplier {
        config.extrusion_multiplier = multiplier;
    }
    if cli.force {
        config.allow_reprocess = true;
    }
    Ok(config)
}

fn backup_path(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

fn write_audit(
    path: &Path,
    cli: &Cli,
    config: &RewriteConfig,
    out: &RewriteOutput,
    events: &[RewriteEvent],
) -> Result<()> {
    let audit = AuditFile {
        input: &cli.input,
        config,
        report: &out.report,
        events,
    };
    let json = serde_json::to_string_pretty(&audit)?;
    fs::write(path, json)
        .with_context(|| format!("failed to write audit trail {}", path.display()))?;
    tracing::info!("Audit trail saved at {}", path.display());
    Ok(())
}

fn print_summary(report: &RewriteReport, target: Option<&Path>) {
    match target {
        Some(path) => println!("Rewrote {}", path.display()),
        None => println!("Dry run, nothing written"),
    }
    println!("  Layers: {}", report.total_layers);
    println!("  Perimeter blocks: {}", report.blocks);
    println!("  Rescaled extrusions: {}", report.rescaled_extrusions);
    println!("  Lines: {} -> {}", report.input_lines, report.output_lines);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_path() {
        assert_eq!(
            backup_path(Path::new("/tmp/part.gcode")),
            PathBuf::from("/tmp/part.gcode.bak")
        );
    }

    #[test]
    fn test_flag_overrides() {
        let cli = Cli::parse_from([
            "zshift",
            "part.gcode",
            "--layerHeight",
            "0.28",
            "--extrusion-multiplier",
            "1.5",
            "--force",
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.nominal_layer_height, 0.28);
        assert_eq!(config.extrusion_multiplier, 1.5);
        assert!(config.allow_reprocess);
        assert_eq!(config.profile, zshift_gcode::AlternationProfile::default());
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["zshift", "part.gcode"]);
        assert_eq!(load_config(&cli).unwrap(), RewriteConfig::default());
    }

    #[test]
    fn test_backup_conflicts_with_output() {
        let parsed = Cli::try_parse_from(["zshift", "a.gcode", "--backup", "-o", "b.gcode"]);
        assert!(parsed.is_err());
    }
}
