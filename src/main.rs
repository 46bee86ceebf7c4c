//! Claims Reporting CLI
//!
//! Builds the claims and expenses summary for one experience extract and
//! prints the dashboard figures derived from it

use anyhow::{anyhow, Context, Result};
use claims_reporting::experience::{load_budgets, load_experience};
use claims_reporting::fees::load_fee_definitions;
use claims_reporting::summary::{load_overrides, LINE_LABELS};
use claims_reporting::{ReportRunner, ReportingConfig, TenantReport};
use clap::Parser;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "claims-report")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Monthly experience CSV
    #[arg(short, long)]
    experience: PathBuf,

    /// Fee definitions JSON
    #[arg(short, long)]
    fees: Option<PathBuf>,

    /// Adjustment items CSV (UC settlement, Rx rebates, stop loss reimbursement)
    #[arg(long)]
    overrides: Option<PathBuf>,

    /// Monthly budget CSV
    #[arg(short, long)]
    budgets: Option<PathBuf>,

    /// Reporting configuration JSON
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// CSV output of all 28 summary lines per period
    #[arg(short, long, default_value = "claims_summary.csv")]
    output: PathBuf,

    /// Write the full report as JSON to this path
    #[arg(long)]
    json: Option<PathBuf>,
}

/// Loaders report `Box<dyn Error>`, which is not `Send`
fn loaded<T>(result: Result<T, Box<dyn std::error::Error>>, what: &str) -> Result<T> {
    result.map_err(|e| anyhow!("failed to load {}: {}", what, e))
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    println!("Claims Reporting v{}", env!("CARGO_PKG_VERSION"));
    println!("========================\n");

    let config = match &cli.config {
        Some(path) => loaded(ReportingConfig::from_json_path(path), "configuration")?,
        None => ReportingConfig::default(),
    };
    let experience = loaded(load_experience(&cli.experience), "experience")?;
    println!("Loaded {} experience periods", experience.len());

    let mut runner = ReportRunner::new(config);
    if let Some(path) = &cli.fees {
        runner = runner.with_fees(loaded(load_fee_definitions(path), "fee definitions")?);
    }
    if let Some(path) = &cli.overrides {
        runner = runner.with_overrides(loaded(load_overrides(path), "overrides")?);
    }
    if let Some(path) = &cli.budgets {
        runner = runner.with_budgets(loaded(load_budgets(path), "budgets")?);
    }

    let report = runner.run(&experience);
    print_report(&report);

    write_summary_csv(&report, &cli.output)
        .with_context(|| format!("writing {}", cli.output.display()))?;
    println!("\nSummary lines written to: {}", cli.output.display());

    if let Some(path) = &cli.json {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &report)?;
        println!("Report written to: {}", path.display());
    }

    Ok(())
}

fn print_report(report: &TenantReport) {
    println!(
        "\n{:>8} {:>14} {:>12} {:>14} {:>8} {:>8} {:>10}",
        "Period", "Claims", "Fees", "Total", "LR", "LR 12m", "PMPM"
    );
    println!("{}", "-".repeat(82));
    for m in &report.monthly {
        println!(
            "{:>8} {:>14.2} {:>12.2} {:>14.2} {:>8.4} {:>8.4} {:>10.2}",
            m.period.to_string(),
            m.claims,
            m.fees,
            m.total_cost,
            m.monthly_loss_ratio,
            m.rolling_12_loss_ratio,
            m.pmpm
        );
    }

    let kpis = &report.kpis;
    println!("\nKPIs:");
    println!("  Total Claims: ${:.2}", kpis.total_claims);
    println!("  Total Cost: ${:.2}", kpis.total_cost);
    println!("  Avg Loss Ratio: {:.4}", kpis.avg_loss_ratio);
    println!("  Avg Claim / Member Month: ${:.2}", kpis.avg_claim);
    println!("  Avg Members: {}", kpis.total_members);
    println!("  Avg PMPM: ${:.2}", kpis.avg_pmpm);
    if let Some(gauge) = &report.budget_gauge {
        println!("  Budget Used: {:.1}% ({:?})", gauge.percent_of_budget, gauge.status);
    }

    if !report.rolling_loss_ratios.is_empty() {
        println!("\nRolling Loss Ratios:");
        for window in &report.rolling_loss_ratios {
            println!(
                "  {:>2} months to {}: {:.4} ({:?})",
                window.window_size, window.end_period, window.loss_ratio, window.trend
            );
        }
    }

    for (title, forecast) in [
        ("Loss Ratio Forecast", &report.loss_ratio_forecast),
        ("PMPM Forecast", &report.pmpm_forecast),
    ] {
        if forecast.is_empty() {
            continue;
        }
        println!("\n{}:", title);
        for p in forecast {
            println!(
                "  {}: {:.4} (confidence {:.2})",
                p.future_period, p.predicted_value, p.confidence
            );
        }
    }

    if !report.summary.warnings.is_empty() {
        println!("\nWarnings ({}):", report.summary.warnings.len());
        for w in &report.summary.warnings {
            let period = w.period.map(|p| p.to_string()).unwrap_or_default();
            match w.line {
                Some(line) => println!("  {} line {}: {}", period, line, w.message),
                None => println!("  {} {}", period, w.message),
            }
        }
    }
    for note in &report.notes {
        println!("  Note: {}", note);
    }
}

/// One row per line, one column per period
fn write_summary_csv(report: &TenantReport, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec!["Line".to_string(), "Description".to_string()];
    header.extend(report.summary.rows.iter().map(|row| row.period.to_string()));
    writer.write_record(&header)?;

    let values: Vec<[f64; 28]> = report.summary.rows.iter().map(|row| row.line_values()).collect();
    for (i, label) in LINE_LABELS.iter().enumerate() {
        let mut record = vec![(i + 1).to_string(), label.to_string()];
        record.extend(values.iter().map(|v| format!("{:.2}", v[i])));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}
