//! Run reports for every tenant in a multi-tenant experience extract
//!
//! Tenants are independent, so their reports are computed in parallel;
//! each tenant's period series is still folded in order.

use anyhow::{anyhow, Context, Result};
use claims_reporting::experience::{load_budgets, load_portfolio_from_reader};
use claims_reporting::fees::load_fee_definitions;
use claims_reporting::{ReportRunner, ReportingConfig, TenantReport};
use clap::Parser;
use rayon::prelude::*;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "run-portfolio")]
#[command(about = "Claims and expenses reports for every tenant in a portfolio")]
struct Cli {
    /// Experience CSV with a Tenant column
    #[arg(short, long)]
    experience: PathBuf,

    /// Fee definitions JSON shared by all tenants
    #[arg(short, long)]
    fees: Option<PathBuf>,

    /// Monthly budget CSV shared by all tenants
    #[arg(short, long)]
    budgets: Option<PathBuf>,

    /// Reporting configuration JSON
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long, default_value = "portfolio_reports.json")]
    output: PathBuf,
}

fn loaded<T>(result: Result<T, Box<dyn std::error::Error>>, what: &str) -> Result<T> {
    result.map_err(|e| anyhow!("failed to load {}: {}", what, e))
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let start = Instant::now();
    let config = match &cli.config {
        Some(path) => loaded(ReportingConfig::from_json_path(path), "configuration")?,
        None => ReportingConfig::default(),
    };
    let file = File::open(&cli.experience).with_context(|| format!("opening {}", cli.experience.display()))?;
    let portfolio = loaded(load_portfolio_from_reader(file), "portfolio")?;
    println!("Loaded {} tenants in {:?}", portfolio.len(), start.elapsed());

    let mut runner = ReportRunner::new(config);
    if let Some(path) = &cli.fees {
        runner = runner.with_fees(loaded(load_fee_definitions(path), "fee definitions")?);
    }
    if let Some(path) = &cli.budgets {
        runner = runner.with_budgets(loaded(load_budgets(path), "budgets")?);
    }

    println!("Running reports...");
    let run_start = Instant::now();
    let tenants: Vec<_> = portfolio.iter().collect();
    let reports: Vec<TenantReport> = tenants
        .par_iter()
        .map(|(tenant, experience)| runner.run_tenant(tenant, experience))
        .collect();
    println!("Reports complete in {:?}", run_start.elapsed());

    println!(
        "\n{:<20} {:>8} {:>16} {:>10} {:>10} {:>9}",
        "Tenant", "Periods", "Total Cost", "Avg LR", "Avg PMPM", "Warnings"
    );
    println!("{}", "-".repeat(78));
    for report in &reports {
        println!(
            "{:<20} {:>8} {:>16.2} {:>10.4} {:>10.2} {:>9}",
            report.tenant.as_deref().unwrap_or("-"),
            report.monthly.len(),
            report.kpis.total_cost,
            report.kpis.avg_loss_ratio,
            report.kpis.avg_pmpm,
            report.summary.warnings.len()
        );
    }

    let out = File::create(&cli.output).with_context(|| format!("creating {}", cli.output.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(out), &reports)?;
    println!("\nReports written to: {}", cli.output.display());
    println!("Total time: {:?}", start.elapsed());

    Ok(())
}
