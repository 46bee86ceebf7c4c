//! Report runner for one tenant or a whole portfolio
//!
//! Holds fee definitions, overrides and budgets once, then runs the summary
//! waterfall and every downstream analytic over any number of experience
//! series. Analytics that cannot run (too little history, no premiums) are
//! left empty and noted; the waterfall itself always completes.

use crate::config::ReportingConfig;
use crate::dashboard::{
    aggregate_kpis, budget_gauge, budget_observations, category_breakdown, medical_rx_split, monthly_summaries,
    premiums_by_period, BudgetObservations, CategoryShare, DashboardKpis, FuelGauge, MedicalRxSplit, MonthlySummary,
};
use crate::experience::{BudgetRecord, ExperienceRecord};
use crate::fees::FeeDefinition;
use crate::metrics::loss_ratio::{LossRatioEngine, LossRatioSummary, MonthlyExperience, RollingWindowResult};
use crate::metrics::{project_pmpm, Projection};
use crate::summary::{Overrides, SummaryAggregator, SummaryTable};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Everything reported for one experience series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantReport {
    pub tenant: Option<String>,
    pub summary: SummaryTable,
    pub monthly: Vec<MonthlySummary>,
    pub kpis: DashboardKpis,
    pub rolling_loss_ratios: Vec<RollingWindowResult>,
    pub loss_ratio_summary: Option<LossRatioSummary>,
    pub loss_ratio_forecast: Vec<Projection>,
    pub pmpm_forecast: Vec<Projection>,
    pub budget_gauge: Option<FuelGauge>,
    pub budget_observations: BudgetObservations,
    pub medical_rx: MedicalRxSplit,
    pub categories: Vec<CategoryShare>,
    /// Analytics that were skipped and why
    pub notes: Vec<String>,
}

/// Pre-loaded report runner
///
/// # Example
/// ```ignore
/// let runner = ReportRunner::new(config)
///     .with_fees(load_fee_definitions("fees.json")?)
///     .with_budgets(load_budgets("budgets.csv")?);
///
/// let report = runner.run(&experience);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ReportRunner {
    config: ReportingConfig,
    fees: Vec<FeeDefinition>,
    overrides: Overrides,
    budgets: Vec<BudgetRecord>,
}

impl ReportRunner {
    pub fn new(config: ReportingConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Create runner with configuration read from a JSON file
    pub fn from_config_path(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self::new(ReportingConfig::from_json_path(path)?))
    }

    pub fn with_fees(mut self, fees: Vec<FeeDefinition>) -> Self {
        self.fees = fees;
        self
    }

    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_budgets(mut self, budgets: Vec<BudgetRecord>) -> Self {
        self.budgets = budgets;
        self
    }

    pub fn config(&self) -> &ReportingConfig {
        &self.config
    }

    pub fn fees(&self) -> &[FeeDefinition] {
        &self.fees
    }

    /// Report a single untagged series
    pub fn run(&self, experience: &[ExperienceRecord]) -> TenantReport {
        self.build(None, experience)
    }

    pub fn run_tenant(&self, tenant: &str, experience: &[ExperienceRecord]) -> TenantReport {
        self.build(Some(tenant.to_string()), experience)
    }

    /// Report every tenant of a portfolio, in tenant order
    pub fn run_batch(&self, portfolio: &BTreeMap<String, Vec<ExperienceRecord>>) -> Vec<TenantReport> {
        portfolio
            .iter()
            .map(|(tenant, experience)| self.run_tenant(tenant, experience))
            .collect()
    }

    fn build(&self, tenant: Option<String>, experience: &[ExperienceRecord]) -> TenantReport {
        let label = tenant.clone().unwrap_or_else(|| "series".to_string());
        let mut notes = Vec::new();

        let summary = SummaryAggregator::from_config(&self.config).aggregate(
            experience,
            &self.fees,
            &self.overrides,
            &self.budgets,
        );
        let monthly = monthly_summaries(&summary, &premiums_by_period(experience), self.config.target_loss_ratio);

        // Ratios are only defined for periods carrying premiums
        let priced: Vec<MonthlyExperience> = monthly
            .iter()
            .filter(|m| m.premiums > 0.0)
            .map(|m| MonthlyExperience {
                period: m.period,
                claims: m.claims,
                fees: m.fees,
                premiums: m.premiums,
            })
            .collect();
        if priced.len() < monthly.len() {
            notes.push(format!(
                "{} period(s) without premiums excluded from loss ratio analysis",
                monthly.len() - priced.len()
            ));
        }
        let engine = LossRatioEngine::new(self.config.target_loss_ratio, priced);

        let loss_ratio_summary = match engine.summary() {
            Ok(stats) => Some(stats),
            Err(e) => {
                notes.push(format!("Loss ratio summary skipped: {}", e));
                None
            }
        };
        let loss_ratio_forecast = engine
            .predict(self.config.loss_ratio_prediction_months)
            .unwrap_or_else(|e| {
                notes.push(format!("Loss ratio forecast skipped: {}", e));
                Vec::new()
            });

        let pmpm_history: Vec<_> = monthly
            .iter()
            .filter(|m| m.member_months > 0.0)
            .map(|m| (m.period, m.pmpm))
            .collect();
        let pmpm_forecast = project_pmpm(&pmpm_history, self.config.pmpm_projection_months).unwrap_or_else(|e| {
            notes.push(format!("PMPM forecast skipped: {}", e));
            Vec::new()
        });

        for note in &notes {
            warn!("{}: {}", label, note);
        }

        let report = TenantReport {
            tenant,
            kpis: aggregate_kpis(&monthly),
            rolling_loss_ratios: engine.rolling_windows(&self.config.rolling_periods),
            loss_ratio_summary,
            loss_ratio_forecast,
            pmpm_forecast,
            budget_gauge: budget_gauge(&summary),
            budget_observations: budget_observations(&summary),
            medical_rx: medical_rx_split(&summary),
            categories: category_breakdown(experience),
            summary,
            monthly,
            notes,
        };

        info!(
            "{}: {} periods, total cost {:.2}, avg loss ratio {:.4}",
            label,
            report.monthly.len(),
            report.kpis.total_cost,
            report.kpis.avg_loss_ratio
        );
        report
    }
}
