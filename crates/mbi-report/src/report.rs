use chrono::{DateTime, Utc};
use mbi_core::{CampaignDataset, ClientScope};
use mbi_insights::InsightReport;
use mbi_kpi::{DateRange, KpiSet};
use serde::Serialize;

/// Shape of the dataset a report was computed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetSummary {
    pub spots: usize,
    pub clients: usize,
    pub date_range: Option<DateRange>,
}

impl DatasetSummary {
    #[must_use]
    pub fn of(dataset: &CampaignDataset) -> Self {
        Self {
            spots: dataset.len(),
            clients: dataset.distinct_clients(),
            date_range: dataset
                .date_range()
                .map(|(start, end)| DateRange { start, end }),
        }
    }
}

/// One run's complete result. Created once and never changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    generated_at: DateTime<Utc>,
    scope: ClientScope,
    client_label: String,
    lookback_days: u32,
    dataset: DatasetSummary,
    kpis: KpiSet,
    insights: InsightReport,
}

impl Report {
    #[must_use]
    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    #[must_use]
    pub fn scope(&self) -> &ClientScope {
        &self.scope
    }

    #[must_use]
    pub fn client_label(&self) -> &str {
        &self.client_label
    }

    #[must_use]
    pub fn lookback_days(&self) -> u32 {
        self.lookback_days
    }

    #[must_use]
    pub fn dataset(&self) -> &DatasetSummary {
        &self.dataset
    }

    #[must_use]
    pub fn kpis(&self) -> &KpiSet {
        &self.kpis
    }

    #[must_use]
    pub fn insights(&self) -> &InsightReport {
        &self.insights
    }

    /// `<stem>_<YYYYmmdd_HHMMSS>`, shared by every file this report produces.
    #[must_use]
    pub fn file_prefix(&self) -> String {
        format!(
            "{}_{}",
            self.scope.file_stem(),
            self.generated_at.format("%Y%m%d_%H%M%S")
        )
    }
}

/// Assemble a report stamped with the current time.
#[must_use]
pub fn build(dataset: &CampaignDataset, kpis: &KpiSet, insights: &InsightReport) -> Report {
    build_at(dataset, kpis, insights, Utc::now())
}

/// Assemble a report with an explicit timestamp. Inputs are cloned, never
/// modified.
#[must_use]
pub fn build_at(
    dataset: &CampaignDataset,
    kpis: &KpiSet,
    insights: &InsightReport,
    generated_at: DateTime<Utc>,
) -> Report {
    Report {
        generated_at,
        scope: dataset.scope().clone(),
        client_label: dataset.scope().label().to_string(),
        lookback_days: dataset.lookback_days(),
        dataset: DatasetSummary::of(dataset),
        kpis: kpis.clone(),
        insights: insights.clone(),
    }
}
