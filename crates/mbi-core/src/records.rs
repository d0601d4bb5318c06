use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One attributed TV spot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignRecord {
    pub unique_key: String,
    pub client: String,
    pub product: Option<String>,
    pub market: Option<String>,
    pub station: Option<String>,
    pub daypart: Option<String>,
    pub spot_time: DateTime<Utc>,
    pub spot_cost: Option<Decimal>,
    pub online_revenue: Option<Decimal>,
    pub online_visits: Option<i64>,
    pub online_orders: Option<i64>,
    pub online_leads: Option<i64>,
    pub impressions: Option<i64>,
}

/// Which clients an analysis run covers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum ClientScope {
    All,
    Client(String),
}

impl ClientScope {
    pub const ALL_SENTINEL: &'static str = "ALL";
    pub const ALL_LABEL: &'static str = "ALL_CLIENTS";

    /// Interpret a user-supplied client argument. `ALL` (any case) selects
    /// every client; anything else is trimmed and upper-cased.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_uppercase();
        if normalized == Self::ALL_SENTINEL {
            ClientScope::All
        } else {
            ClientScope::Client(normalized)
        }
    }

    /// The client name to filter on, or `None` for all clients.
    #[must_use]
    pub fn client(&self) -> Option<&str> {
        match self {
            ClientScope::All => None,
            ClientScope::Client(name) => Some(name),
        }
    }

    /// Display label used in reports and prompts.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            ClientScope::All => Self::ALL_LABEL,
            ClientScope::Client(name) => name,
        }
    }

    /// Filesystem-safe stem derived from the label.
    #[must_use]
    pub fn file_stem(&self) -> String {
        let stem: String = self
            .label()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        if stem.trim_matches('_').is_empty() {
            "client".to_string()
        } else {
            stem
        }
    }
}

impl std::fmt::Display for ClientScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The immutable set of records one analysis run operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignDataset {
    scope: ClientScope,
    lookback_days: u32,
    records: Vec<CampaignRecord>,
}

impl CampaignDataset {
    #[must_use]
    pub fn new(scope: ClientScope, lookback_days: u32, records: Vec<CampaignRecord>) -> Self {
        Self {
            scope,
            lookback_days,
            records,
        }
    }

    #[must_use]
    pub fn empty(scope: ClientScope, lookback_days: u32) -> Self {
        Self::new(scope, lookback_days, Vec::new())
    }

    #[must_use]
    pub fn scope(&self) -> &ClientScope {
        &self.scope
    }

    #[must_use]
    pub fn lookback_days(&self) -> u32 {
        self.lookback_days
    }

    #[must_use]
    pub fn records(&self) -> &[CampaignRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Earliest and latest spot time, or `None` for an empty dataset.
    #[must_use]
    pub fn date_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = self.records.first()?.spot_time;
        Some(
            self.records
                .iter()
                .fold((first, first), |(lo, hi), r| {
                    (lo.min(r.spot_time), hi.max(r.spot_time))
                }),
        )
    }

    /// Number of distinct client names in the dataset.
    #[must_use]
    pub fn distinct_clients(&self) -> usize {
        let mut clients: Vec<&str> = self.records.iter().map(|r| r.client.as_str()).collect();
        clients.sort_unstable();
        clients.dedup();
        clients.len()
    }
}
