//! Dimensional breakdowns and daily trends.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use mbi_core::CampaignRecord;
use rust_decimal::Decimal;

use crate::calculator::round_ratio;
use crate::types::{
    BreakdownRow, Breakdowns, DailyTrend, MetricValue, SliceStats, StationDaypartRow,
};

/// Label for records with no value in the grouped dimension.
pub const UNKNOWN_DIMENSION: &str = "UNKNOWN";

pub const MARKET_LIMIT: usize = 10;
pub const STATION_DAYPART_LIMIT: usize = 20;
pub const STATION_DAYPART_MIN_SPOTS: usize = 5;

#[derive(Default)]
struct Accumulator {
    spots: usize,
    visit_spots: usize,
    visits: i64,
    revenue: Decimal,
    impressions: i64,
    cost: Decimal,
}

impl Accumulator {
    fn add(&mut self, record: &CampaignRecord) {
        self.spots += 1;
        if let Some(visits) = record.online_visits {
            self.visit_spots += 1;
            self.visits = self.visits.saturating_add(visits);
        }
        if let Some(revenue) = record.online_revenue {
            self.revenue = self.revenue.saturating_add(revenue);
        }
        if let Some(impressions) = record.impressions {
            self.impressions = self.impressions.saturating_add(impressions);
        }
        if let Some(cost) = record.spot_cost {
            self.cost = self.cost.saturating_add(cost);
        }
    }

    fn finish(self) -> SliceStats {
        let impressions = Decimal::from(self.impressions);
        let avg_visits_per_spot = MetricValue::ratio(
            Decimal::from(self.visits),
            Decimal::from(self.visit_spots),
        )
        .value()
        .map_or(Decimal::ZERO, round_ratio);

        SliceStats {
            spots: self.spots,
            visits: self.visits,
            avg_visits_per_spot,
            revenue: self.revenue,
            impressions: self.impressions,
            cost: self.cost,
            cpm: MetricValue::per_thousand(self.cost, impressions),
            visits_per_thousand_impressions: MetricValue::per_thousand(
                Decimal::from(self.visits),
                impressions,
            ),
        }
    }
}

fn dimension(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map_or_else(|| UNKNOWN_DIMENSION.to_string(), str::to_string)
}

fn group_by<K, F>(records: &[CampaignRecord], key: F) -> BTreeMap<K, SliceStats>
where
    K: Ord,
    F: Fn(&CampaignRecord) -> K,
{
    let mut groups: BTreeMap<K, Accumulator> = BTreeMap::new();
    for record in records {
        groups.entry(key(record)).or_default().add(record);
    }
    groups.into_iter().map(|(k, acc)| (k, acc.finish())).collect()
}

/// Groups arrive name-sorted from the `BTreeMap`; a stable sort keeps name
/// order among ties.
fn ranked<F>(groups: BTreeMap<String, SliceStats>, by: F) -> Vec<BreakdownRow>
where
    F: Fn(&SliceStats, &SliceStats) -> Ordering,
{
    let mut rows: Vec<BreakdownRow> = groups
        .into_iter()
        .map(|(name, stats)| BreakdownRow { name, stats })
        .collect();
    rows.sort_by(|a, b| by(&a.stats, &b.stats));
    rows
}

fn visits_desc(a: &SliceStats, b: &SliceStats) -> Ordering {
    b.visits.cmp(&a.visits)
}

fn avg_visits_desc(a: &SliceStats, b: &SliceStats) -> Ordering {
    b.avg_visits_per_spot.cmp(&a.avg_visits_per_spot)
}

/// Station, daypart, market and station-by-daypart performance.
#[must_use]
pub fn compute_breakdowns(records: &[CampaignRecord]) -> Breakdowns {
    let by_station = ranked(
        group_by(records, |r| dimension(r.station.as_deref())),
        visits_desc,
    );
    let by_daypart = ranked(
        group_by(records, |r| dimension(r.daypart.as_deref())),
        avg_visits_desc,
    );
    let mut by_market = ranked(
        group_by(records, |r| dimension(r.market.as_deref())),
        visits_desc,
    );
    by_market.truncate(MARKET_LIMIT);

    let mut by_station_daypart: Vec<StationDaypartRow> = group_by(records, |r| {
        (dimension(r.station.as_deref()), dimension(r.daypart.as_deref()))
    })
    .into_iter()
    .filter(|(_, stats)| stats.spots >= STATION_DAYPART_MIN_SPOTS)
    .map(|((station, daypart), stats)| StationDaypartRow {
        station,
        daypart,
        stats,
    })
    .collect();
    by_station_daypart.sort_by(|a, b| avg_visits_desc(&a.stats, &b.stats));
    by_station_daypart.truncate(STATION_DAYPART_LIMIT);

    Breakdowns {
        by_station,
        by_daypart,
        by_market,
        by_station_daypart,
    }
}

/// Spots, revenue and visits per calendar day (UTC), oldest first.
#[must_use]
pub fn compute_daily_trends(records: &[CampaignRecord]) -> Vec<DailyTrend> {
    let mut days: BTreeMap<NaiveDate, DailyTrend> = BTreeMap::new();
    for record in records {
        let date = record.spot_time.date_naive();
        let day = days.entry(date).or_insert_with(|| DailyTrend {
            date,
            spots: 0,
            revenue: Decimal::ZERO,
            visits: 0,
        });
        day.spots += 1;
        if let Some(revenue) = record.online_revenue {
            day.revenue = day.revenue.saturating_add(revenue);
        }
        if let Some(visits) = record.online_visits {
            day.visits = day.visits.saturating_add(visits);
        }
    }
    days.into_values().collect()
}
