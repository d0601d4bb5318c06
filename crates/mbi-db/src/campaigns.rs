//! Queries over the spot, buy-detail and attribution tables.
//!
//! Schema contract: `core_post_time` holds one row per aired spot,
//! `core_buy_detail` carries the buy rate (spot cost) for a spot when known,
//! and `linear_attribution_metrics` holds the online outcomes attributed to
//! it. All three share `unique_key`. Only spots with a non-null
//! `online_visits` count as attributed.
//!
//! Client names are compared and reported upper-cased, so `Bark` and `BARK`
//! are one client. A spot with several buy-detail rows still yields one row.

use chrono::{DateTime, Utc};
use mbi_core::{CampaignRecord, ClientScope};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

/// Upper bound on rows read for one analysis.
pub const MAX_CAMPAIGN_ROWS: i64 = 10_000;

/// Upper bound on clients returned by [`list_clients`].
pub const MAX_LISTED_CLIENTS: i64 = 20;

const LIST_CLIENTS_SQL: &str = "SELECT UPPER(cpt.client) AS client, COUNT(*) AS spot_count \
     FROM core_post_time cpt \
     INNER JOIN linear_attribution_metrics lam ON lam.unique_key = cpt.unique_key \
     WHERE cpt.dtspot >= NOW() - make_interval(days => $1) \
       AND lam.online_visits IS NOT NULL \
       AND cpt.client IS NOT NULL \
     GROUP BY UPPER(cpt.client) \
     ORDER BY spot_count DESC, client ASC \
     LIMIT $2";

const CAMPAIGN_DATA_SQL: &str = "SELECT \
         cpt.unique_key AS unique_key, \
         COALESCE(UPPER(cpt.client), 'UNKNOWN') AS client, \
         cpt.product AS product, \
         cpt.market AS market, \
         cpt.station AS station, \
         cpt.daypart AS daypart, \
         cpt.dtspot::timestamptz AS spot_time, \
         cbd.buyrate::numeric AS spot_cost, \
         lam.online_revenue::numeric AS online_revenue, \
         lam.online_visits::bigint AS online_visits, \
         lam.online_orders::bigint AS online_orders, \
         lam.online_leads::bigint AS online_leads, \
         lam.impressions::bigint AS impressions \
     FROM core_post_time cpt \
     LEFT JOIN LATERAL ( \
         SELECT bd.buyrate FROM core_buy_detail bd \
         WHERE bd.unique_key = cpt.unique_key \
         ORDER BY bd.buyrate DESC NULLS LAST \
         LIMIT 1 \
     ) cbd ON TRUE \
     INNER JOIN linear_attribution_metrics lam ON lam.unique_key = cpt.unique_key \
     WHERE cpt.dtspot >= NOW() - make_interval(days => $1) \
       AND lam.online_visits IS NOT NULL \
       AND ($2::text IS NULL OR UPPER(cpt.client) = $2) \
     ORDER BY cpt.dtspot DESC, cpt.unique_key ASC \
     LIMIT $3";

/// One row of the campaign data query.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CampaignRow {
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

impl From<CampaignRow> for CampaignRecord {
    fn from(row: CampaignRow) -> Self {
        Self {
            unique_key: row.unique_key,
            client: row.client,
            product: row.product,
            market: row.market,
            station: row.station,
            daypart: row.daypart,
            spot_time: row.spot_time,
            spot_cost: row.spot_cost,
            online_revenue: row.online_revenue,
            online_visits: row.online_visits,
            online_orders: row.online_orders,
            online_leads: row.online_leads,
            impressions: row.impressions,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ClientCountRow {
    client: String,
    spot_count: i64,
}

fn days_param(lookback_days: u32) -> i32 {
    i32::try_from(lookback_days).unwrap_or(i32::MAX)
}

/// List clients with attributed spots in the last `lookback_days` days,
/// ordered by attributed spot count (descending) then name.
///
/// At most [`MAX_LISTED_CLIENTS`] names are returned.
///
/// # Errors
///
/// Returns [`DbError::Query`] if the query fails.
pub async fn list_clients(pool: &PgPool, lookback_days: u32) -> Result<Vec<String>, DbError> {
    let rows = sqlx::query_as::<_, ClientCountRow>(LIST_CLIENTS_SQL)
        .bind(days_param(lookback_days))
        .bind(MAX_LISTED_CLIENTS)
        .fetch_all(pool)
        .await?;

    for row in &rows {
        tracing::debug!(
            client = %row.client,
            spots = row.spot_count,
            "client with attributed spots"
        );
    }

    Ok(rows.into_iter().map(|row| row.client).collect())
}

/// Fetch attributed spot records for `scope` in the last `lookback_days`
/// days, newest first.
///
/// Client matching is an exact comparison against the upper-cased client
/// column; an unknown client yields an empty result. At most
/// [`MAX_CAMPAIGN_ROWS`] rows are read.
///
/// # Errors
///
/// Returns [`DbError::Query`] if the query fails or a row cannot be decoded.
pub async fn fetch_campaign_records(
    pool: &PgPool,
    scope: &ClientScope,
    lookback_days: u32,
) -> Result<Vec<CampaignRecord>, DbError> {
    let rows = sqlx::query_as::<_, CampaignRow>(CAMPAIGN_DATA_SQL)
        .bind(days_param(lookback_days))
        .bind(scope.client())
        .bind(MAX_CAMPAIGN_ROWS)
        .fetch_all(pool)
        .await?;

    if i64::try_from(rows.len()).is_ok_and(|n| n >= MAX_CAMPAIGN_ROWS) {
        tracing::warn!(
            scope = %scope,
            limit = MAX_CAMPAIGN_ROWS,
            "campaign data truncated at row limit"
        );
    }

    Ok(rows.into_iter().map(CampaignRecord::from).collect())
}
