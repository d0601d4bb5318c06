//! Live integration tests for mbi-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh Postgres database from the sqlx test harness
//! (`DATABASE_URL` must point at a server the harness can create databases
//! on). The attribution store is owned by another system, so there are no
//! migrations; each test creates the three tables it reads from.
//!
//! Run with `cargo test -p mbi-db -- --ignored`.

use chrono::{Duration, Utc};
use mbi_core::ClientScope;
use mbi_db::{CampaignSource, CampaignStore};
use rust_decimal::Decimal;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn create_schema(pool: &sqlx::PgPool) {
    for ddl in [
        "CREATE TABLE core_post_time ( \
             unique_key TEXT PRIMARY KEY, \
             client TEXT, \
             product TEXT, \
             market TEXT, \
             station TEXT, \
             daypart TEXT, \
             dtspot TIMESTAMPTZ NOT NULL)",
        "CREATE TABLE core_buy_detail ( \
             unique_key TEXT NOT NULL, \
             buyrate NUMERIC(12,2))",
        "CREATE TABLE linear_attribution_metrics ( \
             unique_key TEXT PRIMARY KEY, \
             online_revenue NUMERIC(12,2), \
             online_visits BIGINT, \
             online_orders BIGINT, \
             online_leads BIGINT, \
             impressions BIGINT)",
    ] {
        sqlx::query(ddl)
            .execute(pool)
            .await
            .unwrap_or_else(|e| panic!("schema setup failed: {e}"));
    }
}

/// Insert one spot, its buy detail and its attribution row.
async fn insert_spot(
    pool: &sqlx::PgPool,
    key: &str,
    client: &str,
    days_ago: i64,
    cost: Option<Decimal>,
    visits: Option<i64>,
) {
    sqlx::query(
        "INSERT INTO core_post_time (unique_key, client, station, daypart, dtspot) \
         VALUES ($1, $2, 'ESPN', 'PRIME', $3)",
    )
    .bind(key)
    .bind(client)
    .bind(Utc::now() - Duration::days(days_ago))
    .execute(pool)
    .await
    .expect("insert core_post_time failed");

    if let Some(cost) = cost {
        sqlx::query("INSERT INTO core_buy_detail (unique_key, buyrate) VALUES ($1, $2)")
            .bind(key)
            .bind(cost)
            .execute(pool)
            .await
            .expect("insert core_buy_detail failed");
    }

    sqlx::query(
        "INSERT INTO linear_attribution_metrics \
             (unique_key, online_revenue, online_visits, online_orders, impressions) \
         VALUES ($1, 10.00, $2, 1, 1000)",
    )
    .bind(key)
    .bind(visits)
    .execute(pool)
    .await
    .expect("insert linear_attribution_metrics failed");
}

async fn seed(pool: &sqlx::PgPool) {
    create_schema(pool).await;
    insert_spot(pool, "bark-1", "Bark", 1, Some(Decimal::new(100, 0)), Some(5)).await;
    insert_spot(pool, "bark-2", "BARK", 3, None, Some(2)).await;
    insert_spot(pool, "bark-old", "BARK", 90, Some(Decimal::new(50, 0)), Some(9)).await;
    insert_spot(pool, "barkbox-1", "BARKBOX", 2, Some(Decimal::new(40, 0)), Some(1)).await;
    insert_spot(pool, "acme-1", "ACME", 4, Some(Decimal::new(10, 0)), None).await;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = false)]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn fetch_matches_client_exactly_case_insensitively(pool: sqlx::PgPool) {
    seed(&pool).await;
    let store = CampaignStore::from_pool(pool);

    let dataset = store
        .fetch_campaign_data(&ClientScope::parse("bark"), 30)
        .await
        .expect("fetch failed");

    let keys: Vec<&str> = dataset
        .records()
        .iter()
        .map(|r| r.unique_key.as_str())
        .collect();
    assert_eq!(keys, vec!["bark-1", "bark-2"], "newest first, no BARKBOX rows");
    assert_eq!(dataset.records()[0].spot_cost, Some(Decimal::new(100, 0)));
    assert!(dataset.records()[1].spot_cost.is_none(), "missing buy detail keeps null cost");
}

#[sqlx::test(migrations = false)]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn unknown_client_yields_no_rows(pool: sqlx::PgPool) {
    seed(&pool).await;
    let store = CampaignStore::from_pool(pool);

    let dataset = store
        .fetch_campaign_data(&ClientScope::parse("BAR"), 365)
        .await
        .expect("fetch failed");

    assert!(dataset.is_empty());
}

#[sqlx::test(migrations = false)]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn all_scope_spans_clients_and_skips_unattributed_spots(pool: sqlx::PgPool) {
    seed(&pool).await;
    let store = CampaignStore::from_pool(pool);

    let dataset = store
        .fetch_campaign_data(&ClientScope::All, 30)
        .await
        .expect("fetch failed");

    assert_eq!(dataset.len(), 3);
    assert_eq!(dataset.distinct_clients(), 2, "Bark and BARK are one client");
    assert!(dataset.records().iter().all(|r| r.client == r.client.to_uppercase()));
    assert!(dataset.records().iter().all(|r| r.unique_key != "acme-1"));
}

#[sqlx::test(migrations = false)]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn list_clients_orders_by_attributed_spot_count(pool: sqlx::PgPool) {
    seed(&pool).await;
    insert_spot(&pool, "barkbox-2", "BARKBOX", 1, None, Some(3)).await;
    insert_spot(&pool, "barkbox-3", "BARKBOX", 1, None, Some(3)).await;
    insert_spot(&pool, "barkbox-4", "barkbox", 1, None, Some(3)).await;
    insert_spot(&pool, "bark-3", "bark", 5, None, Some(1)).await;
    let store = CampaignStore::from_pool(pool);

    let clients = store.list_clients(30).await.expect("list failed");

    // BARKBOX: 4 attributed spots, BARK: 3 across three spellings.
    assert_eq!(clients, vec!["BARKBOX", "BARK"]);
}

#[sqlx::test(migrations = false)]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn duplicate_buy_detail_rows_do_not_duplicate_spots(pool: sqlx::PgPool) {
    seed(&pool).await;
    sqlx::query("INSERT INTO core_buy_detail (unique_key, buyrate) VALUES ('bark-1', 100.00)")
        .execute(&pool)
        .await
        .expect("insert duplicate buy detail failed");
    let store = CampaignStore::from_pool(pool);

    let dataset = store
        .fetch_campaign_data(&ClientScope::parse("bark"), 30)
        .await
        .expect("fetch failed");

    assert_eq!(dataset.len(), 2);
    assert_eq!(dataset.records()[0].unique_key, "bark-1");
    assert_eq!(dataset.records()[0].spot_cost, Some(Decimal::new(100, 0)));
}
