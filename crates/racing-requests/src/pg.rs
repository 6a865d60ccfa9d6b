//! Postgres-backed `RequestLifecycleStore`, behind the `database` feature.
//! Grounded in the connection/table conventions used elsewhere for durable
//! state: one `DB_URL`-configured connection, one table per entity.
use std::sync::Arc;

use racing_core::error::Error;
use racing_core::error::Result;
use racing_core::id::ID;
use racing_core::request::RaceRequest;
use racing_core::request::RequestStatus;
use tokio_postgres::Client;
use tokio_postgres::NoTls;

pub const REQUESTS_TABLE: &str = "race_requests";

const CREATE_TABLE: &str = const_format::concatcp!(
    "CREATE TABLE IF NOT EXISTS ",
    REQUESTS_TABLE,
    " (
        id              UUID PRIMARY KEY,
        race_id         SMALLINT NOT NULL,
        horse_id        UUID NOT NULL,
        owner_id        UUID NOT NULL,
        status          TEXT NOT NULL,
        race_run_id     UUID,
        failure_reason  TEXT,
        created         TIMESTAMPTZ NOT NULL,
        updated         TIMESTAMPTZ NOT NULL,
        processed       TIMESTAMPTZ
    )"
);

/// Opens a connection to `DB_URL` and ensures the requests table exists.
pub async fn connect() -> Arc<Client> {
    log::info!("connecting to database");
    let url = std::env::var("DB_URL").expect("DB_URL must be set");
    let (client, connection) = tokio_postgres::connect(&url, NoTls).await.expect("database connection failed");
    tokio::spawn(connection);
    client.execute(CREATE_TABLE, &[]).await.expect("create race_requests table");
    Arc::new(client)
}

pub struct PgRequestStore {
    client: Arc<Client>,
}

impl PgRequestStore {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

fn status_str(status: RequestStatus) -> &'static str {
    match status {
        RequestStatus::Pending => "pending",
        RequestStatus::InProgress => "in_progress",
        RequestStatus::Completed => "completed",
        RequestStatus::Failed => "failed",
    }
}

fn status_from_str(s: &str) -> RequestStatus {
    match s {
        "pending" => RequestStatus::Pending,
        "in_progress" => RequestStatus::InProgress,
        "completed" => RequestStatus::Completed,
        "failed" => RequestStatus::Failed,
        other => panic!("unknown request status in database: {other}"),
    }
}

fn row_to_request(row: &tokio_postgres::Row) -> RaceRequest {
    let id: uuid::Uuid = row.get("id");
    let race_id: i16 = row.get("race_id");
    let horse_id: uuid::Uuid = row.get("horse_id");
    let owner_id: uuid::Uuid = row.get("owner_id");
    let created: chrono::DateTime<chrono::Utc> = row.get("created");
    let mut request = RaceRequest::new(id.into(), race_id as u8, horse_id.into(), owner_id.into(), created);
    let status: String = row.get("status");
    let updated: chrono::DateTime<chrono::Utc> = row.get("updated");
    match status_from_str(&status) {
        RequestStatus::InProgress => request.mark_in_progress(updated),
        RequestStatus::Completed => {
            let run_id: Option<uuid::Uuid> = row.get("race_run_id");
            request.mark_completed(run_id.expect("completed request has a race_run_id").into(), updated);
        }
        RequestStatus::Failed => {
            let reason: Option<String> = row.get("failure_reason");
            request.mark_failed(reason.unwrap_or_default(), updated);
        }
        RequestStatus::Pending => {}
    }
    request
}

#[async_trait::async_trait]
impl crate::store::RequestLifecycleStore for PgRequestStore {
    async fn find(&self, correlation_id: ID<RaceRequest>) -> Result<Option<RaceRequest>> {
        let row = self
            .client
            .query_opt(const_format::concatcp!("SELECT * FROM ", REQUESTS_TABLE, " WHERE id = $1"), &[&correlation_id.inner()])
            .await
            .map_err(|e| Error::TransientIo(e.to_string()))?;
        Ok(row.as_ref().map(row_to_request))
    }

    async fn create(&self, request: RaceRequest) -> Result<bool> {
        use racing_core::id::Unique;
        let inserted = self
            .client
            .execute(
                const_format::concatcp!(
                    "INSERT INTO ",
                    REQUESTS_TABLE,
                    " (id, race_id, horse_id, owner_id, status, created, updated)
                     VALUES ($1, $2, $3, $4, $5, $6, $7)
                     ON CONFLICT (id) DO NOTHING"
                ),
                &[
                    &request.id().inner(),
                    &(request.race_id as i16),
                    &request.horse_id.inner(),
                    &request.owner_id.inner(),
                    &status_str(request.status),
                    &request.created,
                    &request.updated,
                ],
            )
            .await
            .map_err(|e| Error::TransientIo(e.to_string()))?;
        Ok(inserted == 1)
    }

    async fn update(&self, request: RaceRequest) -> Result<()> {
        use racing_core::id::Unique;
        self.client
            .execute(
                const_format::concatcp!(
                    "UPDATE ",
                    REQUESTS_TABLE,
                    " SET status = $2, race_run_id = $3, failure_reason = $4, updated = $5, processed = $6 WHERE id = $1"
                ),
                &[
                    &request.id().inner(),
                    &status_str(request.status),
                    &request.race_run_id.map(|id| id.inner()),
                    &request.failure_reason,
                    &request.updated,
                    &request.processed,
                ],
            )
            .await
            .map_err(|e| Error::TransientIo(e.to_string()))?;
        Ok(())
    }

    async fn list_non_complete(&self) -> Result<Vec<RaceRequest>> {
        let rows = self
            .client
            .query(const_format::concatcp!("SELECT * FROM ", REQUESTS_TABLE, " WHERE status != 'completed'"), &[])
            .await
            .map_err(|e| Error::TransientIo(e.to_string()))?;
        Ok(rows.iter().map(row_to_request).collect())
    }
}
