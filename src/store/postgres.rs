//! Postgres-backed store.
//!
//! The machine aggregate is one transactional unit, so it is persisted as a
//! single JSONB document keyed by id, with the status denormalized into an
//! indexed column for the driver's selection queries.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use super::{StateMachineStore, StoreError};
use crate::state_machine::{FiniteStateMachine, Status};

const CREATE_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS seqflow_state_machines (
    id UUID PRIMARY KEY,
    name TEXT NOT NULL,
    status TEXT NOT NULL,
    document JSONB NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
)";

const CREATE_STATUS_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS seqflow_state_machines_status_idx
    ON seqflow_state_machines (status)";

pub struct PgStateMachineStore {
    pool: PgPool,
}

impl PgStateMachineStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Bootstrap the schema on startup; idempotent.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_STATUS_INDEX).execute(&self.pool).await?;
        Ok(())
    }

    fn from_document(document: serde_json::Value) -> Result<FiniteStateMachine, StoreError> {
        Ok(serde_json::from_value(document)?)
    }
}

#[async_trait]
impl StateMachineStore for PgStateMachineStore {
    async fn find_by_status(
        &self,
        status: Status,
    ) -> Result<Vec<FiniteStateMachine>, StoreError> {
        self.find_by_statuses(&[status]).await
    }

    async fn find_by_statuses(
        &self,
        statuses: &[Status],
    ) -> Result<Vec<FiniteStateMachine>, StoreError> {
        let labels: Vec<String> = statuses.iter().map(ToString::to_string).collect();
        let rows = sqlx::query(
            "SELECT document FROM seqflow_state_machines \
             WHERE status = ANY($1) ORDER BY updated_at, id",
        )
        .bind(&labels)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| Self::from_document(row.try_get("document")?))
            .collect()
    }

    async fn find_by_identifier(
        &self,
        name: &str,
    ) -> Result<Option<FiniteStateMachine>, StoreError> {
        let row = sqlx::query(
            "SELECT document FROM seqflow_state_machines WHERE name = $1 LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| Self::from_document(r.try_get("document")?))
            .transpose()
    }

    async fn persist(&self, machine: &FiniteStateMachine) -> Result<(), StoreError> {
        let document = serde_json::to_value(machine)?;
        sqlx::query(
            "INSERT INTO seqflow_state_machines (id, name, status, document, updated_at) \
             VALUES ($1, $2, $3, $4, now()) \
             ON CONFLICT (id) DO UPDATE SET \
                 name = EXCLUDED.name, \
                 status = EXCLUDED.status, \
                 document = EXCLUDED.document, \
                 updated_at = now()",
        )
        .bind(machine.id)
        .bind(&machine.name)
        .bind(machine.status.to_string())
        .bind(document)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
