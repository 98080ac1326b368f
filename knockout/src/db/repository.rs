//! Entity store abstraction and its PostgreSQL implementation.
//!
//! Every engine operation runs inside a single [`StoreTx`]. A transaction is
//! applied by [`StoreTx::commit`]; dropping it without committing discards
//! every write made through it.
#![allow(clippy::needless_raw_string_hashes)]

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use thiserror::Error;

use crate::bracket::models::{
    BracketSlot, Competitor, Group, SlotFilter, SlotId, SlotSpec, SlotUpdate, Tournament,
    TournamentId,
};

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Record addressed by ID does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// Write rejected by a store constraint
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Durable store for tournaments, competitors and bracket slots
#[async_trait]
pub trait BracketStore: Send + Sync {
    /// Open a transaction
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>>;

    /// Check that the store is reachable
    async fn health_check(&self) -> StoreResult<()>;
}

/// Transaction-scoped store handle
#[async_trait]
pub trait StoreTx: Send {
    /// Create a tournament
    async fn create_tournament(&mut self, name: &str) -> StoreResult<Tournament>;

    /// Get a tournament by ID
    async fn get_tournament(&mut self, id: TournamentId) -> StoreResult<Option<Tournament>>;

    /// Get a tournament by ID and hold it exclusively until the transaction ends
    async fn lock_tournament(&mut self, id: TournamentId) -> StoreResult<Option<Tournament>>;

    /// List tournaments, optionally filtered by case-insensitive name substring
    async fn search_tournaments(&mut self, name: Option<&str>) -> StoreResult<Vec<Tournament>>;

    /// Mark a tournament as bracketed
    async fn set_bracketed(&mut self, id: TournamentId) -> StoreResult<()>;

    /// Mark a tournament as finalized
    async fn set_finalized(&mut self, id: TournamentId) -> StoreResult<()>;

    /// Overwrite the cached competitor count
    async fn set_competitor_count(&mut self, id: TournamentId, count: i64) -> StoreResult<()>;

    /// Register a competitor
    async fn create_competitor(
        &mut self,
        name: &str,
        tournament_id: TournamentId,
    ) -> StoreResult<Competitor>;

    /// Competitors of a tournament in registration order
    async fn list_competitors(&mut self, tournament_id: TournamentId)
    -> StoreResult<Vec<Competitor>>;

    /// Number of competitors of a tournament
    async fn count_competitors(&mut self, tournament_id: TournamentId) -> StoreResult<i64>;

    /// Create slots, in order
    async fn create_slots(&mut self, specs: &[SlotSpec]) -> StoreResult<Vec<BracketSlot>>;

    /// Get a slot by ID
    async fn get_slot(&mut self, id: SlotId) -> StoreResult<Option<BracketSlot>>;

    /// Slots of a tournament matching `filter`, ordered by ID
    async fn find_slots(
        &mut self,
        tournament_id: TournamentId,
        filter: &SlotFilter,
    ) -> StoreResult<Vec<BracketSlot>>;

    /// Apply a partial update and return the updated slot
    async fn update_slot(&mut self, id: SlotId, update: &SlotUpdate) -> StoreResult<BracketSlot>;

    /// Apply every write made through this transaction
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

const TOURNAMENT_COLUMNS: &str =
    "id, name, competitor_count, is_bracketed, is_finalized, created_at";

const SLOT_COLUMNS: &str = "id, tournament_id, round, grp, competitor_a, competitor_b, \
     score_a, score_b, winner, is_bye, bye_resolved";

fn tournament_from_row(row: &PgRow) -> Tournament {
    Tournament {
        id: row.get("id"),
        name: row.get("name"),
        competitor_count: row.get("competitor_count"),
        is_bracketed: row.get("is_bracketed"),
        is_finalized: row.get("is_finalized"),
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
    }
}

fn slot_from_row(row: &PgRow) -> StoreResult<BracketSlot> {
    let grp: String = row.get("grp");
    let group = Group::parse(&grp)
        .ok_or_else(|| StoreError::Constraint(format!("unknown bracket group '{grp}'")))?;

    Ok(BracketSlot {
        id: row.get("id"),
        tournament_id: row.get("tournament_id"),
        round: row.get("round"),
        group,
        competitor_a: row.get("competitor_a"),
        competitor_b: row.get("competitor_b"),
        score_a: row.get("score_a"),
        score_b: row.get("score_b"),
        winner: row.get("winner"),
        is_bye: row.get("is_bye"),
        bye_resolved: row.get("bye_resolved"),
    })
}

/// PostgreSQL implementation of `BracketStore`
#[derive(Clone)]
pub struct PgBracketStore {
    pool: PgPool,
}

impl PgBracketStore {
    /// Create a store over an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BracketStore for PgBracketStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgStoreTx { tx }))
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Open PostgreSQL transaction. Rolled back on drop unless committed.
pub struct PgStoreTx {
    tx: Transaction<'static, Postgres>,
}

impl PgStoreTx {
    async fn fetch_tournament(
        &mut self,
        id: TournamentId,
        for_update: bool,
    ) -> StoreResult<Option<Tournament>> {
        let sql = format!(
            "SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = $1{}",
            if for_update { " FOR UPDATE" } else { "" }
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(row.as_ref().map(tournament_from_row))
    }

    async fn update_tournament_flag(&mut self, id: TournamentId, sql: &str) -> StoreResult<()> {
        let result = sqlx::query(sql).bind(id).execute(&mut *self.tx).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "tournament",
                id,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl StoreTx for PgStoreTx {
    async fn create_tournament(&mut self, name: &str) -> StoreResult<Tournament> {
        let sql =
            format!("INSERT INTO tournaments (name) VALUES ($1) RETURNING {TOURNAMENT_COLUMNS}");
        let row = sqlx::query(&sql)
            .bind(name)
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(tournament_from_row(&row))
    }

    async fn get_tournament(&mut self, id: TournamentId) -> StoreResult<Option<Tournament>> {
        self.fetch_tournament(id, false).await
    }

    async fn lock_tournament(&mut self, id: TournamentId) -> StoreResult<Option<Tournament>> {
        self.fetch_tournament(id, true).await
    }

    async fn search_tournaments(&mut self, name: Option<&str>) -> StoreResult<Vec<Tournament>> {
        let rows = match name {
            Some(name) => {
                let sql = format!(
                    "SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE name ILIKE $1 ORDER BY id"
                );
                sqlx::query(&sql)
                    .bind(format!("%{name}%"))
                    .fetch_all(&mut *self.tx)
                    .await?
            }
            None => {
                let sql = format!("SELECT {TOURNAMENT_COLUMNS} FROM tournaments ORDER BY id");
                sqlx::query(&sql).fetch_all(&mut *self.tx).await?
            }
        };

        Ok(rows.iter().map(tournament_from_row).collect())
    }

    async fn set_bracketed(&mut self, id: TournamentId) -> StoreResult<()> {
        self.update_tournament_flag(id, "UPDATE tournaments SET is_bracketed = TRUE WHERE id = $1")
            .await
    }

    async fn set_finalized(&mut self, id: TournamentId) -> StoreResult<()> {
        self.update_tournament_flag(id, "UPDATE tournaments SET is_finalized = TRUE WHERE id = $1")
            .await
    }

    async fn set_competitor_count(&mut self, id: TournamentId, count: i64) -> StoreResult<()> {
        let result = sqlx::query("UPDATE tournaments SET competitor_count = $1 WHERE id = $2")
            .bind(count)
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "tournament",
                id,
            });
        }
        Ok(())
    }

    async fn create_competitor(
        &mut self,
        name: &str,
        tournament_id: TournamentId,
    ) -> StoreResult<Competitor> {
        let row = sqlx::query(
            r#"
            INSERT INTO competitors (name, tournament_id)
            VALUES ($1, $2)
            RETURNING id, name, tournament_id
            "#,
        )
        .bind(name)
        .bind(tournament_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => StoreError::NotFound {
                entity: "tournament",
                id: tournament_id,
            },
            other => StoreError::Database(other),
        })?;

        Ok(Competitor {
            id: row.get("id"),
            name: row.get("name"),
            tournament_id: row.get("tournament_id"),
        })
    }

    async fn list_competitors(
        &mut self,
        tournament_id: TournamentId,
    ) -> StoreResult<Vec<Competitor>> {
        let rows = sqlx::query(
            "SELECT id, name, tournament_id FROM competitors WHERE tournament_id = $1 ORDER BY id",
        )
        .bind(tournament_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Competitor {
                id: row.get("id"),
                name: row.get("name"),
                tournament_id: row.get("tournament_id"),
            })
            .collect())
    }

    async fn count_competitors(&mut self, tournament_id: TournamentId) -> StoreResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM competitors WHERE tournament_id = $1")
            .bind(tournament_id)
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(row.get("total"))
    }

    async fn create_slots(&mut self, specs: &[SlotSpec]) -> StoreResult<Vec<BracketSlot>> {
        let sql = format!(
            r#"
            INSERT INTO bracket_slots
                (tournament_id, round, grp, competitor_a, competitor_b, winner, is_bye)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {SLOT_COLUMNS}
            "#
        );

        let mut created = Vec::with_capacity(specs.len());
        for spec in specs {
            let row = sqlx::query(&sql)
                .bind(spec.tournament_id)
                .bind(spec.round)
                .bind(spec.group.as_str())
                .bind(spec.competitor_a)
                .bind(spec.competitor_b)
                .bind(spec.winner)
                .bind(spec.is_bye)
                .fetch_one(&mut *self.tx)
                .await
                .map_err(|e| match e {
                    sqlx::Error::Database(db) if db.is_unique_violation() => {
                        StoreError::Constraint(db.message().to_string())
                    }
                    other => StoreError::Database(other),
                })?;
            created.push(slot_from_row(&row)?);
        }

        Ok(created)
    }

    async fn get_slot(&mut self, id: SlotId) -> StoreResult<Option<BracketSlot>> {
        let sql = format!("SELECT {SLOT_COLUMNS} FROM bracket_slots WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;

        row.as_ref().map(slot_from_row).transpose()
    }

    async fn find_slots(
        &mut self,
        tournament_id: TournamentId,
        filter: &SlotFilter,
    ) -> StoreResult<Vec<BracketSlot>> {
        let sql = format!(
            r#"
            SELECT {SLOT_COLUMNS} FROM bracket_slots
            WHERE tournament_id = $1
              AND ($2::INTEGER IS NULL OR round = $2)
              AND ($3::TEXT IS NULL OR grp = $3)
              AND ($4::BOOLEAN IS NULL OR is_bye = $4)
            ORDER BY id
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(tournament_id)
            .bind(filter.round)
            .bind(filter.group.map(|g| g.as_str()))
            .bind(filter.is_bye)
            .fetch_all(&mut *self.tx)
            .await?;

        rows.iter().map(slot_from_row).collect()
    }

    async fn update_slot(&mut self, id: SlotId, update: &SlotUpdate) -> StoreResult<BracketSlot> {
        let sql = format!(
            r#"
            UPDATE bracket_slots SET
                competitor_a = COALESCE($2, competitor_a),
                competitor_b = COALESCE($3, competitor_b),
                score_a = COALESCE($4, score_a),
                score_b = COALESCE($5, score_b),
                winner = COALESCE($6, winner),
                is_bye = COALESCE($7, is_bye),
                bye_resolved = COALESCE($8, bye_resolved)
            WHERE id = $1
            RETURNING {SLOT_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(update.competitor_a)
            .bind(update.competitor_b)
            .bind(update.scores.map(|(a, _)| a))
            .bind(update.scores.map(|(_, b)| b))
            .bind(update.winner)
            .bind(update.is_bye)
            .bind(update.bye_resolved)
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or(StoreError::NotFound { entity: "slot", id })?;

        slot_from_row(&row)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
