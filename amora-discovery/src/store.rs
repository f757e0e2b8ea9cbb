//! Postgres/Redis/HTTP adapters behind the engine's port traits.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use amora_engine::error::{EngineError, EngineResult};
use amora_engine::ports::{CandidateStore, Conversations, Entitlements, InterestLedger};
use amora_engine::profile::{Orientation, ProfileRecord};
use amora_shared::clients::db::DbPool;
use amora_shared::clients::redis::RedisClient;

use crate::models::{NewInterest, Profile};
use crate::schema::{blocks, interests, profiles};

type PooledPg =
    diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<diesel::pg::PgConnection>>;

fn pool_conn(db: &DbPool) -> EngineResult<PooledPg> {
    db.get().map_err(|e| EngineError::storage(e.to_string()))
}

/// Profile reads over Postgres, with presence enriched from Redis so the
/// online flag is fresh on every call (the socket layer owns the keys).
pub struct PgCandidateStore {
    db: DbPool,
    redis: RedisClient,
}

impl PgCandidateStore {
    pub fn new(db: DbPool, redis: RedisClient) -> Self {
        Self { db, redis }
    }
}

#[async_trait]
impl CandidateStore for PgCandidateStore {
    async fn get(&self, id: Uuid) -> EngineResult<Option<ProfileRecord>> {
        let row: Option<Profile> = {
            let mut conn = pool_conn(&self.db)?;
            profiles::table
                .find(id)
                .first::<Profile>(&mut conn)
                .optional()
                .map_err(|e| EngineError::storage(e.to_string()))?
        };

        let Some(row) = row else { return Ok(None) };
        let mut record = row.into_record();

        let key = format!("online:{}", record.id);
        if let Ok(true) = self.redis.exists(&key).await {
            record.online = true;
        }

        Ok(Some(record))
    }

    async fn window(&self, pool: Orientation, limit: usize) -> EngineResult<Vec<ProfileRecord>> {
        let rows: Vec<Profile> = {
            let mut conn = pool_conn(&self.db)?;
            profiles::table
                .filter(profiles::orientation.eq(pool.as_str()))
                .filter(profiles::is_visible.eq(true))
                .filter(profiles::photo_url.is_not_null())
                .order(profiles::last_active_at.desc())
                .limit(limit as i64)
                .load::<Profile>(&mut conn)
                .map_err(|e| EngineError::storage(e.to_string()))?
        };

        let mut records: Vec<ProfileRecord> = rows.into_iter().map(Profile::into_record).collect();

        // One pipelined round trip for the whole window.
        let keys: Vec<String> = records.iter().map(|r| format!("online:{}", r.id)).collect();
        match self.redis.exists_multi(&keys).await {
            Ok(flags) => {
                for (record, live) in records.iter_mut().zip(flags) {
                    if live {
                        record.online = true;
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "presence enrichment failed, using stored flags");
            }
        }

        Ok(records)
    }
}

/// Interest and block edges over Postgres. The (from, to) pair carries a
/// unique index; upsert relies on ON CONFLICT DO NOTHING so a re-signal
/// neither errors nor touches the original timestamp.
pub struct PgInterestLedger {
    db: DbPool,
}

impl PgInterestLedger {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl InterestLedger for PgInterestLedger {
    async fn upsert(&self, from: Uuid, to: Uuid, at: DateTime<Utc>) -> EngineResult<bool> {
        let mut conn = pool_conn(&self.db)?;
        let inserted = diesel::insert_into(interests::table)
            .values(&NewInterest {
                from_profile_id: from,
                to_profile_id: to,
                created_at: at,
            })
            .on_conflict((interests::from_profile_id, interests::to_profile_id))
            .do_nothing()
            .execute(&mut conn)
            .map_err(|e| EngineError::storage(e.to_string()))?;
        Ok(inserted > 0)
    }

    async fn exists(&self, from: Uuid, to: Uuid) -> EngineResult<bool> {
        let mut conn = pool_conn(&self.db)?;
        let count: i64 = interests::table
            .filter(interests::from_profile_id.eq(from))
            .filter(interests::to_profile_id.eq(to))
            .count()
            .get_result(&mut conn)
            .map_err(|e| EngineError::storage(e.to_string()))?;
        Ok(count > 0)
    }

    async fn remove(&self, from: Uuid, to: Uuid) -> EngineResult<bool> {
        let mut conn = pool_conn(&self.db)?;
        let deleted = diesel::delete(
            interests::table
                .filter(interests::from_profile_id.eq(from))
                .filter(interests::to_profile_id.eq(to)),
        )
        .execute(&mut conn)
        .map_err(|e| EngineError::storage(e.to_string()))?;
        Ok(deleted > 0)
    }

    async fn outgoing(&self, from: Uuid) -> EngineResult<HashSet<Uuid>> {
        let mut conn = pool_conn(&self.db)?;
        let ids: Vec<Uuid> = interests::table
            .filter(interests::from_profile_id.eq(from))
            .select(interests::to_profile_id)
            .load(&mut conn)
            .map_err(|e| EngineError::storage(e.to_string()))?;
        Ok(ids.into_iter().collect())
    }

    async fn incoming(&self, to: Uuid) -> EngineResult<HashSet<Uuid>> {
        let mut conn = pool_conn(&self.db)?;
        let ids: Vec<Uuid> = interests::table
            .filter(interests::to_profile_id.eq(to))
            .select(interests::from_profile_id)
            .load(&mut conn)
            .map_err(|e| EngineError::storage(e.to_string()))?;
        Ok(ids.into_iter().collect())
    }

    async fn blocked_between(&self, a: Uuid, b: Uuid) -> EngineResult<bool> {
        let mut conn = pool_conn(&self.db)?;
        let count: i64 = blocks::table
            .filter(
                blocks::blocker_id
                    .eq(a)
                    .and(blocks::blocked_id.eq(b))
                    .or(blocks::blocker_id.eq(b).and(blocks::blocked_id.eq(a))),
            )
            .count()
            .get_result(&mut conn)
            .map_err(|e| EngineError::storage(e.to_string()))?;
        Ok(count > 0)
    }

    async fn blocked_with(&self, id: Uuid) -> EngineResult<HashSet<Uuid>> {
        let mut conn = pool_conn(&self.db)?;
        let rows: Vec<(Uuid, Uuid)> = blocks::table
            .filter(blocks::blocker_id.eq(id).or(blocks::blocked_id.eq(id)))
            .select((blocks::blocker_id, blocks::blocked_id))
            .load(&mut conn)
            .map_err(|e| EngineError::storage(e.to_string()))?;
        Ok(rows
            .into_iter()
            .map(|(blocker, blocked)| if blocker == id { blocked } else { blocker })
            .collect())
    }
}

/// Billing collaborator over HTTP. Any failure degrades to the free tier
/// rather than failing the search.
pub struct HttpEntitlements {
    client: reqwest::Client,
    base_url: String,
}

impl HttpEntitlements {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct EntitlementData {
    active: bool,
}

#[derive(Debug, serde::Deserialize)]
struct CollaboratorResponse<T> {
    data: T,
}

#[async_trait]
impl Entitlements for HttpEntitlements {
    async fn is_active(&self, profile_id: Uuid) -> bool {
        let url = format!("{}/internal/entitlements/{profile_id}", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => {
                match resp.json::<CollaboratorResponse<EntitlementData>>().await {
                    Ok(body) => body.data.active,
                    Err(e) => {
                        tracing::warn!(error = %e, "unparseable entitlement response, assuming free tier");
                        false
                    }
                }
            }
            Ok(resp) => {
                tracing::warn!(status = %resp.status(), "entitlement lookup failed, assuming free tier");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "entitlement lookup error, assuming free tier");
                false
            }
        }
    }
}

/// Messaging collaborator over HTTP: "does a conversation exist" as a
/// boolean signal, consumed by views layered on top of match data.
pub struct HttpConversations {
    client: reqwest::Client,
    base_url: String,
}

impl HttpConversations {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct ConversationData {
    exists: bool,
}

#[async_trait]
impl Conversations for HttpConversations {
    async fn exists(&self, a: Uuid, b: Uuid) -> bool {
        let url = format!(
            "{}/internal/conversations/exists?profile_a={a}&profile_b={b}",
            self.base_url
        );
        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => resp
                .json::<CollaboratorResponse<ConversationData>>()
                .await
                .map(|body| body.data.exists)
                .unwrap_or(false),
            _ => false,
        }
    }
}
