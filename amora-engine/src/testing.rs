//! In-memory doubles for the engine's ports.
//!
//! Used by this crate's own tests and by downstream crates that want to
//! exercise discovery logic without Postgres, Redis or a socket server.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex as StdMutex;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::EngineResult;
use crate::ports::{
    BoxedTask, CandidateStore, ChannelRegistry, Clock, Conversations, Entitlements,
    InterestLedger, Scheduler,
};
use crate::profile::{Gender, Orientation, ProfileRecord};

/// A visible, photo-bearing hetero male profile with no coordinates.
pub fn profile(name: &str) -> ProfileRecord {
    ProfileRecord {
        id: Uuid::new_v4(),
        display_name: name.to_string(),
        orientation: Some(Orientation::Hetero),
        gender: Some(Gender::Male),
        age: 30,
        city: None,
        latitude: None,
        longitude: None,
        photo_url: Some(format!("https://cdn.example/{name}.jpg")),
        relationship_goal: None,
        role: None,
        visible: true,
        online: false,
        last_active_at: Utc::now(),
        boosted: false,
        boost_expires_at: None,
        responsive: false,
    }
}

pub fn profile_at(name: &str, lat: f64, lng: f64) -> ProfileRecord {
    let mut p = profile(name);
    p.latitude = Some(lat);
    p.longitude = Some(lng);
    p
}

/// Insertion-ordered profile store; ties on last-active keep insertion
/// order, which makes window ordering deterministic in tests.
#[derive(Default)]
pub struct MemoryStore {
    profiles: RwLock<Vec<ProfileRecord>>,
}

impl MemoryStore {
    /// Insert or replace by id.
    pub fn insert(&self, record: ProfileRecord) {
        let mut profiles = self.profiles.write().unwrap();
        if let Some(existing) = profiles.iter_mut().find(|p| p.id == record.id) {
            *existing = record;
        } else {
            profiles.push(record);
        }
    }
}

#[async_trait]
impl CandidateStore for MemoryStore {
    async fn get(&self, id: Uuid) -> EngineResult<Option<ProfileRecord>> {
        Ok(self.profiles.read().unwrap().iter().find(|p| p.id == id).cloned())
    }

    async fn window(&self, pool: Orientation, limit: usize) -> EngineResult<Vec<ProfileRecord>> {
        let mut window: Vec<ProfileRecord> = self
            .profiles
            .read()
            .unwrap()
            .iter()
            .filter(|p| p.visible && p.has_photo() && p.orientation == Some(pool))
            .cloned()
            .collect();
        window.sort_by(|a, b| b.last_active_at.cmp(&a.last_active_at));
        window.truncate(limit);
        Ok(window)
    }
}

#[derive(Default)]
pub struct MemoryLedger {
    edges: RwLock<HashMap<(Uuid, Uuid), DateTime<Utc>>>,
    blocks: RwLock<HashSet<(Uuid, Uuid)>>,
}

impl MemoryLedger {
    pub async fn block(&self, blocker: Uuid, blocked: Uuid) {
        self.blocks.write().unwrap().insert((blocker, blocked));
    }

    pub async fn created_at(&self, from: Uuid, to: Uuid) -> Option<DateTime<Utc>> {
        self.edges.read().unwrap().get(&(from, to)).copied()
    }

    pub async fn edge_count(&self) -> usize {
        self.edges.read().unwrap().len()
    }
}

#[async_trait]
impl InterestLedger for MemoryLedger {
    async fn upsert(&self, from: Uuid, to: Uuid, at: DateTime<Utc>) -> EngineResult<bool> {
        let mut edges = self.edges.write().unwrap();
        match edges.entry((from, to)) {
            std::collections::hash_map::Entry::Occupied(_) => Ok(false),
            std::collections::hash_map::Entry::Vacant(v) => {
                v.insert(at);
                Ok(true)
            }
        }
    }

    async fn exists(&self, from: Uuid, to: Uuid) -> EngineResult<bool> {
        Ok(self.edges.read().unwrap().contains_key(&(from, to)))
    }

    async fn remove(&self, from: Uuid, to: Uuid) -> EngineResult<bool> {
        Ok(self.edges.write().unwrap().remove(&(from, to)).is_some())
    }

    async fn outgoing(&self, from: Uuid) -> EngineResult<HashSet<Uuid>> {
        Ok(self
            .edges
            .read()
            .unwrap()
            .keys()
            .filter(|(f, _)| *f == from)
            .map(|(_, t)| *t)
            .collect())
    }

    async fn incoming(&self, to: Uuid) -> EngineResult<HashSet<Uuid>> {
        Ok(self
            .edges
            .read()
            .unwrap()
            .keys()
            .filter(|(_, t)| *t == to)
            .map(|(f, _)| *f)
            .collect())
    }

    async fn blocked_between(&self, a: Uuid, b: Uuid) -> EngineResult<bool> {
        let blocks = self.blocks.read().unwrap();
        Ok(blocks.contains(&(a, b)) || blocks.contains(&(b, a)))
    }

    async fn blocked_with(&self, id: Uuid) -> EngineResult<HashSet<Uuid>> {
        Ok(self
            .blocks
            .read()
            .unwrap()
            .iter()
            .filter_map(|(blocker, blocked)| {
                if *blocker == id {
                    Some(*blocked)
                } else if *blocked == id {
                    Some(*blocker)
                } else {
                    None
                }
            })
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryEntitlements {
    active: StdMutex<HashSet<Uuid>>,
}

impl MemoryEntitlements {
    pub fn grant(&self, profile_id: Uuid) {
        self.active.lock().unwrap().insert(profile_id);
    }

    pub fn revoke(&self, profile_id: Uuid) {
        self.active.lock().unwrap().remove(&profile_id);
    }
}

#[async_trait]
impl Entitlements for MemoryEntitlements {
    async fn is_active(&self, profile_id: Uuid) -> bool {
        self.active.lock().unwrap().contains(&profile_id)
    }
}

#[derive(Default)]
pub struct MemoryConversations {
    open: StdMutex<HashSet<(Uuid, Uuid)>>,
}

impl MemoryConversations {
    pub fn open_between(&self, a: Uuid, b: Uuid) {
        let key = if a < b { (a, b) } else { (b, a) };
        self.open.lock().unwrap().insert(key);
    }
}

#[async_trait]
impl Conversations for MemoryConversations {
    async fn exists(&self, a: Uuid, b: Uuid) -> bool {
        let key = if a < b { (a, b) } else { (b, a) };
        self.open.lock().unwrap().contains(&key)
    }
}

#[derive(Debug, Clone)]
pub struct EmittedEvent {
    pub profile_id: Uuid,
    pub event: String,
    pub payload: serde_json::Value,
}

/// Records everything the dispatcher emits.
#[derive(Default)]
pub struct RecordingRegistry {
    events: StdMutex<Vec<EmittedEvent>>,
}

impl RecordingRegistry {
    pub fn events(&self) -> Vec<EmittedEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl ChannelRegistry for RecordingRegistry {
    fn emit(&self, profile_id: Uuid, event: &str, payload: serde_json::Value) {
        self.events.lock().unwrap().push(EmittedEvent {
            profile_id,
            event: event.to_string(),
            payload,
        });
    }
}

/// Captures scheduled tasks instead of sleeping; tests fire them manually.
#[derive(Default)]
pub struct ManualScheduler {
    tasks: StdMutex<Vec<(Duration, BoxedTask)>>,
}

impl ManualScheduler {
    pub fn pending_count(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.tasks.lock().unwrap().iter().map(|(d, _)| *d).collect()
    }

    /// Run every captured task to completion, in scheduling order.
    pub async fn run_all(&self) {
        let tasks: Vec<(Duration, BoxedTask)> =
            self.tasks.lock().unwrap().drain(..).collect();
        for (_, task) in tasks {
            task.await;
        }
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: BoxedTask) {
        self.tasks.lock().unwrap().push((delay, task));
    }
}

/// A pinned, manually advanced time source.
pub struct ManualClock {
    now: StdMutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: StdMutex::new(now),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        ManualClock::now(self)
    }
}
