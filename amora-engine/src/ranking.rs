use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::filters::SearchFilters;
use crate::ports::{CandidateStore, Clock, Entitlements, InterestLedger};
use crate::profile::{distance_between, CandidateSummary, Orientation, ProfileRecord};

/// "Recently active" means online now or active within this window.
const RECENT_ACTIVITY_WINDOW_MINUTES: i64 = 120;

/// A boosted candidate is visible only inside this radius; boost reorders
/// within proximity, it never extends reach.
pub const BOOST_RADIUS_KM: f64 = 20.0;

/// Hard total result ceiling for non-entitled viewers, across all pages.
pub const FREE_RESULT_CEILING: usize = 50;

/// Over-fetch multiplier: the raw window is larger than the requested slice
/// so boost-radius and distance filtering can run without extra round trips.
const OVERFETCH_FACTOR: usize = 3;

/// Fetch-window cap for non-entitled viewers (3x the result ceiling, so the
/// ceiling stays reachable after filtering).
const FREE_WINDOW_CAP: usize = FREE_RESULT_CEILING * OVERFETCH_FACTOR;

pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Serialize)]
pub struct SearchPage {
    pub items: Vec<CandidateSummary>,
    pub has_more: bool,
    pub entitled: bool,
}

/// The search/filter/rank pipeline. Stateless per call; the store and
/// ledger are read fresh every time (presence and boost state are mutated
/// by other components and must never be cached here).
pub struct RankingPipeline {
    store: Arc<dyn CandidateStore>,
    ledger: Arc<dyn InterestLedger>,
    entitlements: Arc<dyn Entitlements>,
    clock: Arc<dyn Clock>,
}

struct RankedCandidate {
    record: ProfileRecord,
    distance_km: Option<f64>,
    boosted_in_radius: bool,
}

impl RankingPipeline {
    pub fn new(
        store: Arc<dyn CandidateStore>,
        ledger: Arc<dyn InterestLedger>,
        entitlements: Arc<dyn Entitlements>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            ledger,
            entitlements,
            clock,
        }
    }

    pub async fn search(
        &self,
        viewer_id: Uuid,
        filters: SearchFilters,
        page: u64,
        per_page: usize,
    ) -> EngineResult<SearchPage> {
        let viewer = self
            .store
            .get(viewer_id)
            .await?
            .ok_or_else(|| EngineError::storage(format!("viewer profile {viewer_id} missing")))?;

        let (Some(pool), Some(_gender)) = (viewer.orientation, viewer.gender) else {
            return Err(EngineError::IncompleteProfile);
        };

        let filters = filters.clamped();
        let entitled = self.entitlements.is_active(viewer_id).await;
        let now = self.clock.now();

        let page = page.max(1).min(u32::MAX as u64) as usize;
        let per_page = per_page.clamp(1, MAX_PAGE_SIZE);
        let offset = (page - 1).saturating_mul(per_page);

        // Exclusion set: self plus every block relationship, either direction.
        let mut excluded = self.ledger.blocked_with(viewer_id).await?;
        excluded.insert(viewer_id);

        // Over-fetched window ordered by last-active descending. Free
        // viewers get a capped window; their result set is capped anyway.
        let mut fetch_limit = offset.saturating_add(per_page).saturating_mul(OVERFETCH_FACTOR);
        if !entitled {
            fetch_limit = fetch_limit.min(FREE_WINDOW_CAP);
        }
        let window = self.store.window(pool, fetch_limit).await?;

        let recent_cutoff = now - Duration::minutes(RECENT_ACTIVITY_WINDOW_MINUTES);
        let mut seen: HashSet<Uuid> = HashSet::new();
        let mut ranked: Vec<RankedCandidate> = Vec::with_capacity(window.len());

        for candidate in window {
            if excluded.contains(&candidate.id) {
                continue;
            }
            // Defensive re-checks; the store contract already promises
            // visible, photo-bearing profiles in the right pool.
            if !candidate.visible
                || !candidate.has_photo()
                || candidate.orientation != Some(pool)
            {
                continue;
            }

            // Free tier cannot narrow by gender; the requested value is
            // ignored, not rejected.
            if entitled {
                if let Some(gender) = filters.gender {
                    if candidate.gender != Some(gender) {
                        continue;
                    }
                }
                if let Some(city) = filters.city.as_deref() {
                    let matches_city = candidate
                        .city
                        .as_deref()
                        .map(|c| c.eq_ignore_ascii_case(city))
                        .unwrap_or(false);
                    if !matches_city {
                        continue;
                    }
                }
                if (filters.age_min.is_some() || filters.age_max.is_some())
                    && !filters.age_in_range(candidate.age)
                {
                    continue;
                }
                if filters.online_now && !candidate.online {
                    continue;
                }
                if let Some(goal) = filters.goal {
                    if candidate.relationship_goal != Some(goal) {
                        continue;
                    }
                }
                // Role targeting only means anything inside the gay pool.
                if pool == Orientation::Gay {
                    if let Some(role) = filters.role {
                        if candidate.role != Some(role) {
                            continue;
                        }
                    }
                }
            }

            // Available to all tiers.
            if filters.recent_activity
                && !candidate.online
                && candidate.last_active_at < recent_cutoff
            {
                continue;
            }

            let distance_km = distance_between(&viewer, &candidate);

            if entitled && filters.has_distance_range() && !filters.distance_in_range(distance_km) {
                continue;
            }

            // Boost never extends reach: an active boost outside the radius
            // removes the candidate entirely.
            let boost_active = candidate.boost_active(now);
            let boosted_in_radius = boost_active
                && distance_km.map(|d| d <= BOOST_RADIUS_KM).unwrap_or(false);
            if boost_active && !boosted_in_radius {
                continue;
            }

            // Dedup by id; upstream joins can produce repeats.
            if !seen.insert(candidate.id) {
                continue;
            }

            ranked.push(RankedCandidate {
                record: candidate,
                distance_km,
                boosted_in_radius,
            });
        }

        // Boosted-in-radius first, then ascending distance with undefined
        // distance after all defined; stable sort keeps the last-active
        // ordering for ties.
        ranked.sort_by(|a, b| rank_ordering(a, b));

        if !entitled {
            ranked.truncate(FREE_RESULT_CEILING);
        }

        let has_more = ranked.len() > offset.saturating_add(per_page);
        let outgoing = self.ledger.outgoing(viewer_id).await?;

        let items = ranked
            .into_iter()
            .skip(offset)
            .take(per_page)
            .map(|c| {
                let already = outgoing.contains(&c.record.id);
                c.record.summary(now, c.distance_km, already)
            })
            .collect();

        Ok(SearchPage {
            items,
            has_more,
            entitled,
        })
    }
}

fn rank_ordering(a: &RankedCandidate, b: &RankedCandidate) -> Ordering {
    match (a.boosted_in_radius, b.boosted_in_radius) {
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }
    match (a.distance_km, b.distance_km) {
        (Some(da), Some(db)) => da.total_cmp(&db),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
