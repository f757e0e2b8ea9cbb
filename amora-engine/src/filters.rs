use serde::{Deserialize, Serialize};

use crate::profile::{Gender, RelationshipGoal, Role};

pub const MIN_AGE: i32 = 18;
pub const MAX_AGE: i32 = 99;
pub const MAX_DISTANCE_KM: f64 = 20_000.0;

/// Explicit search filter configuration. Every recognized option is a typed
/// field; there is no dynamic filter bag, so an unknown key cannot slip
/// through and an unentitled one is simply not applied.
///
/// Entitlement gating:
/// - `recent_activity` is available on every tier.
/// - `gender`, `city`, `age_min`/`age_max`, `online_now`, `goal`, `role`
///   and the distance range apply only when the viewer's entitlement is
///   active; otherwise they are ignored without error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilters {
    pub recent_activity: bool,
    pub online_now: bool,
    pub city: Option<String>,
    pub age_min: Option<i32>,
    pub age_max: Option<i32>,
    pub distance_min_km: Option<f64>,
    pub distance_max_km: Option<f64>,
    pub gender: Option<Gender>,
    pub goal: Option<RelationshipGoal>,
    pub role: Option<Role>,
}

impl SearchFilters {
    /// Malformed values are clamped to valid ranges, never rejected.
    /// Inverted bounds are swapped.
    pub fn clamped(mut self) -> Self {
        self.age_min = self.age_min.map(|a| a.clamp(MIN_AGE, MAX_AGE));
        self.age_max = self.age_max.map(|a| a.clamp(MIN_AGE, MAX_AGE));
        if let (Some(lo), Some(hi)) = (self.age_min, self.age_max) {
            if lo > hi {
                self.age_min = Some(hi);
                self.age_max = Some(lo);
            }
        }

        self.distance_min_km = self
            .distance_min_km
            .map(|d| if d.is_finite() { d.clamp(0.0, MAX_DISTANCE_KM) } else { 0.0 });
        self.distance_max_km = self
            .distance_max_km
            .map(|d| if d.is_finite() { d.clamp(0.0, MAX_DISTANCE_KM) } else { MAX_DISTANCE_KM });
        if let (Some(lo), Some(hi)) = (self.distance_min_km, self.distance_max_km) {
            if lo > hi {
                self.distance_min_km = Some(hi);
                self.distance_max_km = Some(lo);
            }
        }

        self
    }

    pub fn has_distance_range(&self) -> bool {
        self.distance_min_km.is_some() || self.distance_max_km.is_some()
    }

    /// True when `distance` falls inside the configured range. A candidate
    /// with no computable distance never passes an active range.
    pub fn distance_in_range(&self, distance: Option<f64>) -> bool {
        let Some(d) = distance else { return false };
        if let Some(lo) = self.distance_min_km {
            if d < lo {
                return false;
            }
        }
        if let Some(hi) = self.distance_max_km {
            if d > hi {
                return false;
            }
        }
        true
    }

    pub fn age_in_range(&self, age: i32) -> bool {
        if let Some(lo) = self.age_min {
            if age < lo {
                return false;
            }
        }
        if let Some(hi) = self.age_max {
            if age > hi {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_ages_are_clamped() {
        let f = SearchFilters {
            age_min: Some(3),
            age_max: Some(250),
            ..Default::default()
        }
        .clamped();
        assert_eq!(f.age_min, Some(MIN_AGE));
        assert_eq!(f.age_max, Some(MAX_AGE));
    }

    #[test]
    fn inverted_age_bounds_are_swapped() {
        let f = SearchFilters {
            age_min: Some(40),
            age_max: Some(25),
            ..Default::default()
        }
        .clamped();
        assert_eq!(f.age_min, Some(25));
        assert_eq!(f.age_max, Some(40));
    }

    #[test]
    fn negative_and_nan_distances_are_clamped() {
        let f = SearchFilters {
            distance_min_km: Some(-5.0),
            distance_max_km: Some(f64::NAN),
            ..Default::default()
        }
        .clamped();
        assert_eq!(f.distance_min_km, Some(0.0));
        assert_eq!(f.distance_max_km, Some(MAX_DISTANCE_KM));
    }

    #[test]
    fn undefined_distance_fails_active_range() {
        let f = SearchFilters {
            distance_max_km: Some(50.0),
            ..Default::default()
        }
        .clamped();
        assert!(!f.distance_in_range(None));
        assert!(f.distance_in_range(Some(10.0)));
        assert!(!f.distance_in_range(Some(80.0)));
    }
}
