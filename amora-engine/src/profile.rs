use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Disjoint candidate pools. Profiles of different orientations never rank
/// against each other and may not signal interest across pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Hetero,
    Gay,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hetero => "hetero",
            Self::Gay => "gay",
        }
    }
}

impl std::str::FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hetero" => Ok(Self::Hetero),
            "gay" => Ok(Self::Gay),
            _ => Err(format!("unknown orientation: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            _ => Err(format!("unknown gender: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipGoal {
    Casual,
    Serious,
    Friends,
    Open,
}

impl std::str::FromStr for RelationshipGoal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "casual" => Ok(Self::Casual),
            "serious" => Ok(Self::Serious),
            "friends" => Ok(Self::Friends),
            "open" => Ok(Self::Open),
            _ => Err(format!("unknown relationship goal: {s}")),
        }
    }
}

/// Only meaningful inside the [`Orientation::Gay`] pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Top,
    Bottom,
    Versatile,
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "top" => Ok(Self::Top),
            "bottom" => Ok(Self::Bottom),
            "versatile" => Ok(Self::Versatile),
            _ => Err(format!("unknown role: {s}")),
        }
    }
}

/// The engine's read view of a profile. Orientation and gender stay optional
/// because profiles exist before onboarding completes; the pipeline rejects
/// viewers that have not set them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub id: Uuid,
    pub display_name: String,
    pub orientation: Option<Orientation>,
    pub gender: Option<Gender>,
    pub age: i32,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub photo_url: Option<String>,
    pub relationship_goal: Option<RelationshipGoal>,
    pub role: Option<Role>,
    pub visible: bool,
    pub online: bool,
    pub last_active_at: DateTime<Utc>,
    pub boosted: bool,
    pub boost_expires_at: Option<DateTime<Utc>>,
    pub responsive: bool,
}

impl ProfileRecord {
    /// An expired boost counts as inactive even before the background sweep
    /// clears the flag. Flag and expiry are always checked together.
    pub fn boost_active(&self, now: DateTime<Utc>) -> bool {
        self.boosted && self.boost_expires_at.map(|exp| exp > now).unwrap_or(false)
    }

    pub fn has_photo(&self) -> bool {
        self.photo_url.as_deref().map(|u| !u.is_empty()).unwrap_or(false)
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }

    pub fn summary(&self, now: DateTime<Utc>, distance_km: Option<f64>, already_signaled: bool) -> CandidateSummary {
        CandidateSummary {
            id: self.id,
            display_name: self.display_name.clone(),
            age: self.age,
            city: self.city.clone(),
            photo_url: self.photo_url.clone(),
            online: self.online,
            distance_km,
            boost_active: self.boost_active(now),
            already_signaled,
        }
    }
}

/// Public projection of a profile as returned by search and carried in
/// real-time payloads. `distance_km` is null when either side has no
/// coordinates, never zero. `already_signaled` reflects only the viewer's
/// own outgoing edge; incoming interest is never leaked here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub id: Uuid,
    pub display_name: String,
    pub age: i32,
    pub city: Option<String>,
    pub photo_url: Option<String>,
    pub online: bool,
    pub distance_km: Option<f64>,
    pub boost_active: bool,
    pub already_signaled: bool,
}

/// Haversine distance in km between two lat/lng points.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    const R: f64 = 6371.0; // Earth radius in km
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    R * c
}

/// Distance between two profiles, undefined unless both carry coordinates.
pub fn distance_between(a: &ProfileRecord, b: &ProfileRecord) -> Option<f64> {
    let (lat1, lng1) = a.coordinates()?;
    let (lat2, lng2) = b.coordinates()?;
    Some(haversine_km(lat1, lng1, lat2, lng2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(boosted: bool, expires_in_secs: i64) -> ProfileRecord {
        let now = Utc::now();
        ProfileRecord {
            id: Uuid::new_v4(),
            display_name: "t".into(),
            orientation: Some(Orientation::Hetero),
            gender: Some(Gender::Male),
            age: 30,
            city: None,
            latitude: None,
            longitude: None,
            photo_url: Some("p.jpg".into()),
            relationship_goal: None,
            role: None,
            visible: true,
            online: false,
            last_active_at: now,
            boosted,
            boost_expires_at: Some(now + Duration::seconds(expires_in_secs)),
            responsive: false,
        }
    }

    #[test]
    fn expired_boost_is_inactive_despite_flag() {
        let p = record(true, -10);
        assert!(!p.boost_active(Utc::now()));
    }

    #[test]
    fn live_boost_is_active() {
        let p = record(true, 600);
        assert!(p.boost_active(Utc::now()));
    }

    #[test]
    fn boost_without_expiry_is_inactive() {
        let mut p = record(true, 600);
        p.boost_expires_at = None;
        assert!(!p.boost_active(Utc::now()));
    }

    #[test]
    fn haversine_zero_for_same_point() {
        assert!(haversine_km(48.85, 2.35, 48.85, 2.35) < 1e-9);
    }

    #[test]
    fn haversine_paris_london_plausible() {
        let km = haversine_km(48.8566, 2.3522, 51.5074, -0.1278);
        assert!((300.0..400.0).contains(&km), "got {km}");
    }

    #[test]
    fn distance_undefined_without_both_coordinates() {
        let mut a = record(false, 0);
        let mut b = record(false, 0);
        a.latitude = Some(48.0);
        a.longitude = Some(2.0);
        assert!(distance_between(&a, &b).is_none());
        b.latitude = Some(48.0);
        b.longitude = Some(2.1);
        assert!(distance_between(&a, &b).is_some());
    }

    #[test]
    fn orientation_tokens_parse() {
        assert_eq!("Hetero".parse::<Orientation>().unwrap(), Orientation::Hetero);
        assert_eq!("gay".parse::<Orientation>().unwrap(), Orientation::Gay);
        assert!("both".parse::<Orientation>().is_err());
    }
}
