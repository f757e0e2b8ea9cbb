use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use amora_engine::profile::{Gender, Orientation, ProfileRecord, RelationshipGoal, Role};

use crate::schema::{blocks, interests, profiles};

// --- Profile ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = profiles)]
pub struct Profile {
    pub id: Uuid,
    pub credential_id: Uuid,
    pub display_name: Option<String>,
    pub orientation: Option<String>,
    pub gender: Option<String>,
    pub age: i32,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub photo_url: Option<String>,
    pub relationship_goal: Option<String>,
    pub role: Option<String>,
    pub is_visible: bool,
    pub is_online: bool,
    pub last_active_at: DateTime<Utc>,
    pub is_boosted: bool,
    pub boost_expires_at: Option<DateTime<Utc>>,
    pub is_responsive: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Project the row into the engine's read view. Enum columns that fail
    /// to parse behave as unset rather than failing the whole row.
    pub fn into_record(self) -> ProfileRecord {
        ProfileRecord {
            id: self.id,
            display_name: self.display_name.unwrap_or_else(|| "unknown".into()),
            orientation: self.orientation.as_deref().and_then(parse_enum::<Orientation>),
            gender: self.gender.as_deref().and_then(parse_enum::<Gender>),
            age: self.age,
            city: self.city,
            latitude: self.latitude,
            longitude: self.longitude,
            photo_url: self.photo_url,
            relationship_goal: self
                .relationship_goal
                .as_deref()
                .and_then(parse_enum::<RelationshipGoal>),
            role: self.role.as_deref().and_then(parse_enum::<Role>),
            visible: self.is_visible,
            online: self.is_online,
            last_active_at: self.last_active_at,
            boosted: self.is_boosted,
            boost_expires_at: self.boost_expires_at,
            responsive: self.is_responsive,
        }
    }
}

fn parse_enum<T: std::str::FromStr>(value: &str) -> Option<T> {
    match value.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(value = %value, "unparseable enum column value, treating as unset");
            None
        }
    }
}

// --- Interest ---

#[derive(Debug, Queryable, Identifiable, Serialize)]
#[diesel(table_name = interests)]
pub struct Interest {
    pub id: Uuid,
    pub from_profile_id: Uuid,
    pub to_profile_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = interests)]
pub struct NewInterest {
    pub from_profile_id: Uuid,
    pub to_profile_id: Uuid,
    pub created_at: DateTime<Utc>,
}

// --- Block ---

#[derive(Debug, Queryable, Identifiable, Serialize)]
#[diesel(table_name = blocks)]
pub struct Block {
    pub id: Uuid,
    pub blocker_id: Uuid,
    pub blocked_id: Uuid,
    pub created_at: DateTime<Utc>,
}
