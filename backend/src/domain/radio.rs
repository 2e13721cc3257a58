/// Radio content entities: stations, their programme and listener data
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadioStation {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub stream_url: String,
    pub logo_url: Option<String>,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub country: String,
    pub language: String,
    pub quality: String,
    pub listeners_count: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub bio: String,
    pub avatar_url: Option<String>,
    pub favorite_station_ids: Vec<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub id: i64,
    pub station_id: i64,
    pub station_name: Option<String>,
    pub title: String,
    pub description: String,
    pub event_type: String,
    pub host: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.start_time <= now && now <= self.end_time
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Published,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(PostStatus::Draft),
            "published" => Some(PostStatus::Published),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlogPost {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub author: String,
    pub content: String,
    pub excerpt: String,
    pub tags: String,
    pub status: PostStatus,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListeningSession {
    pub id: i64,
    pub user_id: i64,
    pub station_id: i64,
    pub station_name: String,
    pub listened_at: DateTime<Utc>,
    pub duration_minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactMessage {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Per-station aggregate inside listening statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationListening {
    pub station_name: String,
    pub count: i64,
    pub total_minutes: i64,
}

/// Listening statistics for one user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListeningStats {
    pub total_sessions: i64,
    pub total_minutes: i64,
    pub total_hours: f64,
    pub most_listened_stations: Vec<StationListening>,
}

impl ListeningStats {
    /// Number of stations reported in `most_listened_stations`
    pub const TOP_STATIONS: usize = 5;

    pub fn compute(sessions: &[ListeningSession]) -> Self {
        let total_minutes: i64 = sessions.iter().map(|s| s.duration_minutes).sum();

        let mut per_station: HashMap<&str, StationListening> = HashMap::new();
        for session in sessions {
            let entry = per_station
                .entry(session.station_name.as_str())
                .or_insert_with(|| StationListening {
                    station_name: session.station_name.clone(),
                    count: 0,
                    total_minutes: 0,
                });
            entry.count += 1;
            entry.total_minutes += session.duration_minutes;
        }

        let mut most_listened: Vec<StationListening> = per_station.into_values().collect();
        most_listened.sort_by(|a, b| {
            b.total_minutes
                .cmp(&a.total_minutes)
                .then_with(|| a.station_name.cmp(&b.station_name))
        });
        most_listened.truncate(Self::TOP_STATIONS);

        ListeningStats {
            total_sessions: sessions.len() as i64,
            total_minutes,
            total_hours: (total_minutes as f64 / 60.0 * 10.0).round() / 10.0,
            most_listened_stations: most_listened,
        }
    }
}
