/// Radio content service: stations, programme, blog and per-user listening data
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::application::dto::{
    EventQuery, FavoriteToggle, FixtureImportSummary, ListQuery, ListenerCount, NewContact,
    NewListening, ProfileUpdate, RadioFixtures, StationQuery,
};
use crate::application::repositories::RadioRepository;
use crate::domain::base::DomainError;
use crate::domain::radio::{
    BlogPost, Category, ContactMessage, Event, ListeningSession, ListeningStats, RadioStation,
    User, UserProfile,
};
use crate::domain::value_objects::EmailAddress;

pub const POPULAR_STATIONS: usize = 10;
pub const FEATURED_STATIONS: usize = 5;
pub const UPCOMING_EVENTS: usize = 10;
pub const FEATURED_EVENTS: usize = 5;
pub const FEATURED_POSTS: usize = 5;
pub const RECENT_POSTS: usize = 10;

pub const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";

/// Field name to its validation messages
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Error, Debug)]
pub enum RadioError {
    #[error("Not found.")]
    NotFound,

    #[error("Authentication credentials were not provided.")]
    Unauthenticated,

    #[error("Invalid token.")]
    InvalidToken,

    #[error("Invalid input: {0:?}")]
    Validation(FieldErrors),

    #[error("JSON parse error - {0}")]
    Parse(String),

    #[error("Unsupported media type \"{0}\" in request.")]
    UnsupportedMediaType(String),

    #[error("Repository error: {0}")]
    Repository(#[from] DomainError),
}

impl RadioError {
    /// Validation error for a single field
    pub fn field(name: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(name.to_string(), vec![message.into()]);
        RadioError::Validation(errors)
    }
}

pub type RadioResult<T> = Result<T, RadioError>;

/// Application service over a [`RadioRepository`]
pub struct RadioService {
    repository: Mutex<Box<dyn RadioRepository>>,
}

impl RadioService {
    pub fn new(repository: Box<dyn RadioRepository>) -> Self {
        RadioService {
            repository: Mutex::new(repository),
        }
    }

    /// Resolve the token from an `Authorization: Token <token>` header
    pub async fn authenticate(&self, token: Option<&str>) -> RadioResult<User> {
        let token = token.ok_or(RadioError::Unauthenticated)?;
        self.repository
            .lock()
            .await
            .find_user_by_token(token)?
            .ok_or(RadioError::InvalidToken)
    }

    pub async fn create_user(&self, username: &str) -> RadioResult<(User, String)> {
        let (user, token) = self.repository.lock().await.create_user(username)?;
        info!("Created user '{}'", user.username);
        Ok((user, token))
    }

    pub async fn import_fixtures(&self, fixtures: &RadioFixtures) -> RadioResult<FixtureImportSummary> {
        Ok(self.repository.lock().await.import_fixtures(fixtures)?)
    }

    // Categories

    pub async fn categories(&self, query: &ListQuery) -> RadioResult<Vec<Category>> {
        Ok(self.repository.lock().await.list_categories(query)?)
    }

    pub async fn category(&self, id: i64) -> RadioResult<Category> {
        self.repository
            .lock()
            .await
            .find_category(id)?
            .ok_or(RadioError::NotFound)
    }

    // Stations

    pub async fn stations(&self, query: &StationQuery) -> RadioResult<Vec<RadioStation>> {
        Ok(self.repository.lock().await.list_stations(query)?)
    }

    pub async fn station(&self, id: i64) -> RadioResult<RadioStation> {
        self.repository
            .lock()
            .await
            .find_station(id)?
            .ok_or(RadioError::NotFound)
    }

    pub async fn popular_stations(&self) -> RadioResult<Vec<RadioStation>> {
        Ok(self.repository.lock().await.top_stations(POPULAR_STATIONS)?)
    }

    pub async fn featured_stations(&self) -> RadioResult<Vec<RadioStation>> {
        Ok(self.repository.lock().await.top_stations(FEATURED_STATIONS)?)
    }

    pub async fn toggle_favorite(&self, user: &User, station_id: i64) -> RadioResult<FavoriteToggle> {
        let mut repository = self.repository.lock().await;
        repository.find_station(station_id)?.ok_or(RadioError::NotFound)?;

        let is_favorited = repository.toggle_favorite(user.id, station_id)?;
        let message = if is_favorited {
            "Station added to favorites"
        } else {
            "Station removed from favorites"
        };
        debug!("User {} toggled station {}: {}", user.id, station_id, is_favorited);

        Ok(FavoriteToggle {
            is_favorited,
            message: message.to_string(),
        })
    }

    pub async fn increment_listeners(&self, station_id: i64) -> RadioResult<ListenerCount> {
        self.adjust_listeners(station_id, 1).await
    }

    pub async fn decrement_listeners(&self, station_id: i64) -> RadioResult<ListenerCount> {
        self.adjust_listeners(station_id, -1).await
    }

    async fn adjust_listeners(&self, station_id: i64, delta: i64) -> RadioResult<ListenerCount> {
        let listeners_count = self
            .repository
            .lock()
            .await
            .adjust_listeners(station_id, delta)?
            .ok_or(RadioError::NotFound)?;
        Ok(ListenerCount { listeners_count })
    }

    // Profiles

    /// The caller's profile as a list (empty until it has been created)
    pub async fn profiles(&self, user: &User) -> RadioResult<Vec<UserProfile>> {
        Ok(self
            .repository
            .lock()
            .await
            .find_profile(user.id)?
            .into_iter()
            .collect())
    }

    pub async fn my_profile(&self, user: &User) -> RadioResult<UserProfile> {
        Ok(self.repository.lock().await.get_or_create_profile(user.id)?)
    }

    pub async fn update_my_profile(&self, user: &User, update: &ProfileUpdate) -> RadioResult<UserProfile> {
        Ok(self.repository.lock().await.update_profile(user.id, update)?)
    }

    /// One profile by id; other users' profiles are not found
    pub async fn profile(&self, user: &User, id: i64) -> RadioResult<UserProfile> {
        self.repository
            .lock()
            .await
            .find_profile(user.id)?
            .filter(|profile| profile.id == id)
            .ok_or(RadioError::NotFound)
    }

    pub async fn update_profile(
        &self,
        user: &User,
        id: i64,
        update: &ProfileUpdate,
    ) -> RadioResult<UserProfile> {
        self.profile(user, id).await?;
        Ok(self.repository.lock().await.update_profile(user.id, update)?)
    }

    pub async fn delete_profile(&self, user: &User, id: i64) -> RadioResult<()> {
        self.profile(user, id).await?;
        if self.repository.lock().await.delete_profile(user.id)? {
            Ok(())
        } else {
            Err(RadioError::NotFound)
        }
    }

    pub async fn favorite_stations(&self, user: &User) -> RadioResult<Vec<RadioStation>> {
        Ok(self.repository.lock().await.favorite_stations(user.id)?)
    }

    // Events

    pub async fn events(&self, query: &EventQuery) -> RadioResult<Vec<Event>> {
        Ok(self.repository.lock().await.list_events(query)?)
    }

    pub async fn event(&self, id: i64) -> RadioResult<Event> {
        self.repository
            .lock()
            .await
            .find_event(id)?
            .ok_or(RadioError::NotFound)
    }

    /// Events starting after `now`, soonest first
    pub async fn upcoming_events(&self, now: DateTime<Utc>) -> RadioResult<Vec<Event>> {
        let events = self.events(&EventQuery::default()).await?;
        Ok(events
            .into_iter()
            .filter(|e| e.start_time > now)
            .take(UPCOMING_EVENTS)
            .collect())
    }

    pub async fn live_events(&self, now: DateTime<Utc>) -> RadioResult<Vec<Event>> {
        let events = self.events(&EventQuery::default()).await?;
        Ok(events.into_iter().filter(|e| e.is_live_at(now)).collect())
    }

    pub async fn featured_events(&self) -> RadioResult<Vec<Event>> {
        let query = EventQuery {
            is_featured: Some(true),
            ..EventQuery::default()
        };
        let mut events = self.events(&query).await?;
        events.truncate(FEATURED_EVENTS);
        Ok(events)
    }

    // Blog

    pub async fn posts(&self, query: &ListQuery) -> RadioResult<Vec<BlogPost>> {
        Ok(self.repository.lock().await.list_posts(query)?)
    }

    pub async fn post(&self, slug: &str) -> RadioResult<BlogPost> {
        self.repository
            .lock()
            .await
            .find_post(slug)?
            .ok_or(RadioError::NotFound)
    }

    pub async fn featured_posts(&self) -> RadioResult<Vec<BlogPost>> {
        let posts = self.posts(&ListQuery::default()).await?;
        Ok(posts
            .into_iter()
            .filter(|p| p.is_featured)
            .take(FEATURED_POSTS)
            .collect())
    }

    pub async fn recent_posts(&self) -> RadioResult<Vec<BlogPost>> {
        let mut posts = self.posts(&ListQuery::default()).await?;
        posts.truncate(RECENT_POSTS);
        Ok(posts)
    }

    // Listening history

    pub async fn history(&self, user: &User) -> RadioResult<Vec<ListeningSession>> {
        Ok(self.repository.lock().await.list_history(user.id)?)
    }

    pub async fn add_history(&self, user: &User, entry: &NewListening) -> RadioResult<ListeningSession> {
        if entry.duration_minutes < 0 {
            return Err(RadioError::field(
                "duration_minutes",
                "Ensure this value is greater than or equal to 0.",
            ));
        }

        let mut repository = self.repository.lock().await;
        match repository.add_history(user.id, entry) {
            Ok(session) => Ok(session),
            Err(DomainError::NotFound(_)) => Err(RadioError::field(
                "station",
                format!("Invalid pk \"{}\" - object does not exist.", entry.station),
            )),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn history_entry(&self, user: &User, id: i64) -> RadioResult<ListeningSession> {
        self.repository
            .lock()
            .await
            .find_history(user.id, id)?
            .ok_or(RadioError::NotFound)
    }

    pub async fn delete_history(&self, user: &User, id: i64) -> RadioResult<()> {
        if self.repository.lock().await.delete_history(user.id, id)? {
            Ok(())
        } else {
            Err(RadioError::NotFound)
        }
    }

    pub async fn listening_stats(&self, user: &User) -> RadioResult<ListeningStats> {
        let sessions = self.history(user).await?;
        Ok(ListeningStats::compute(&sessions))
    }

    // Contact

    pub async fn submit_contact(&self, contact: &NewContact) -> RadioResult<ContactMessage> {
        let mut errors = FieldErrors::new();
        let mut required = |name: &str, value: &Option<String>| -> String {
            match value.as_deref().map(str::trim) {
                None => {
                    errors.insert(name.to_string(), vec![REQUIRED.to_string()]);
                    String::new()
                }
                Some("") => {
                    errors.insert(name.to_string(), vec![BLANK.to_string()]);
                    String::new()
                }
                Some(value) => value.to_string(),
            }
        };

        let name = required("name", &contact.name);
        let email = required("email", &contact.email);
        let subject = required("subject", &contact.subject);
        let message = required("message", &contact.message);

        let address = if email.is_empty() {
            None
        } else {
            match EmailAddress::new(email) {
                Ok(address) => Some(address),
                Err(_) => {
                    errors.insert(
                        "email".to_string(),
                        vec!["Enter a valid email address.".to_string()],
                    );
                    None
                }
            }
        };

        let address = match address {
            Some(address) if errors.is_empty() => address,
            _ => return Err(RadioError::Validation(errors)),
        };

        let saved = self
            .repository
            .lock()
            .await
            .create_contact(&name, &address, &subject, &message)?;
        info!("Stored contact message {} from {}", saved.id, saved.email);
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dto::{BlogPostFixture, CategoryFixture, EventFixture, StationFixture};
    use crate::infrastructure::persistence::SqliteRadioRepository;
    use chrono::Duration;

    fn station(name: &str, listeners: i64) -> StationFixture {
        StationFixture {
            name: name.to_string(),
            description: String::new(),
            stream_url: format!("http://stream.example/{}", name),
            logo_url: None,
            category: Some("Pop".to_string()),
            country: "Kenya".to_string(),
            language: "Swahili".to_string(),
            quality: "medium".to_string(),
            listeners_count: listeners,
            is_active: true,
        }
    }

    fn event(station: &str, title: &str, starts_in_hours: i64, featured: bool) -> EventFixture {
        let start = Utc::now() + Duration::hours(starts_in_hours);
        EventFixture {
            station: station.to_string(),
            title: title.to_string(),
            description: String::new(),
            event_type: "show".to_string(),
            host: "Host".to_string(),
            start_time: start,
            end_time: start + Duration::hours(2),
            is_featured: featured,
        }
    }

    fn post(title: &str, featured: bool, days_ago: i64) -> BlogPostFixture {
        BlogPostFixture {
            title: title.to_string(),
            slug: None,
            author: "Desk".to_string(),
            content: String::new(),
            excerpt: String::new(),
            tags: String::new(),
            status: "published".to_string(),
            is_featured: featured,
            published_at: Some(Utc::now() - Duration::days(days_ago)),
        }
    }

    async fn service() -> RadioService {
        let repository = SqliteRadioRepository::new_in_memory().unwrap();
        let service = RadioService::new(Box::new(repository));

        let fixtures = RadioFixtures {
            categories: vec![CategoryFixture {
                name: "Pop".to_string(),
                description: String::new(),
            }],
            stations: (0..12).map(|i| station(&format!("Station {}", i), i * 10)).collect(),
            events: vec![
                event("Station 1", "Breakfast", -1, false),
                event("Station 2", "Drive Time", 3, true),
                event("Station 3", "Late Show", 10, true),
            ],
            blog_posts: vec![post("Old news", true, 10), post("Fresh news", false, 1)],
        };
        service.import_fixtures(&fixtures).await.unwrap();
        service
    }

    #[tokio::test]
    async fn test_authentication() {
        let service = service().await;
        let (user, token) = service.create_user("dj").await.unwrap();

        assert_eq!(service.authenticate(Some(&token)).await.unwrap(), user);
        assert!(matches!(
            service.authenticate(None).await,
            Err(RadioError::Unauthenticated)
        ));
        assert!(matches!(
            service.authenticate(Some("nope")).await,
            Err(RadioError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_popular_and_featured_limits() {
        let service = service().await;
        let popular = service.popular_stations().await.unwrap();
        assert_eq!(popular.len(), POPULAR_STATIONS);
        assert_eq!(popular[0].name, "Station 11");
        assert_eq!(service.featured_stations().await.unwrap().len(), FEATURED_STATIONS);
    }

    #[tokio::test]
    async fn test_toggle_favorite_messages() {
        let service = service().await;
        let (user, _) = service.create_user("fan").await.unwrap();
        let id = service.popular_stations().await.unwrap()[0].id;

        let first = service.toggle_favorite(&user, id).await.unwrap();
        assert!(first.is_favorited);
        assert_eq!(first.message, "Station added to favorites");

        let second = service.toggle_favorite(&user, id).await.unwrap();
        assert!(!second.is_favorited);
        assert_eq!(second.message, "Station removed from favorites");

        assert!(matches!(
            service.toggle_favorite(&user, 9999).await,
            Err(RadioError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_decrement_stops_at_zero() {
        let service = service().await;
        let quiet = service
            .stations(&StationQuery {
                ordering: Some("listeners_count".to_string()),
                ..StationQuery::default()
            })
            .await
            .unwrap()[0]
            .id;

        assert_eq!(service.decrement_listeners(quiet).await.unwrap().listeners_count, 0);
        assert_eq!(service.increment_listeners(quiet).await.unwrap().listeners_count, 1);
    }

    #[tokio::test]
    async fn test_event_views() {
        let service = service().await;
        let now = Utc::now();

        let upcoming = service.upcoming_events(now).await.unwrap();
        assert_eq!(
            upcoming.iter().map(|e| e.title.as_str()).collect::<Vec<_>>(),
            vec!["Drive Time", "Late Show"]
        );

        let live = service.live_events(now).await.unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].title, "Breakfast");

        assert_eq!(service.featured_events().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_blog_views() {
        let service = service().await;
        let recent = service.recent_posts().await.unwrap();
        assert_eq!(recent[0].title, "Fresh news");

        let featured = service.featured_posts().await.unwrap();
        assert_eq!(featured.len(), 1);
        assert_eq!(featured[0].slug, "old-news");

        assert!(matches!(
            service.post("missing").await,
            Err(RadioError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_history_and_stats() {
        let service = service().await;
        let (user, _) = service.create_user("listener").await.unwrap();
        let stations = service.popular_stations().await.unwrap();

        for (station, minutes) in [(&stations[0], 30), (&stations[1], 15), (&stations[0], 45)] {
            service
                .add_history(
                    &user,
                    &NewListening {
                        station: station.id,
                        duration_minutes: minutes,
                        listened_at: None,
                    },
                )
                .await
                .unwrap();
        }

        let stats = service.listening_stats(&user).await.unwrap();
        assert_eq!(stats.total_sessions, 3);
        assert_eq!(stats.total_minutes, 90);
        assert_eq!(stats.total_hours, 1.5);
        assert_eq!(stats.most_listened_stations[0].station_name, "Station 11");
        assert_eq!(stats.most_listened_stations[0].count, 2);

        let entry = service.history(&user).await.unwrap()[0].clone();
        service.delete_history(&user, entry.id).await.unwrap();
        assert!(matches!(
            service.history_entry(&user, entry.id).await,
            Err(RadioError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_history_validation() {
        let service = service().await;
        let (user, _) = service.create_user("listener").await.unwrap();

        let err = service
            .add_history(
                &user,
                &NewListening {
                    station: 9999,
                    duration_minutes: 5,
                    listened_at: None,
                },
            )
            .await
            .unwrap_err();
        match err {
            RadioError::Validation(errors) => assert!(errors.contains_key("station")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_contact_validation() {
        let service = service().await;
        let err = service
            .submit_contact(&NewContact {
                name: Some("Ama".to_string()),
                email: Some("not-an-email".to_string()),
                subject: Some("  ".to_string()),
                message: None,
            })
            .await
            .unwrap_err();

        let RadioError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors["email"], vec!["Enter a valid email address."]);
        assert_eq!(errors["subject"], vec![BLANK]);
        assert_eq!(errors["message"], vec![REQUIRED]);
        assert!(!errors.contains_key("name"));
    }

    #[tokio::test]
    async fn test_contact_is_stored() {
        let service = service().await;
        let saved = service
            .submit_contact(&NewContact {
                name: Some("Ama".to_string()),
                email: Some("ama@example.com".to_string()),
                subject: Some("Hi".to_string()),
                message: Some("Love the station".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(saved.subject, "Hi");
    }
}
