use crate::application::dto::{
    EventQuery, FixtureImportSummary, ListQuery, NewListening, ProfileUpdate, RadioFixtures,
    StationQuery,
};
use crate::domain::radio::{
    BlogPost, Category, ContactMessage, Event, ListeningSession, RadioStation, User, UserProfile,
};
use crate::domain::value_objects::EmailAddress;
use crate::domain::DomainResult;

/// Repository trait for the radio content tables.
///
/// Station lookups only ever see active stations and blog lookups only
/// published posts. Per-user data (profiles, favourites, history) is always
/// scoped to the `user_id` passed in.
pub trait RadioRepository: Send {
    /// Creates a user and returns it with a fresh API token.
    fn create_user(&mut self, username: &str) -> DomainResult<(User, String)>;

    /// Resolves an API token to its user.
    fn find_user_by_token(&self, token: &str) -> DomainResult<Option<User>>;

    fn list_categories(&self, query: &ListQuery) -> DomainResult<Vec<Category>>;

    fn find_category(&self, id: i64) -> DomainResult<Option<Category>>;

    fn list_stations(&self, query: &StationQuery) -> DomainResult<Vec<RadioStation>>;

    fn find_station(&self, id: i64) -> DomainResult<Option<RadioStation>>;

    /// Active stations by listeners, most first.
    fn top_stations(&self, limit: usize) -> DomainResult<Vec<RadioStation>>;

    /// Adds `delta` to the listener count, never going below zero.
    /// Returns the new count, or `None` when the station does not exist.
    fn adjust_listeners(&mut self, station_id: i64, delta: i64) -> DomainResult<Option<i64>>;

    /// Flips a favourite; returns whether the station is now a favourite.
    fn toggle_favorite(&mut self, user_id: i64, station_id: i64) -> DomainResult<bool>;

    fn find_profile(&self, user_id: i64) -> DomainResult<Option<UserProfile>>;

    fn get_or_create_profile(&mut self, user_id: i64) -> DomainResult<UserProfile>;

    fn update_profile(&mut self, user_id: i64, update: &ProfileUpdate) -> DomainResult<UserProfile>;

    /// Removes a user's profile and its favourites; false when there was none.
    fn delete_profile(&mut self, user_id: i64) -> DomainResult<bool>;

    /// Active favourite stations of a user.
    fn favorite_stations(&self, user_id: i64) -> DomainResult<Vec<RadioStation>>;

    fn list_events(&self, query: &EventQuery) -> DomainResult<Vec<Event>>;

    fn find_event(&self, id: i64) -> DomainResult<Option<Event>>;

    fn list_posts(&self, query: &ListQuery) -> DomainResult<Vec<BlogPost>>;

    fn find_post(&self, slug: &str) -> DomainResult<Option<BlogPost>>;

    fn list_history(&self, user_id: i64) -> DomainResult<Vec<ListeningSession>>;

    fn add_history(&mut self, user_id: i64, entry: &NewListening) -> DomainResult<ListeningSession>;

    fn find_history(&self, user_id: i64, id: i64) -> DomainResult<Option<ListeningSession>>;

    /// Returns `Ok(true)` if the row was deleted.
    fn delete_history(&mut self, user_id: i64, id: i64) -> DomainResult<bool>;

    fn create_contact(
        &mut self,
        name: &str,
        email: &EmailAddress,
        subject: &str,
        message: &str,
    ) -> DomainResult<ContactMessage>;

    /// Inserts seed data; categories and stations are matched by name.
    fn import_fixtures(&mut self, fixtures: &RadioFixtures) -> DomainResult<FixtureImportSummary>;
}
