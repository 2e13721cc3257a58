/// Handlers for the radio content routes under `/api`
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Path, Query, Request, State},
    http::{header, request::Parts, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use regex::Regex;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::OnceLock;

use super::error::{ApiError, ApiResult};
use super::server::AppState;
use crate::application::dto::{
    EventQuery, FavoriteToggle, FromQueryParams, ListQuery, ListenerCount, NewContact,
    NewListening, ProfileUpdate, QueryParams, StationQuery,
};
use crate::application::services::radio_service::REQUIRED;
use crate::application::services::{FieldErrors, RadioError};
use crate::domain::radio::{
    BlogPost, Category, ContactMessage, Event, ListeningSession, ListeningStats, RadioStation,
    User, UserProfile,
};

/// Authenticated caller, from an `Authorization: Token <token>` header
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Token "))
            .map(str::trim);

        let user = state.radio.authenticate(token).await?;
        Ok(AuthUser(user))
    }
}

/// JSON body whose rejections come back as field errors instead of plain text
pub struct RadioJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for RadioJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(RadioJson(value)),
            Err(rejection) => Err(ApiError::Radio(json_rejection(rejection, content_type))),
        }
    }
}

fn json_rejection(rejection: JsonRejection, content_type: String) -> RadioError {
    match rejection {
        JsonRejection::JsonDataError(err) => RadioError::Validation(data_errors(&err.body_text())),
        JsonRejection::MissingJsonContentType(_) => RadioError::UnsupportedMediaType(content_type),
        other => {
            let text = other.body_text();
            let detail = without_location(&text);
            let detail = detail.split_once("as JSON: ").map(|(_, rest)| rest).unwrap_or(detail);
            RadioError::Parse(detail.to_string())
        }
    }
}

/// Serde's "at line 1 column 9" suffix means nothing to API clients
fn without_location(message: &str) -> &str {
    static LOCATION: OnceLock<Regex> = OnceLock::new();
    let location = LOCATION.get_or_init(|| Regex::new(r" at line \d+ column \d+$").expect("valid regex"));
    match location.find(message) {
        Some(m) => &message[..m.start()],
        None => message,
    }
}

/// Field errors from a body that parsed as JSON but not as the expected shape
fn data_errors(body_text: &str) -> FieldErrors {
    static MISSING: OnceLock<Regex> = OnceLock::new();
    static TYPED: OnceLock<Regex> = OnceLock::new();
    let missing = MISSING.get_or_init(|| Regex::new(r"missing field `([^`]+)`").expect("valid regex"));
    let typed = TYPED.get_or_init(|| Regex::new(r"^([\w.\[\]]+): (.+)$").expect("valid regex"));

    let detail = without_location(body_text);
    let detail = detail
        .split_once("target type: ")
        .map(|(_, rest)| rest)
        .unwrap_or(detail);

    let mut errors = FieldErrors::new();
    if let Some(captures) = missing.captures(detail) {
        errors.insert(captures[1].to_string(), vec![REQUIRED.to_string()]);
    } else if let Some(captures) = typed.captures(detail) {
        let message = if captures[2].contains("expected i64") {
            "A valid integer is required.".to_string()
        } else if captures[2].contains("expected a string") {
            "Not a valid string.".to_string()
        } else {
            format!("Invalid value: {}", &captures[2])
        };
        errors.insert(captures[1].to_string(), vec![message]);
    } else {
        errors.insert("non_field_errors".to_string(), vec![detail.to_string()]);
    }
    errors
}

/// List filters from the query string, rejected as field errors
pub struct Filters<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for Filters<T>
where
    T: FromQueryParams,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<QueryParams>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                ApiError::Radio(RadioError::field("non_field_errors", rejection.body_text()))
            })?;
        T::from_params(&params)
            .map(Filters)
            .map_err(|errors| ApiError::Radio(RadioError::Validation(errors)))
    }
}

#[derive(Debug, Serialize)]
pub struct ContactCreated {
    pub message: String,
    pub data: ContactMessage,
}

pub fn radio_routes() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(list_categories))
        .route("/api/categories/:id", get(get_category))
        .route("/api/stations", get(list_stations))
        .route("/api/stations/popular", get(popular_stations))
        .route("/api/stations/featured", get(featured_stations))
        .route("/api/stations/:id", get(get_station))
        .route("/api/stations/:id/toggle_favorite", post(toggle_favorite))
        .route("/api/stations/:id/increment_listeners", post(increment_listeners))
        .route("/api/stations/:id/decrement_listeners", post(decrement_listeners))
        .route("/api/profile", get(list_profiles))
        .route("/api/profile/me", get(my_profile).put(update_my_profile).patch(update_my_profile))
        .route("/api/profile/favorites", get(favorite_stations))
        .route(
            "/api/profile/:id",
            get(get_profile)
                .put(update_profile)
                .patch(update_profile)
                .delete(delete_profile),
        )
        .route("/api/events", get(list_events))
        .route("/api/events/upcoming", get(upcoming_events))
        .route("/api/events/live", get(live_events))
        .route("/api/events/featured", get(featured_events))
        .route("/api/events/:id", get(get_event))
        .route("/api/blog", get(list_posts))
        .route("/api/blog/featured", get(featured_posts))
        .route("/api/blog/recent", get(recent_posts))
        .route("/api/blog/:slug", get(get_post))
        .route("/api/history", get(list_history).post(add_history))
        .route("/api/history/stats", get(listening_stats))
        .route("/api/history/:id", get(get_history).delete(delete_history))
        .route("/api/contact", post(submit_contact))
}

// Categories

async fn list_categories(
    State(state): State<AppState>,
    Filters(query): Filters<ListQuery>,
) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(state.radio.categories(&query).await?))
}

async fn get_category(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Category>> {
    Ok(Json(state.radio.category(id).await?))
}

// Stations

async fn list_stations(
    State(state): State<AppState>,
    Filters(query): Filters<StationQuery>,
) -> ApiResult<Json<Vec<RadioStation>>> {
    Ok(Json(state.radio.stations(&query).await?))
}

async fn get_station(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<RadioStation>> {
    Ok(Json(state.radio.station(id).await?))
}

async fn popular_stations(State(state): State<AppState>) -> ApiResult<Json<Vec<RadioStation>>> {
    Ok(Json(state.radio.popular_stations().await?))
}

async fn featured_stations(State(state): State<AppState>) -> ApiResult<Json<Vec<RadioStation>>> {
    Ok(Json(state.radio.featured_stations().await?))
}

async fn toggle_favorite(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<FavoriteToggle>> {
    Ok(Json(state.radio.toggle_favorite(&user, id).await?))
}

async fn increment_listeners(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ListenerCount>> {
    Ok(Json(state.radio.increment_listeners(id).await?))
}

async fn decrement_listeners(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ListenerCount>> {
    Ok(Json(state.radio.decrement_listeners(id).await?))
}

// Profile

async fn list_profiles(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Vec<UserProfile>>> {
    Ok(Json(state.radio.profiles(&user).await?))
}

async fn my_profile(State(state): State<AppState>, AuthUser(user): AuthUser) -> ApiResult<Json<UserProfile>> {
    Ok(Json(state.radio.my_profile(&user).await?))
}

async fn update_my_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    RadioJson(update): RadioJson<ProfileUpdate>,
) -> ApiResult<Json<UserProfile>> {
    Ok(Json(state.radio.update_my_profile(&user, &update).await?))
}

async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<UserProfile>> {
    Ok(Json(state.radio.profile(&user, id).await?))
}

async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    RadioJson(update): RadioJson<ProfileUpdate>,
) -> ApiResult<Json<UserProfile>> {
    Ok(Json(state.radio.update_profile(&user, id, &update).await?))
}

async fn delete_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.radio.delete_profile(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn favorite_stations(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Vec<RadioStation>>> {
    Ok(Json(state.radio.favorite_stations(&user).await?))
}

// Events

async fn list_events(
    State(state): State<AppState>,
    Filters(query): Filters<EventQuery>,
) -> ApiResult<Json<Vec<Event>>> {
    Ok(Json(state.radio.events(&query).await?))
}

async fn get_event(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Event>> {
    Ok(Json(state.radio.event(id).await?))
}

async fn upcoming_events(State(state): State<AppState>) -> ApiResult<Json<Vec<Event>>> {
    Ok(Json(state.radio.upcoming_events(Utc::now()).await?))
}

async fn live_events(State(state): State<AppState>) -> ApiResult<Json<Vec<Event>>> {
    Ok(Json(state.radio.live_events(Utc::now()).await?))
}

async fn featured_events(State(state): State<AppState>) -> ApiResult<Json<Vec<Event>>> {
    Ok(Json(state.radio.featured_events().await?))
}

// Blog

async fn list_posts(
    State(state): State<AppState>,
    Filters(query): Filters<ListQuery>,
) -> ApiResult<Json<Vec<BlogPost>>> {
    Ok(Json(state.radio.posts(&query).await?))
}

async fn get_post(State(state): State<AppState>, Path(slug): Path<String>) -> ApiResult<Json<BlogPost>> {
    Ok(Json(state.radio.post(&slug).await?))
}

async fn featured_posts(State(state): State<AppState>) -> ApiResult<Json<Vec<BlogPost>>> {
    Ok(Json(state.radio.featured_posts().await?))
}

async fn recent_posts(State(state): State<AppState>) -> ApiResult<Json<Vec<BlogPost>>> {
    Ok(Json(state.radio.recent_posts().await?))
}

// Listening history

async fn list_history(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Vec<ListeningSession>>> {
    Ok(Json(state.radio.history(&user).await?))
}

async fn add_history(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    RadioJson(entry): RadioJson<NewListening>,
) -> ApiResult<(StatusCode, Json<ListeningSession>)> {
    let session = state.radio.add_history(&user, &entry).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn get_history(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<ListeningSession>> {
    Ok(Json(state.radio.history_entry(&user, id).await?))
}

async fn delete_history(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.radio.delete_history(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn listening_stats(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<ListeningStats>> {
    Ok(Json(state.radio.listening_stats(&user).await?))
}

// Contact

async fn submit_contact(
    State(state): State<AppState>,
    RadioJson(contact): RadioJson<NewContact>,
) -> ApiResult<(StatusCode, Json<ContactCreated>)> {
    let data = state.radio.submit_contact(&contact).await?;
    Ok((
        StatusCode::CREATED,
        Json(ContactCreated {
            message: "Thank you for your message. We will get back to you soon!".to_string(),
            data,
        }),
    ))
}
