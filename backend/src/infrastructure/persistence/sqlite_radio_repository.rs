use crate::application::dto::{
    EventQuery, FixtureImportSummary, ListQuery, NewListening, ProfileUpdate, RadioFixtures,
    StationQuery,
};
use crate::application::repositories::RadioRepository;
use crate::domain::base::DomainError;
use crate::domain::radio::{
    BlogPost, Category, ContactMessage, Event, ListeningSession, PostStatus, RadioStation, User,
    UserProfile,
};
use crate::domain::value_objects::{EmailAddress, Slug};
use crate::domain::DomainResult;
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Result as SqliteResult, Row};
use tracing::{debug, info};

const STATION_COLUMNS: &str = "SELECT s.id, s.name, s.description, s.stream_url, s.logo_url,
        s.category_id, c.name, s.country, s.language, s.quality, s.listeners_count,
        s.is_active, s.created_at
     FROM stations s LEFT JOIN categories c ON c.id = s.category_id";

const EVENT_COLUMNS: &str = "SELECT e.id, e.station_id, s.name, e.title, e.description,
        e.event_type, e.host, e.start_time, e.end_time, e.is_featured, e.created_at
     FROM events e LEFT JOIN stations s ON s.id = e.station_id";

const POST_COLUMNS: &str = "SELECT id, title, slug, author, content, excerpt, tags, status,
        is_featured, created_at, published_at
     FROM blog_posts";

const HISTORY_COLUMNS: &str = "SELECT h.id, h.user_id, h.station_id, s.name, h.listened_at,
        h.duration_minutes
     FROM listening_history h JOIN stations s ON s.id = h.station_id";

fn db_error(e: rusqlite::Error) -> DomainError {
    DomainError::InvalidOperation(format!("Database error: {}", e))
}

/// Build an ORDER BY clause from a `?ordering=` value such as `-listeners_count,name`.
/// Unknown fields are ignored; `default` applies when nothing valid remains.
pub fn order_clause(ordering: Option<&str>, allowed: &[(&str, &str)], default: &str) -> String {
    let terms: Vec<String> = ordering
        .unwrap_or_default()
        .split(',')
        .filter_map(|term| {
            let term = term.trim();
            let (field, direction) = match term.strip_prefix('-') {
                Some(field) => (field, "DESC"),
                None => (term, "ASC"),
            };
            allowed
                .iter()
                .find(|(name, _)| *name == field)
                .map(|(_, column)| format!("{} {}", column, direction))
        })
        .collect();

    if terms.is_empty() {
        default.to_string()
    } else {
        terms.join(", ")
    }
}

/// Filter conditions and their bound values
#[derive(Default)]
struct Conditions {
    clauses: Vec<String>,
    values: Vec<Value>,
}

impl Conditions {
    fn push(&mut self, clause: &str, value: Value) {
        self.values.push(value);
        self.clauses
            .push(clause.replace('?', &format!("?{}", self.values.len())));
    }

    fn push_fixed(&mut self, clause: &str) {
        self.clauses.push(clause.to_string());
    }

    /// Every whitespace-separated term must appear (case-insensitively) in one of `fields`
    fn push_search(&mut self, search: Option<&str>, fields: &[&str]) {
        for term in search.unwrap_or_default().split_whitespace() {
            let escaped = term
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            self.values.push(Value::Text(format!("%{}%", escaped)));
            let index = self.values.len();
            let any: Vec<String> = fields
                .iter()
                .map(|f| format!("{} LIKE ?{} ESCAPE '\\'", f, index))
                .collect();
            self.clauses.push(format!("({})", any.join(" OR ")));
        }
    }

    fn where_clause(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }
}

fn station_from_row(row: &Row) -> SqliteResult<RadioStation> {
    Ok(RadioStation {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        stream_url: row.get(3)?,
        logo_url: row.get(4)?,
        category_id: row.get(5)?,
        category_name: row.get(6)?,
        country: row.get(7)?,
        language: row.get(8)?,
        quality: row.get(9)?,
        listeners_count: row.get(10)?,
        is_active: row.get(11)?,
        created_at: row.get(12)?,
    })
}

fn event_from_row(row: &Row) -> SqliteResult<Event> {
    Ok(Event {
        id: row.get(0)?,
        station_id: row.get(1)?,
        station_name: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        event_type: row.get(5)?,
        host: row.get(6)?,
        start_time: row.get(7)?,
        end_time: row.get(8)?,
        is_featured: row.get(9)?,
        created_at: row.get(10)?,
    })
}

fn post_from_row(row: &Row) -> SqliteResult<BlogPost> {
    let status: String = row.get(7)?;
    Ok(BlogPost {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        author: row.get(3)?,
        content: row.get(4)?,
        excerpt: row.get(5)?,
        tags: row.get(6)?,
        status: PostStatus::parse(&status).unwrap_or(PostStatus::Draft),
        is_featured: row.get(8)?,
        created_at: row.get(9)?,
        published_at: row.get(10)?,
    })
}

fn history_from_row(row: &Row) -> SqliteResult<ListeningSession> {
    Ok(ListeningSession {
        id: row.get(0)?,
        user_id: row.get(1)?,
        station_id: row.get(2)?,
        station_name: row.get(3)?,
        listened_at: row.get(4)?,
        duration_minutes: row.get(5)?,
    })
}

fn category_from_row(row: &Row) -> SqliteResult<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: row.get(3)?,
    })
}

/// SQLite-based implementation of the RadioRepository trait
pub struct SqliteRadioRepository {
    conn: Connection,
}

impl SqliteRadioRepository {
    /// Create a new SQLite repository with the given connection
    pub fn new(conn: Connection) -> SqliteResult<Self> {
        super::schema::initialize_database(&conn)?;
        Ok(SqliteRadioRepository { conn })
    }

    /// Create a new in-memory SQLite repository (useful for testing)
    pub fn new_in_memory() -> SqliteResult<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    /// Create a new file-based SQLite repository, creating parent directories
    pub fn new_with_path(path: impl AsRef<std::path::Path>) -> SqliteResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            }
        }
        Self::new(Connection::open(path)?)
    }

    fn query_stations(&self, conditions: &Conditions, order: &str, limit: Option<usize>) -> SqliteResult<Vec<RadioStation>> {
        let mut sql = format!("{}{} ORDER BY {}, s.id", STATION_COLUMNS, conditions.where_clause(), order);
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(conditions.values.iter()), station_from_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    fn query_events(&self, conditions: &Conditions, order: &str) -> SqliteResult<Vec<Event>> {
        let sql = format!("{}{} ORDER BY {}, e.id", EVENT_COLUMNS, conditions.where_clause(), order);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(conditions.values.iter()), event_from_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    fn query_posts(&self, conditions: &Conditions, order: &str) -> SqliteResult<Vec<BlogPost>> {
        let sql = format!("{}{} ORDER BY {}, id", POST_COLUMNS, conditions.where_clause(), order);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(conditions.values.iter()), post_from_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    fn profile_id(&self, user_id: i64) -> SqliteResult<Option<i64>> {
        self.conn
            .query_row(
                "SELECT id FROM user_profiles WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()
    }

    fn load_profile(&self, user_id: i64) -> SqliteResult<Option<UserProfile>> {
        let profile = self
            .conn
            .query_row(
                "SELECT p.id, p.user_id, u.username, p.bio, p.avatar_url, p.created_at, p.updated_at
                 FROM user_profiles p JOIN users u ON u.id = p.user_id
                 WHERE p.user_id = ?1",
                params![user_id],
                |row| {
                    Ok(UserProfile {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        username: row.get(2)?,
                        bio: row.get(3)?,
                        avatar_url: row.get(4)?,
                        favorite_station_ids: Vec::new(),
                        created_at: row.get(5)?,
                        updated_at: row.get(6)?,
                    })
                },
            )
            .optional()?;

        let Some(mut profile) = profile else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT station_id FROM favorite_stations WHERE profile_id = ?1 ORDER BY station_id",
        )?;
        profile.favorite_station_ids = stmt
            .query_map(params![profile.id], |row| row.get(0))?
            .collect::<SqliteResult<Vec<i64>>>()?;

        Ok(Some(profile))
    }

    fn ensure_profile(&self, user_id: i64) -> SqliteResult<i64> {
        if let Some(id) = self.profile_id(user_id)? {
            return Ok(id);
        }
        let now = Utc::now();
        self.conn.execute(
            "INSERT INTO user_profiles (user_id, bio, created_at, updated_at) VALUES (?1, '', ?2, ?2)",
            params![user_id, now],
        )?;
        debug!("Created profile for user {}", user_id);
        Ok(self.conn.last_insert_rowid())
    }

    fn import_transaction(&mut self, fixtures: &RadioFixtures) -> DomainResult<FixtureImportSummary> {
        let tx = self.conn.transaction().map_err(db_error)?;
        let now = Utc::now();
        let mut summary = FixtureImportSummary::default();

        for category in &fixtures.categories {
            let inserted = tx
                .execute(
                    "INSERT OR IGNORE INTO categories (name, description, created_at) VALUES (?1, ?2, ?3)",
                    params![category.name, category.description, now],
                )
                .map_err(db_error)?;
            summary.categories += inserted;
        }

        for station in &fixtures.stations {
            let category_id: Option<i64> = match &station.category {
                Some(name) => Some(
                    tx.query_row(
                        "SELECT id FROM categories WHERE name = ?1",
                        params![name],
                        |row| row.get(0),
                    )
                    .optional()
                    .map_err(db_error)?
                    .ok_or_else(|| DomainError::NotFound(format!("Category '{}'", name)))?,
                ),
                None => None,
            };
            tx.execute(
                "INSERT INTO stations (name, description, stream_url, logo_url, category_id,
                    country, language, quality, listeners_count, is_active, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    station.name,
                    station.description,
                    station.stream_url,
                    station.logo_url,
                    category_id,
                    station.country,
                    station.language,
                    station.quality,
                    station.listeners_count.max(0),
                    station.is_active,
                    now,
                ],
            )
            .map_err(db_error)?;
            summary.stations += 1;
        }

        for event in &fixtures.events {
            let station_id: i64 = tx
                .query_row(
                    "SELECT id FROM stations WHERE name = ?1 ORDER BY id LIMIT 1",
                    params![event.station],
                    |row| row.get(0),
                )
                .optional()
                .map_err(db_error)?
                .ok_or_else(|| DomainError::NotFound(format!("Station '{}'", event.station)))?;
            if event.end_time < event.start_time {
                return Err(DomainError::InvalidValue(format!(
                    "Event '{}' ends before it starts",
                    event.title
                )));
            }
            tx.execute(
                "INSERT INTO events (station_id, title, description, event_type, host,
                    start_time, end_time, is_featured, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    station_id,
                    event.title,
                    event.description,
                    event.event_type,
                    event.host,
                    event.start_time,
                    event.end_time,
                    event.is_featured,
                    now,
                ],
            )
            .map_err(db_error)?;
            summary.events += 1;
        }

        for post in &fixtures.blog_posts {
            let slug = match &post.slug {
                Some(slug) => Slug::new(slug.clone())?,
                None => Slug::from_title(&post.title)?,
            };
            let status = PostStatus::parse(&post.status).ok_or_else(|| {
                DomainError::InvalidValue(format!("Unknown post status '{}'", post.status))
            })?;
            let published_at = match (status, post.published_at) {
                (PostStatus::Published, None) => Some(now),
                (_, at) => at,
            };
            tx.execute(
                "INSERT INTO blog_posts (title, slug, author, content, excerpt, tags, status,
                    is_featured, created_at, published_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    post.title,
                    slug.as_str(),
                    post.author,
                    post.content,
                    post.excerpt,
                    post.tags,
                    status.as_str(),
                    post.is_featured,
                    now,
                    published_at,
                ],
            )
            .map_err(db_error)?;
            summary.blog_posts += 1;
        }

        tx.commit().map_err(db_error)?;
        info!("Imported radio fixtures: {:?}", summary);
        Ok(summary)
    }
}

impl RadioRepository for SqliteRadioRepository {
    fn create_user(&mut self, username: &str) -> DomainResult<(User, String)> {
        let username = username.trim();
        if username.is_empty() {
            return Err(DomainError::InvalidValue("Username cannot be empty".to_string()));
        }
        let token = uuid::Uuid::new_v4().simple().to_string();
        self.conn
            .execute(
                "INSERT INTO users (username, token, created_at) VALUES (?1, ?2, ?3)",
                params![username, token, Utc::now()],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(err, _)
                    if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    DomainError::BusinessRuleViolation(format!("User '{}' already exists", username))
                }
                other => db_error(other),
            })?;

        let user = User {
            id: self.conn.last_insert_rowid(),
            username: username.to_string(),
        };
        Ok((user, token))
    }

    fn find_user_by_token(&self, token: &str) -> DomainResult<Option<User>> {
        self.conn
            .query_row(
                "SELECT id, username FROM users WHERE token = ?1",
                params![token],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        username: row.get(1)?,
                    })
                },
            )
            .optional()
            .map_err(db_error)
    }

    fn list_categories(&self, query: &ListQuery) -> DomainResult<Vec<Category>> {
        let mut conditions = Conditions::default();
        conditions.push_search(query.search.as_deref(), &["name", "description"]);
        let order = order_clause(
            query.ordering.as_deref(),
            &[("name", "name"), ("created_at", "created_at")],
            "id ASC",
        );

        let sql = format!(
            "SELECT id, name, description, created_at FROM categories{} ORDER BY {}, id",
            conditions.where_clause(),
            order
        );
        let mut stmt = self.conn.prepare(&sql).map_err(db_error)?;
        let rows = stmt
            .query_map(params_from_iter(conditions.values.iter()), category_from_row)
            .map_err(db_error)?
            .collect::<SqliteResult<Vec<_>>>()
            .map_err(db_error)?;
        Ok(rows)
    }

    fn find_category(&self, id: i64) -> DomainResult<Option<Category>> {
        self.conn
            .query_row(
                "SELECT id, name, description, created_at FROM categories WHERE id = ?1",
                params![id],
                category_from_row,
            )
            .optional()
            .map_err(db_error)
    }

    fn list_stations(&self, query: &StationQuery) -> DomainResult<Vec<RadioStation>> {
        let mut conditions = Conditions::default();
        conditions.push_fixed("s.is_active = 1");
        if let Some(category) = query.category {
            conditions.push("s.category_id = ?", Value::Integer(category));
        }
        if let Some(country) = &query.country {
            conditions.push("s.country = ?", Value::Text(country.clone()));
        }
        if let Some(language) = &query.language {
            conditions.push("s.language = ?", Value::Text(language.clone()));
        }
        if let Some(quality) = &query.quality {
            conditions.push("s.quality = ?", Value::Text(quality.clone()));
        }
        conditions.push_search(
            query.search.as_deref(),
            &["s.name", "s.description", "s.country", "s.language"],
        );
        let order = order_clause(
            query.ordering.as_deref(),
            &[
                ("name", "s.name"),
                ("listeners_count", "s.listeners_count"),
                ("created_at", "s.created_at"),
            ],
            "s.listeners_count DESC",
        );

        self.query_stations(&conditions, &order, None).map_err(db_error)
    }

    fn find_station(&self, id: i64) -> DomainResult<Option<RadioStation>> {
        let mut conditions = Conditions::default();
        conditions.push_fixed("s.is_active = 1");
        conditions.push("s.id = ?", Value::Integer(id));
        Ok(self
            .query_stations(&conditions, "s.id", Some(1))
            .map_err(db_error)?
            .into_iter()
            .next())
    }

    fn top_stations(&self, limit: usize) -> DomainResult<Vec<RadioStation>> {
        let mut conditions = Conditions::default();
        conditions.push_fixed("s.is_active = 1");
        self.query_stations(&conditions, "s.listeners_count DESC", Some(limit))
            .map_err(db_error)
    }

    fn adjust_listeners(&mut self, station_id: i64, delta: i64) -> DomainResult<Option<i64>> {
        let updated = self
            .conn
            .execute(
                "UPDATE stations SET listeners_count = MAX(listeners_count + ?1, 0)
                 WHERE id = ?2 AND is_active = 1",
                params![delta, station_id],
            )
            .map_err(db_error)?;
        if updated == 0 {
            return Ok(None);
        }

        self.conn
            .query_row(
                "SELECT listeners_count FROM stations WHERE id = ?1",
                params![station_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_error)
    }

    fn toggle_favorite(&mut self, user_id: i64, station_id: i64) -> DomainResult<bool> {
        let profile_id = self.ensure_profile(user_id).map_err(db_error)?;
        let removed = self
            .conn
            .execute(
                "DELETE FROM favorite_stations WHERE profile_id = ?1 AND station_id = ?2",
                params![profile_id, station_id],
            )
            .map_err(db_error)?;
        if removed > 0 {
            return Ok(false);
        }

        self.conn
            .execute(
                "INSERT INTO favorite_stations (profile_id, station_id) VALUES (?1, ?2)",
                params![profile_id, station_id],
            )
            .map_err(db_error)?;
        Ok(true)
    }

    fn find_profile(&self, user_id: i64) -> DomainResult<Option<UserProfile>> {
        self.load_profile(user_id).map_err(db_error)
    }

    fn get_or_create_profile(&mut self, user_id: i64) -> DomainResult<UserProfile> {
        self.ensure_profile(user_id).map_err(db_error)?;
        self.load_profile(user_id)
            .map_err(db_error)?
            .ok_or_else(|| DomainError::NotFound(format!("Profile for user {}", user_id)))
    }

    fn update_profile(&mut self, user_id: i64, update: &ProfileUpdate) -> DomainResult<UserProfile> {
        self.ensure_profile(user_id).map_err(db_error)?;
        self.conn
            .execute(
                "UPDATE user_profiles
                 SET bio = COALESCE(?1, bio), avatar_url = COALESCE(?2, avatar_url), updated_at = ?3
                 WHERE user_id = ?4",
                params![update.bio, update.avatar_url, Utc::now(), user_id],
            )
            .map_err(db_error)?;
        self.get_or_create_profile(user_id)
    }

    fn delete_profile(&mut self, user_id: i64) -> DomainResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM user_profiles WHERE user_id = ?1", params![user_id])
            .map_err(db_error)?;
        Ok(rows_affected > 0)
    }

    fn favorite_stations(&self, user_id: i64) -> DomainResult<Vec<RadioStation>> {
        let Some(profile_id) = self.profile_id(user_id).map_err(db_error)? else {
            return Ok(Vec::new());
        };
        let mut conditions = Conditions::default();
        conditions.push_fixed("s.is_active = 1");
        conditions.push(
            "s.id IN (SELECT station_id FROM favorite_stations WHERE profile_id = ?)",
            Value::Integer(profile_id),
        );
        self.query_stations(&conditions, "s.name ASC", None)
            .map_err(db_error)
    }

    fn list_events(&self, query: &EventQuery) -> DomainResult<Vec<Event>> {
        let mut conditions = Conditions::default();
        if let Some(station) = query.station {
            conditions.push("e.station_id = ?", Value::Integer(station));
        }
        if let Some(event_type) = &query.event_type {
            conditions.push("e.event_type = ?", Value::Text(event_type.clone()));
        }
        if let Some(is_featured) = query.is_featured {
            conditions.push("e.is_featured = ?", Value::Integer(is_featured as i64));
        }
        conditions.push_search(
            query.search.as_deref(),
            &["e.title", "e.description", "e.host"],
        );
        let order = order_clause(
            query.ordering.as_deref(),
            &[("start_time", "e.start_time"), ("created_at", "e.created_at")],
            "e.start_time ASC",
        );

        self.query_events(&conditions, &order).map_err(db_error)
    }

    fn find_event(&self, id: i64) -> DomainResult<Option<Event>> {
        let mut conditions = Conditions::default();
        conditions.push("e.id = ?", Value::Integer(id));
        Ok(self
            .query_events(&conditions, "e.id")
            .map_err(db_error)?
            .into_iter()
            .next())
    }

    fn list_posts(&self, query: &ListQuery) -> DomainResult<Vec<BlogPost>> {
        let mut conditions = Conditions::default();
        conditions.push("status = ?", Value::Text(PostStatus::Published.as_str().to_string()));
        conditions.push_search(
            query.search.as_deref(),
            &["title", "content", "excerpt", "tags"],
        );
        let order = order_clause(
            query.ordering.as_deref(),
            &[("created_at", "created_at"), ("published_at", "published_at")],
            "published_at DESC",
        );

        self.query_posts(&conditions, &order).map_err(db_error)
    }

    fn find_post(&self, slug: &str) -> DomainResult<Option<BlogPost>> {
        let mut conditions = Conditions::default();
        conditions.push("status = ?", Value::Text(PostStatus::Published.as_str().to_string()));
        conditions.push("slug = ?", Value::Text(slug.to_string()));
        Ok(self
            .query_posts(&conditions, "id")
            .map_err(db_error)?
            .into_iter()
            .next())
    }

    fn list_history(&self, user_id: i64) -> DomainResult<Vec<ListeningSession>> {
        let sql = format!(
            "{} WHERE h.user_id = ?1 ORDER BY h.listened_at DESC, h.id DESC",
            HISTORY_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql).map_err(db_error)?;
        let rows = stmt
            .query_map(params![user_id], history_from_row)
            .map_err(db_error)?
            .collect::<SqliteResult<Vec<_>>>()
            .map_err(db_error)?;
        Ok(rows)
    }

    fn add_history(&mut self, user_id: i64, entry: &NewListening) -> DomainResult<ListeningSession> {
        let station_exists: bool = self
            .conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM stations WHERE id = ?1)",
                params![entry.station],
                |row| row.get(0),
            )
            .map_err(db_error)?;
        if !station_exists {
            return Err(DomainError::NotFound(format!("Station {}", entry.station)));
        }
        if entry.duration_minutes < 0 {
            return Err(DomainError::InvalidValue(
                "duration_minutes cannot be negative".to_string(),
            ));
        }

        let listened_at: DateTime<Utc> = entry.listened_at.unwrap_or_else(Utc::now);
        self.conn
            .execute(
                "INSERT INTO listening_history (user_id, station_id, listened_at, duration_minutes)
                 VALUES (?1, ?2, ?3, ?4)",
                params![user_id, entry.station, listened_at, entry.duration_minutes],
            )
            .map_err(db_error)?;

        let id = self.conn.last_insert_rowid();
        self.find_history(user_id, id)?
            .ok_or_else(|| DomainError::NotFound(format!("History entry {}", id)))
    }

    fn find_history(&self, user_id: i64, id: i64) -> DomainResult<Option<ListeningSession>> {
        let sql = format!("{} WHERE h.user_id = ?1 AND h.id = ?2", HISTORY_COLUMNS);
        self.conn
            .query_row(&sql, params![user_id, id], history_from_row)
            .optional()
            .map_err(db_error)
    }

    fn delete_history(&mut self, user_id: i64, id: i64) -> DomainResult<bool> {
        let rows_affected = self
            .conn
            .execute(
                "DELETE FROM listening_history WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )
            .map_err(db_error)?;
        Ok(rows_affected > 0)
    }

    fn create_contact(
        &mut self,
        name: &str,
        email: &EmailAddress,
        subject: &str,
        message: &str,
    ) -> DomainResult<ContactMessage> {
        let created_at = Utc::now();
        self.conn
            .execute(
                "INSERT INTO contacts (name, email, subject, message, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![name, email.as_str(), subject, message, created_at],
            )
            .map_err(db_error)?;

        Ok(ContactMessage {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            email: email.as_str().to_string(),
            subject: subject.to_string(),
            message: message.to_string(),
            created_at,
        })
    }

    fn import_fixtures(&mut self, fixtures: &RadioFixtures) -> DomainResult<FixtureImportSummary> {
        self.import_transaction(fixtures)
    }
}
