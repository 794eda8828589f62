use crate::{
    bookmarks::{Bookmark, BookmarkCreate, BookmarkStore, BookmarkUpdate, StoreError},
    config::Config,
    reminders::{ReminderAction, ReminderEngine},
    search::{self, AiRanker},
};
use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{Arc, RwLock};
use tokio::{signal, sync::Mutex};

struct SharedState {
    store: Arc<dyn BookmarkStore>,
    config: Arc<RwLock<Config>>,
    /// One reminder prompt at a time for the whole daemon session.
    engine: Mutex<ReminderEngine>,
}

async fn start_app(store: Arc<dyn BookmarkStore>, config: Arc<RwLock<Config>>) {
    let schedule = config.read().unwrap().reminders.clone();
    let engine = ReminderEngine::with_schedule(
        store.clone(),
        schedule.interval_days,
        schedule.cooldown_days,
    );

    let shared_state = Arc::new(SharedState {
        store,
        config,
        engine: Mutex::new(engine),
    });

    async fn shutdown_signal() {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    }

    let app = Router::new()
        .route("/api/bookmarks/search", post(search_bookmarks))
        .route("/api/bookmarks/create", post(create))
        .route("/api/bookmarks/update", post(update))
        .route("/api/bookmarks/delete", post(delete))
        .route("/api/categories", post(categories))
        .route("/api/reminders/due", post(reminders_due))
        .route("/api/reminders/pending", post(reminders_pending))
        .route("/api/reminders/resolve", post(reminders_resolve))
        .route("/api/config", get(get_config))
        .route("/api/config", post(update_config))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(shared_state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await.unwrap();
    log::info!("listening on 0.0.0.0:8080");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();
}

pub fn start_daemon(store: Arc<dyn BookmarkStore>, config: Arc<RwLock<Config>>) {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(async { start_app(store, config).await });
}

// Wrapper so `?` converts store failures into responses.
#[derive(Debug)]
struct HttpError(StoreError);

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        match self.0 {
            StoreError::NotFound => (
                axum::http::StatusCode::NOT_FOUND,
                json!({"error": self.0.to_string()}).to_string(),
            ),
            StoreError::InvalidUrl(_) => (
                axum::http::StatusCode::BAD_REQUEST,
                json!({"error": self.0.to_string()}).to_string(),
            ),
            StoreError::IO(_) | StoreError::Csv(_) | StoreError::Other(_) => {
                log::error!("{self:?}");
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": self.0.to_string()}).to_string(),
                )
            }
        }
        .into_response()
    }
}

impl<E> From<E> for HttpError
where
    E: Into<StoreError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    pub user_id: String,

    /// Free-text query. Empty or absent returns the full collection.
    /// An `ai:` prefix routes to the ranking collaborator when configured.
    #[serde(default)]
    pub query: String,
}

async fn search_bookmarks(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<SearchRequest>,
) -> Result<axum::Json<Vec<Bookmark>>, HttpError> {
    log::debug!("payload: {payload:?}");

    tokio::task::block_in_place(move || {
        let bookmarks = state.store.list(&payload.user_id)?;

        let ranker = state.config.read().unwrap().ai_search.ranker();
        let results = search::search_with_ranker(
            &payload.query,
            &bookmarks,
            ranker.as_ref().map(|r| r as &dyn AiRanker),
        );

        Ok(results.into())
    })
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BookmarkCreateRequest {
    pub user_id: String,
    pub url: String,
    pub title: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
}

async fn create(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<BookmarkCreateRequest>,
) -> Result<axum::Json<Bookmark>, HttpError> {
    log::debug!("payload: {payload:?}");

    tokio::task::block_in_place(move || {
        let bmark = state.store.create(BookmarkCreate {
            user_id: payload.user_id,
            url: payload.url,
            title: payload.title,
            category: payload.category,
            description: payload.description,
        })?;

        Ok(bmark.into())
    })
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BookmarkUpdateRequest {
    pub id: u64,
    pub user_id: String,
    pub title: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub reminder_dismissed: Option<bool>,
}

async fn update(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<BookmarkUpdateRequest>,
) -> Result<axum::Json<Bookmark>, HttpError> {
    log::debug!("payload: {payload:?}");

    tokio::task::block_in_place(move || {
        let bmark = state.store.update(
            payload.id,
            &payload.user_id,
            BookmarkUpdate {
                title: payload.title,
                category: payload.category,
                description: payload.description,
                url: payload.url,
                reminder_dismissed: payload.reminder_dismissed,
            },
        )?;

        Ok(bmark.into())
    })
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BookmarkDeleteRequest {
    pub id: u64,
    pub user_id: String,
}

async fn delete(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<BookmarkDeleteRequest>,
) -> Result<(), HttpError> {
    log::debug!("payload: {payload:?}");

    tokio::task::block_in_place(move || {
        state
            .store
            .delete(payload.id, &payload.user_id)
            .map_err(Into::into)
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserRequest {
    pub user_id: String,
}

async fn categories(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<UserRequest>,
) -> Result<axum::Json<Vec<String>>, HttpError> {
    tokio::task::block_in_place(move || {
        state
            .store
            .categories(&payload.user_id)
            .map(Into::into)
            .map_err(Into::into)
    })
}

async fn reminders_due(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<UserRequest>,
) -> Result<axum::Json<Option<Bookmark>>, HttpError> {
    tokio::task::block_in_place(move || {
        let bookmarks = state.store.list(&payload.user_id)?;

        let mut engine = state.engine.blocking_lock();
        Ok(engine.evaluate(&bookmarks, chrono::Utc::now()).into())
    })
}

async fn reminders_pending(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<UserRequest>,
) -> Result<axum::Json<Vec<Bookmark>>, HttpError> {
    tokio::task::block_in_place(move || {
        let bookmarks = state.store.list(&payload.user_id)?;

        let engine = state.engine.blocking_lock();
        let mut due = engine.pending(&bookmarks, chrono::Utc::now());
        // Presentation order: longest-neglected first.
        due.sort_by_key(|b| b.created_at);

        Ok(due.into())
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReminderResolveRequest {
    pub user_id: String,
    pub action: ReminderAction,
}

async fn reminders_resolve(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<ReminderResolveRequest>,
) -> Result<axum::Json<()>, HttpError> {
    log::debug!("payload: {payload:?}");

    tokio::task::block_in_place(move || {
        let mut engine = state.engine.blocking_lock();
        engine
            .resolve(&payload.user_id, payload.action, chrono::Utc::now())
            .map(Into::into)
            .map_err(Into::into)
    })
}

async fn get_config(
    State(state): State<Arc<SharedState>>,
) -> Result<axum::Json<Config>, HttpError> {
    tokio::task::block_in_place(move || Ok(state.config.read().unwrap().clone().into()))
}

async fn update_config(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<Config>,
) -> Result<axum::Json<Config>, HttpError> {
    tokio::task::block_in_place(move || {
        *state.config.write().unwrap() = payload;
        Ok(state.config.read().unwrap().clone().into())
    })
}
