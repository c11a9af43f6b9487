/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskboard_api::{app::{build_router, AppState}, config::Config};
/// use taskboard_shared::store::MemoryStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(Arc::new(MemoryStore::new()), config);
/// let app = build_router(state);
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use taskboard_shared::auth::authenticator::Authenticator;
use taskboard_shared::auth::middleware::{identity_middleware, AuthState};
use taskboard_shared::store::{TaskStore, UserStore};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::{config::Config, middleware::security::SecurityHeadersLayer, routes};

/// Shared application state
///
/// Cloned into every handler through Axum's `State` extractor; all fields are
/// reference counted.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,

    pub tasks: Arc<dyn TaskStore>,

    /// Per-request identity resolution, built once from `config`
    pub authenticator: Arc<Authenticator>,

    pub config: Arc<Config>,
}

impl AppState {
    /// Creates state around a store that keeps both users and tasks
    pub fn new<S>(store: Arc<S>, config: Config) -> Self
    where
        S: UserStore + TaskStore + 'static,
    {
        let authenticator = Authenticator::new(
            config.jwt.secret.clone(),
            config.auth.cookie_name.clone(),
            config.auth.csrf_policy(),
        );

        Self {
            users: store.clone(),
            tasks: store,
            authenticator: Arc::new(authenticator),
            config: Arc::new(config),
        }
    }

    pub fn jwt_secret(&self) -> &str {
        self.authenticator.jwt_secret()
    }

    /// State for [`identity_middleware`]
    pub fn auth_state(&self) -> AuthState {
        AuthState {
            authenticator: self.authenticator.clone(),
            users: self.users.clone(),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET  /                          banner (public)
/// ├── GET  /health                    health check (public)
/// └── /api/
///     ├── auth/
///     │   ├── POST register/          (public)
///     │   ├── POST token/             (public)
///     │   ├── POST token/refresh/     (public)
///     │   ├── POST logout/            (public)
///     │   ├── GET  csrf/              (public)
///     │   └── GET  me/                (authenticated)
///     └── tasks/                      (authenticated, owner scoped)
///         ├── GET | POST              /
///         └── GET | PUT | PATCH | DELETE  /:id/
/// ```
///
/// Protected routes sit behind [`identity_middleware`]; handlers on them take
/// an `AuthContext`, which rejects anonymous requests with 401.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(routes::home::index))
        .route("/health", get(routes::health::health_check))
        .route("/api/auth/register/", post(routes::auth::register))
        .route("/api/auth/token/", post(routes::auth::login))
        .route("/api/auth/token/refresh/", post(routes::auth::refresh))
        .route("/api/auth/logout/", post(routes::auth::logout))
        .route("/api/auth/csrf/", get(routes::auth::csrf_token));

    let protected_routes = Router::new()
        .route("/api/auth/me/", get(routes::auth::me))
        .route(
            "/api/tasks/",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/api/tasks/:id/",
            get(routes::tasks::get_task)
                .put(routes::tasks::replace_task)
                .patch(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .layer(middleware::from_fn_with_state(
            state.auth_state(),
            identity_middleware,
        ));

    let cors = cors_layer(&state.config);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.api.cors_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let mut allowed_headers = vec![header::AUTHORIZATION, header::CONTENT_TYPE];
    if let Ok(csrf_header) = HeaderName::try_from(config.auth.csrf_header_name.as_str()) {
        allowed_headers.push(csrf_header);
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(allowed_headers)
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
