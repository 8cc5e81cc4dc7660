use crate::{
    app::{AppError, PreviewService},
    metadata::{ImageList, LinkPreview, OriginalUrl},
};
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::{signal, sync::Semaphore};

#[derive(Clone)]
pub struct SharedState {
    pub service: Arc<PreviewService>,
    /// One permit per open rendering session.
    pub sessions: Arc<Semaphore>,
}

impl SharedState {
    pub fn new(service: PreviewService, max_sessions: usize) -> Self {
        Self {
            service: Arc::new(service),
            sessions: Arc::new(Semaphore::new(max_sessions)),
        }
    }

    /// Runs `f` on the blocking pool once a session slot is free.
    async fn with_session<T, F>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&PreviewService) -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .sessions
            .clone()
            .acquire_owned()
            .await
            .map_err(|err| AppError::Other(err.into()))?;
        let service = self.service.clone();

        tokio::task::spawn_blocking(move || {
            let result = f(&service);
            drop(permit);
            result
        })
        .await
        .map_err(|err| AppError::Other(err.into()))
    }
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/preview", get(preview))
        .route("/all-images", get(all_images))
        .route("/original-url", get(original_url))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::warn!("shutting down, waiting for open requests");
}

async fn start_app(state: SharedState, listen: &str) -> anyhow::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(listen).await?;
    log::info!("link preview server listening at http://{listen}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

pub fn start_daemon(state: SharedState, listen: &str) -> anyhow::Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async { start_app(state, listen).await })
}

#[derive(Debug)]
struct HttpError(AppError);

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        if self.0.is_client_error() {
            log::debug!("{self:?}");
            (
                axum::http::StatusCode::BAD_REQUEST,
                Json(json!({"error": self.0.to_string()})),
            )
        } else {
            log::error!("error processing request: {self:?}");
            (
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Internal server error"})),
            )
        }
        .into_response()
    }
}

impl<E> From<E> for HttpError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UrlQuery {
    pub url: Option<String>,
}

impl UrlQuery {
    /// The `url` parameter, treating an empty value as missing.
    fn url(self) -> Option<String> {
        self.url.filter(|url| !url.trim().is_empty())
    }
}

async fn preview(
    State(state): State<SharedState>,
    Query(query): Query<UrlQuery>,
) -> Result<Json<LinkPreview>, HttpError> {
    let url = query.url().ok_or(AppError::MissingUrl)?;

    state
        .with_session(move |service| service.build_preview(&url))
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NoPreview.into())
}

async fn all_images(
    State(state): State<SharedState>,
    Query(query): Query<UrlQuery>,
) -> Result<Json<ImageList>, HttpError> {
    let url = query.url().ok_or(AppError::MissingUrl)?;

    let images = state
        .with_session(move |service| service.all_images(&url))
        .await??;

    if images.is_empty() {
        return Err(AppError::NoImages.into());
    }

    Ok(Json(ImageList { images }))
}

async fn original_url(
    State(state): State<SharedState>,
    Query(query): Query<UrlQuery>,
) -> Json<OriginalUrl> {
    let Some(url) = query.url() else {
        return Json(OriginalUrl { original_url: None });
    };

    let original_url = match state
        .with_session(move |service| service.original_url(&url))
        .await
    {
        Ok(original_url) => original_url,
        Err(err) => {
            log::error!("{err}");
            None
        }
    };

    Json(OriginalUrl { original_url })
}
