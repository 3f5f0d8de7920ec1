use std::sync::Arc;

use avatar_core::{AvatarService, Config, DiscordConnector, Reply};
use axum::{
    http::{Method, Uri},
    response::IntoResponse,
    Extension, Json, Router,
};
use tower_http::cors::{Any, CorsLayer};

type GenericError = Box<dyn std::error::Error + Send + Sync + 'static>;

type Service = Arc<AvatarService<DiscordConnector>>;

#[tokio::main]
async fn main() -> Result<(), GenericError> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let addr = std::env::var("AVATAR_LISTEN_ADDR").unwrap_or_else(|_| "localhost:3000".to_string());

    let service: Service = Arc::new(AvatarService::from_config(&config));
    service.warm_up();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Every path goes through the handler so wrong routes still get the JSON 405.
    let router = Router::new()
        .fallback(serve_avatar)
        .layer(cors)
        .layer(Extension(service.clone()));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %listener.local_addr()?, lifecycle = ?config.lifecycle, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    service.shutdown().await;

    Ok(())
}

async fn serve_avatar(Extension(service): Extension<Service>, method: Method, uri: Uri) -> ApiReply {
    ApiReply(service.handle(&method, uri.path()).await)
}

/// `Reply` as an axum response. CORS is left to the `CorsLayer`.
pub struct ApiReply(pub Reply);

impl IntoResponse for ApiReply {
    fn into_response(self) -> axum::response::Response {
        let Reply { status, body } = self.0;
        (status, Json(body)).into_response()
    }
}
