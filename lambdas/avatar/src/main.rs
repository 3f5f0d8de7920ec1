use std::sync::Arc;

use avatar_core::{AvatarService, Config, Connector};
use lambda_http::{run, service_fn, tracing, Body, Error, Request, Response};

async fn function_handler<C: Connector>(service: &AvatarService<C>, event: Request) -> Result<Response<Body>, Error> {
    let reply = service.handle(event.method(), event.uri().path()).await;

    Ok(reply.into_response()?.map(Body::from))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();

    let config = Config::from_env().map_err(|e| {
        tracing::error!(error = %e, "invalid configuration");
        e
    })?;
    tracing::info!(lifecycle = ?config.lifecycle, route = %config.route_prefix, "starting avatar function");

    let service = Arc::new(AvatarService::from_config(&config));
    service.warm_up();

    run(service_fn(move |event: Request| {
        let service = service.clone();
        async move { function_handler(&service, event).await }
    }))
    .await
}
