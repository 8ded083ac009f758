//! Replygate JSON API Server

use std::process;

use salvo::{
    affix_state::inject,
    oapi::{
        OpenApi,
        security::{Http, HttpAuthScheme, SecurityScheme},
        swagger_ui::SwaggerUi,
    },
    prelude::*,
    trailing_slash::remove_slash,
};
use tracing::{error, info};

use replygate_app::{
    auth::AuthSettings,
    context::{AppContext, AppSettings},
};

use crate::{
    config::ServerConfig,
    cors::CorsBoundary,
    observability::{Observability, request_logging},
    state::{GatewaySettings, State},
};

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod auth;
mod config;
mod cors;
mod errors;
mod extension;
mod extensions;
mod healthcheck;
mod observability;
mod quota;
mod replies;
mod router;
mod shutdown;
mod state;
#[cfg(test)]
mod test_helpers;

/// Replygate JSON API Server entry point
///
/// # Panics
///
/// Panics if the server fails to bind or serve requests
#[tokio::main]
pub async fn main() {
    let config = ServerConfig::load().unwrap_or_else(|e| {
        #[expect(
            clippy::print_stderr,
            reason = "logging not initialized yet, must use eprintln for config errors"
        )]
        {
            eprintln!("Configuration error: {e}");
        }

        process::exit(1);
    });

    let observability = Observability::init(&config).unwrap_or_else(|e| {
        #[expect(
            clippy::print_stderr,
            reason = "logging failed to initialize, must use eprintln"
        )]
        {
            eprintln!("Observability error: {e}");
        }

        process::exit(1);
    });

    let addr = config.socket_addr();

    info!("Starting server on {addr}");

    let listener = TcpListener::new(addr).bind().await;

    let settings = AppSettings {
        auth: AuthSettings {
            token_ttl: config.auth.token_ttl(),
            store_timeout: config.database.store_timeout(),
        },
        store_timeout: config.database.store_timeout(),
        replies: config.upstream.generator_config(),
    };

    let app = match AppContext::from_database_url(&config.database.database_url, settings).await
    {
        Ok(app) => app,
        Err(init_error) => {
            error!("failed to initialize app context: {init_error}");

            process::exit(1);
        }
    };

    let gateway = GatewaySettings {
        session_cookie_name: config.auth.session_cookie_name.clone(),
        issue_policy: config.rate_limits.issue_policy(),
        generate_policy: config.rate_limits.generate_policy(),
    };

    let router = Router::new()
        .hoop(CatchPanic::new())
        .hoop(remove_slash())
        .hoop(request_logging)
        .hoop(inject(State::shared(app, gateway)))
        .push(router::routes());

    let doc = OpenApi::new("Replygate API", env!("CARGO_PKG_VERSION"))
        .add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        )
        .merge_router(&router);

    let router = router
        .push(doc.into_router("/api-doc/openapi.json"))
        .push(SwaggerUi::new("/api-doc/openapi.json").into_router("docs"));

    let service = Service::new(router).hoop(CorsBoundary::new(config.cors.allowed_origins()));

    let server = Server::new(listener);

    let handle = server.handle();

    tokio::spawn(async move {
        if let Err(error) = shutdown::listen(handle).await {
            error!("failed to listen for shutdown signal: {error}");
        }
    });

    server.serve(service).await;

    observability.shutdown();
}
