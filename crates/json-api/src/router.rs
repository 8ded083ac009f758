//! Routes

use salvo::prelude::*;

use crate::{auth, extension, healthcheck, observability::metrics_handler, replies};

/// Every gateway route. State injection and outer hoops are added by the caller.
pub(crate) fn routes() -> Router {
    Router::new()
        .push(Router::with_path("healthcheck").get(healthcheck::handler))
        .push(Router::with_path("metrics").get(metrics_handler))
        .push(Router::with_path("extension/token").post(extension::issue::handler))
        .push(
            Router::new()
                .hoop(auth::middleware::handler)
                .push(Router::with_path("extension/me").get(extension::me::handler))
                .push(Router::with_path("extension/token").delete(extension::revoke::handler))
                .push(Router::with_path("replies").post(replies::generate::handler)),
        )
}
