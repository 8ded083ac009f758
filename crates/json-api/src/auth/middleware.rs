//! Auth middleware.

use std::sync::Arc;

use replygate_app::auth::{AuthServiceError, parse_bearer};
use salvo::{http::header::AUTHORIZATION, prelude::*};

use crate::{auth::into_api_error, extensions::*, state::State};

/// Resolve the bearer credential and stash the user for downstream handlers.
#[salvo::handler]
pub(crate) async fn handler(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
    ctrl: &mut FlowCtrl,
) {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let token = match parse_bearer(header) {
        Ok(token) => token.to_owned(),
        Err(source) => {
            res.render(into_api_error(AuthServiceError::MalformedCredential(source)));
            ctrl.skip_rest();

            return;
        }
    };

    let state = match depot.obtain_or_500::<Arc<State>>() {
        Ok(state) => state,
        Err(error) => {
            res.render(error);
            ctrl.skip_rest();

            return;
        }
    };

    let user = match state.app.auth.authenticate_bearer(&token).await {
        Ok(user) => user,
        Err(error) => {
            res.render(into_api_error(error));
            ctrl.skip_rest();

            return;
        }
    };

    depot.insert_user_uuid(user);

    ctrl.call_next(req, depot, res).await;
}
