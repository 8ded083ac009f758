//! CORS boundary.
//!
//! Wraps the whole service so that every response, including errors and
//! unmatched routes, carries credentialed CORS headers for an allow-listed
//! origin. Origins are never reflected unless they match an entry.

use salvo::{
    Depot, FlowCtrl, Handler, Request, Response, async_trait,
    http::{
        HeaderName, Method, StatusCode,
        header::{
            ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS,
            ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE,
            ORIGIN, VARY,
        },
    },
};
use tracing::warn;

const ALLOWED_METHODS: &str = "GET, POST, DELETE, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type, Authorization";
const PREFLIGHT_MAX_AGE_SECS: &str = "86400";

#[derive(Debug, Clone)]
pub(crate) struct CorsBoundary {
    allowed: Vec<String>,
}

impl CorsBoundary {
    /// The first origin is answered for absent or unknown origins.
    pub(crate) fn new(allowed: Vec<String>) -> Self {
        Self { allowed }
    }

    /// Origin to put in `Access-Control-Allow-Origin` for a request.
    pub(crate) fn resolve<'a>(&'a self, origin: Option<&'a str>) -> &'a str {
        origin
            .filter(|origin| {
                self.allowed
                    .iter()
                    .any(|entry| origin_matches(entry, origin))
            })
            .or_else(|| self.allowed.first().map(String::as_str))
            .unwrap_or_default()
    }
}

/// Prefix match that stops at a host boundary.
///
/// `https://app.example.com` admits `https://app.example.com:8443` but not
/// `https://app.example.com.evil.example`. Entries that already end in a
/// separator (`chrome-extension://`) admit anything after it.
fn origin_matches(entry: &str, origin: &str) -> bool {
    let Some(rest) = origin.strip_prefix(entry) else {
        return false;
    };

    if entry.ends_with("://") || entry.ends_with('/') {
        return !rest.is_empty();
    }

    rest.is_empty() || rest.starts_with(':') || rest.starts_with('/')
}

fn set_header(res: &mut Response, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            res.headers_mut().insert(name, value);
        }
        Err(source) => warn!(header = %name, "could not encode cors header: {source}"),
    }
}

#[async_trait]
impl Handler for CorsBoundary {
    async fn handle(
        &self,
        req: &mut Request,
        depot: &mut Depot,
        res: &mut Response,
        ctrl: &mut FlowCtrl,
    ) {
        let origin = req
            .headers()
            .get(ORIGIN)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        let allow_origin = self.resolve(origin.as_deref()).to_owned();

        if req.method() == Method::OPTIONS {
            res.status_code(StatusCode::NO_CONTENT);
            set_header(res, ACCESS_CONTROL_ALLOW_METHODS, ALLOWED_METHODS);
            set_header(res, ACCESS_CONTROL_ALLOW_HEADERS, ALLOWED_HEADERS);
            set_header(res, ACCESS_CONTROL_MAX_AGE, PREFLIGHT_MAX_AGE_SECS);
            ctrl.skip_rest();
        } else {
            ctrl.call_next(req, depot, res).await;
        }

        set_header(res, ACCESS_CONTROL_ALLOW_ORIGIN, &allow_origin);
        set_header(res, ACCESS_CONTROL_ALLOW_CREDENTIALS, "true");
        set_header(res, VARY, "Origin");
    }
}
