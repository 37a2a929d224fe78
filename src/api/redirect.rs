use std::collections::HashMap;
use std::sync::Arc;

use actix_web::cookie::{Cookie, time::Duration};
use actix_web::{HttpResponse, Responder, web};
use tracing::{debug, instrument};

use crate::api::error_response;
use crate::errors::LinkhubError;
use crate::services::ClickRouter;
use crate::structs::Destination;

/// Cookie carrying the tracking token across the channel hop
pub const REF_COOKIE_NAME: &str = "lh_ref";

pub struct RedirectService {}

impl RedirectService {
    /// GET /go/{channel}?ref={token}: set the token cookie and 302 to the
    /// channel deep link.
    #[instrument(skip(path, query, router), fields(channel = %path))]
    pub async fn go(
        path: web::Path<String>,
        query: web::Query<HashMap<String, String>>,
        router: web::Data<Arc<ClickRouter>>,
    ) -> impl Responder {
        let destination: Destination = match path.into_inner().parse() {
            Ok(dest) => dest,
            Err(e) => return error_response(&LinkhubError::validation(e)),
        };

        let Some(token) = query.get("ref").filter(|t| !t.is_empty()) else {
            return error_response(&LinkhubError::validation("missing ref token"));
        };

        match router.deep_link(destination, token) {
            Ok(location) => {
                debug!("Redirecting token={} to {}", token, destination);
                let cookie = Cookie::build(REF_COOKIE_NAME, token.clone())
                    .path("/")
                    .http_only(true)
                    .max_age(Duration::days(destination.cookie_max_age_days()))
                    .finish();

                HttpResponse::Found()
                    .cookie(cookie)
                    .insert_header(("Location", location))
                    .finish()
            }
            Err(e) => error_response(&e),
        }
    }
}
