//! Entity authentication middleware
//!
//! ```ignore
//! let app = Router::new()
//!     .route("/me", get(me))
//!     .route_layer(middleware::from_fn_with_state(users.clone(), require_entity::<User>))
//!     .with_state(state);
//! ```

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::cache::RequestCache;
use crate::entity::EntityAuth;
use crate::store::AuthEntity;

/// Reject the request unless it carries a token for an existing `E`
///
/// Unauthorized, BadRequest and Forbidden short-circuit with a bare status
/// and the message as plain text. Any other failure goes through the JSON
/// error response. On success the entity stays in the request cache for the
/// extractors downstream.
pub async fn require_entity<E: AuthEntity>(
    State(auth): State<EntityAuth<E>>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();
    let cache = RequestCache::from_extensions(&mut parts.extensions);

    match auth.authenticate(&parts, &cache).await {
        Ok(entity) => {
            tracing::debug!(entity_id = %entity.id(), "Request authenticated");
            next.run(Request::from_parts(parts, body)).await
        }
        Err(e) if e.is_http() => {
            tracing::debug!(error = %e, status = %e.status_code(), "Request rejected");
            e.into_plain_response()
        }
        Err(e) => e.into_response(),
    }
}
