//! Maps an inbound request to an [`events::Role`] for control-plane
//! authorization. Authentication itself (who the caller is) is out of
//! scope per the spec; this only extracts the *role* a caller claims via
//! the `X-Role` header, trusting it the way a reverse proxy in front of
//! this service would after doing real auth.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use events::Role;

pub struct RoleHeader(pub Role);

#[async_trait]
impl<S> FromRequestParts<S> for RoleHeader
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let role = parts
            .headers
            .get("x-role")
            .and_then(|v| v.to_str().ok())
            .map(|v| match v.to_ascii_lowercase().as_str() {
                "admin" => Role::Admin,
                "developer" => Role::Developer,
                _ => Role::Viewer,
            })
            .unwrap_or(Role::Viewer);

        Ok(RoleHeader(role))
    }
}
