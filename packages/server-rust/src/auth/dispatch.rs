//! Path-based pipeline selection.
//!
//! [`dispatch`] is the axum middleware every request passes through. It opens
//! the request's unit of work, classifies the path once, and runs exactly one
//! of the two pipelines (or none, for public and anonymous-only routes).

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};
use vigil_core::Principal;

use super::config::AuthConfig;
use super::pipeline::{AdminPipeline, TenantPipeline};
use super::security::SECURITY_TARGET;
use crate::network::handlers::ApiError;
use crate::tenancy::TenantContextStore;

/// Access policy of a tenant-domain route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantPolicy {
    /// Whistleblower channel: principal forced to Anonymous, credentials
    /// ignored.
    AnonymousOnly,
    /// Staff panel: a resolved tenant user is required.
    Authenticated,
    /// Health checks, static assets, activation: no principal, no tenant.
    Public,
}

/// Outcome of classifying a request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Admin,
    Tenant(TenantPolicy),
    /// Empty, `.` or `..` segments, or encoded separators. Rejected before
    /// any pipeline runs.
    NonCanonical,
}

/// Fixed, non-overlapping partition of the path space.
#[derive(Debug, Clone)]
pub struct PathPartition {
    admin_prefix: String,
    anonymous: Vec<String>,
    public: Vec<String>,
}

impl PathPartition {
    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            admin_prefix: config.admin_prefix.clone(),
            anonymous: config.anonymous_prefixes.clone(),
            public: config.public_prefixes.clone(),
        }
    }

    /// Classifies `path`. Anything not claimed by the admin, anonymous, or
    /// public prefixes requires an authenticated tenant user.
    #[must_use]
    pub fn classify(&self, path: &str) -> Route {
        if !is_canonical(path) {
            return Route::NonCanonical;
        }
        if under(path, &self.admin_prefix) {
            return Route::Admin;
        }
        if self.anonymous.iter().any(|p| under(path, p)) {
            return Route::Tenant(TenantPolicy::AnonymousOnly);
        }
        if self.public.iter().any(|p| under(path, p)) {
            return Route::Tenant(TenantPolicy::Public);
        }
        Route::Tenant(TenantPolicy::Authenticated)
    }
}

/// `path` equals `prefix` or continues it at a segment boundary.
fn under(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

fn is_canonical(path: &str) -> bool {
    if path == "/" {
        return true;
    }
    let Some(rest) = path.strip_prefix('/') else {
        return false;
    };
    let lower = rest.to_ascii_lowercase();
    if lower.contains("%2f") || lower.contains("%2e") || lower.contains("%5c") || rest.contains('\\') {
        return false;
    }
    rest.split('/')
        .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}

/// Pipeline selection state shared by all requests.
pub struct ChainDispatcher {
    partition: PathPartition,
    admin: AdminPipeline,
    tenant: TenantPipeline,
}

impl ChainDispatcher {
    #[must_use]
    pub fn new(partition: PathPartition, admin: AdminPipeline, tenant: TenantPipeline) -> Self {
        Self {
            partition,
            admin,
            tenant,
        }
    }

    #[must_use]
    pub fn partition(&self) -> &PathPartition {
        &self.partition
    }

    #[must_use]
    pub fn admin(&self) -> &AdminPipeline {
        &self.admin
    }

    #[must_use]
    pub fn tenant(&self) -> &TenantPipeline {
        &self.tenant
    }

    async fn route(&self, mut request: Request, next: Next) -> Response {
        let route = self.partition.classify(request.uri().path());
        match route {
            Route::NonCanonical => {
                warn!(
                    target: SECURITY_TARGET,
                    path = %request.uri().path(),
                    "non-canonical request path rejected"
                );
                ApiError::new(StatusCode::BAD_REQUEST, "bad_request").into_response()
            }
            Route::Admin => match self.admin.authenticate(request.headers()).await {
                Ok(principal) => {
                    request
                        .extensions_mut()
                        .insert(Principal::Admin(principal.clone()));
                    request.extensions_mut().insert(principal);
                    next.run(request).await
                }
                Err(err) => ApiError::from(err).into_response(),
            },
            Route::Tenant(TenantPolicy::AnonymousOnly) => {
                // Whatever was presented is dropped unread.
                request.headers_mut().remove(AUTHORIZATION);
                request.extensions_mut().insert(Principal::Anonymous);
                next.run(request).await
            }
            Route::Tenant(TenantPolicy::Public) => next.run(request).await,
            Route::Tenant(TenantPolicy::Authenticated) => {
                let principal = match self.tenant.authenticate(request.headers()).await {
                    Ok(principal) => principal,
                    Err(err) => return ApiError::from(err).into_response(),
                };
                let _tenant = match TenantContextStore::enter(principal.tenant_id) {
                    Ok(guard) => guard,
                    Err(err) => {
                        error!(error = %err, "could not enter tenant context for request");
                        return ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal")
                            .into_response();
                    }
                };
                request
                    .extensions_mut()
                    .insert(Principal::TenantUser(principal.clone()));
                request.extensions_mut().insert(principal);
                next.run(request).await
            }
        }
    }
}

/// Axum middleware: one unit of work and at most one pipeline per request.
pub async fn dispatch(
    State(dispatcher): State<Arc<ChainDispatcher>>,
    request: Request,
    next: Next,
) -> Response {
    TenantContextStore::scope(dispatcher.route(request, next)).await
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn partition() -> PathPartition {
        PathPartition::from_config(&AuthConfig::default())
    }

    #[test]
    fn classifies_default_prefixes() {
        let p = partition();
        assert_eq!(p.classify("/api/admin"), Route::Admin);
        assert_eq!(p.classify("/api/admin/users"), Route::Admin);
        assert_eq!(
            p.classify("/api/alert/submit"),
            Route::Tenant(TenantPolicy::AnonymousOnly)
        );
        assert_eq!(p.classify("/health"), Route::Tenant(TenantPolicy::Public));
        assert_eq!(
            p.classify("/api/auth/activate"),
            Route::Tenant(TenantPolicy::Public)
        );
        assert_eq!(
            p.classify("/api/panel/cases"),
            Route::Tenant(TenantPolicy::Authenticated)
        );
        assert_eq!(p.classify("/"), Route::Tenant(TenantPolicy::Authenticated));
    }

    #[test]
    fn prefixes_match_only_on_segment_boundaries() {
        let p = partition();
        assert_eq!(
            p.classify("/api/administrator"),
            Route::Tenant(TenantPolicy::Authenticated)
        );
        assert_eq!(
            p.classify("/api/alerts"),
            Route::Tenant(TenantPolicy::Authenticated)
        );
        assert_eq!(
            p.classify("/healthz"),
            Route::Tenant(TenantPolicy::Authenticated)
        );
    }

    #[test]
    fn non_canonical_paths_are_rejected() {
        let p = partition();
        for path in [
            "",
            "api/admin",
            "//api/admin",
            "/api/admin/",
            "/api/alert/../panel/cases",
            "/api/./admin",
            "/api/alert%2f..%2fpanel",
            "/api/%2E%2E/admin",
            "/api\\admin",
        ] {
            assert_eq!(p.classify(path), Route::NonCanonical, "{path}");
        }
    }

    fn segment() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("api".to_string()),
            Just("admin".to_string()),
            Just("alert".to_string()),
            Just("panel".to_string()),
            Just("health".to_string()),
            Just(".".to_string()),
            Just("..".to_string()),
            Just(String::new()),
            "[a-z]{1,6}",
        ]
    }

    proptest! {
        #[test]
        fn admin_route_iff_admin_prefix(segments in prop::collection::vec(segment(), 1..6)) {
            let path = format!("/{}", segments.join("/"));
            let canonical = segments.iter().all(|s| !s.is_empty() && s != "." && s != "..");
            let route = partition().classify(&path);

            if !canonical {
                prop_assert_eq!(route, Route::NonCanonical);
            } else {
                let admin = segments.len() >= 2 && segments[0] == "api" && segments[1] == "admin";
                prop_assert_eq!(route == Route::Admin, admin);
                prop_assert_ne!(route, Route::NonCanonical);
            }
        }

        #[test]
        fn traversal_never_reaches_a_pipeline(
            head in prop::collection::vec("[a-z]{1,6}", 0..3),
            tail in prop::collection::vec("[a-z]{1,6}", 0..3),
        ) {
            let mut segments = head;
            segments.push("..".to_string());
            segments.extend(tail);
            let path = format!("/{}", segments.join("/"));
            prop_assert_eq!(partition().classify(&path), Route::NonCanonical);
        }
    }
}
