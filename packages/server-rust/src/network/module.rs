//! Network module with deferred startup lifecycle.
//!
//! `new()` wires shared state, `start()` binds the TCP listener, and
//! `serve()` accepts connections until shutdown. Binding before serving lets
//! the binary report the bound port and start background work in between.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context as _;
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};
use vigil_core::TenantDirectory;

use super::config::{NetworkConfig, TlsConfig};
use super::handlers::{
    activate_handler, alert_status_handler, create_user_handler, delete_user_handler,
    get_case_handler, health_handler, list_cases_handler, list_users_handler, liveness_handler,
    readiness_handler, submit_alert_handler, suspend_user_handler, update_case_status_handler,
    AppState,
};
use super::middleware::build_http_layers;
use super::shutdown::{track_in_flight, ShutdownController};
use crate::auth::{dispatch, ChainDispatcher};
use crate::service::OperationService;

/// Owns the HTTP server lifecycle.
///
/// 1. `new()` -- allocates the shutdown controller
/// 2. `start()` -- binds the TCP listener to the configured address
/// 3. `serve()` -- accepts connections until the shutdown future resolves
pub struct NetworkModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    shutdown: Arc<ShutdownController>,
    operations: Arc<OperationService>,
    tenants: Arc<dyn TenantDirectory>,
    dispatcher: Arc<ChainDispatcher>,
}

impl NetworkModule {
    /// Creates a network module without binding any port.
    #[must_use]
    pub fn new(
        config: NetworkConfig,
        operations: Arc<OperationService>,
        tenants: Arc<dyn TenantDirectory>,
        dispatcher: Arc<ChainDispatcher>,
    ) -> Self {
        Self {
            config,
            listener: None,
            shutdown: Arc::new(ShutdownController::new()),
            operations,
            tenants,
            dispatcher,
        }
    }

    /// Shared shutdown controller. The binary triggers shutdown through it
    /// and the background worker listens on it.
    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    /// Assembles the axum router with all routes and middleware.
    ///
    /// Every request, matched or not, passes the HTTP layers and then the
    /// chain dispatcher, which picks the authentication pipeline by path.
    /// Probes sit outside the in-flight tracking so they answer while
    /// draining.
    ///
    /// Routes:
    /// - `GET /health`, `/health/live`, `/health/ready` -- public probes
    /// - `/api/admin/users...` -- admin pipeline
    /// - `/api/panel/cases...` -- tenant pipeline, authenticated staff
    /// - `/api/alert/...` -- tenant domain, forced anonymous
    /// - `POST /api/auth/activate` -- public
    pub fn build_router(&self) -> Router {
        let state = AppState {
            operations: Arc::clone(&self.operations),
            tenants: Arc::clone(&self.tenants),
            shutdown: Arc::clone(&self.shutdown),
            config: Arc::new(self.config.clone()),
            start_time: Instant::now(),
        };

        let api = Router::new()
            .route(
                "/api/admin/users",
                get(list_users_handler).post(create_user_handler),
            )
            .route("/api/admin/users/{id}", delete(delete_user_handler))
            .route("/api/admin/users/{id}/suspend", post(suspend_user_handler))
            .route("/api/panel/cases", get(list_cases_handler))
            .route("/api/panel/cases/{id}", get(get_case_handler))
            .route(
                "/api/panel/cases/{id}/status",
                post(update_case_status_handler),
            )
            .route("/api/alert/submit", post(submit_alert_handler))
            .route(
                "/api/alert/status/{company_id}/{tracking_id}",
                get(alert_status_handler),
            )
            .route("/api/auth/activate", post(activate_handler))
            .route_layer(from_fn_with_state(
                Arc::clone(&self.shutdown),
                track_in_flight,
            ));

        Router::new()
            .route("/health", get(health_handler))
            .route("/health/live", get(liveness_handler))
            .route("/health/ready", get(readiness_handler))
            .merge(api)
            .layer(from_fn_with_state(Arc::clone(&self.dispatcher), dispatch))
            .layer(build_http_layers(&self.config))
            .with_state(state)
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the bound port, which differs from the configured one when
    /// port 0 is used.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound (e.g., port in use).
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = self.config.bind_address();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        let port = listener.local_addr()?.port();

        info!(host = %self.config.host, port, "TCP listener bound");

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves connections until `shutdown` resolves, then drains.
    ///
    /// After the signal:
    /// 1. Health state moves to `Draining`; new API requests get 503
    /// 2. Waits up to `drain_timeout` for in-flight requests
    /// 3. Health state moves to `Stopped`
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called, TLS material cannot be
    /// loaded, or the server hits a fatal I/O error.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let router = self.build_router();
        let listener = self
            .listener
            .take()
            .context("start() must be called before serve()")?;
        let shutdown_ctrl = Arc::clone(&self.shutdown);

        let signal_ctrl = Arc::clone(&shutdown_ctrl);
        let signal = async move {
            shutdown.await;
            signal_ctrl.trigger_shutdown();
        };

        shutdown_ctrl.set_ready();

        if let Some(ref tls_config) = self.config.tls {
            serve_tls(listener, router, tls_config, signal).await?;
        } else {
            serve_plain(listener, router, signal).await?;
        }

        if shutdown_ctrl.wait_for_drain(self.config.drain_timeout).await {
            info!("all requests drained");
        } else {
            warn!(
                in_flight = shutdown_ctrl.in_flight_count(),
                "drain timeout expired with requests in flight"
            );
        }
        Ok(())
    }
}

async fn serve_plain(
    listener: TcpListener,
    router: Router,
    signal: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    info!("serving plain HTTP");

    axum::serve(listener, router)
        .with_graceful_shutdown(signal)
        .await?;
    Ok(())
}

/// Serves TLS using `axum-server` with rustls, reusing the pre-bound
/// listener.
async fn serve_tls(
    listener: TcpListener,
    router: Router,
    tls_config: &TlsConfig,
    signal: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    use axum_server::tls_rustls::RustlsConfig;

    let rustls_config = RustlsConfig::from_pem_file(&tls_config.cert_path, &tls_config.key_path)
        .await
        .context("failed to load TLS certificates")?;

    let addr = listener.local_addr()?;
    let std_listener = listener.into_std()?;
    let handle = axum_server::Handle::new();
    let shutdown_handle = handle.clone();

    tokio::spawn(async move {
        signal.await;
        shutdown_handle.graceful_shutdown(None);
    });

    info!(%addr, "serving TLS");

    axum_server::from_tcp_rustls(std_listener, rustls_config)
        .handle(handle)
        .serve(router.into_make_service())
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::header::AUTHORIZATION;
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use vigil_core::{
        AdminClaims, AdminId, TenantClaims, TenantId, TenantRole, UserId, UserStatus,
    };

    use super::*;
    use crate::app::Vigil;
    use crate::auth::AuthConfig;
    use crate::service::ServerConfig;
    use crate::storage::unix_now;

    struct Fixture {
        vigil: Vigil,
        router: Router,
        shutdown: Arc<ShutdownController>,
    }

    /// Admin 7; tenants 42 and 43 (both active); responder 3 in tenant 42
    /// and responder 4 in tenant 43.
    fn fixture() -> Fixture {
        let auth = AuthConfig {
            admin_secret: "admin-secret".to_string(),
            tenant_secret: "tenant-secret".to_string(),
            ..AuthConfig::default()
        };
        let vigil = Vigil::in_memory(&auth, ServerConfig::default()).unwrap();
        let dir = &vigil.directory;
        dir.add_admin(AdminId::new(7).unwrap(), true);
        for (tenant, user) in [(42, 3), (43, 4)] {
            let tenant = TenantId::new(tenant).unwrap();
            dir.add_tenant(tenant, "tenant", true);
            dir.add_user(
                UserId::new(user).unwrap(),
                tenant,
                TenantRole::Responder,
                UserStatus::Active,
            );
        }
        let module = vigil.network(NetworkConfig::default());
        let shutdown = module.shutdown_controller();
        shutdown.set_ready();
        let router = module.build_router();
        Fixture {
            vigil,
            router,
            shutdown,
        }
    }

    impl Fixture {
        fn admin_token(&self) -> String {
            let claims = AdminClaims::new(AdminId::new(7).unwrap(), unix_now(), 600);
            self.vigil.dispatcher.admin().codec().encode(&claims).unwrap()
        }

        fn tenant_token(&self, user: i64, tenant: i64) -> String {
            let claims = TenantClaims::new(
                UserId::new(user).unwrap(),
                TenantId::new(tenant).unwrap(),
                TenantRole::Responder,
                unix_now(),
                600,
            );
            self.vigil.dispatcher.tenant().codec().encode(&claims).unwrap()
        }

        async fn send(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
            }
            let body = match body {
                Some(json) => {
                    builder = builder.header("content-type", "application/json");
                    Body::from(json.to_string())
                }
                None => Body::empty(),
            };
            let response = self
                .router
                .clone()
                .oneshot(builder.body(body).unwrap())
                .await
                .unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, value)
        }

        async fn submit(&self, company_id: i64, title: &str, token: Option<&str>) -> Value {
            let (status, body) = self
                .send(
                    Method::POST,
                    "/api/alert/submit",
                    token,
                    Some(json!({ "company_id": company_id, "title": title, "body": "details" })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "{body}");
            body
        }
    }

    #[tokio::test]
    async fn admin_token_opens_admin_surface_only() {
        let f = fixture();
        let admin = f.admin_token();

        let (status, users) = f
            .send(Method::GET, "/api/admin/users", Some(&admin), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(users.as_array().unwrap().len(), 2);

        let (status, body) = f
            .send(Method::GET, "/api/panel/cases", Some(&admin), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "error": "invalid_token" }));
    }

    #[tokio::test]
    async fn tenant_token_is_rejected_on_admin_surface() {
        let f = fixture();
        let tenant = f.tenant_token(3, 42);
        let (status, body) = f
            .send(Method::GET, "/api/admin/users", Some(&tenant), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "error": "invalid_token" }));
    }

    #[tokio::test]
    async fn panel_sees_only_the_token_tenant() {
        let f = fixture();
        let token = f.tenant_token(3, 42);

        // The staff token is ignored on the whistleblower channel.
        f.submit(42, "ours", Some(&token)).await;
        f.submit(43, "theirs", None).await;

        let (status, cases) = f
            .send(Method::GET, "/api/panel/cases", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let cases = cases.as_array().unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0]["title"], "ours");
        assert!(cases[0].get("tenant_id").is_none());

        // Case 2 belongs to tenant 43.
        let (status, _) = f
            .send(Method::GET, "/api/panel/cases/2", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, case) = f
            .send(
                Method::POST,
                "/api/panel/cases/1/status",
                Some(&token),
                Some(json!({ "status": "in_progress" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(case["status"], "in_progress");
    }

    #[tokio::test]
    async fn reporter_tracks_status_with_receipt() {
        let f = fixture();
        let receipt = f.submit(42, "report", None).await;
        let tracking_id = receipt["tracking_id"].as_str().unwrap();

        let (status, body) = f
            .send(
                Method::GET,
                &format!("/api/alert/status/42/{tracking_id}"),
                None,
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "new" }));

        let (status, _) = f
            .send(
                Method::GET,
                &format!("/api/alert/status/43/{tracking_id}"),
                None,
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn missing_credential_fails_before_the_guard() {
        let f = fixture();
        let (status, body) = f.send(Method::GET, "/api/panel/cases", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "error": "unauthenticated" }));

        // Unknown tenant-domain paths fail closed too.
        let (status, _) = f.send(Method::GET, "/api/elsewhere", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn token_for_another_tenant_is_unauthenticated() {
        let f = fixture();
        // User 3 belongs to tenant 42, not 43.
        let forged = f.tenant_token(3, 43);
        let (status, body) = f
            .send(Method::GET, "/api/panel/cases", Some(&forged), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "error": "unauthenticated" }));
    }

    #[tokio::test]
    async fn non_canonical_paths_are_rejected() {
        let f = fixture();
        let admin = f.admin_token();
        for path in ["/api/panel/../admin/users", "/api/admin/%2e%2e/panel/cases"] {
            let (status, body) = f.send(Method::GET, path, Some(&admin), None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{path}");
            assert_eq!(body, json!({ "error": "bad_request" }));
        }
    }

    #[tokio::test]
    async fn probes_answer_while_api_is_refused_during_drain() {
        let f = fixture();
        f.shutdown.trigger_shutdown();

        let (status, body) = f.send(Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "draining");

        let (status, _) = f.send(Method::GET, "/health/ready", None, None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, body) = f
            .send(Method::GET, "/api/admin/users", Some(&f.admin_token()), None)
            .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, json!({ "error": "unavailable" }));
    }

    #[tokio::test]
    async fn start_binds_to_os_assigned_port() {
        let f = fixture();
        let mut module = f.vigil.network(NetworkConfig {
            host: "127.0.0.1".to_string(),
            ..NetworkConfig::default()
        });
        let port = module.start().await.unwrap();
        assert!(port > 0);
    }

    #[tokio::test]
    async fn serve_without_start_is_an_error() {
        let f = fixture();
        let module = f.vigil.network(NetworkConfig::default());
        let err = module.serve(std::future::ready(())).await.unwrap_err();
        assert!(err.to_string().contains("start()"));
    }
}
