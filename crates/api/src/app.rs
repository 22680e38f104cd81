use axum::{
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use shared::jwt::{JwtConfig, JwtError};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, require_admin, require_auth, route_guard,
    security_headers_middleware, throttle_middleware, trace_id, RateLimiterState,
};
use crate::routes::{
    admin_accounts, admin_catalog, admin_stats, admin_suppliers, admin_users, auth, catalog,
    chat, frontend, health, lookups, orders, profiles, proposals, quotes, two_factor, webhooks,
};
use crate::services::{
    AuthService, EmailService, FixedWindowLimiter, LookupService, SessionCookies,
    TwoFactorService,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub jwt: Arc<JwtConfig>,
    /// Fixed-window limiter for login, lookups and password resets.
    pub limiter: Arc<FixedWindowLimiter>,
    /// Per-account throttle; `None` when `security.rate_limit_per_minute` is 0.
    pub throttle: Option<Arc<RateLimiterState>>,
    pub auth: AuthService,
    pub two_factor: TwoFactorService,
    pub email: EmailService,
    pub lookups: LookupService,
    pub cookies: SessionCookies,
}

impl AppState {
    pub fn new(
        config: Config,
        pool: PgPool,
        limiter: Arc<FixedWindowLimiter>,
    ) -> Result<Self, JwtError> {
        let config = Arc::new(config);
        let jwt = Arc::new(JwtConfig::new(
            &config.auth.jwt_secret,
            config.auth.access_token_expiry_secs,
            config.auth.leeway_secs,
        )?);

        let throttle = (config.security.rate_limit_per_minute > 0).then(|| {
            Arc::new(RateLimiterState::new(
                config.security.rate_limit_per_minute,
            ))
        });

        let http = reqwest::Client::builder()
            .user_agent(concat!("comprar-construir/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        let two_factor = TwoFactorService::new(config.two_factor.issuer.clone());

        Ok(Self {
            auth: AuthService::new(pool.clone(), jwt.clone(), two_factor.clone()),
            email: EmailService::new(config.email.clone(), http.clone()),
            lookups: LookupService::new(&config.lookups, http),
            cookies: SessionCookies::new(&config.auth),
            two_factor,
            throttle,
            limiter,
            jwt,
            pool,
            config,
        })
    }
}

/// Builds the application with the in-memory rate limit backend.
pub fn create_app(config: Config, pool: PgPool) -> Result<Router, JwtError> {
    let state = AppState::new(config, pool, Arc::new(FixedWindowLimiter::memory()))?;
    Ok(router(state))
}

pub fn router(state: AppState) -> Router {
    let config = state.config.clone();

    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Authenticated marketplace routes; role checks happen per handler.
    // Outermost route_layer runs first: auth, then the per-account throttle.
    let protected_routes = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/change-password", post(auth::change_password))
        .route("/api/auth/2fa/setup", post(two_factor::setup))
        .route("/api/auth/2fa/enable", post(two_factor::enable))
        .route("/api/auth/2fa/disable", post(two_factor::disable))
        .route("/api/grupos", get(catalog::list_grupos))
        .route("/api/materiais", get(catalog::list_materiais))
        .route(
            "/api/fornecedor/perfil",
            get(profiles::get_supplier_profile).put(profiles::update_supplier_profile),
        )
        .route(
            "/api/cliente/perfil",
            get(profiles::get_client_profile).put(profiles::update_client_profile),
        )
        .route(
            "/api/cotacoes",
            get(quotes::list_quotes).post(quotes::create_quote),
        )
        .route("/api/cotacoes/:id", get(quotes::get_quote))
        .route("/api/cotacoes/:id/cancelar", post(quotes::cancel_quote))
        .route(
            "/api/cotacoes/:id/propostas",
            get(proposals::list_proposals).post(proposals::create_proposal),
        )
        .route("/api/propostas/:id/aceitar", post(proposals::accept_proposal))
        .route("/api/pedidos", get(orders::list_orders))
        .route("/api/pedidos/:id", get(orders::get_order))
        .route("/api/pedidos/:id/status", patch(orders::update_order_status))
        .route(
            "/api/chat/rooms",
            get(chat::list_rooms).post(chat::create_room),
        )
        .route(
            "/api/chat/rooms/:id/messages",
            get(chat::list_messages).post(chat::post_message),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            throttle_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let admin_routes = Router::new()
        .route("/api/admin/users", get(admin_users::list_users))
        .route("/api/admin/users/:id", get(admin_users::get_user))
        .route("/api/admin/accounts", post(admin_accounts::create_account))
        .route(
            "/api/admin/accounts/:id",
            put(admin_accounts::update_account).delete(admin_accounts::delete_account),
        )
        .route(
            "/api/admin/accounts/:id/reset-password",
            post(admin_accounts::reset_password),
        )
        .route(
            "/api/admin/fornecedores",
            get(admin_suppliers::list_suppliers).post(admin_suppliers::create_supplier),
        )
        .route(
            "/api/admin/fornecedores/:id",
            get(admin_suppliers::get_supplier)
                .put(admin_suppliers::update_supplier)
                .delete(admin_suppliers::delete_supplier),
        )
        .route(
            "/api/admin/grupos",
            get(admin_catalog::list_grupos).post(admin_catalog::create_grupo),
        )
        .route(
            "/api/admin/grupos/:id",
            put(admin_catalog::update_grupo).delete(admin_catalog::delete_grupo),
        )
        .route(
            "/api/admin/materiais",
            get(admin_catalog::list_materiais).post(admin_catalog::create_material),
        )
        .route(
            "/api/admin/materiais/:id",
            put(admin_catalog::update_material).delete(admin_catalog::delete_material),
        )
        .route("/api/admin/stats", get(admin_stats::get_stats))
        .route("/api/admin/audit-logs", get(admin_stats::list_audit_logs))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            throttle_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    // Public: login/logout, lookups (fixed-window limited), webhooks, health checks.
    let public_routes = Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/lookup/cep/:cep", get(lookups::cep))
        .route("/api/lookup/cnpj/:cnpj", get(lookups::cnpj))
        .route("/api/webhooks/mercadopago", post(webhooks::mercadopago))
        .route("/api/webhooks/sendgrid", post(webhooks::sendgrid))
        .route("/api/webhooks/generic", post(webhooks::generic))
        .route(
            "/api/webhooks/whatsapp",
            get(webhooks::whatsapp_verify).post(webhooks::whatsapp_event),
        )
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    let mut app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes);

    if config.frontend.enabled {
        app = app.fallback(frontend::serve_frontend);
    }

    // Global middleware (bottom layers run first)
    app.layer(middleware::from_fn_with_state(state.clone(), route_guard))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security_headers_middleware,
        ))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
