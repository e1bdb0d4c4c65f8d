use std::sync::Arc;

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::api::handlers;
use crate::AppState;

/// Builds the crate's unauthenticated demo surface over the core. Real
/// deployments sit an auth layer (JWT, session) in front of this router —
/// out of scope per `spec.md` §1 — the core itself never checks identity
/// beyond "does this order belong to this user".
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        // Onboarding / fixtures
        .route("/users", post(handlers::admin::create_user))
        .route("/users/:user_id/wallet", get(handlers::admin::get_wallet))
        .route("/users/:user_id/wallet/adjust", post(handlers::admin::adjust_balance))
        .route("/matches", post(handlers::admin::create_match))
        .route("/matches/:match_id/transition", post(handlers::admin::transition_match))
        .route("/markets", post(handlers::admin::create_market))
        // Market/order core
        .route("/markets/:market_id", get(handlers::market::get_market))
        .route("/markets/:market_id/transition", post(handlers::market::transition_market))
        .route("/markets/:market_id/settle", post(handlers::market::settle_market))
        .route("/markets/:market_id/orderbook", get(handlers::market::get_order_book))
        .route(
            "/markets/:market_id/reference-odds",
            put(handlers::market::upsert_reference_odds).get(handlers::market::get_reference_odds),
        )
        .route("/orders", post(handlers::order::place_order))
        .route(
            "/orders/:order_id",
            get(handlers::order::get_order).delete(handlers::order::cancel_order),
        )
}
