use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use zion_sdk::{Broadcaster, MakerWallet};

use crate::state::AppState;

pub mod markets;
pub mod trade;
pub mod types;

pub fn router<W, B>(state: AppState<W, B>) -> Router
where
    W: MakerWallet + Send + Sync + 'static,
    B: Broadcaster + Send + Sync + 'static,
{
    let v1_routes = Router::new()
        .route("/markets", get(markets::list_markets::<W, B>))
        .route("/balances", post(markets::balances::<W, B>))
        .route("/market/price", post(markets::market_price::<W, B>))
        .route("/trade/propose", post(trade::propose_trade::<W, B>))
        .route("/trade/complete", post(trade::complete_trade::<W, B>))
        .with_state(state);

    Router::new()
        .nest("/v1", v1_routes)
        .layer(TraceLayer::new_for_http())
}
