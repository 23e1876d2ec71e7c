//! Market data endpoints.

use axum::{extract::State, Json};
use zion_sdk::{Broadcaster, MakerWallet};

use super::types::{
    BalancesRequest, BalancesResponse, MarketPriceRequest, MarketPriceResponse, MarketsResponse,
};
use crate::{error::ApiError, state::AppState};

/// `GET /v1/markets`
pub async fn list_markets<W, B>(State(state): State<AppState<W, B>>) -> Json<MarketsResponse>
where
    W: MakerWallet + Send + Sync + 'static,
    B: Broadcaster + Send + Sync + 'static,
{
    let markets = state.service.markets().into_iter().map(Into::into).collect();
    Json(MarketsResponse { markets })
}

/// `POST /v1/balances`
pub async fn balances<W, B>(
    State(state): State<AppState<W, B>>,
    Json(req): Json<BalancesRequest>,
) -> Result<Json<BalancesResponse>, ApiError>
where
    W: MakerWallet + Send + Sync + 'static,
    B: Broadcaster + Send + Sync + 'static,
{
    let market = req.market.to_market()?;
    let reply = state.service.balances(market).await?;
    Ok(Json(reply.into()))
}

/// `POST /v1/market/price`
pub async fn market_price<W, B>(
    State(state): State<AppState<W, B>>,
    Json(req): Json<MarketPriceRequest>,
) -> Result<Json<MarketPriceResponse>, ApiError>
where
    W: MakerWallet + Send + Sync + 'static,
    B: Broadcaster + Send + Sync + 'static,
{
    let market = req.market.to_market()?;
    let asset = zion_sdk::parse_asset(&req.asset).map_err(ApiError::invalid_request)?;
    let reply = state
        .service
        .market_price(market, req.trade_type, req.amount, asset)
        .await?;
    Ok(Json(reply.into()))
}
