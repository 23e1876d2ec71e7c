//! Swap negotiation endpoints. Engine failures are protocol replies here,
//! not HTTP errors; only undecodable requests are.

use axum::{extract::State, Json};
use zion_sdk::{Broadcaster, CompleteRequest, MakerWallet, SwapAcceptOrFail};

use super::types::{
    CompleteTradeRequest, CompleteTradeResponse, ProposeTradeRequest, ProposeTradeResponse,
};
use crate::{error::ApiError, state::AppState};

/// `POST /v1/trade/propose`
pub async fn propose_trade<W, B>(
    State(state): State<AppState<W, B>>,
    Json(req): Json<ProposeTradeRequest>,
) -> Result<Json<ProposeTradeResponse>, ApiError>
where
    W: MakerWallet + Send + Sync + 'static,
    B: Broadcaster + Send + Sync + 'static,
{
    let market = req.market.to_market()?;
    let request = req.swap_request.to_request()?;
    tracing::debug!(request_id = %request.id, trade_type = %req.trade_type, "swap proposal");

    let reply = match state
        .service
        .propose_trade(market, req.trade_type, request)
        .await
    {
        SwapAcceptOrFail::Accept(accept) => ProposeTradeResponse::SwapAccept(accept.into()),
        SwapAcceptOrFail::Fail(fail) => ProposeTradeResponse::SwapFail(fail.into()),
    };
    Ok(Json(reply))
}

/// `POST /v1/trade/complete`
pub async fn complete_trade<W, B>(
    State(state): State<AppState<W, B>>,
    Json(req): Json<CompleteTradeRequest>,
) -> Json<CompleteTradeResponse>
where
    W: MakerWallet + Send + Sync + 'static,
    B: Broadcaster + Send + Sync + 'static,
{
    let request = match req {
        CompleteTradeRequest::SwapComplete { transaction } => {
            CompleteRequest::Signed { transaction }
        }
        CompleteTradeRequest::SwapFail { id, reason } => CompleteRequest::Fail {
            swap_id: id,
            reason,
        },
    };
    Json(state.service.complete_trade(request).await.into())
}
