//! `TradeService`: the async trade protocol surface over [`SwapEngine`].
//!
//! Engine calls block on wallet and Electrum I/O, so every call runs on the
//! blocking pool through `tokio::task::spawn_blocking`.

use std::sync::Arc;

use lwk_wollet::elements::{AssetId, Txid};

use crate::chain::Broadcaster;
use crate::engine::{SwapAccept, SwapEngine, SwapRequest};
use crate::error::{Error, ErrorKind, Result};
use crate::market::{
    BalanceWithFee, DEFAULT_FEE, Market, MarketWithFee, PriceWithFee, TradeType,
};
use crate::validate::require_valid_market;
use crate::wallet::MakerWallet;

/// Why the maker refused a proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapFail {
    pub request_id: String,
    pub kind: ErrorKind,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub enum SwapAcceptOrFail {
    Accept(SwapAccept),
    Fail(SwapFail),
}

/// Second leg of the protocol: the signed swap, or the counterparty's notice
/// that it gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompleteRequest {
    Signed { transaction: String },
    Fail { swap_id: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxHashOrError {
    Broadcast { txid: Txid },
    Failed { kind: ErrorKind, reason: String },
}

impl TxHashOrError {
    fn failed(err: &Error) -> Self {
        TxHashOrError::Failed {
            kind: err.kind(),
            reason: err.to_string(),
        }
    }
}

pub struct TradeService<W, B> {
    engine: Arc<SwapEngine<W, B>>,
}

impl<W, B> Clone for TradeService<W, B> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
        }
    }
}

impl<W, B> TradeService<W, B>
where
    W: MakerWallet + Send + Sync + 'static,
    B: Broadcaster + Send + Sync + 'static,
{
    pub fn new(engine: SwapEngine<W, B>) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    /// Run a closure against the engine on a blocking thread.
    async fn with_engine<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&SwapEngine<W, B>) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || f(&engine))
            .await
            .map_err(|e| Error::Task(e.to_string()))?
    }

    // ── Market data ─────────────────────────────────────────────────────

    pub fn markets(&self) -> Vec<MarketWithFee> {
        vec![MarketWithFee {
            market: *self.engine.market(),
            fee: DEFAULT_FEE,
        }]
    }

    pub async fn balances(&self, market: Market) -> Result<BalanceWithFee> {
        self.with_engine(move |engine| {
            require_valid_market(engine.market(), &market)?;
            Ok(BalanceWithFee {
                balance: engine.balance()?,
                fee: DEFAULT_FEE,
            })
        })
        .await
    }

    pub async fn market_price(
        &self,
        market: Market,
        trade_type: TradeType,
        amount: u64,
        asset: AssetId,
    ) -> Result<PriceWithFee> {
        self.with_engine(move |engine| engine.quote(&market, trade_type, amount, &asset))
            .await
    }

    // ── Trade ───────────────────────────────────────────────────────────

    /// Every failure, including internal ones, is reported as a `Fail`.
    pub async fn propose_trade(
        &self,
        market: Market,
        trade_type: TradeType,
        request: SwapRequest,
    ) -> SwapAcceptOrFail {
        let request_id = request.id.clone();
        match self
            .with_engine(move |engine| engine.propose(&market, trade_type, request))
            .await
        {
            Ok(accept) => SwapAcceptOrFail::Accept(accept),
            Err(e) => {
                if e.is_rejection() {
                    log::info!("rejected swap request {request_id}: {e}");
                } else {
                    log::warn!("swap request {request_id} failed: {e}");
                }
                SwapAcceptOrFail::Fail(SwapFail {
                    request_id,
                    kind: e.kind(),
                    reason: e.to_string(),
                })
            }
        }
    }

    pub async fn complete_trade(&self, request: CompleteRequest) -> TxHashOrError {
        match request {
            CompleteRequest::Signed { transaction } => {
                match self
                    .with_engine(move |engine| engine.complete(&transaction))
                    .await
                {
                    Ok(txid) => TxHashOrError::Broadcast { txid },
                    Err(e) => {
                        log::warn!("completing swap failed: {e}");
                        TxHashOrError::failed(&e)
                    }
                }
            }
            CompleteRequest::Fail { swap_id, reason } => {
                log::info!("counterparty abandoned swap {swap_id}: {reason}");
                let id = swap_id.clone();
                if let Err(e) = self.with_engine(move |engine| engine.abandon(&id)).await {
                    log::warn!("could not release swap {swap_id}: {e}");
                }
                TxHashOrError::Failed {
                    kind: ErrorKind::Aborted,
                    reason,
                }
            }
        }
    }
}
