pub use lwk_wollet::elements;

pub mod assembly;
pub mod blinding;
pub mod chain;
pub mod coin_select;
pub mod engine;
pub mod error;
pub mod fee;
pub mod market;
pub mod network;
pub mod price;
pub mod pset;
pub mod reservation;
pub mod service;
pub mod settlement;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod validate;
pub mod wallet;

// Core types
pub use error::{Error, ErrorKind, Result, TxSide};
pub use market::{
    Balance, BalanceWithFee, DEFAULT_FEE, Fee, Market, MarketWithFee, Price, PriceWithFee,
    SwapTerms, TradeType, parse_asset,
};
pub use network::Network;

// Engine and service
pub use engine::{DEFAULT_TRADE_EXPIRY, EngineConfig, SwapAccept, SwapEngine, SwapRequest};
pub use service::{CompleteRequest, SwapAcceptOrFail, SwapFail, TradeService, TxHashOrError};

// Transaction building blocks
pub use assembly::{AssembledSwap, AssemblyParams, complete_swap_pset};
pub use blinding::{BlindingKeys, BlindingPlan, blind_swap_pset, plan_blinding};
pub use coin_select::{ChangeOutput, Commitment, Selection, Target, UtxoPool};
pub use fee::{DEFAULT_FEE_RATE, estimate_fee, estimate_vsize};
pub use pset::{UnblindedUtxo, decode_pset, decode_tx_hex, encode_pset};
pub use reservation::{ReservationToken, Reservations};
pub use settlement::{complete_settlement, finalize_settlement};

// Collaborators
pub use chain::{Broadcaster, ElectrumBackend};
pub use wallet::{
    AddressProvider, BalanceOracle, LedgerSigner, LwkWallet, MakerAddress, MakerWallet,
    UtxoSource,
};

// Re-export LWK for app-layer use
pub use lwk_wollet;
