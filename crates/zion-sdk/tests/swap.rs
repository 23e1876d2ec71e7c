//! End-to-end swap negotiation and settlement against in-memory
//! collaborators: admission, assembly, blinding, signing and broadcast.

use std::sync::Arc;

use lwk_wollet::elements::encode::serialize_hex;
use zion_sdk::testing::{Counterparty, MockBroadcaster, MockWallet, asset};
use zion_sdk::{
    EngineConfig, Error, Market, Price, SwapEngine, SwapTerms, TradeType, TxSide, encode_pset,
};

type Engine = SwapEngine<Arc<MockWallet>, Arc<MockBroadcaster>>;

// ── Helpers ─────────────────────────────────────────────────────────────

const BASE: u8 = 0xaa;
const QUOTE: u8 = 0xbb;
const LBTC: u8 = 0xcc;

fn market() -> Market {
    Market::new(asset(BASE), asset(QUOTE)).unwrap()
}

fn engine_with(wallet: &Arc<MockWallet>, broadcaster: &Arc<MockBroadcaster>) -> Engine {
    let config = EngineConfig::new(market(), Price::new(100.0, 0.01).unwrap(), asset(LBTC));
    SwapEngine::new(config, Arc::clone(wallet), Arc::clone(broadcaster))
}

fn funded_wallet() -> Arc<MockWallet> {
    let wallet = Arc::new(MockWallet::new());
    wallet.fund(asset(BASE), 5);
    wallet.fund(asset(QUOTE), 300);
    wallet.fund(asset(LBTC), 10_000);
    wallet
}

fn buy(input_amount: u64, output_amount: u64) -> SwapTerms {
    SwapTerms {
        input_asset: asset(QUOTE),
        input_amount,
        output_asset: asset(BASE),
        output_amount,
    }
}

fn sell(input_amount: u64, output_amount: u64) -> SwapTerms {
    SwapTerms {
        input_asset: asset(BASE),
        input_amount,
        output_asset: asset(QUOTE),
        output_amount,
    }
}

// ── Proposal ────────────────────────────────────────────────────────────

#[test]
fn buy_at_quoted_price_is_accepted_and_blinded() {
    let wallet = funded_wallet();
    let broadcaster = Arc::new(MockBroadcaster::new());
    let engine = engine_with(&wallet, &broadcaster);
    let cp = Counterparty::new(1);

    let before = chrono::Utc::now().timestamp();
    let accept = engine
        .propose(&market(), TradeType::Buy, cp.request("req-1", buy(100, 1)))
        .unwrap();

    assert_eq!(accept.request_id, "req-1");
    assert_eq!(wallet.sign_calls(), 1);
    assert!(accept.expiry >= before + 120);

    // cp receive, maker payout, base change, fee change, fee
    let tx = accept.pset.extract_tx().unwrap();
    assert_eq!(tx.output.len(), 5);
    for out in &tx.output[..4] {
        assert!(out.value.is_confidential());
        assert!(out.asset.is_confidential());
    }
    let fee = &tx.output[4];
    assert!(fee.script_pubkey.is_empty());
    assert!(fee.value.is_explicit());
    assert_eq!(fee.asset.explicit(), Some(asset(LBTC)));

    // counterparty input + base + native
    assert_eq!(tx.input.len(), 3);
}

#[test]
fn sell_at_quoted_price_is_accepted() {
    let wallet = funded_wallet();
    let engine = engine_with(&wallet, &Arc::new(MockBroadcaster::new()));
    let cp = Counterparty::new(2);

    let accept = engine
        .propose(&market(), TradeType::Sell, cp.request("req-s", sell(1, 100)))
        .unwrap();
    let outputs = accept.pset.outputs();
    assert_eq!(outputs.len(), 5);
    assert_eq!(wallet.sign_calls(), 1);
}

#[test]
fn merged_key_maps_hold_both_sides() {
    let wallet = funded_wallet();
    let engine = engine_with(&wallet, &Arc::new(MockBroadcaster::new()));
    let cp = Counterparty::new(3);
    let request = cp.request("req-k", buy(100, 1));
    let sent_inputs = request.input_blinding_keys.clone();
    let sent_outputs = request.output_blinding_keys.clone();

    let accept = engine.propose(&market(), TradeType::Buy, request).unwrap();

    // counterparty script + the two maker inputs
    assert_eq!(accept.input_blinding_keys.len(), 3);
    // counterparty, maker receive, maker change
    assert_eq!(accept.output_blinding_keys.len(), 3);
    assert_eq!(
        accept.output_blinding_keys.get(&cp.script_pubkey()),
        Some(&cp.blinding_key)
    );
    assert_eq!(sent_inputs.len(), 1);
    assert_eq!(sent_outputs.len(), 1);
}

// ── Admission ───────────────────────────────────────────────────────────

#[test]
fn insufficient_balance_is_rejected_before_any_address() {
    let wallet = funded_wallet();
    let engine = engine_with(&wallet, &Arc::new(MockBroadcaster::new()));
    let cp = Counterparty::new(4);

    let err = engine
        .propose(&market(), TradeType::Buy, cp.request("req", buy(600, 6)))
        .unwrap_err();
    assert!(matches!(err, Error::InsufficientFunds(_)));
    assert_eq!(wallet.address_calls(), 0);
    assert_eq!(wallet.sign_calls(), 0);
}

#[test]
fn balance_equal_to_output_is_admitted() {
    let wallet = funded_wallet();
    let engine = engine_with(&wallet, &Arc::new(MockBroadcaster::new()));
    let cp = Counterparty::new(5);

    assert!(
        engine
            .propose(&market(), TradeType::Buy, cp.request("req", buy(500, 5)))
            .is_ok()
    );
}

#[test]
fn one_proposal_refreshes_the_wallet_once() {
    let wallet = funded_wallet();
    let engine = engine_with(&wallet, &Arc::new(MockBroadcaster::new()));
    let cp = Counterparty::new(7);

    engine
        .propose(&market(), TradeType::Buy, cp.request("req", buy(100, 1)))
        .unwrap();
    assert_eq!(wallet.refresh_calls(), 1);

    engine.balance().unwrap();
    assert_eq!(wallet.refresh_calls(), 2);
}

#[test]
fn rejections_touch_no_wallet_state() {
    let wallet = funded_wallet();
    let engine = engine_with(&wallet, &Arc::new(MockBroadcaster::new()));
    let cp = Counterparty::new(6);

    let other = Market::new(asset(BASE), asset(0x01)).unwrap();
    let cases = [
        (other, TradeType::Buy, buy(100, 1)),
        (market(), TradeType::Sell, buy(100, 1)),
        (market(), TradeType::Buy, buy(101, 1)),
    ];
    for (m, trade_type, terms) in cases {
        let err = engine
            .propose(&m, trade_type, cp.request("req", terms))
            .unwrap_err();
        assert!(err.is_rejection(), "{err}");
    }
    assert_eq!(wallet.refresh_calls(), 0);
    assert_eq!(wallet.address_calls(), 0);
}

#[test]
fn missing_native_funds_fail_assembly() {
    let wallet = Arc::new(MockWallet::new());
    wallet.fund(asset(BASE), 5);
    let engine = engine_with(&wallet, &Arc::new(MockBroadcaster::new()));
    let cp = Counterparty::new(7);

    let err = engine
        .propose(&market(), TradeType::Buy, cp.request("req", buy(100, 1)))
        .unwrap_err();
    assert!(matches!(err, Error::InsufficientFunds(_)));
    assert_eq!(wallet.sign_calls(), 0);
}

// ── Blinding keys ───────────────────────────────────────────────────────

#[test]
fn missing_output_key_names_the_output_and_skips_signing() {
    let wallet = funded_wallet();
    let engine = engine_with(&wallet, &Arc::new(MockBroadcaster::new()));
    let cp = Counterparty::new(8);
    let mut request = cp.request("req", buy(100, 1));
    request.output_blinding_keys = Default::default();

    let err = engine
        .propose(&market(), TradeType::Buy, request)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::MissingBlindingKey {
            side: TxSide::Output,
            index: 0
        }
    ));
    assert_eq!(
        err.to_string(),
        "blinding key for output at index 0 is missing in the swap request"
    );
    assert_eq!(wallet.sign_calls(), 0);

    // The failed proposal released its inputs.
    assert!(
        engine
            .propose(&market(), TradeType::Buy, cp.request("again", buy(100, 1)))
            .is_ok()
    );
}

#[test]
fn missing_input_key_names_the_input() {
    let wallet = funded_wallet();
    let engine = engine_with(&wallet, &Arc::new(MockBroadcaster::new()));
    let cp = Counterparty::new(9);
    let mut request = cp.request("req", buy(100, 1));
    request.input_blinding_keys = Default::default();

    let err = engine
        .propose(&market(), TradeType::Buy, request)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::MissingBlindingKey {
            side: TxSide::Input,
            index: 0
        }
    ));
    assert_eq!(wallet.sign_calls(), 0);
}

// ── Reservations ────────────────────────────────────────────────────────

#[test]
fn pending_swap_holds_its_inputs() {
    let wallet = funded_wallet();
    let engine = engine_with(&wallet, &Arc::new(MockBroadcaster::new()));
    let cp = Counterparty::new(10);

    let first = engine
        .propose(&market(), TradeType::Buy, cp.request("one", buy(100, 1)))
        .unwrap();
    let err = engine
        .propose(&market(), TradeType::Buy, cp.request("two", buy(100, 1)))
        .unwrap_err();
    assert!(matches!(err, Error::InsufficientFunds(_)));

    assert_eq!(engine.abandon(&first.swap_id.to_string()).unwrap(), 2);
    assert!(
        engine
            .propose(&market(), TradeType::Buy, cp.request("three", buy(100, 1)))
            .is_ok()
    );
}

#[test]
fn abandoning_unknown_swap_fails() {
    let wallet = funded_wallet();
    let engine = engine_with(&wallet, &Arc::new(MockBroadcaster::new()));
    assert!(matches!(
        engine.abandon("00000000000000ff"),
        Err(Error::UnknownSwap(_))
    ));
    assert!(matches!(
        engine.abandon("not-hex"),
        Err(Error::UnknownSwap(_))
    ));
}

// ── Settlement ──────────────────────────────────────────────────────────

#[test]
fn complete_accepts_raw_transaction_hex() {
    let wallet = funded_wallet();
    let broadcaster = Arc::new(MockBroadcaster::new());
    let engine = engine_with(&wallet, &broadcaster);
    let cp = Counterparty::new(11);

    let accept = engine
        .propose(&market(), TradeType::Buy, cp.request("req", buy(100, 1)))
        .unwrap();
    let tx = accept.pset.extract_tx().unwrap();

    let txid = engine.complete(&serialize_hex(&tx)).unwrap();
    assert_eq!(txid, tx.txid());
    assert_eq!(broadcaster.sent(), vec![tx]);
}

#[test]
fn complete_accepts_signed_pset() {
    let wallet = funded_wallet();
    let broadcaster = Arc::new(MockBroadcaster::new());
    let engine = engine_with(&wallet, &broadcaster);
    let cp = Counterparty::new(12);

    let accept = engine
        .propose(&market(), TradeType::Buy, cp.request("req", buy(100, 1)))
        .unwrap();
    let expected = accept.pset.extract_tx().unwrap().txid();

    let txid = engine.complete(&encode_pset(&accept.pset)).unwrap();
    assert_eq!(txid, expected);
    assert_eq!(broadcaster.sent().len(), 1);
}

#[test]
fn complete_rejects_garbage() {
    let wallet = funded_wallet();
    let broadcaster = Arc::new(MockBroadcaster::new());
    let engine = engine_with(&wallet, &broadcaster);

    for text in ["", "hello", "deadbeef"] {
        assert!(matches!(
            engine.complete(text),
            Err(Error::MalformedTransaction(_))
        ));
    }
    assert!(broadcaster.sent().is_empty());
}

#[test]
fn broadcast_rejection_keeps_its_message() {
    let wallet = funded_wallet();
    let broadcaster = Arc::new(MockBroadcaster::rejecting("bad-txns-inputs-missingorspent"));
    let engine = engine_with(&wallet, &broadcaster);
    let cp = Counterparty::new(13);

    let accept = engine
        .propose(&market(), TradeType::Buy, cp.request("req", buy(100, 1)))
        .unwrap();
    let err = engine.complete(&encode_pset(&accept.pset)).unwrap_err();
    match err {
        Error::BroadcastFailed(msg) => assert_eq!(msg, "bad-txns-inputs-missingorspent"),
        other => panic!("unexpected error: {other}"),
    }
}
