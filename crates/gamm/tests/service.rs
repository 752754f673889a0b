// gamm/tests/service.rs

use amm_core::{Amount, Coin, Dec, PoolId};
use gamm::pool::{init_pool_shares, share_denom};
use gamm::{
    Bank, GammError, GammParams, GammService, MemoryBank, MemoryPoolStore, PoolStore, SwapAmountInRoute,
    SwapAmountOutRoute, FEE_COLLECTOR, MODULE_ACCOUNT,
};
use std::collections::BTreeMap;

type Service = GammService<MemoryPoolStore, MemoryBank>;

const ALICE: &str = "alice";
const BOB: &str = "bob";

fn coin(amount: u64, denom: &str) -> Coin {
    Coin::new(denom, Amount::from_u64(amount))
}

fn d(s: &str) -> Dec {
    s.parse().unwrap()
}

fn service() -> Service {
    let mut bank = MemoryBank::new();
    for denom in ["tokena", "tokenb", "tokenc", "uosmo"] {
        bank.mint(ALICE, &coin(100_000_000, denom)).unwrap();
    }
    let params = GammParams {
        pool_creation_fee: vec![coin(1_000, "uosmo")],
    };
    GammService::new(MemoryPoolStore::new(), bank, params)
}

fn create_ab(service: &mut Service, swap_fee: &str, exit_fee: &str) -> PoolId {
    service
        .create_pool(
            ALICE,
            vec![(coin(1_000_000, "tokena"), d("1")), (coin(2_000_000, "tokenb"), d("1"))],
            d(swap_fee),
            d(exit_fee),
        )
        .unwrap()
}

/// The module account must hold exactly the sum of all pool reserves
fn assert_module_backs_reserves(service: &Service) {
    let mut reserves: BTreeMap<String, Amount> = BTreeMap::new();
    for pool in service.store().list().unwrap() {
        for asset in pool.assets() {
            let entry = reserves.entry(asset.denom.clone()).or_default();
            *entry = &*entry + &asset.balance;
        }
        assert_eq!(&service.bank().supply(&pool.share_denom()), pool.total_shares());
    }
    for (denom, total) in reserves {
        assert_eq!(service.bank().balance(MODULE_ACCOUNT, &denom), total, "{}", denom);
    }
}

#[test]
fn test_create_pool_moves_funds_and_mints_shares() {
    let mut service = service();
    let pool_id = create_ab(&mut service, "0.003", "0");

    assert_eq!(pool_id, 1);
    assert_eq!(service.bank().balance(ALICE, &share_denom(1)), init_pool_shares());
    assert_eq!(service.bank().balance(FEE_COLLECTOR, "uosmo"), Amount::from_u64(1_000));
    assert_eq!(service.bank().balance(ALICE, "tokena"), Amount::from_u64(99_000_000));
    assert_module_backs_reserves(&service);
}

#[test]
fn test_create_pool_without_funds_changes_nothing() {
    let mut service = service();
    let err = service
        .create_pool(
            BOB,
            vec![(coin(10, "tokena"), d("1")), (coin(10, "tokenb"), d("1"))],
            Dec::zero(),
            Dec::zero(),
        )
        .unwrap_err();

    assert!(matches!(err, GammError::InsufficientFunds { .. }));
    assert!(service.store().list().unwrap().is_empty());
    assert_eq!(service.store().next_pool_id().unwrap(), 1);
}

#[test]
fn test_create_pool_rejects_bad_params() {
    let mut service = service();
    let assets = vec![(coin(10, "tokena"), d("1")), (coin(10, "tokenb"), d("1"))];
    assert!(matches!(
        service.create_pool(ALICE, assets.clone(), d("1"), Dec::zero()),
        Err(GammError::InvalidParameter(_))
    ));
    assert!(matches!(
        service.create_pool(ALICE, vec![(coin(10, "tokena"), d("1"))], Dec::zero(), Dec::zero()),
        Err(GammError::InvalidParameter(_))
    ));
}

#[test]
fn test_join_and_exit_keep_share_supply_consistent() {
    let mut service = service();
    let pool_id = create_ab(&mut service, "0", "0.01");

    let joined = service
        .join_pool(ALICE, pool_id, &[coin(100_000, "tokena"), coin(500_000, "tokenb")], &Amount::zero())
        .unwrap();
    assert_eq!(joined.shares_out, Amount::from_tokens(10));
    assert_eq!(joined.tokens_in, vec![coin(100_000, "tokena"), coin(200_000, "tokenb")]);
    assert_module_backs_reserves(&service);

    let exited = service
        .exit_pool(ALICE, pool_id, &Amount::from_tokens(10), &[])
        .unwrap();
    assert!(!exited.exit_fee_shares.is_zero());
    assert_eq!(
        service.bank().balance(FEE_COLLECTOR, &share_denom(pool_id)),
        exited.exit_fee_shares
    );
    assert_module_backs_reserves(&service);
}

#[test]
fn test_exit_requires_shares() {
    let mut service = service();
    let pool_id = create_ab(&mut service, "0", "0");
    let before = service.store().list().unwrap();

    let err = service
        .exit_pool(BOB, pool_id, &Amount::from_tokens(1), &[])
        .unwrap_err();
    assert!(matches!(err, GammError::InsufficientFunds { .. }));
    assert_eq!(service.store().list().unwrap(), before);
}

#[test]
fn test_single_asset_join_and_exit() {
    let mut service = service();
    let pool_id = create_ab(&mut service, "0.01", "0");

    let joined = service
        .join_swap_extern_amount_in(ALICE, pool_id, &coin(50_000, "tokena"), &Amount::zero())
        .unwrap();
    assert_module_backs_reserves(&service);

    let exited = service
        .exit_swap_share_amount_in(ALICE, pool_id, "tokena", &joined.shares_out, &Amount::zero())
        .unwrap();
    // swap fees on the way in and out
    assert!(exited.tokens_out[0].amount < Amount::from_u64(50_000));
    assert_module_backs_reserves(&service);
}

#[test]
fn test_swaps_move_coins_through_module() {
    let mut service = service();
    let ab = create_ab(&mut service, "0.003", "0");
    let bc = service
        .create_pool(
            ALICE,
            vec![(coin(2_000_000, "tokenb"), d("1")), (coin(3_000_000, "tokenc"), d("3"))],
            d("0.002"),
            Dec::zero(),
        )
        .unwrap();

    let routes = vec![
        SwapAmountInRoute { pool_id: ab, token_out_denom: "tokenb".into() },
        SwapAmountInRoute { pool_id: bc, token_out_denom: "tokenc".into() },
    ];
    let estimate = service
        .querier()
        .estimate_swap_exact_amount_in(ab, ALICE, &coin(10_000, "tokena"), &routes)
        .unwrap();

    let alice_c = service.bank().balance(ALICE, "tokenc");
    let out = service
        .swap_exact_amount_in(ALICE, &routes, &coin(10_000, "tokena"), &Amount::from_u64(1))
        .unwrap();
    assert_eq!(out, estimate);
    assert_eq!(service.bank().balance(ALICE, "tokenc"), &alice_c + &out);
    assert_module_backs_reserves(&service);

    let out_routes = vec![
        SwapAmountOutRoute { pool_id: ab, token_in_denom: "tokena".into() },
        SwapAmountOutRoute { pool_id: bc, token_in_denom: "tokenb".into() },
    ];
    let alice_a = service.bank().balance(ALICE, "tokena");
    let paid = service
        .swap_exact_amount_out(ALICE, &out_routes, &Amount::from_u64(100_000), &coin(5_000, "tokenc"))
        .unwrap();
    assert_eq!(
        service.bank().balance(ALICE, "tokena"),
        alice_a.checked_sub(&paid).unwrap()
    );
    assert_module_backs_reserves(&service);
}

#[test]
fn test_failed_swap_changes_nothing() {
    let mut service = service();
    let pool_id = create_ab(&mut service, "0.003", "0");
    let pools = service.store().list().unwrap();
    let bank = service.bank().clone();
    let routes = vec![SwapAmountInRoute { pool_id, token_out_denom: "tokenb".into() }];

    let err = service
        .swap_exact_amount_in(ALICE, &routes, &coin(10_000, "tokena"), &Amount::from_u64(1_000_000))
        .unwrap_err();
    assert!(matches!(err, GammError::SlippageExceeded(_)));

    let err = service
        .swap_exact_amount_in(BOB, &routes, &coin(10_000, "tokena"), &Amount::zero())
        .unwrap_err();
    assert!(matches!(err, GammError::InsufficientFunds { .. }));

    assert_eq!(service.store().list().unwrap(), pools);
    assert_eq!(service.bank(), &bank);
}

#[test]
fn test_estimate_checks_outer_pool_id() {
    let mut service = service();
    let pool_id = create_ab(&mut service, "0", "0");
    let routes = vec![SwapAmountInRoute { pool_id, token_out_denom: "tokenb".into() }];

    let err = service
        .querier()
        .estimate_swap_exact_amount_in(pool_id + 1, ALICE, &coin(100, "tokena"), &routes)
        .unwrap_err();
    assert!(matches!(err, GammError::InvalidRoute(_)));

    let err = service
        .querier()
        .estimate_swap_exact_amount_in(pool_id, ALICE, &coin(100, "tokena"), &[])
        .unwrap_err();
    assert!(matches!(err, GammError::InvalidRoute(_)));
}

#[test]
fn test_query_helpers() {
    let mut service = service();
    let pool_id = create_ab(&mut service, "0.003", "0.001");
    let querier = service.querier();

    let params = querier.pool_params(pool_id).unwrap();
    assert_eq!(params.swap_fee, d("0.003"));
    assert_eq!(params.weights.len(), 2);
    assert_eq!(querier.total_share(pool_id).unwrap(), Coin::new(share_denom(pool_id), init_pool_shares()));
    assert_eq!(querier.records(pool_id).unwrap()[1].balance, Amount::from_u64(2_000_000));
    assert_eq!(querier.spot_price(pool_id, "tokena", "tokenb").unwrap(), d("0.5"));
    assert_eq!(querier.pool(7), Err(GammError::PoolNotFound(7)));
}
