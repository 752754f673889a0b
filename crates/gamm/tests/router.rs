// gamm/tests/router.rs

use amm_core::{Amount, Coin, Dec, PoolId};
use gamm::pool::{init_pool_shares, prepare_assets};
use gamm::pricing::{quote_exact_out, swap_exact_in};
use gamm::{
    execute_exact_in, execute_exact_out, GammError, MemoryPoolStore, PoolParams, PoolStore, SwapHop,
    SwapRoute, SwapRouter,
};

fn create(store: &mut MemoryPoolStore, a: (&str, u64), b: (&str, u64), swap_fee: &str) -> PoolId {
    let assets = prepare_assets(vec![
        (Coin::new(a.0, Amount::from_u64(a.1)), Dec::one()),
        (Coin::new(b.0, Amount::from_u64(b.1)), Dec::one()),
    ])
    .unwrap();
    let params = PoolParams::new(swap_fee.parse().unwrap(), Dec::zero()).unwrap();
    store.create(assets, params, init_pool_shares()).unwrap()
}

fn hop(pool_id: PoolId, denom_in: &str, denom_out: &str) -> SwapHop {
    SwapHop {
        pool_id,
        denom_in: denom_in.into(),
        denom_out: denom_out.into(),
    }
}

fn two_pools() -> (MemoryPoolStore, PoolId, PoolId) {
    let mut store = MemoryPoolStore::new();
    let p1 = create(&mut store, ("tokena", 1_000_000), ("tokenb", 2_000_000), "0.003");
    let p2 = create(&mut store, ("tokenb", 500_000), ("tokenc", 1_500_000), "0.01");
    (store, p1, p2)
}

#[test]
fn test_multi_hop_matches_manual_composition() {
    let (mut store, p1, p2) = two_pools();
    let route = SwapRoute::new(vec![hop(p1, "tokena", "tokenb"), hop(p2, "tokenb", "tokenc")]).unwrap();
    let amount_in = Amount::from_u64(10_000);

    let first = swap_exact_in(&store.get(p1).unwrap(), "tokena", &amount_in, "tokenb", &Amount::zero()).unwrap();
    let second =
        swap_exact_in(&store.get(p2).unwrap(), "tokenb", &first.amount_out, "tokenc", &Amount::zero()).unwrap();

    let plan = execute_exact_in(&mut store, &route, &amount_in, &Amount::zero()).unwrap();
    assert_eq!(plan.token_out, Coin::new("tokenc", second.amount_out.clone()));
    assert_eq!(plan.hops[0].token_out.amount, first.amount_out);
    assert_eq!(store.get(p1).unwrap(), first.pool);
    assert_eq!(store.get(p2).unwrap(), second.pool);
}

#[test]
fn test_second_hop_slippage_leaves_first_pool_untouched() {
    let (mut store, p1, p2) = two_pools();
    let before = store.list().unwrap();
    let route = SwapRoute::new(vec![hop(p1, "tokena", "tokenb"), hop(p2, "tokenb", "tokenc")]).unwrap();

    let err = execute_exact_in(&mut store, &route, &Amount::from_u64(10_000), &Amount::from_u64(1_000_000))
        .unwrap_err();
    assert!(matches!(err, GammError::SlippageExceeded(_)));
    assert_eq!(store.list().unwrap(), before);
}

#[test]
fn test_unknown_pool_aborts_whole_route() {
    let (mut store, p1, _) = two_pools();
    let before = store.list().unwrap();
    let route = SwapRoute::new(vec![hop(p1, "tokena", "tokenb"), hop(99, "tokenb", "tokenc")]).unwrap();

    let err = execute_exact_in(&mut store, &route, &Amount::from_u64(10_000), &Amount::zero()).unwrap_err();
    assert_eq!(err, GammError::PoolNotFound(99));
    assert_eq!(store.list().unwrap(), before);
}

#[test]
fn test_exact_out_prices_backward() {
    let (mut store, p1, p2) = two_pools();
    let route = SwapRoute::new(vec![hop(p1, "tokena", "tokenb"), hop(p2, "tokenb", "tokenc")]).unwrap();
    let amount_out = Amount::from_u64(1_000);

    let last = quote_exact_out(&store.get(p2).unwrap(), "tokenb", "tokenc", &amount_out).unwrap();
    let first = quote_exact_out(&store.get(p1).unwrap(), "tokena", "tokenb", &last.amount_in).unwrap();

    let plan = execute_exact_out(&mut store, &route, &first.amount_in, &amount_out).unwrap();
    assert_eq!(plan.token_in, Coin::new("tokena", first.amount_in.clone()));
    assert_eq!(plan.hops[0].pool_id, p1);
    assert_eq!(plan.hops[1].token_in.amount, last.amount_in);
    assert_eq!(store.get(p1).unwrap(), first.pool);
    assert_eq!(store.get(p2).unwrap(), last.pool);
}

#[test]
fn test_exact_out_bounds_first_hop_only() {
    let (mut store, p1, p2) = two_pools();
    let before = store.list().unwrap();
    let route = SwapRoute::new(vec![hop(p1, "tokena", "tokenb"), hop(p2, "tokenb", "tokenc")]).unwrap();
    let amount_out = Amount::from_u64(1_000);

    let needed = SwapRouter::new(&store).estimate_exact_out(&route, &amount_out).unwrap();
    let too_little = needed.checked_sub(&Amount::from_u64(1)).unwrap();

    let err = execute_exact_out(&mut store, &route, &too_little, &amount_out).unwrap_err();
    assert!(matches!(err, GammError::SlippageExceeded(_)));
    assert_eq!(store.list().unwrap(), before);
}

#[test]
fn test_estimates_do_not_write() {
    let (mut store, p1, p2) = two_pools();
    let before = store.list().unwrap();
    let route = SwapRoute::new(vec![hop(p1, "tokena", "tokenb"), hop(p2, "tokenb", "tokenc")]).unwrap();
    let amount_in = Amount::from_u64(25_000);

    let estimate = SwapRouter::new(&store).estimate_exact_in(&route, &amount_in).unwrap();
    assert_eq!(store.list().unwrap(), before);

    let plan = execute_exact_in(&mut store, &route, &amount_in, &estimate).unwrap();
    assert_eq!(plan.token_out.amount, estimate);
}

#[test]
fn test_repeated_pool_sees_its_own_earlier_hop() {
    let (store, p1, _) = two_pools();
    let route = SwapRoute::new(vec![hop(p1, "tokena", "tokenb"), hop(p1, "tokenb", "tokena")]).unwrap();
    let amount_in = Amount::from_u64(10_000);

    let there = swap_exact_in(&store.get(p1).unwrap(), "tokena", &amount_in, "tokenb", &Amount::zero()).unwrap();
    let back = swap_exact_in(&there.pool, "tokenb", &there.amount_out, "tokena", &Amount::zero()).unwrap();

    let plan = SwapRouter::new(&store).plan_exact_in(&route, &amount_in, &Amount::zero()).unwrap();
    assert_eq!(plan.token_out.amount, back.amount_out);
    // fees on both legs
    assert!(back.amount_out < amount_in);
    assert_eq!(plan.staged_pools().count(), 1);
}
