#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use soroban_sdk::{
    testutils::{Address as _, Ledger as _},
    token::{Client as TokenClient, StellarAssetClient},
    Address, Env,
};
use staker::{StakerContract, StakerContractClient};

#[derive(Arbitrary, Debug)]
pub enum FuzzAction {
    AddRewards { amount: u32, duration_days: u8 },
    Deposit { amount: u32 },
    Withdraw { amount: u32 },
    Claim,
    Skim,
    AdvanceTime { seconds: u32 },
}

fuzz_target!(|actions: Vec<FuzzAction>| {
    let env = Env::default();
    env.mock_all_auths();

    let stake_token = env
        .register_stellar_asset_contract_v2(Address::generate(&env))
        .address();
    let reward_token = env
        .register_stellar_asset_contract_v2(Address::generate(&env))
        .address();

    let contract_id = env.register(StakerContract, ());
    let client = StakerContractClient::new(&env, &contract_id);

    let owner = Address::generate(&env);
    let _ = client.try_initialize(&owner, &stake_token, &reward_token);

    // A small cast of users with deep token balances so transfers themselves
    // rarely fail and the engine's own guards do the rejecting.
    let mut users = vec![owner.clone()];
    for _ in 0..4 {
        users.push(Address::generate(&env));
    }
    for user in &users {
        StellarAssetClient::new(&env, &stake_token).mint(user, &(i64::MAX as i128));
        StellarAssetClient::new(&env, &reward_token).mint(user, &(i64::MAX as i128));
    }

    // Drive arbitrary operation sequences looking for arithmetic panics and
    // conservation violations; contract errors are expected and ignored.
    let mut now: u64 = 0;
    for (i, action) in actions.into_iter().enumerate() {
        let caller = &users[i % users.len()];
        match action {
            FuzzAction::AddRewards {
                amount,
                duration_days,
            } => {
                let _ = client.try_add_rewards(caller, &(amount as i128), &(duration_days as u64));
            }
            FuzzAction::Deposit { amount } => {
                let _ = client.try_deposit(caller, &(amount as i128));
            }
            FuzzAction::Withdraw { amount } => {
                let _ = client.try_withdraw(caller, &(amount as i128));
            }
            FuzzAction::Claim => {
                let _ = client.try_claim(caller);
            }
            FuzzAction::Skim => {
                let _ = client.try_skim();
            }
            FuzzAction::AdvanceTime { seconds } => {
                now = now.saturating_add(seconds as u64);
                env.ledger().set_timestamp(now);
            }
        }

        // Deposits must always be fully backed by the contract's balance.
        let held = TokenClient::new(&env, &stake_token).balance(&contract_id);
        assert!(held >= client.get_total_staked());
    }
});
