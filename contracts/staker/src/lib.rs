#![no_std]

pub mod accrual;
pub mod events;

use soroban_sdk::{
    contract, contractimpl, contracttype, symbol_short, token, Address, Env, Symbol,
};

use accrual::SECONDS_PER_DAY;

// ── Storage key constants ────────────────────────────────────────────────────

const OWNER: Symbol = symbol_short!("OWNER");
const INITIALIZED: Symbol = symbol_short!("INIT");
const STAKE_TOKEN: Symbol = symbol_short!("STK_TOK");
const REWARD_TOKEN: Symbol = symbol_short!("RWD_TOK");
const REWARD_RATE: Symbol = symbol_short!("RWD_RATE");
const PERIOD_FINISH: Symbol = symbol_short!("PRD_FIN");
const ACC_PER_SHARE: Symbol = symbol_short!("ACC_RPS");
const LAST_UPDATE: Symbol = symbol_short!("LAST_UPD");
const TOTAL_STAKED: Symbol = symbol_short!("TOT_STK");

// Per-user persistent storage uses tuple keys:  (prefix, user_address)
const POSITION: Symbol = symbol_short!("POS");

// ── Contract errors ──────────────────────────────────────────────────────────

#[soroban_sdk::contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum ContractError {
    AlreadyInitialized = 1,
    NotInitialized = 2,
    TokensIdentical = 3,
    InvalidAmount = 4,
    InvalidDuration = 5,
    WithdrawExceedsStake = 6,
    NoSurplusToSkim = 7,
}

// ── Public-facing types (re-exported for test consumers) ─────────────────────

/// A user's staking position.
///
/// Created lazily on first deposit and never deleted; a position with
/// `amount_staked == 0` is a valid settled state.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Position {
    /// Stake-token units currently deposited.
    pub amount_staked: i128,
    /// Accumulator snapshot (scaled by `SHARE_PRECISION`) at last settlement.
    pub reward_debt: i128,
    /// Settled-but-unclaimed reward-token units.
    pub pending_reward: i128,
}

// ── Contract ─────────────────────────────────────────────────────────────────

#[contract]
pub struct StakerContract;

#[contractimpl]
impl StakerContract {
    // ── Initialisation ──────────────────────────────────────────────────────

    /// Bootstrap the contract.
    ///
    /// * `owner`        – fixed recipient of [`skim`](Self::skim) recoveries.
    /// * `stake_token`  – SAC address of the token users deposit.
    /// * `reward_token` – SAC address of the token paid out as rewards.
    ///
    /// The campaign starts unfunded: `reward_rate` and `period_finish` are
    /// zero until the first `add_rewards` call.
    pub fn initialize(
        env: Env,
        owner: Address,
        stake_token: Address,
        reward_token: Address,
    ) -> Result<(), ContractError> {
        if env.storage().instance().has(&INITIALIZED) {
            return Err(ContractError::AlreadyInitialized);
        }
        if stake_token == reward_token {
            return Err(ContractError::TokensIdentical);
        }

        let now = env.ledger().timestamp();

        env.storage().instance().set(&OWNER, &owner);
        env.storage().instance().set(&INITIALIZED, &true);
        env.storage().instance().set(&STAKE_TOKEN, &stake_token);
        env.storage().instance().set(&REWARD_TOKEN, &reward_token);
        env.storage().instance().set(&LAST_UPDATE, &now);
        // REWARD_RATE, PERIOD_FINISH, ACC_PER_SHARE, and TOTAL_STAKED start
        // at zero; unwrap_or(0) handles absent keys, so no explicit init needed.

        events::publish_initialized(&env, owner, stake_token, reward_token);

        Ok(())
    }

    // ── Campaign controller ─────────────────────────────────────────────────

    /// Fund a reward campaign: `amount` reward tokens emitted evenly over
    /// `duration_days` days, starting now.
    ///
    /// Callable by anyone willing to supply the tokens. The accumulator is
    /// flushed at the old rate first, so reward already accrued under a
    /// previous campaign is locked in before the rate changes.
    ///
    /// If the previous campaign has not finished, its unspent remainder is
    /// discarded — the new rate is derived from `amount` alone.
    pub fn add_rewards(
        env: Env,
        funder: Address,
        amount: i128,
        duration_days: u64,
    ) -> Result<(), ContractError> {
        Self::require_initialized(&env)?;
        funder.require_auth();

        if amount <= 0 {
            return Err(ContractError::InvalidAmount);
        }
        if duration_days == 0 {
            return Err(ContractError::InvalidDuration);
        }

        // 1. Lock in accrual at the outgoing rate.
        Self::checkpoint(&env);

        // 2. Install the new campaign. LAST_UPDATE must move to `now`:
        //    the checkpoint clamps it to the old `period_finish`, and any
        //    dead gap since then must not accrue at the new rate.
        let now = env.ledger().timestamp();
        let new_rate = accrual::rate_per_second(amount, duration_days);
        let period_finish = now.saturating_add(duration_days.saturating_mul(SECONDS_PER_DAY));

        env.storage().instance().set(&REWARD_RATE, &new_rate);
        env.storage().instance().set(&PERIOD_FINISH, &period_finish);
        env.storage().instance().set(&LAST_UPDATE, &now);

        // 3. Pull the budget from the funder (after all ledger mutations).
        let reward_token: Address = env
            .storage()
            .instance()
            .get(&REWARD_TOKEN)
            .ok_or(ContractError::NotInitialized)?;
        token::Client::new(&env, &reward_token).transfer(
            &funder,
            &env.current_contract_address(),
            &amount,
        );

        events::publish_rewards_added(&env, funder, amount, new_rate, period_finish);

        Ok(())
    }

    // ── Staking ─────────────────────────────────────────────────────────────

    /// Deposit `amount` stake tokens.
    ///
    /// The position is settled first so the staker does not retroactively
    /// earn rewards on the newly deposited tokens.
    pub fn deposit(env: Env, staker: Address, amount: i128) -> Result<(), ContractError> {
        Self::require_initialized(&env)?;
        staker.require_auth();

        if amount <= 0 {
            return Err(ContractError::InvalidAmount);
        }

        // 1. Flush global accumulator then snapshot for this user.
        let mut position = Self::settle_position(&env, &staker);

        // 2. Increase the user's staked balance and the global total.
        position.amount_staked = position.amount_staked.saturating_add(amount);
        Self::write_position(&env, &staker, &position);

        let prev_total: i128 = env.storage().instance().get(&TOTAL_STAKED).unwrap_or(0);
        let new_total = prev_total.saturating_add(amount);
        env.storage().instance().set(&TOTAL_STAKED, &new_total);

        // 3. Pull tokens from the staker into the contract.
        let stake_token: Address = env
            .storage()
            .instance()
            .get(&STAKE_TOKEN)
            .ok_or(ContractError::NotInitialized)?;
        token::Client::new(&env, &stake_token).transfer(
            &staker,
            &env.current_contract_address(),
            &amount,
        );

        events::publish_staked(&env, staker, amount, new_total);

        Ok(())
    }

    /// Withdraw `amount` previously deposited stake tokens.
    ///
    /// Accrued rewards are settled into `pending_reward` but not paid out;
    /// claiming is a separate, explicit action.
    pub fn withdraw(env: Env, staker: Address, amount: i128) -> Result<(), ContractError> {
        Self::require_initialized(&env)?;
        staker.require_auth();

        if amount <= 0 {
            return Err(ContractError::InvalidAmount);
        }

        // 1. Settle rewards before reducing stake.
        let mut position = Self::settle_position(&env, &staker);

        if amount > position.amount_staked {
            return Err(ContractError::WithdrawExceedsStake);
        }

        // 2. Reduce the user's staked balance and the global total.
        position.amount_staked = position.amount_staked.saturating_sub(amount);
        Self::write_position(&env, &staker, &position);

        let prev_total: i128 = env.storage().instance().get(&TOTAL_STAKED).unwrap_or(0);
        let new_total = prev_total.saturating_sub(amount);
        env.storage().instance().set(&TOTAL_STAKED, &new_total);

        // 3. Return tokens to the staker.
        let stake_token: Address = env
            .storage()
            .instance()
            .get(&STAKE_TOKEN)
            .ok_or(ContractError::NotInitialized)?;
        token::Client::new(&env, &stake_token).transfer(
            &env.current_contract_address(),
            &staker,
            &amount,
        );

        events::publish_withdrawn(&env, staker, amount, new_total);

        Ok(())
    }

    // ── Rewards ─────────────────────────────────────────────────────────────

    /// Claim all settled rewards for `staker`.
    ///
    /// Returns the amount transferred; returns `Ok(0)` without reverting when
    /// nothing is pending.
    pub fn claim(env: Env, staker: Address) -> Result<i128, ContractError> {
        Self::require_initialized(&env)?;
        staker.require_auth();

        // 1. Sync the accumulator and the user's snapshot.
        let mut position = Self::settle_position(&env, &staker);

        let pending = position.pending_reward;
        if pending <= 0 {
            return Ok(0);
        }

        // 2. Zero out before the external transfer (checks-effects-interactions).
        position.pending_reward = 0;
        Self::write_position(&env, &staker, &position);

        // 3. Transfer reward tokens to the staker.
        let reward_token: Address = env
            .storage()
            .instance()
            .get(&REWARD_TOKEN)
            .ok_or(ContractError::NotInitialized)?;
        token::Client::new(&env, &reward_token).transfer(
            &env.current_contract_address(),
            &staker,
            &pending,
        );

        events::publish_rewards_claimed(&env, staker, pending);

        Ok(pending)
    }

    // ── Surplus reconciliation ──────────────────────────────────────────────

    /// Recover stake tokens held by the contract beyond the recorded total
    /// stake (e.g. sent by direct transfer outside `deposit`).
    ///
    /// Callable by anyone; the surplus always routes to the owner fixed at
    /// initialisation. Touches neither the accumulator nor any position.
    pub fn skim(env: Env) -> Result<i128, ContractError> {
        Self::require_initialized(&env)?;

        let stake_token: Address = env
            .storage()
            .instance()
            .get(&STAKE_TOKEN)
            .ok_or(ContractError::NotInitialized)?;
        let total_staked: i128 = env.storage().instance().get(&TOTAL_STAKED).unwrap_or(0);

        let held = token::Client::new(&env, &stake_token).balance(&env.current_contract_address());
        let surplus = held.saturating_sub(total_staked);
        if surplus <= 0 {
            return Err(ContractError::NoSurplusToSkim);
        }

        let owner: Address = env
            .storage()
            .instance()
            .get(&OWNER)
            .ok_or(ContractError::NotInitialized)?;
        token::Client::new(&env, &stake_token).transfer(
            &env.current_contract_address(),
            &owner,
            &surplus,
        );

        events::publish_skimmed(&env, owner, surplus);

        Ok(surplus)
    }

    // ── View functions ───────────────────────────────────────────────────────

    /// Current scaled emission rate (reward units × `RATE_PRECISION` per second).
    pub fn reward_per_second(env: Env) -> i128 {
        env.storage().instance().get(&REWARD_RATE).unwrap_or(0)
    }

    /// Timestamp after which the active campaign stops accruing.
    pub fn reward_period_end_timestamp(env: Env) -> u64 {
        env.storage().instance().get(&PERIOD_FINISH).unwrap_or(0)
    }

    /// Real-time claimable rewards for a staker, without mutating state.
    ///
    /// Replicates the settlement arithmetic exactly: a `claim` executed at
    /// the same ledger timestamp pays out precisely this value.
    pub fn pending_rewards(env: Env, staker: Address) -> i128 {
        let total_staked: i128 = env.storage().instance().get(&TOTAL_STAKED).unwrap_or(0);
        let reward_rate: i128 = env.storage().instance().get(&REWARD_RATE).unwrap_or(0);
        let stored_acc: i128 = env.storage().instance().get(&ACC_PER_SHARE).unwrap_or(0);
        let last_update: u64 = env.storage().instance().get(&LAST_UPDATE).unwrap_or(0);
        let period_finish: u64 = env.storage().instance().get(&PERIOD_FINISH).unwrap_or(0);

        let effective_now = env.ledger().timestamp().min(period_finish);
        let elapsed = effective_now.saturating_sub(last_update);
        let current_acc = accrual::accumulate(stored_acc, reward_rate, elapsed, total_staked);

        let position = Self::read_position(&env, &staker);
        position.pending_reward.saturating_add(accrual::owed(
            position.amount_staked,
            current_acc,
            position.reward_debt,
        ))
    }

    /// Return the stored position for a staker (zeroes if never deposited).
    pub fn get_position(env: Env, staker: Address) -> Position {
        Self::read_position(&env, &staker)
    }

    /// Return the sum of all currently staked tokens.
    pub fn get_total_staked(env: Env) -> i128 {
        env.storage().instance().get(&TOTAL_STAKED).unwrap_or(0)
    }

    pub fn get_owner(env: Env) -> Result<Address, ContractError> {
        env.storage()
            .instance()
            .get(&OWNER)
            .ok_or(ContractError::NotInitialized)
    }

    pub fn get_stake_token(env: Env) -> Result<Address, ContractError> {
        env.storage()
            .instance()
            .get(&STAKE_TOKEN)
            .ok_or(ContractError::NotInitialized)
    }

    pub fn get_reward_token(env: Env) -> Result<Address, ContractError> {
        env.storage()
            .instance()
            .get(&REWARD_TOKEN)
            .ok_or(ContractError::NotInitialized)
    }

    pub fn is_initialized(env: Env) -> bool {
        env.storage().instance().has(&INITIALIZED)
    }

    // ── Internal helpers ─────────────────────────────────────────────────────

    /// Guard: revert if the contract is not yet initialized.
    fn require_initialized(env: &Env) -> Result<(), ContractError> {
        if !env.storage().instance().has(&INITIALIZED) {
            return Err(ContractError::NotInitialized);
        }
        Ok(())
    }

    fn read_position(env: &Env, staker: &Address) -> Position {
        env.storage()
            .persistent()
            .get(&(POSITION, staker.clone()))
            .unwrap_or(Position {
                amount_staked: 0,
                reward_debt: 0,
                pending_reward: 0,
            })
    }

    fn write_position(env: &Env, staker: &Address, position: &Position) {
        env.storage()
            .persistent()
            .set(&(POSITION, staker.clone()), position);
    }

    /// Flush the global reward-per-share accumulator up to now.
    ///
    /// `LAST_UPDATE` clamps to `PERIOD_FINISH`, so once a campaign expires
    /// further checkpoints are no-ops until a new one is funded, and the
    /// gap between campaigns accrues nothing.
    fn checkpoint(env: &Env) {
        let total_staked: i128 = env.storage().instance().get(&TOTAL_STAKED).unwrap_or(0);
        let reward_rate: i128 = env.storage().instance().get(&REWARD_RATE).unwrap_or(0);
        let stored_acc: i128 = env.storage().instance().get(&ACC_PER_SHARE).unwrap_or(0);
        let last_update: u64 = env.storage().instance().get(&LAST_UPDATE).unwrap_or(0);
        let period_finish: u64 = env.storage().instance().get(&PERIOD_FINISH).unwrap_or(0);

        let effective_now = env.ledger().timestamp().min(period_finish);
        let elapsed = effective_now.saturating_sub(last_update);

        let new_acc = accrual::accumulate(stored_acc, reward_rate, elapsed, total_staked);

        env.storage().instance().set(&ACC_PER_SHARE, &new_acc);
        env.storage().instance().set(&LAST_UPDATE, &effective_now);
    }

    /// Full per-user settlement.
    ///
    /// 1. Checkpoint the global accumulator.
    /// 2. Move everything owed since the user's last snapshot into
    ///    `pending_reward`.
    /// 3. Refresh `reward_debt` so the next settlement starts clean.
    fn settle_position(env: &Env, staker: &Address) -> Position {
        Self::checkpoint(env);

        let current_acc: i128 = env.storage().instance().get(&ACC_PER_SHARE).unwrap_or(0);

        let mut position = Self::read_position(env, staker);
        let newly_owed = accrual::owed(position.amount_staked, current_acc, position.reward_debt);
        position.pending_reward = position.pending_reward.saturating_add(newly_owed);
        position.reward_debt = current_acc;

        Self::write_position(env, staker, &position);
        position
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
