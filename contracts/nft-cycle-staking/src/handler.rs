use std::convert::TryFrom;

use cosmwasm_std::{
    to_binary, Addr, CosmosMsg, Env, MessageInfo, Storage, SubMsg, Uint128, Uint256, WasmMsg,
};
use cw20::Cw20ExecuteMsg;
use cw721::Cw721ExecuteMsg;

use crate::state::{
    Claim, Config, NextClaim, Snapshot, DISABLE, GLOBAL_HISTORY, GRANTS, NEXT_CLAIMS,
    REWARDS_SCHEDULE, STAKER_HISTORIES, START_TIMESTAMP, TOTAL_REWARDS_POOL, WEIGHT_BY_ATTRIBUTE,
};
use crate::ContractError;

const MIN_CYCLE_LENGTH: u32 = 60;
const MIN_PERIOD_LENGTH: u16 = 2;

/// Token ids are the lowercase hex encoding of a 128-bit integer. Byte 0
/// carries the token type, byte 1 the attribute looked up in the weight
/// table.
const TOKEN_ID_BYTES: usize = 16;
const STAKEABLE_TOKEN_TYPE: u8 = 1;

pub const UNSTAKE_RETURN_REPLY_ID: u64 = 1;

// -- time grid ---------------------------------------------------------------

// get cycle of this timestamp, 1-based.
pub fn get_cycle(
    timestamp: u64,
    start_timestamp: u64,
    config: &Config,
) -> Result<u16, ContractError> {
    if timestamp < start_timestamp {
        return Err(ContractError::TimestampPrecedesStart {});
    }

    let cycle = (timestamp - start_timestamp) / u64::from(config.cycle_length_in_seconds) + 1;
    u16::try_from(cycle).map_err(|_| ContractError::CycleOverflow {})
}

// get period of this cycle, 1-based.
pub fn get_period(cycle: u16, config: &Config) -> Result<u16, ContractError> {
    if cycle == 0 {
        return Err(ContractError::ZeroCycle {});
    }

    Ok((cycle - 1) / config.period_length_in_cycles + 1)
}

pub fn get_current_period(
    now: u64,
    start_timestamp: u64,
    config: &Config,
) -> Result<u16, ContractError> {
    let cycle = get_cycle(now, start_timestamp, config)?;
    get_period(cycle, config)
}

pub fn is_valid_cycle_length(cycle_length_in_seconds: u32) -> Result<(), ContractError> {
    if cycle_length_in_seconds < MIN_CYCLE_LENGTH {
        return Err(ContractError::CycleLengthInvalid {
            min_cycle_length: MIN_CYCLE_LENGTH,
            cycle_length_in_seconds,
        });
    }

    Ok(())
}

pub fn is_valid_period_length(period_length_in_cycles: u16) -> Result<(), ContractError> {
    if period_length_in_cycles < MIN_PERIOD_LENGTH {
        return Err(ContractError::PeriodLengthInvalid {
            min_period_length: MIN_PERIOD_LENGTH,
            period_length_in_cycles,
        });
    }

    Ok(())
}

// -- weight policy -----------------------------------------------------------

// validate the token id and derive the weight it contributes while staked.
pub fn validate_and_get_weight(
    storage: &dyn Storage,
    token_id: &str,
) -> Result<u64, ContractError> {
    let raw = hex::decode(token_id).map_err(|_| ContractError::InvalidTokenId {})?;
    if raw.len() != TOKEN_ID_BYTES {
        return Err(ContractError::InvalidTokenId {});
    }

    if raw[0] != STAKEABLE_TOKEN_TYPE {
        return Err(ContractError::InvalidTokenType {
            token_id: token_id.to_string(),
        });
    }

    let attribute = raw[1];
    WEIGHT_BY_ATTRIBUTE
        .may_load(storage, attribute)?
        .ok_or(ContractError::UnknownTokenAttribute { attribute })
}

// -- snapshot store ----------------------------------------------------------

fn apply_stake_delta(stake: u128, delta: i128) -> Result<u128, ContractError> {
    if delta >= 0 {
        stake
            .checked_add(delta as u128)
            .ok_or(ContractError::StakeOverflow {})
    } else {
        stake
            .checked_sub(delta.unsigned_abs())
            .ok_or(ContractError::StakeUnderflow {})
    }
}

/// Records a stake difference at the current cycle, either by overwriting
/// the tail snapshot when it already starts on the current cycle or by
/// appending a new one. Returns the index of the snapshot carrying the new
/// total.
pub fn update_snapshot_history(
    history: &mut Vec<Snapshot>,
    delta: i128,
    current_cycle: u16,
) -> Result<u64, ContractError> {
    let new_stake = match history.last() {
        Some(tail) => apply_stake_delta(tail.stake, delta)?,
        None => apply_stake_delta(0, delta)?,
    };

    match history.last_mut() {
        Some(tail) if tail.start_cycle == current_cycle => {
            tail.stake = new_stake;
        }
        _ => history.push(Snapshot::new(new_stake, current_cycle)),
    }

    Ok(history.len() as u64 - 1)
}

pub struct HistoriesUpdate {
    pub start_cycle: u16,
    pub global_snapshot_index: u64,
    pub staker_snapshot_index: u64,
    pub global_stake: u128,
    pub staker_stake: u128,
}

// update the global and the staker history at the current cycle with the
// same stake difference.
pub fn update_histories(
    storage: &mut dyn Storage,
    staker: &Addr,
    delta: i128,
    current_cycle: u16,
) -> Result<HistoriesUpdate, ContractError> {
    let mut global_history = GLOBAL_HISTORY.may_load(storage)?.unwrap_or_default();
    let global_snapshot_index = update_snapshot_history(&mut global_history, delta, current_cycle)?;
    GLOBAL_HISTORY.save(storage, &global_history)?;

    let mut staker_history = STAKER_HISTORIES.may_load(storage, staker)?.unwrap_or_default();
    let staker_snapshot_index = update_snapshot_history(&mut staker_history, delta, current_cycle)?;
    STAKER_HISTORIES.save(storage, staker, &staker_history)?;

    Ok(HistoriesUpdate {
        start_cycle: current_cycle,
        global_snapshot_index,
        staker_snapshot_index,
        global_stake: global_history[global_snapshot_index as usize].stake,
        staker_stake: staker_history[staker_snapshot_index as usize].stake,
    })
}

// -- guard checks ------------------------------------------------------------

// check message sender is contract owner.
pub fn check_contract_owner_only(
    info: &MessageInfo,
    config: &Config,
) -> Result<(), ContractError> {
    if config.owner != info.sender {
        return Err(ContractError::Unauthorized {});
    }

    Ok(())
}

// check message sender is contract owner or a granted address.
pub fn check_contract_owner(
    storage: &dyn Storage,
    env: &Env,
    info: &MessageInfo,
    config: &Config,
) -> Result<(), ContractError> {
    if config.owner == info.sender {
        return Ok(());
    }

    let grant = GRANTS.may_load(storage, info.sender.to_string())?;
    match grant {
        Some(grant) if !grant.expires.is_expired(&env.block) => Ok(()),
        _ => Err(ContractError::Unauthorized {}),
    }
}

// check the contract is started and return the start timestamp.
pub fn check_start_timestamp(storage: &dyn Storage) -> Result<u64, ContractError> {
    START_TIMESTAMP
        .may_load(storage)?
        .ok_or(ContractError::NotStarted {})
}

// check the contract is not disabled.
pub fn check_disable(storage: &dyn Storage) -> Result<(), ContractError> {
    if DISABLE.load(storage)? {
        return Err(ContractError::Disabled {});
    }

    Ok(())
}

// check the tracked rewards pool covers the requested amount.
pub fn check_rewards_pool(storage: &dyn Storage, amount: Uint128) -> Result<(), ContractError> {
    let rewards_pool = TOTAL_REWARDS_POOL.load(storage)?;
    if rewards_pool < amount {
        return Err(ContractError::InsufficientRewardsPool {
            rewards_pool: rewards_pool.u128(),
            amount: amount.u128(),
        });
    }

    Ok(())
}

// -- transport messages ------------------------------------------------------

pub fn rewards_transfer_msg(
    config: &Config,
    recipient: &Addr,
    amount: Uint128,
) -> Result<CosmosMsg, ContractError> {
    Ok(CosmosMsg::Wasm(WasmMsg::Execute {
        contract_addr: config.rewards_token_contract.to_string(),
        msg: to_binary(&Cw20ExecuteMsg::Transfer {
            recipient: recipient.to_string(),
            amount,
        })?,
        funds: vec![],
    }))
}

pub fn rewards_transfer_from_msg(
    config: &Config,
    owner: &Addr,
    recipient: &Addr,
    amount: Uint128,
) -> Result<CosmosMsg, ContractError> {
    Ok(CosmosMsg::Wasm(WasmMsg::Execute {
        contract_addr: config.rewards_token_contract.to_string(),
        msg: to_binary(&Cw20ExecuteMsg::TransferFrom {
            owner: owner.to_string(),
            recipient: recipient.to_string(),
            amount,
        })?,
        funds: vec![],
    }))
}

/// Preferred nft return path. `SendNft` invokes the receiver hook of the
/// recipient; the submessage reply lets the caller fall back to the plain
/// transfer when that fails (a wallet recipient, a rejecting hook).
pub fn nft_return_submsg(
    config: &Config,
    recipient: &Addr,
    token_id: String,
) -> Result<SubMsg, ContractError> {
    Ok(SubMsg::reply_always(
        CosmosMsg::Wasm(WasmMsg::Execute {
            contract_addr: config.white_listed_nft_contract.to_string(),
            msg: to_binary(&Cw721ExecuteMsg::SendNft {
                contract: recipient.to_string(),
                token_id,
                msg: Default::default(),
            })?,
            funds: vec![],
        }),
        UNSTAKE_RETURN_REPLY_ID,
    ))
}

pub fn nft_transfer_msg(
    config: &Config,
    recipient: &Addr,
    token_id: String,
) -> Result<CosmosMsg, ContractError> {
    Ok(CosmosMsg::Wasm(WasmMsg::Execute {
        contract_addr: config.white_listed_nft_contract.to_string(),
        msg: to_binary(&Cw721ExecuteMsg::TransferNft {
            recipient: recipient.to_string(),
            token_id,
        })?,
        funds: vec![],
    }))
}

// -- claim engine ------------------------------------------------------------

fn snapshot_at(history: &[Snapshot], index: u64) -> Result<Snapshot, ContractError> {
    history
        .get(index as usize)
        .copied()
        .ok_or(ContractError::InvalidSnapshotIndex {})
}

fn following_snapshot(history: &[Snapshot], index: u64) -> Snapshot {
    history
        .get(index as usize + 1)
        .copied()
        .unwrap_or_default()
}

/// Calculates the rewards owed to a staker over a capped number of past
/// periods, resuming from the stored claim cursor.
///
/// The walk keeps four snapshot views: the global and the staker segment
/// the cursor points at, and the respective following segments (or the
/// zero sentinel when none exists). Within a period it repeatedly takes
/// the widest cycle range over which all of (period, global segment,
/// staker segment) are constant, accumulates
/// `(end - start) * rewards_per_cycle * staker_stake / global_stake`
/// for that range, and advances whichever series ends at the range
/// boundary. The current period is never claimable.
pub fn compute_rewards(
    storage: &dyn Storage,
    staker: &Addr,
    max_periods: u16,
    now: u64,
    start_timestamp: u64,
    config: &Config,
) -> Result<(Claim, NextClaim), ContractError> {
    let mut claim = Claim::default();

    let mut next_claim = match NEXT_CLAIMS.may_load(storage, staker)? {
        Some(next_claim) => next_claim,
        None => return Ok((claim, NextClaim::default())),
    };
    claim.start_period = next_claim.period;

    if max_periods == 0 {
        return Ok((claim, next_claim));
    }

    let global_history = GLOBAL_HISTORY.may_load(storage)?.unwrap_or_default();
    if global_history.is_empty() {
        return Ok((claim, next_claim));
    }

    let current_period = get_current_period(now, start_timestamp, config)?;
    let claimable_periods = match current_period.checked_sub(next_claim.period) {
        Some(periods) if periods > 0 => periods,
        _ => return Ok((claim, next_claim)),
    };

    let staker_history = STAKER_HISTORIES.may_load(storage, staker)?.unwrap_or_default();
    if staker_history.is_empty() {
        return Err(ContractError::EmptyHistory {});
    }

    claim.periods = claimable_periods.min(max_periods);
    let end_claim_period = next_claim.period + claim.periods;

    let mut global_snapshot = snapshot_at(&global_history, next_claim.global_snapshot_index)?;
    let mut next_global_snapshot =
        following_snapshot(&global_history, next_claim.global_snapshot_index);
    let mut staker_snapshot = snapshot_at(&staker_history, next_claim.staker_snapshot_index)?;
    let mut next_staker_snapshot =
        following_snapshot(&staker_history, next_claim.staker_snapshot_index);

    let period_length = u32::from(config.period_length_in_cycles);
    let mut amount = Uint256::zero();

    while next_claim.period != end_claim_period {
        let rewards_per_cycle = REWARDS_SCHEDULE
            .may_load(storage, next_claim.period)?
            .unwrap_or_default();

        let next_period_start_cycle = u32::from(next_claim.period) * period_length + 1;
        let mut start_cycle = next_period_start_cycle - period_length;
        let mut end_cycle = 0u32;

        while end_cycle != next_period_start_cycle {
            // find the first cycle at which the period, the global segment
            // and the staker segment all overlap.
            if u32::from(global_snapshot.start_cycle) > start_cycle {
                start_cycle = u32::from(global_snapshot.start_cycle);
            }
            if u32::from(staker_snapshot.start_cycle) > start_cycle {
                start_cycle = u32::from(staker_snapshot.start_cycle);
            }

            // the exclusive end of the range is the earliest boundary any of
            // the three crosses. a zero start_cycle means no next segment.
            end_cycle = next_period_start_cycle;
            if next_global_snapshot.start_cycle != 0
                && u32::from(next_global_snapshot.start_cycle) < end_cycle
            {
                end_cycle = u32::from(next_global_snapshot.start_cycle);
            }
            if next_staker_snapshot.start_cycle != 0
                && u32::from(next_staker_snapshot.start_cycle) < end_cycle
            {
                end_cycle = u32::from(next_staker_snapshot.start_cycle);
            }

            if global_snapshot.stake != 0
                && staker_snapshot.stake != 0
                && !rewards_per_cycle.is_zero()
            {
                let cycles = end_cycle
                    .checked_sub(start_cycle)
                    .ok_or(ContractError::StakeUnderflow {})?;
                let snapshot_reward = Uint256::from(cycles)
                    .checked_mul(Uint256::from(rewards_per_cycle))?
                    .checked_mul(Uint256::from(staker_snapshot.stake))?
                    .checked_div(Uint256::from(global_snapshot.stake))?;
                amount = amount.checked_add(snapshot_reward)?;
            }

            if u32::from(next_global_snapshot.start_cycle) == end_cycle {
                global_snapshot = next_global_snapshot;
                next_claim.global_snapshot_index += 1;
                next_global_snapshot =
                    following_snapshot(&global_history, next_claim.global_snapshot_index);
            }
            if u32::from(next_staker_snapshot.start_cycle) == end_cycle {
                staker_snapshot = next_staker_snapshot;
                next_claim.staker_snapshot_index += 1;
                next_staker_snapshot =
                    following_snapshot(&staker_history, next_claim.staker_snapshot_index);
            }
        }

        next_claim.period += 1;
    }

    claim.amount = Uint128::try_from(amount)?;
    Ok((claim, next_claim))
}
