#[cfg(not(feature = "library"))]
use cosmwasm_std::entry_point;
use cosmwasm_std::{
    Addr, Attribute, DepsMut, Env, MessageInfo, Reply, Response, StdError, SubMsgResult, Uint128,
};
use cw2::{get_contract_version, set_contract_version};
use cw20::Expiration;
use cw721::Cw721ReceiveMsg;

use crate::error::ContractError;
use crate::handler::{
    check_contract_owner, check_contract_owner_only, check_disable, check_rewards_pool,
    check_start_timestamp, compute_rewards, get_current_period, get_cycle, is_valid_cycle_length,
    is_valid_period_length, nft_return_submsg, nft_transfer_msg, rewards_transfer_from_msg,
    rewards_transfer_msg, update_histories, validate_and_get_weight, UNSTAKE_RETURN_REPLY_ID,
};
use crate::msg::{BatchReceiveMsg, ExecuteMsg, InstantiateMsg, MigrateMsg};
use crate::state::{
    Config, Grant, NextClaim, PendingNftReturn, Snapshot, TokenInfo, CONFIG_STATE, DISABLE,
    GRANTS, NEXT_CLAIMS, NUMBER_OF_STAKED_NFTS, PENDING_NFT_RETURN, REWARDS_SCHEDULE,
    STAKER_HISTORIES, START_TIMESTAMP, TOKEN_INFOS, TOTAL_REWARDS_POOL, WEIGHT_BY_ATTRIBUTE,
};

// version info for migration
const CONTRACT_NAME: &str = env!("CARGO_PKG_NAME");
const CONTRACT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn instantiate(
    deps: DepsMut,
    _env: Env,
    info: MessageInfo,
    msg: InstantiateMsg,
) -> Result<Response, ContractError> {
    is_valid_cycle_length(msg.cycle_length_in_seconds)?;
    is_valid_period_length(msg.period_length_in_cycles)?;

    if msg.token_weights.is_empty() {
        return Err(ContractError::EmptyWeightTable {});
    }
    for entry in &msg.token_weights {
        if entry.weight == 0 {
            return Err(ContractError::ZeroWeight {
                attribute: entry.attribute,
            });
        }
        WEIGHT_BY_ATTRIBUTE.save(deps.storage, entry.attribute, &entry.weight)?;
    }

    // the owner is the contract instantiater and runs every administrative
    // operation except stake, unstake and claim.
    // Warning: cycles and periods need to be calibrated carefully.
    //          Small values will increase computation load while estimating
    //          and claiming rewards. Big values will increase the time to
    //          wait before a new period becomes claimable.
    let config_state = Config {
        owner: info.sender,
        cycle_length_in_seconds: msg.cycle_length_in_seconds,
        period_length_in_cycles: msg.period_length_in_cycles,
        white_listed_nft_contract: deps.api.addr_validate(&msg.white_listed_nft_contract)?,
        rewards_token_contract: deps.api.addr_validate(&msg.rewards_token_contract)?,
    };

    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;
    CONFIG_STATE.save(deps.storage, &config_state)?;

    DISABLE.save(deps.storage, &false)?;
    TOTAL_REWARDS_POOL.save(deps.storage, &Uint128::zero())?;
    NUMBER_OF_STAKED_NFTS.save(deps.storage, &0)?;

    Ok(Response::new()
        .add_attribute("method", "instantiate")
        .add_attribute("contract_owner", config_state.owner)
        .add_attribute(
            "cycle_length_in_seconds",
            config_state.cycle_length_in_seconds.to_string(),
        )
        .add_attribute(
            "period_length_in_cycles",
            config_state.period_length_in_cycles.to_string(),
        )
        .add_attribute(
            "white_listed_nft_contract",
            config_state.white_listed_nft_contract,
        )
        .add_attribute("rewards_token_contract", config_state.rewards_token_contract))
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn execute(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    msg: ExecuteMsg,
) -> Result<Response, ContractError> {
    let config = CONFIG_STATE.load(deps.storage)?;

    match msg {
        ExecuteMsg::AddRewardsForPeriods {
            start_period,
            end_period,
            rewards_per_cycle,
        } => add_rewards_for_periods(deps, env, info, config, start_period, end_period, rewards_per_cycle),
        ExecuteMsg::Grant { address, expires } => grant(deps, info, config, address, expires),
        ExecuteMsg::Revoke { address } => revoke(deps, info, config, address),
        ExecuteMsg::Start {} => start(deps, env, info, config),
        ExecuteMsg::Disable {} => disable(deps, env, info, config),
        ExecuteMsg::WithdrawRewardsPool { amount } => {
            withdraw_rewards_pool(deps, env, info, config, amount)
        }
        ExecuteMsg::ReceiveNft(msg) => receive_nft(deps, env, info, config, msg),
        ExecuteMsg::BatchReceiveNft(msg) => batch_receive_nft(deps, env, info, config, msg),
        ExecuteMsg::UnstakeNft { token_id } => unstake_nft(deps, env, info, config, token_id),
        ExecuteMsg::ClaimRewards { max_periods } => {
            claim_rewards(deps, env, info, config, max_periods)
        }
    }
}

// set the rewards schedule for an inclusive range of periods and pull the
// matching budget from the caller. Re-adding over a period accumulates.
pub fn add_rewards_for_periods(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    config: Config,
    start_period: u16,
    end_period: u16,
    rewards_per_cycle: Uint128,
) -> Result<Response, ContractError> {
    check_contract_owner(deps.storage, &env, &info, &config)?;

    if rewards_per_cycle.is_zero() {
        return Err(ContractError::ZeroRewardsPerCycle {});
    }
    if start_period == 0 || end_period < start_period {
        return Err(ContractError::InvalidPeriodRange {
            start_period,
            end_period,
        });
    }

    // once started, the schedule of periods already begun is immutable.
    if let Some(start_timestamp) = START_TIMESTAMP.may_load(deps.storage)? {
        let current_period =
            get_current_period(env.block.time.seconds(), start_timestamp, &config)?;
        if start_period < current_period {
            return Err(ContractError::InvalidPeriodRange {
                start_period,
                end_period,
            });
        }
    }

    for period in start_period..=end_period {
        let scheduled = REWARDS_SCHEDULE
            .may_load(deps.storage, period)?
            .unwrap_or_default();
        REWARDS_SCHEDULE.save(deps.storage, period, &scheduled.checked_add(rewards_per_cycle)?)?;
    }

    let periods = Uint128::from(u128::from(end_period - start_period) + 1);
    let amount = rewards_per_cycle
        .checked_mul(Uint128::from(config.period_length_in_cycles))?
        .checked_mul(periods)?;

    let total_rewards_pool = TOTAL_REWARDS_POOL.load(deps.storage)?;
    TOTAL_REWARDS_POOL.save(deps.storage, &total_rewards_pool.checked_add(amount)?)?;

    let funding = rewards_transfer_from_msg(&config, &info.sender, &env.contract.address, amount)?;

    Ok(Response::new()
        .add_attribute("method", "add_rewards_for_periods")
        .add_attribute("start_period", start_period.to_string())
        .add_attribute("end_period", end_period.to_string())
        .add_attribute("rewards_per_cycle", rewards_per_cycle)
        .add_attribute("added_rewards", amount)
        .add_message(funding))
}

// grant another account the administrative role.
pub fn grant(
    deps: DepsMut,
    info: MessageInfo,
    config: Config,
    address: String,
    expires: Option<Expiration>,
) -> Result<Response, ContractError> {
    check_contract_owner_only(&info, &config)?;

    let address = deps.api.addr_validate(&address)?;
    if GRANTS.may_load(deps.storage, address.to_string())?.is_some() {
        return Err(ContractError::AlreadyGranted {
            address: address.to_string(),
        });
    }

    let grant = Grant::new(address.clone(), expires);
    GRANTS.save(deps.storage, address.to_string(), &grant)?;

    Ok(Response::new()
        .add_attribute("method", "grant")
        .add_attribute("grant_address", address))
}

// revoke a granted address.
pub fn revoke(
    deps: DepsMut,
    info: MessageInfo,
    config: Config,
    address: String,
) -> Result<Response, ContractError> {
    check_contract_owner_only(&info, &config)?;

    if GRANTS.may_load(deps.storage, address.clone())?.is_none() {
        return Err(ContractError::InvalidGrantedAddress { address });
    }
    GRANTS.remove(deps.storage, address.clone());

    Ok(Response::new()
        .add_attribute("method", "revoke")
        .add_attribute("revoke_address", address))
}

// start the reward accrual clock. One-shot: every cycle and period is
// derived from this timestamp.
pub fn start(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    config: Config,
) -> Result<Response, ContractError> {
    check_contract_owner(deps.storage, &env, &info, &config)?;

    if START_TIMESTAMP.may_load(deps.storage)?.is_some() {
        return Err(ContractError::AlreadyStarted {});
    }
    let now = env.block.time.seconds();
    START_TIMESTAMP.save(deps.storage, &now)?;

    Ok(Response::new()
        .add_attribute("method", "start")
        .add_attribute("start_timestamp", now.to_string()))
}

// halt staking, claiming and scheduling. One-way: stakers keep the
// emergency unstake exit, the owner gains access to the rewards pool.
pub fn disable(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    config: Config,
) -> Result<Response, ContractError> {
    check_contract_owner(deps.storage, &env, &info, &config)?;

    if DISABLE.load(deps.storage)? {
        return Err(ContractError::AlreadyDisabled {});
    }
    DISABLE.save(deps.storage, &true)?;

    Ok(Response::new()
        .add_attribute("method", "disable")
        .add_attribute("disable", true.to_string()))
}

// drain part of the rewards pool to the owner. Only available once the
// contract is disabled.
pub fn withdraw_rewards_pool(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    config: Config,
    amount: Uint128,
) -> Result<Response, ContractError> {
    check_contract_owner(deps.storage, &env, &info, &config)?;

    if !DISABLE.load(deps.storage)? {
        return Err(ContractError::StillEnabled {});
    }

    check_rewards_pool(deps.storage, amount)?;
    let total_rewards_pool = TOTAL_REWARDS_POOL.load(deps.storage)?;
    TOTAL_REWARDS_POOL.save(deps.storage, &(total_rewards_pool - amount))?;

    let withdraw = rewards_transfer_msg(&config, &info.sender, amount)?;

    Ok(Response::new()
        .add_attribute("method", "withdraw_rewards_pool")
        .add_attribute("owner", info.sender)
        .add_attribute("withdraw_amount", amount)
        .add_message(withdraw))
}

// staking entry for a single nft, invoked by the whitelisted cw721 contract.
pub fn receive_nft(
    mut deps: DepsMut,
    env: Env,
    info: MessageInfo,
    config: Config,
    msg: Cw721ReceiveMsg,
) -> Result<Response, ContractError> {
    if info.sender != config.white_listed_nft_contract {
        return Err(ContractError::InvalidWhitelistedContract {
            white_listed_contract: config.white_listed_nft_contract.to_string(),
            requester: info.sender.to_string(),
        });
    }

    let staker = deps.api.addr_validate(&msg.sender)?;
    let attributes = stake_nft(deps.branch(), &env, &config, &staker, msg.token_id)?;

    Ok(Response::new().add_attributes(attributes))
}

// staking entry for several nfts in one transfer. Each token id is staked
// independently.
pub fn batch_receive_nft(
    mut deps: DepsMut,
    env: Env,
    info: MessageInfo,
    config: Config,
    msg: BatchReceiveMsg,
) -> Result<Response, ContractError> {
    if info.sender != config.white_listed_nft_contract {
        return Err(ContractError::InvalidWhitelistedContract {
            white_listed_contract: config.white_listed_nft_contract.to_string(),
            requester: info.sender.to_string(),
        });
    }

    let staker = deps.api.addr_validate(&msg.sender)?;
    let mut attributes = vec![];
    for token_id in msg.token_ids {
        attributes.extend(stake_nft(deps.branch(), &env, &config, &staker, token_id)?);
    }

    Ok(Response::new().add_attributes(attributes))
}

fn stake_nft(
    deps: DepsMut,
    env: &Env,
    config: &Config,
    staker: &Addr,
    token_id: String,
) -> Result<Vec<Attribute>, ContractError> {
    let start_timestamp = check_start_timestamp(deps.storage)?;
    check_disable(deps.storage)?;

    let current_cycle = get_cycle(env.block.time.seconds(), start_timestamp, config)?;
    let weight = validate_and_get_weight(deps.storage, &token_id)?;

    if let Some(token_info) = TOKEN_INFOS.may_load(deps.storage, token_id.clone())? {
        if token_info.is_staked() {
            return Err(ContractError::AlreadyStaked {});
        }
        // a token unstaked in this very cycle cannot come back before the
        // next one.
        if token_info.withdraw_cycle == current_cycle {
            return Err(ContractError::UnstakedTokenCooldown {});
        }
    }

    let update = update_histories(deps.storage, staker, i128::from(weight), current_cycle)?;

    // initialise the next claim if it was the first stake for this staker or
    // if the next claim was re-initialised, i.e. rewards were claimed until
    // the last staker snapshot which held no stake.
    if NEXT_CLAIMS.may_load(deps.storage, staker)?.is_none() {
        let current_period =
            get_current_period(env.block.time.seconds(), start_timestamp, config)?;
        let next_claim = NextClaim::new(
            current_period,
            update.global_snapshot_index,
            update.staker_snapshot_index,
        );
        NEXT_CLAIMS.save(deps.storage, staker, &next_claim)?;
    }

    TOKEN_INFOS.save(
        deps.storage,
        token_id.clone(),
        &TokenInfo::stake(staker.clone(), weight, current_cycle),
    )?;

    let staked_nfts = NUMBER_OF_STAKED_NFTS.load(deps.storage)?;
    NUMBER_OF_STAKED_NFTS.save(deps.storage, &(staked_nfts + 1))?;

    Ok(vec![
        Attribute::new("method", "stake_nft"),
        Attribute::new("staker", staker.to_string()),
        Attribute::new("cycle", current_cycle.to_string()),
        Attribute::new("token_id", token_id),
        Attribute::new("weight", weight.to_string()),
        Attribute::new("start_cycle", update.start_cycle.to_string()),
        Attribute::new("staker_stake", update.staker_stake.to_string()),
        Attribute::new("global_stake", update.global_stake.to_string()),
    ])
}

// unbond an nft. With the contract enabled this settles the accounting and
// enforces the two-cycle freeze; disabled, it only returns the token
// (emergency exit). The return itself goes through the safe transfer with
// an unsafe fallback handled in `reply`.
pub fn unstake_nft(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    config: Config,
    token_id: String,
) -> Result<Response, ContractError> {
    let token_info = TOKEN_INFOS
        .may_load(deps.storage, token_id.clone())?
        .ok_or(ContractError::InvalidTokenId {})?;

    match &token_info.owner {
        Some(owner) if *owner == info.sender => {}
        _ => {
            return Err(ContractError::InvalidNftOwner {
                requester: info.sender.to_string(),
            })
        }
    }

    let disabled = DISABLE.load(deps.storage)?;
    let mut attributes = vec![
        Attribute::new("method", "unstake_nft"),
        Attribute::new("staker", info.sender.to_string()),
        Attribute::new("token_id", token_id.clone()),
    ];

    if !disabled {
        let start_timestamp = check_start_timestamp(deps.storage)?;
        let current_cycle = get_cycle(env.block.time.seconds(), start_timestamp, &config)?;

        // ensure that at least an entire cycle has elapsed before unstaking
        // the token to avoid an exploit where a full cycle would be claimable
        // by staking just before the end of a cycle and unstaking right after
        // the start of the next one.
        if current_cycle.saturating_sub(token_info.deposit_cycle) < 2 {
            return Err(ContractError::TokenFrozen {});
        }

        let update = update_histories(
            deps.storage,
            &info.sender,
            -i128::from(token_info.weight),
            current_cycle,
        )?;

        TOKEN_INFOS.save(
            deps.storage,
            token_id.clone(),
            &TokenInfo::unstake(token_info.weight, token_info.deposit_cycle, current_cycle),
        )?;

        let staked_nfts = NUMBER_OF_STAKED_NFTS.load(deps.storage)?;
        NUMBER_OF_STAKED_NFTS.save(deps.storage, &staked_nfts.saturating_sub(1))?;

        attributes.extend(vec![
            Attribute::new("cycle", current_cycle.to_string()),
            Attribute::new("weight", token_info.weight.to_string()),
            Attribute::new("start_cycle", update.start_cycle.to_string()),
            Attribute::new("staker_stake", update.staker_stake.to_string()),
            Attribute::new("global_stake", update.global_stake.to_string()),
        ]);
    } else {
        attributes.push(Attribute::new("emergency_exit", true.to_string()));
    }

    PENDING_NFT_RETURN.save(
        deps.storage,
        &PendingNftReturn {
            recipient: info.sender.clone(),
            token_id: token_id.clone(),
        },
    )?;
    let return_nft = nft_return_submsg(&config, &info.sender, token_id)?;

    Ok(Response::new()
        .add_attributes(attributes)
        .add_submessage(return_nft))
}

// resolution of the nft return submessage: fall back to the plain transfer
// when the safe path failed.
#[cfg_attr(not(feature = "library"), entry_point)]
pub fn reply(deps: DepsMut, _env: Env, msg: Reply) -> Result<Response, ContractError> {
    if msg.id != UNSTAKE_RETURN_REPLY_ID {
        return Err(ContractError::UnknownReplyId { id: msg.id });
    }

    let pending = PENDING_NFT_RETURN
        .may_load(deps.storage)?
        .ok_or(ContractError::NoPendingNftReturn {})?;
    PENDING_NFT_RETURN.remove(deps.storage);

    let config = CONFIG_STATE.load(deps.storage)?;

    match msg.result {
        SubMsgResult::Ok(_) => Ok(Response::new()
            .add_attribute("method", "unstake_nft_return")
            .add_attribute("transfer_mode", "safe")),
        SubMsgResult::Err(_) => {
            let transfer = nft_transfer_msg(&config, &pending.recipient, pending.token_id)?;
            Ok(Response::new()
                .add_attribute("method", "unstake_nft_return")
                .add_attribute("transfer_mode", "fallback")
                .add_message(transfer))
        }
    }
}

// claim the rewards accrued over up to `max_periods` past periods, starting
// at the next claimable period. Periods still in progress are not
// claimable; the bound lets a large backlog be chunked over several
// transactions.
pub fn claim_rewards(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    config: Config,
    max_periods: u16,
) -> Result<Response, ContractError> {
    let start_timestamp = check_start_timestamp(deps.storage)?;
    check_disable(deps.storage)?;

    let staker = info.sender;
    let now = env.block.time.seconds();
    let current_cycle = get_cycle(now, start_timestamp, &config)?;

    let previous_claim = NEXT_CLAIMS.may_load(deps.storage, &staker)?;
    let (claim, new_next_claim) =
        compute_rewards(deps.storage, &staker, max_periods, now, start_timestamp, &config)?;

    let mut response = Response::new()
        .add_attribute("method", "claim_rewards")
        .add_attribute("staker", staker.to_string())
        .add_attribute("cycle", current_cycle.to_string())
        .add_attribute("claim_start_period", claim.start_period.to_string())
        .add_attribute("claim_periods", claim.periods.to_string())
        .add_attribute("claim_amount", claim.amount);

    // nothing claimable yet: leave the cursor untouched.
    if claim.periods == 0 {
        return Ok(response.add_attribute("exist_next_claim", previous_claim.is_some().to_string()));
    }

    if let Some(previous_claim) = previous_claim {
        let mut staker_history = STAKER_HISTORIES
            .may_load(deps.storage, &staker)?
            .unwrap_or_default();
        let last_snapshot = staker_history
            .last()
            .copied()
            .ok_or(ContractError::EmptyHistory {})?;

        let last_claimed_cycle = u32::from(claim.start_period + claim.periods - 1)
            * u32::from(config.period_length_in_cycles);

        if last_claimed_cycle >= u32::from(last_snapshot.start_cycle) && last_snapshot.stake == 0 {
            // the claim reached the last staker snapshot and nothing is
            // staked anymore: re-init, so the next stake starts a fresh
            // accounting instead of resuming from stale indices. The history
            // is consumed in its entirety at this point.
            NEXT_CLAIMS.remove(deps.storage, &staker);
            STAKER_HISTORIES.remove(deps.storage, &staker);
            response = response.add_attribute("exist_next_claim", false.to_string());
        } else {
            // free up storage on already processed staker snapshots. The
            // cursor never re-reads a consumed prefix.
            let mut index = previous_claim.staker_snapshot_index;
            while index < new_next_claim.staker_snapshot_index {
                staker_history[index as usize] = Snapshot::default();
                index += 1;
            }
            STAKER_HISTORIES.save(deps.storage, &staker, &staker_history)?;
            NEXT_CLAIMS.save(deps.storage, &staker, &new_next_claim)?;
            response = response.add_attribute("exist_next_claim", true.to_string());
        }
    }

    if !claim.amount.is_zero() {
        check_rewards_pool(deps.storage, claim.amount)?;
        let total_rewards_pool = TOTAL_REWARDS_POOL.load(deps.storage)?;
        TOTAL_REWARDS_POOL.save(deps.storage, &(total_rewards_pool - claim.amount))?;

        let payout = rewards_transfer_msg(&config, &staker, claim.amount)?;
        response = response.add_message(payout);
    }

    Ok(response)
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn migrate(deps: DepsMut, _env: Env, _msg: MigrateMsg) -> Result<Response, ContractError> {
    let ver = get_contract_version(deps.storage)?;
    if ver.contract != CONTRACT_NAME {
        return Err(StdError::generic_err("Can only upgrade from same type").into());
    }

    #[allow(clippy::cmp_owned)]
    if ver.version >= CONTRACT_VERSION.to_string() {
        return Err(StdError::generic_err("Cannot upgrade from a newer version").into());
    }

    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;

    Ok(Response::default())
}
