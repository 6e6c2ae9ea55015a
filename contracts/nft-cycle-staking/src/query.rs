#[cfg(not(feature = "library"))]
use cosmwasm_std::entry_point;
use cosmwasm_std::{to_binary, Binary, Deps, Env, Order, StdError, StdResult};

use crate::handler::{compute_rewards, get_cycle, get_period};
use crate::msg::{
    ConfigResponse, CurrentCycleAndPeriodResponse, DisableResponse, EstimateRewardsResponse,
    GrantsResponse, HistoryResponse, NextClaimResponse, NumberOfStakedNftsResponse, QueryMsg,
    RewardsScheduleResponse, SnapshotIndexResponse, StartTimeResponse, TokenInfoResponse,
    TotalRewardsPoolResponse,
};
use crate::state::{
    Snapshot, CONFIG_STATE, DISABLE, GLOBAL_HISTORY, GRANTS, NEXT_CLAIMS, NUMBER_OF_STAKED_NFTS,
    REWARDS_SCHEDULE, STAKER_HISTORIES, START_TIMESTAMP, TOKEN_INFOS, TOTAL_REWARDS_POOL,
};
use crate::ContractError;

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn query(deps: Deps, env: Env, msg: QueryMsg) -> StdResult<Binary> {
    match msg {
        QueryMsg::GetConfig {} => to_binary(&get_config(deps)?),
        QueryMsg::GetCurrentCycleAndPeriod {} => to_binary(&current_cycle_and_period(deps, env)?),
        QueryMsg::RewardsSchedule { period } => to_binary(&rewards_schedule(deps, period)?),
        QueryMsg::StartTime {} => to_binary(&start_time(deps)?),
        QueryMsg::Disable {} => to_binary(&disable(deps)?),
        QueryMsg::TotalRewardsPool {} => to_binary(&total_rewards_pool(deps)?),
        QueryMsg::NumberOfStakedNfts {} => to_binary(&number_of_staked_nfts(deps)?),
        QueryMsg::GlobalHistory {} => to_binary(&global_history(deps)?),
        QueryMsg::LastGlobalSnapshotIndex {} => to_binary(&last_global_snapshot_index(deps)?),
        QueryMsg::StakerHistory { staker } => to_binary(&staker_history(deps, staker)?),
        QueryMsg::LastStakerSnapshotIndex { staker } => {
            to_binary(&last_staker_snapshot_index(deps, staker)?)
        }
        QueryMsg::TokenInfo { token_id } => to_binary(&token_info(deps, token_id)?),
        QueryMsg::NextClaim { staker } => to_binary(&next_claim(deps, staker)?),
        QueryMsg::EstimateRewards {
            staker,
            max_periods,
        } => to_binary(&estimate_rewards(deps, env, staker, max_periods)?),
        QueryMsg::GetAllGrants {} => to_binary(&get_all_grants(deps)?),
    }
}

fn contract_err(err: ContractError) -> StdError {
    StdError::generic_err(err.to_string())
}

fn get_config(deps: Deps) -> StdResult<ConfigResponse> {
    let config = CONFIG_STATE.load(deps.storage)?;
    Ok(ConfigResponse {
        owner: config.owner.to_string(),
        cycle_length_in_seconds: config.cycle_length_in_seconds,
        period_length_in_cycles: config.period_length_in_cycles,
        white_listed_nft_contract: config.white_listed_nft_contract.to_string(),
        rewards_token_contract: config.rewards_token_contract.to_string(),
    })
}

fn current_cycle_and_period(deps: Deps, env: Env) -> StdResult<CurrentCycleAndPeriodResponse> {
    let config = CONFIG_STATE.load(deps.storage)?;
    let start_timestamp = START_TIMESTAMP
        .may_load(deps.storage)?
        .ok_or_else(|| contract_err(ContractError::NotStarted {}))?;

    let cycle =
        get_cycle(env.block.time.seconds(), start_timestamp, &config).map_err(contract_err)?;
    let period = get_period(cycle, &config).map_err(contract_err)?;

    Ok(CurrentCycleAndPeriodResponse { cycle, period })
}

fn rewards_schedule(deps: Deps, period: u16) -> StdResult<RewardsScheduleResponse> {
    let rewards_per_cycle = REWARDS_SCHEDULE
        .may_load(deps.storage, period)?
        .unwrap_or_default();
    Ok(RewardsScheduleResponse {
        period,
        rewards_per_cycle,
    })
}

fn start_time(deps: Deps) -> StdResult<StartTimeResponse> {
    let start_timestamp = START_TIMESTAMP.may_load(deps.storage)?;
    Ok(StartTimeResponse {
        started: start_timestamp.is_some(),
        start_timestamp: start_timestamp.unwrap_or_default(),
    })
}

fn disable(deps: Deps) -> StdResult<DisableResponse> {
    Ok(DisableResponse {
        disable: DISABLE.load(deps.storage)?,
    })
}

fn total_rewards_pool(deps: Deps) -> StdResult<TotalRewardsPoolResponse> {
    Ok(TotalRewardsPoolResponse {
        total_rewards_pool: TOTAL_REWARDS_POOL.load(deps.storage)?,
    })
}

fn number_of_staked_nfts(deps: Deps) -> StdResult<NumberOfStakedNftsResponse> {
    Ok(NumberOfStakedNftsResponse {
        number_of_staked_nfts: NUMBER_OF_STAKED_NFTS.load(deps.storage)?,
    })
}

fn global_history(deps: Deps) -> StdResult<HistoryResponse> {
    Ok(HistoryResponse {
        history: GLOBAL_HISTORY.may_load(deps.storage)?.unwrap_or_default(),
    })
}

fn last_snapshot(history: Vec<Snapshot>) -> StdResult<SnapshotIndexResponse> {
    match history.last() {
        Some(snapshot) => Ok(SnapshotIndexResponse {
            index: history.len() as u64 - 1,
            snapshot: *snapshot,
        }),
        None => Err(contract_err(ContractError::EmptyHistory {})),
    }
}

fn last_global_snapshot_index(deps: Deps) -> StdResult<SnapshotIndexResponse> {
    last_snapshot(GLOBAL_HISTORY.may_load(deps.storage)?.unwrap_or_default())
}

fn staker_history(deps: Deps, staker: String) -> StdResult<HistoryResponse> {
    let staker = deps.api.addr_validate(&staker)?;
    Ok(HistoryResponse {
        history: STAKER_HISTORIES
            .may_load(deps.storage, &staker)?
            .unwrap_or_default(),
    })
}

fn last_staker_snapshot_index(deps: Deps, staker: String) -> StdResult<SnapshotIndexResponse> {
    let staker = deps.api.addr_validate(&staker)?;
    last_snapshot(
        STAKER_HISTORIES
            .may_load(deps.storage, &staker)?
            .unwrap_or_default(),
    )
}

fn token_info(deps: Deps, token_id: String) -> StdResult<TokenInfoResponse> {
    let token_info = TOKEN_INFOS
        .may_load(deps.storage, token_id.clone())?
        .ok_or_else(|| contract_err(ContractError::InvalidTokenId {}))?;
    Ok(TokenInfoResponse {
        token_id,
        token_info,
    })
}

fn next_claim(deps: Deps, staker: String) -> StdResult<NextClaimResponse> {
    let staker = deps.api.addr_validate(&staker)?;
    Ok(NextClaimResponse {
        next_claim: NEXT_CLAIMS.may_load(deps.storage, &staker)?,
    })
}

// estimate the claimable rewards without advancing the cursor. Runs the
// same computation a claim would.
fn estimate_rewards(
    deps: Deps,
    env: Env,
    staker: String,
    max_periods: u16,
) -> StdResult<EstimateRewardsResponse> {
    let config = CONFIG_STATE.load(deps.storage)?;
    let staker = deps.api.addr_validate(&staker)?;

    let start_timestamp = START_TIMESTAMP
        .may_load(deps.storage)?
        .ok_or_else(|| contract_err(ContractError::NotStarted {}))?;
    if DISABLE.load(deps.storage)? {
        return Err(contract_err(ContractError::Disabled {}));
    }

    let (claim, _) = compute_rewards(
        deps.storage,
        &staker,
        max_periods,
        env.block.time.seconds(),
        start_timestamp,
        &config,
    )
    .map_err(contract_err)?;

    Ok(EstimateRewardsResponse {
        staker: staker.to_string(),
        claim,
    })
}

fn get_all_grants(deps: Deps) -> StdResult<GrantsResponse> {
    let grants = GRANTS
        .range(deps.storage, None, None, Order::Ascending)
        .map(|entry| entry.map(|(_, grant)| grant))
        .collect::<StdResult<Vec<_>>>()?;
    Ok(GrantsResponse { grants })
}
