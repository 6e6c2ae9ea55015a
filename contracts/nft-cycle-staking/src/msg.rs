use cosmwasm_std::{Binary, Uint128};
use cw20::Expiration;
use cw721::Cw721ReceiveMsg;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::state::{Claim, Grant, NextClaim, Snapshot, TokenInfo};

/// Weight granted per staked token carrying the given attribute byte.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct AttributeWeight {
    pub attribute: u8,
    pub weight: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct InstantiateMsg {
    pub cycle_length_in_seconds: u32,
    pub period_length_in_cycles: u16,
    pub white_listed_nft_contract: String,
    pub rewards_token_contract: String,
    pub token_weights: Vec<AttributeWeight>,
}

/// Batch counterpart of `Cw721ReceiveMsg`, sent by cw721 implementations
/// that support transferring several tokens in one message. Each token id is
/// staked independently.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct BatchReceiveMsg {
    pub sender: String,
    pub token_ids: Vec<String>,
    pub msg: Binary,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExecuteMsg {
    AddRewardsForPeriods {
        start_period: u16,
        end_period: u16,
        rewards_per_cycle: Uint128,
    },
    Grant {
        address: String,
        expires: Option<Expiration>,
    },
    Revoke {
        address: String,
    },
    Start {},
    Disable {},
    WithdrawRewardsPool {
        amount: Uint128,
    },
    ReceiveNft(Cw721ReceiveMsg),
    BatchReceiveNft(BatchReceiveMsg),
    UnstakeNft {
        token_id: String,
    },
    ClaimRewards {
        max_periods: u16,
    },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum QueryMsg {
    GetConfig {},
    GetCurrentCycleAndPeriod {},
    RewardsSchedule { period: u16 },
    StartTime {},
    Disable {},
    TotalRewardsPool {},
    NumberOfStakedNfts {},
    GlobalHistory {},
    LastGlobalSnapshotIndex {},
    StakerHistory { staker: String },
    LastStakerSnapshotIndex { staker: String },
    TokenInfo { token_id: String },
    NextClaim { staker: String },
    EstimateRewards { staker: String, max_periods: u16 },
    GetAllGrants {},
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct MigrateMsg {}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct ConfigResponse {
    pub owner: String,
    pub cycle_length_in_seconds: u32,
    pub period_length_in_cycles: u16,
    pub white_listed_nft_contract: String,
    pub rewards_token_contract: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct CurrentCycleAndPeriodResponse {
    pub cycle: u16,
    pub period: u16,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct RewardsScheduleResponse {
    pub period: u16,
    pub rewards_per_cycle: Uint128,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct StartTimeResponse {
    pub started: bool,
    pub start_timestamp: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct DisableResponse {
    pub disable: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct TotalRewardsPoolResponse {
    pub total_rewards_pool: Uint128,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct NumberOfStakedNftsResponse {
    pub number_of_staked_nfts: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct HistoryResponse {
    pub history: Vec<Snapshot>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct SnapshotIndexResponse {
    pub index: u64,
    pub snapshot: Snapshot,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct TokenInfoResponse {
    pub token_id: String,
    pub token_info: TokenInfo,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct NextClaimResponse {
    pub next_claim: Option<NextClaim>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct EstimateRewardsResponse {
    pub staker: String,
    pub claim: Claim,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct GrantsResponse {
    pub grants: Vec<Grant>,
}
