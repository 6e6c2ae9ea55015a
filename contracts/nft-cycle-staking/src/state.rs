use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use cosmwasm_std::{Addr, Uint128};
use cw20::Expiration;
use cw_storage_plus::{Item, Map};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct Config {
    pub owner: Addr,
    pub cycle_length_in_seconds: u32,
    pub period_length_in_cycles: u16,
    pub white_listed_nft_contract: Addr,
    pub rewards_token_contract: Addr,
}

/// One piecewise-constant segment of a stake history. The segment is valid
/// from `start_cycle` until the `start_cycle` of the next snapshot, or
/// forever if it is the last one. `start_cycle == 0` never occurs in a
/// stored history and doubles as the "no next snapshot" sentinel inside the
/// claim computation.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, JsonSchema, Default)]
pub struct Snapshot {
    pub stake: u128,
    pub start_cycle: u16,
}

impl Snapshot {
    pub fn new(stake: u128, start_cycle: u16) -> Self {
        Snapshot { stake, start_cycle }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct TokenInfo {
    pub owner: Option<Addr>,
    pub weight: u64,
    pub deposit_cycle: u16,
    pub withdraw_cycle: u16,
}

impl TokenInfo {
    pub fn stake(owner: Addr, weight: u64, deposit_cycle: u16) -> Self {
        TokenInfo {
            owner: Some(owner),
            weight,
            deposit_cycle,
            withdraw_cycle: 0,
        }
    }

    /// Clears the owner so the token cannot be unstaked again without being
    /// re-staked, and records the withdrawal cycle for the re-stake cooldown.
    pub fn unstake(weight: u64, deposit_cycle: u16, withdraw_cycle: u16) -> Self {
        TokenInfo {
            owner: None,
            weight,
            deposit_cycle,
            withdraw_cycle,
        }
    }

    pub fn is_staked(&self) -> bool {
        self.owner.is_some()
    }
}

/// Per-staker resume pointer of the claim computation. An absent map entry
/// is the uninitialized state: the staker either never staked or was fully
/// re-initialized after claiming everything with zero stake remaining.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, JsonSchema, Default)]
pub struct NextClaim {
    pub period: u16,
    pub global_snapshot_index: u64,
    pub staker_snapshot_index: u64,
}

impl NextClaim {
    pub fn new(period: u16, global_snapshot_index: u64, staker_snapshot_index: u64) -> Self {
        NextClaim {
            period,
            global_snapshot_index,
            staker_snapshot_index,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, JsonSchema, Default)]
pub struct Claim {
    pub start_period: u16,
    pub periods: u16,
    pub amount: Uint128,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct Grant {
    pub address: Addr,
    pub expires: Expiration,
}

impl Grant {
    pub fn new(address: Addr, expires: Option<Expiration>) -> Self {
        Grant {
            address,
            expires: expires.unwrap_or_default(),
        }
    }
}

/// Recipient of an in-flight nft return, consumed by the reply handler of
/// the unstake submessage.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct PendingNftReturn {
    pub recipient: Addr,
    pub token_id: String,
}

pub const CONFIG_STATE: Item<Config> = Item::new("config");
pub const START_TIMESTAMP: Item<u64> = Item::new("start_timestamp");
pub const DISABLE: Item<bool> = Item::new("disable");
pub const TOTAL_REWARDS_POOL: Item<Uint128> = Item::new("total_rewards_pool");
pub const REWARDS_SCHEDULE: Map<u16, Uint128> = Map::new("rewards_schedule");
pub const GLOBAL_HISTORY: Item<Vec<Snapshot>> = Item::new("global_history");
pub const STAKER_HISTORIES: Map<&Addr, Vec<Snapshot>> = Map::new("staker_histories");
pub const NEXT_CLAIMS: Map<&Addr, NextClaim> = Map::new("next_claims");
pub const TOKEN_INFOS: Map<String, TokenInfo> = Map::new("token_infos");
pub const WEIGHT_BY_ATTRIBUTE: Map<u8, u64> = Map::new("weight_by_attribute");
pub const NUMBER_OF_STAKED_NFTS: Item<u64> = Item::new("number_of_staked_nfts");
pub const GRANTS: Map<String, Grant> = Map::new("grants");
pub const PENDING_NFT_RETURN: Item<PendingNftReturn> = Item::new("pending_nft_return");
