use cosmwasm_std::{ConversionOverflowError, DivideByZeroError, OverflowError, StdError};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ContractError {
    #[error("{0}")]
    Std(#[from] StdError),

    #[error("{0}")]
    Overflow(#[from] OverflowError),

    #[error("{0}")]
    DivideByZero(#[from] DivideByZeroError),

    #[error("{0}")]
    ConversionOverflow(#[from] ConversionOverflowError),

    #[error("unauthorized address")]
    Unauthorized {},

    #[error("cycle length is invalid, at least {min_cycle_length} seconds > request {cycle_length_in_seconds} seconds")]
    CycleLengthInvalid {
        min_cycle_length: u32,
        cycle_length_in_seconds: u32,
    },

    #[error("period length is invalid, at least {min_period_length} cycles > request {period_length_in_cycles} cycles")]
    PeriodLengthInvalid {
        min_period_length: u16,
        period_length_in_cycles: u16,
    },

    #[error("weight table is empty")]
    EmptyWeightTable {},

    #[error("weight of attribute {attribute} is zero")]
    ZeroWeight { attribute: u8 },

    #[error("cycle cannot be zero")]
    ZeroCycle {},

    #[error("timestamp precedes contract start")]
    TimestampPrecedesStart {},

    #[error("cycle index exceeds the supported range")]
    CycleOverflow {},

    #[error("not started, run start()")]
    NotStarted {},

    #[error("already started")]
    AlreadyStarted {},

    #[error("disabled")]
    Disabled {},

    #[error("already disabled")]
    AlreadyDisabled {},

    #[error("still enabled, run disable() before withdrawing the rewards pool")]
    StillEnabled {},

    #[error("invalid cw721 contract, whitelisted contract is {white_listed_contract}, but request is {requester}")]
    InvalidWhitelistedContract {
        white_listed_contract: String,
        requester: String,
    },

    #[error("invalid token id")]
    InvalidTokenId {},

    #[error("token type of {token_id} is not stakeable")]
    InvalidTokenType { token_id: String },

    #[error("no weight configured for token attribute {attribute}")]
    UnknownTokenAttribute { attribute: u8 },

    #[error("token id is already staked")]
    AlreadyStaked {},

    #[error("unstaked token cooldown")]
    UnstakedTokenCooldown {},

    #[error("token is still frozen, unstaking needs at least two cycles after deposit")]
    TokenFrozen {},

    #[error("invalid nft owner, requester is {requester}")]
    InvalidNftOwner { requester: String },

    #[error("invalid period range [{start_period}, {end_period}]")]
    InvalidPeriodRange { start_period: u16, end_period: u16 },

    #[error("rewards per cycle cannot be zero")]
    ZeroRewardsPerCycle {},

    #[error("history is empty")]
    EmptyHistory {},

    #[error("snapshot index is out of range")]
    InvalidSnapshotIndex {},

    #[error("stake total overflow")]
    StakeOverflow {},

    #[error("stake total underflow")]
    StakeUnderflow {},

    #[error("rewards pool is insufficient, pool is {rewards_pool} and requested amount is {amount}")]
    InsufficientRewardsPool { rewards_pool: u128, amount: u128 },

    #[error("already granted address {address}")]
    AlreadyGranted { address: String },

    #[error("invalid granted address {address}")]
    InvalidGrantedAddress { address: String },

    #[error("no pending nft return for reply")]
    NoPendingNftReturn {},

    #[error("unknown reply id {id}")]
    UnknownReplyId { id: u64 },
}
