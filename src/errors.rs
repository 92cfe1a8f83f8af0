use concordium_std::*;

/// The custom errors the contract can produce.
///
/// Authorization failures: `Unauthorized`, `InvalidCapability`,
/// `NotAuctionWinner`, `OwnerForbidden`. Funds failures: `InsufficientFunds`. Duplicate
/// participation: `AlreadyBid`. Missing participation: `NotABidder`,
/// `UnknownReceipt`. Timing and status failures: `AuctionCompleted`,
/// `AuctionStillActive`, `DepositPending`, `PendingWithdrawals`.
#[derive(Serialize, Debug, PartialEq, Eq, Reject, SchemaType)]
pub enum CustomContractError {
    /// Failed parsing the parameter (Error code: -1).
    #[from(ParseError)]
    ParseParams,
    /// Failed logging: Log is full (Error code: -2).
    LogFull,
    /// Failed logging: Log is malformed (Error code: -3).
    LogMalformed,
    /// No auction with this identifier (Error code: -4).
    UnknownAuction,
    /// Presented capability is not bound to this auction (Error code: -5).
    InvalidCapability,
    /// Bid below the required threshold, or attached funds do not cover the
    /// computed auto bid (Error code: -6).
    InsufficientFunds,
    /// This account has already placed a bid on this auction (Error code: -7).
    AlreadyBid,
    /// This account has no bid on this auction (Error code: -8).
    NotABidder,
    /// The auction has already ended (Error code: -9).
    AuctionCompleted,
    /// The auction has not yet reached its end time (Error code: -10).
    AuctionStillActive,
    /// Only account addresses can interact with auctions (Error code: -11).
    OnlyAccountAddress,
    /// The auction creator is not allowed to bid (Error code: -12).
    OwnerForbidden,
    /// The current highest bidder cannot withdraw their bid (Error code: -13).
    CurrentHighestBidder,
    /// No outstanding settlement receipt for this auction (Error code: -14).
    UnknownReceipt,
    /// Only the recorded winner may settle the deposit (Error code: -15).
    NotAuctionWinner,
    /// The winning deposit has not been settled yet (Error code: -16).
    DepositPending,
    /// Losing bidders still hold escrowed funds (Error code: -17).
    PendingWithdrawals,
    /// Failed to invoke a transfer (Error code: -18).
    InvokeTransferError,
    /// Failed to invoke a contract (Error code: -19).
    InvokeContractError,
    /// Only the auction creator may perform this operation (Error code: -20).
    Unauthorized,
}

/// Mapping the logging errors to CustomContractError.
impl From<LogError> for CustomContractError {
    fn from(le: LogError) -> Self {
        match le {
            LogError::Full => Self::LogFull,
            LogError::Malformed => Self::LogMalformed,
        }
    }
}

/// Mapping errors related to transfer invocations to CustomContractError.
impl From<TransferError> for CustomContractError {
    fn from(_te: TransferError) -> Self {
        Self::InvokeTransferError
    }
}

/// Mapping errors related to contract invocations to CustomContractError.
impl<T> From<CallContractError<T>> for CustomContractError {
    fn from(_cce: CallContractError<T>) -> Self {
        Self::InvokeContractError
    }
}

/// Alias for the result type of every entry point.
pub type ContractResult<A> = Result<A, CustomContractError>;
