use concordium_std::*;

use crate::errors::{ContractResult, CustomContractError};
use crate::events::AuctionEvents;
use crate::external::NewAuctionParams;
use crate::item;
use crate::state::{AuctionId, Bid, CapabilityToken, CloseOutcome, State};

/// Initialize the auction house with no auctions.
#[init(contract = "AuctionHouse")]
fn contract_init<S: HasStateApi>(
    _ctx: &impl HasInitContext,
    state_builder: &mut StateBuilder<S>,
) -> InitResult<State<S>> {
    Ok(State::empty(state_builder))
}

fn only_account(sender: Address) -> ContractResult<AccountAddress> {
    match sender {
        Address::Account(account) => Ok(account),
        Address::Contract(_) => Err(CustomContractError::OnlyAccountAddress),
    }
}

/// Create a new auction and issue its capability token to the caller.
///
/// The token is returned rather than stored under the caller's address; the
/// contract never hands it out again.
#[receive(
    mutable,
    contract = "AuctionHouse",
    name = "newAuction",
    parameter = "NewAuctionParams",
    return_value = "CapabilityToken",
    enable_logger
)]
fn contract_new_auction<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    logger: &mut impl HasLogger,
) -> ContractResult<CapabilityToken> {
    let params: NewAuctionParams = ctx.parameter_cursor().get()?;
    let creator = only_account(ctx.sender())?;
    let slot_time = ctx.metadata().slot_time();

    let (auction, capability) = host.state_mut().new_auction(creator, params, slot_time);

    let state = host.state();
    let record = state.auctions.get(&auction).unwrap_abort();
    logger.log(&AuctionEvents::new_auction(
        auction,
        &creator,
        &record.item,
        record.starting_price,
        record.end,
    ))?;

    Ok(capability)
}

/// Place a bid. The attached amount is the bid and is held by the contract;
/// it must strictly exceed the starting price and lead the current highest
/// bid by at least the auction's configured increment. One bid per account.
#[receive(
    mutable,
    payable,
    contract = "AuctionHouse",
    name = "bid",
    parameter = "AuctionId",
    enable_logger
)]
fn contract_bid<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    amount: Amount,
    logger: &mut impl HasLogger,
) -> ContractResult<()> {
    let auction: AuctionId = ctx.parameter_cursor().get()?;
    let bidder = only_account(ctx.sender())?;
    let slot_time = ctx.metadata().slot_time();

    host.state_mut()
        .place_bid(auction, bidder, amount, slot_time)?;

    logger.log(&AuctionEvents::bid(auction, &bidder, amount))?;

    Ok(())
}

/// Place the smallest qualifying bid on behalf of the caller: the current
/// highest bid plus the configured increment, clamped to the auction's auto
/// bid ceiling. Anything attached beyond the computed bid is refunded
/// immediately.
#[receive(
    mutable,
    payable,
    contract = "AuctionHouse",
    name = "placeAutoBid",
    parameter = "AuctionId",
    enable_logger
)]
fn contract_place_auto_bid<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    amount: Amount,
    logger: &mut impl HasLogger,
) -> ContractResult<()> {
    let auction: AuctionId = ctx.parameter_cursor().get()?;
    let bidder = only_account(ctx.sender())?;
    let slot_time = ctx.metadata().slot_time();

    let candidate = host.state().auto_bid_candidate(auction)?;
    ensure!(amount >= candidate, CustomContractError::InsufficientFunds);

    host.state_mut()
        .place_bid(auction, bidder, candidate, slot_time)?;

    logger.log(&AuctionEvents::bid(auction, &bidder, candidate))?;

    let excess = amount - candidate;
    if excess > Amount::zero() {
        host.invoke_transfer(&bidder, excess)?;
    }

    Ok(())
}

/// End the auction: flip it to closed once the end time has been reached.
/// Only the creator may call this, presenting the capability issued at
/// creation.
#[receive(
    mutable,
    contract = "AuctionHouse",
    name = "endAuction",
    parameter = "CapabilityToken",
    enable_logger
)]
fn contract_end_auction<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    logger: &mut impl HasLogger,
) -> ContractResult<()> {
    let capability: CapabilityToken = ctx.parameter_cursor().get()?;
    let caller = only_account(ctx.sender())?;
    let slot_time = ctx.metadata().slot_time();

    host.state_mut().end_auction(&capability, caller, slot_time)?;

    logger.log(&AuctionEvents::end(capability.auction))?;

    Ok(())
}

/// Settlement phase one: the winner settles their deposit, which is
/// transferred to the auction creator. Consumes the settlement receipt, so a
/// second settlement fails.
#[receive(
    mutable,
    contract = "AuctionHouse",
    name = "transferItemPrice",
    parameter = "AuctionId",
    enable_logger
)]
fn contract_transfer_item_price<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    logger: &mut impl HasLogger,
) -> ContractResult<()> {
    let auction: AuctionId = ctx.parameter_cursor().get()?;
    let caller = only_account(ctx.sender())?;

    let (creator, amount) = host.state_mut().settle_deposit(auction, caller)?;

    logger.log(&AuctionEvents::settle(auction, &creator, amount))?;

    host.invoke_transfer(&creator, amount)?;

    Ok(())
}

/// Settlement phase two: destroy the auction and release the item to the
/// winner, or back to the creator if nobody bid. Only the creator may call
/// this, presenting the capability; requires a settled deposit and every
/// losing bidder to have withdrawn.
#[receive(
    mutable,
    contract = "AuctionHouse",
    name = "closeAuction",
    parameter = "CapabilityToken",
    enable_logger
)]
fn contract_close_auction<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    logger: &mut impl HasLogger,
) -> ContractResult<()> {
    let capability: CapabilityToken = ctx.parameter_cursor().get()?;
    let caller = only_account(ctx.sender())?;

    let outcome = host.state_mut().close_auction(&capability, caller)?;

    match outcome {
        CloseOutcome::Winner { item, winner } => {
            logger.log(&AuctionEvents::close(capability.auction, &winner, &item))?;
            item::release(host, &item, ctx.self_address(), &winner)?;
        }
        CloseOutcome::NoBids { item, creator } => {
            logger.log(&AuctionEvents::returned(capability.auction, &creator, &item))?;
            item::release(host, &item, ctx.self_address(), &creator)?;
        }
    }

    Ok(())
}

/// Withdraw a losing bid: the caller's full escrow share is transferred back
/// and the caller leaves the bidder set. The current highest bidder cannot
/// withdraw.
#[receive(
    mutable,
    contract = "AuctionHouse",
    name = "withdrawBid",
    parameter = "AuctionId",
    enable_logger
)]
fn contract_withdraw_bid<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    logger: &mut impl HasLogger,
) -> ContractResult<()> {
    let auction: AuctionId = ctx.parameter_cursor().get()?;
    let caller = only_account(ctx.sender())?;

    let refund = host.state_mut().withdraw(auction, caller)?;

    logger.log(&AuctionEvents::withdraw(auction, &caller, refund))?;

    if refund > Amount::zero() {
        host.invoke_transfer(&caller, refund)?;
    }

    Ok(())
}

/// View the current highest bid, if any.
#[receive(
    contract = "AuctionHouse",
    name = "viewWinningBidder",
    parameter = "AuctionId",
    return_value = "Option<Bid>"
)]
fn contract_view_winning_bidder<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ContractResult<Option<Bid>> {
    let auction: AuctionId = ctx.parameter_cursor().get()?;
    let record = host
        .state()
        .auctions
        .get(&auction)
        .ok_or(CustomContractError::UnknownAuction)?;
    Ok(record.highest.clone())
}

/// View the auctions whose bidding window is over: closed, or past their end
/// time at the current slot time.
#[receive(
    contract = "AuctionHouse",
    name = "viewEndedAuctions",
    return_value = "Vec<AuctionId>"
)]
fn contract_view_ended_auctions<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ContractResult<Vec<AuctionId>> {
    let now = ctx.metadata().slot_time();
    let mut ended = Vec::new();
    for (auction, record) in host.state().auctions.iter() {
        if record.has_ended(now) {
            ended.push(*auction);
        }
    }
    Ok(ended)
}

/// View the accounts currently registered as bidders.
#[receive(
    contract = "AuctionHouse",
    name = "viewActiveBidders",
    parameter = "AuctionId",
    return_value = "Vec<AccountAddress>"
)]
fn contract_view_active_bidders<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ContractResult<Vec<AccountAddress>> {
    let auction: AuctionId = ctx.parameter_cursor().get()?;
    let record = host
        .state()
        .auctions
        .get(&auction)
        .ok_or(CustomContractError::UnknownAuction)?;
    Ok(record.bidders.accounts())
}

/// View every accepted bid in acceptance order.
#[receive(
    contract = "AuctionHouse",
    name = "viewBiddingHistory",
    parameter = "AuctionId",
    return_value = "Vec<Bid>"
)]
fn contract_view_bidding_history<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ContractResult<Vec<Bid>> {
    let auction: AuctionId = ctx.parameter_cursor().get()?;
    let record = host
        .state()
        .auctions
        .get(&auction)
        .ok_or(CustomContractError::UnknownAuction)?;
    Ok(record.history.clone())
}

#[concordium_cfg_test]
mod tests {
    use super::*;
    use crate::events::NEW_AUCTION_TAG;
    use crate::external::{BidPolicy, Item, ItemId};
    use crate::state::{CapabilityId, Status};
    use core::fmt::Debug;
    use test_infrastructure::*;

    const CREATOR: AccountAddress = AccountAddress([1u8; 32]);
    const ALICE: AccountAddress = AccountAddress([2u8; 32]);
    const BOB: AccountAddress = AccountAddress([3u8; 32]);
    const MALLORY: AccountAddress = AccountAddress([4u8; 32]);
    const SELF_ADDRESS: ContractAddress = ContractAddress {
        index: 0,
        subindex: 0,
    };
    const ITEM_CONTRACT: ContractAddress = ContractAddress {
        index: 7,
        subindex: 0,
    };
    const AUCTION_0: AuctionId = AuctionId(0);
    const AUCTION_END: u64 = 1_000;

    type Host = TestHost<State<TestStateApi>>;

    fn micro(amount: u64) -> Amount {
        Amount::from_micro_ccd(amount)
    }

    fn dummy_item() -> Item {
        Item {
            contract: ITEM_CONTRACT,
            id: ItemId(vec![0, 1]),
        }
    }

    fn dummy_params() -> NewAuctionParams {
        NewAuctionParams {
            item: dummy_item(),
            starting_price: micro(100),
            duration: Duration::from_millis(AUCTION_END),
            policy: BidPolicy {
                min_increment: micro(50),
                max_auto_bid: micro(1_000),
            },
        }
    }

    fn new_ctx<'a>(sender: AccountAddress, slot_time: u64) -> TestReceiveContext<'a> {
        let mut ctx = TestReceiveContext::empty();
        ctx.set_sender(Address::Account(sender));
        ctx.set_self_address(SELF_ADDRESS);
        ctx.set_metadata_slot_time(Timestamp::from_timestamp_millis(slot_time));
        ctx
    }

    fn new_host() -> Host {
        let mut state_builder = TestStateBuilder::new();
        let state = State::empty(&mut state_builder);
        TestHost::new(state, state_builder)
    }

    fn create_auction_with(host: &mut Host, params: NewAuctionParams) -> CapabilityToken {
        let parameter_bytes = to_bytes(&params);
        let mut ctx = new_ctx(CREATOR, 0);
        ctx.set_parameter(&parameter_bytes);
        let mut logger = TestLogger::init();
        contract_new_auction(&ctx, host, &mut logger).expect("Creating an auction should succeed")
    }

    fn create_auction(host: &mut Host) -> CapabilityToken {
        create_auction_with(host, dummy_params())
    }

    fn bid_on(
        host: &mut Host,
        auction: AuctionId,
        bidder: AccountAddress,
        amount: u64,
        slot_time: u64,
    ) -> ContractResult<()> {
        let parameter_bytes = to_bytes(&auction);
        let mut ctx = new_ctx(bidder, slot_time);
        ctx.set_parameter(&parameter_bytes);
        let mut logger = TestLogger::init();
        // The attached amount is part of the balance during execution.
        host.set_self_balance(host.self_balance() + micro(amount));
        contract_bid(&ctx, host, micro(amount), &mut logger)
    }

    fn bid(host: &mut Host, bidder: AccountAddress, amount: u64, slot_time: u64) -> ContractResult<()> {
        bid_on(host, AUCTION_0, bidder, amount, slot_time)
    }

    fn auto_bid(
        host: &mut Host,
        bidder: AccountAddress,
        attached: u64,
        slot_time: u64,
    ) -> ContractResult<()> {
        let parameter_bytes = to_bytes(&AUCTION_0);
        let mut ctx = new_ctx(bidder, slot_time);
        ctx.set_parameter(&parameter_bytes);
        let mut logger = TestLogger::init();
        host.set_self_balance(host.self_balance() + micro(attached));
        contract_place_auto_bid(&ctx, host, micro(attached), &mut logger)
    }

    fn end_auction_as(
        host: &mut Host,
        sender: AccountAddress,
        capability: &CapabilityToken,
        slot_time: u64,
    ) -> ContractResult<()> {
        let parameter_bytes = to_bytes(capability);
        let mut ctx = new_ctx(sender, slot_time);
        ctx.set_parameter(&parameter_bytes);
        let mut logger = TestLogger::init();
        contract_end_auction(&ctx, host, &mut logger)
    }

    fn end_auction(host: &mut Host, capability: &CapabilityToken, slot_time: u64) -> ContractResult<()> {
        end_auction_as(host, CREATOR, capability, slot_time)
    }

    fn settle(host: &mut Host, caller: AccountAddress, slot_time: u64) -> ContractResult<()> {
        let parameter_bytes = to_bytes(&AUCTION_0);
        let mut ctx = new_ctx(caller, slot_time);
        ctx.set_parameter(&parameter_bytes);
        let mut logger = TestLogger::init();
        contract_transfer_item_price(&ctx, host, &mut logger)
    }

    fn close_as(
        host: &mut Host,
        sender: AccountAddress,
        capability: &CapabilityToken,
        slot_time: u64,
    ) -> ContractResult<()> {
        let parameter_bytes = to_bytes(capability);
        let mut ctx = new_ctx(sender, slot_time);
        ctx.set_parameter(&parameter_bytes);
        let mut logger = TestLogger::init();
        contract_close_auction(&ctx, host, &mut logger)
    }

    fn close(host: &mut Host, capability: &CapabilityToken, slot_time: u64) -> ContractResult<()> {
        close_as(host, CREATOR, capability, slot_time)
    }

    fn withdraw(host: &mut Host, caller: AccountAddress, slot_time: u64) -> ContractResult<()> {
        let parameter_bytes = to_bytes(&AUCTION_0);
        let mut ctx = new_ctx(caller, slot_time);
        ctx.set_parameter(&parameter_bytes);
        let mut logger = TestLogger::init();
        contract_withdraw_bid(&ctx, host, &mut logger)
    }

    fn mock_item_transfer(host: &mut Host) {
        host.setup_mock_entrypoint(
            ITEM_CONTRACT,
            OwnedEntrypointName::new_unchecked("transfer".into()),
            MockFn::returning_ok(()),
        );
    }

    fn expect_error<T: Debug>(expr: ContractResult<T>, err: CustomContractError, msg: &str) {
        let actual = expr.expect_err(msg);
        claim_eq!(actual, err);
    }

    #[concordium_test]
    fn test_init() {
        let ctx = TestInitContext::empty();
        let mut state_builder = TestStateBuilder::new();
        let state = contract_init(&ctx, &mut state_builder)
            .expect("Contract initialization results in error");
        claim!(state.auctions.iter().next().is_none());
        claim!(state.receipts.iter().next().is_none());
    }

    #[concordium_test]
    fn test_new_auction_issues_capability() {
        let mut host = new_host();

        let parameter_bytes = to_bytes(&dummy_params());
        let mut ctx = new_ctx(CREATOR, 0);
        ctx.set_parameter(&parameter_bytes);
        let mut logger = TestLogger::init();
        let capability = contract_new_auction(&ctx, &mut host, &mut logger)
            .expect("Creating an auction should succeed");

        claim_eq!(capability.auction, AUCTION_0);
        claim_eq!(capability.id, CapabilityId(0));
        claim_eq!(logger.logs.len(), 1);
        claim_eq!(logger.logs[0][0], NEW_AUCTION_TAG);

        let state = host.state();
        let record = state.auctions.get(&AUCTION_0).expect("Record should exist");
        claim_eq!(record.creator, CREATOR);
        claim_eq!(record.status, Status::Active);
        claim_eq!(record.start, Timestamp::from_timestamp_millis(0));
        claim_eq!(record.end, Timestamp::from_timestamp_millis(AUCTION_END));
        claim!(record.highest.is_none());
        claim!(!record.deposit_received);
        claim!(record.bidders.is_empty());
        claim!(record.escrow.is_empty());
        claim!(record.history.is_empty());

        // A second auction gets fresh identifiers.
        let capability = create_auction(&mut host);
        claim_eq!(capability.auction, AuctionId(1));
        claim_eq!(capability.id, CapabilityId(1));
    }

    #[concordium_test]
    fn test_bid_thresholds() {
        let mut host = new_host();
        let _capability = create_auction(&mut host);

        // The opening bid must strictly exceed the starting price.
        expect_error(
            bid(&mut host, ALICE, 100, 10),
            CustomContractError::InsufficientFunds,
            "A bid equal to the starting price should fail",
        );
        bid(&mut host, ALICE, 150, 10).expect("Opening bid should pass");

        // Ties never take the lead, and the increment must be honored.
        expect_error(
            bid(&mut host, BOB, 150, 20),
            CustomContractError::InsufficientFunds,
            "A bid equal to the highest bid should fail",
        );
        expect_error(
            bid(&mut host, BOB, 199, 20),
            CustomContractError::InsufficientFunds,
            "A bid below the increment should fail",
        );
        bid(&mut host, BOB, 200, 20).expect("Qualifying bid should pass");

        let state = host.state();
        let record = state.auctions.get(&AUCTION_0).expect("Record should exist");
        let highest = record.highest.as_ref().expect("A bid was accepted");
        claim_eq!(highest.account, BOB);
        claim_eq!(highest.amount, micro(200));
        // The displaced bid is withdrawable; the leading bid is escrowed in
        // the receipt.
        claim_eq!(record.escrow.balance_of(&ALICE), micro(150));
        let receipt = state
            .receipts
            .get(&AUCTION_0)
            .expect("Receipt should be outstanding");
        claim_eq!(receipt.winner, BOB);
        claim_eq!(receipt.balance, micro(200));
        claim_eq!(record.history.len(), 2);
    }

    #[concordium_test]
    fn test_duplicate_bid_rejected() {
        let mut host = new_host();
        let _capability = create_auction(&mut host);

        bid(&mut host, ALICE, 150, 10).expect("Opening bid should pass");
        expect_error(
            bid(&mut host, ALICE, 300, 20),
            CustomContractError::AlreadyBid,
            "A second bid from the same account should fail",
        );
    }

    #[concordium_test]
    fn test_bid_time_boundary() {
        let mut host = new_host();
        let _capability = create_auction(&mut host);

        expect_error(
            bid(&mut host, ALICE, 150, AUCTION_END),
            CustomContractError::AuctionCompleted,
            "A bid at the end time should fail",
        );
        bid(&mut host, ALICE, 150, AUCTION_END - 1)
            .expect("A bid right before the end time should pass");
    }

    #[concordium_test]
    fn test_bid_guards() {
        let mut host = new_host();
        let _capability = create_auction(&mut host);

        expect_error(
            bid_on(&mut host, AuctionId(5), ALICE, 150, 10),
            CustomContractError::UnknownAuction,
            "Bidding on a missing auction should fail",
        );
        expect_error(
            bid(&mut host, CREATOR, 150, 10),
            CustomContractError::OwnerForbidden,
            "The creator must not bid on their own auction",
        );

        // Contract senders cannot bid.
        let parameter_bytes = to_bytes(&AUCTION_0);
        let mut ctx = new_ctx(ALICE, 10);
        ctx.set_sender(Address::Contract(ITEM_CONTRACT));
        ctx.set_parameter(&parameter_bytes);
        let mut logger = TestLogger::init();
        expect_error(
            contract_bid(&ctx, &mut host, micro(150), &mut logger),
            CustomContractError::OnlyAccountAddress,
            "Contract senders should be rejected",
        );
    }

    #[concordium_test]
    fn test_end_auction_guards() {
        let mut host = new_host();
        let capability = create_auction(&mut host);

        expect_error(
            end_auction(&mut host, &capability, AUCTION_END - 1),
            CustomContractError::AuctionStillActive,
            "Ending before the end time should fail",
        );

        let forged = CapabilityToken {
            id: CapabilityId(99),
            auction: AUCTION_0,
        };
        expect_error(
            end_auction(&mut host, &forged, AUCTION_END),
            CustomContractError::InvalidCapability,
            "A capability not bound to the record should fail",
        );

        let dangling = CapabilityToken {
            id: CapabilityId(0),
            auction: AuctionId(9),
        };
        expect_error(
            end_auction(&mut host, &dangling, AUCTION_END),
            CustomContractError::UnknownAuction,
            "A capability over a missing auction should fail",
        );

        end_auction(&mut host, &capability, AUCTION_END).expect("Ending should pass");
        claim_eq!(
            host.state()
                .auctions
                .get(&AUCTION_0)
                .expect("Record should exist")
                .status,
            Status::Closed
        );

        // Closing is not idempotent: the second attempt fails deterministically.
        expect_error(
            end_auction(&mut host, &capability, AUCTION_END + 5),
            CustomContractError::AuctionCompleted,
            "Ending an already closed auction should fail",
        );

        // Bids after the close are refused.
        expect_error(
            bid(&mut host, ALICE, 150, AUCTION_END + 5),
            CustomContractError::AuctionCompleted,
            "Bidding on a closed auction should fail",
        );
    }

    /// Token values are sequential and thus reconstructible from public
    /// state; the lifecycle entry points must also check the sender.
    #[concordium_test]
    fn test_lifecycle_requires_creator() {
        let mut host = new_host();
        let capability = create_auction(&mut host);

        // A byte-for-byte copy of the real token in the wrong hands.
        let reconstructed = CapabilityToken {
            id: CapabilityId(0),
            auction: AUCTION_0,
        };
        claim_eq!(reconstructed, capability);
        expect_error(
            end_auction_as(&mut host, MALLORY, &reconstructed, AUCTION_END),
            CustomContractError::Unauthorized,
            "A non-creator must not end the auction",
        );
        claim_eq!(
            host.state()
                .auctions
                .get(&AUCTION_0)
                .expect("Record should exist")
                .status,
            Status::Active
        );

        end_auction(&mut host, &capability, AUCTION_END).expect("Ending should pass");

        mock_item_transfer(&mut host);
        expect_error(
            close_as(&mut host, MALLORY, &reconstructed, AUCTION_END),
            CustomContractError::Unauthorized,
            "A non-creator must not close the auction",
        );
        claim!(host.state().auctions.get(&AUCTION_0).is_some());

        close(&mut host, &capability, AUCTION_END).expect("Closing should pass");
    }

    /// Full settlement sequence: one winning bid, one rejected bid, end,
    /// deposit settlement to the creator, item release to the winner.
    #[concordium_test]
    fn test_settlement_flow() {
        let mut host = new_host();
        let capability = create_auction(&mut host);

        bid(&mut host, ALICE, 150, 10).expect("Opening bid should pass");
        expect_error(
            bid(&mut host, BOB, 120, 20),
            CustomContractError::InsufficientFunds,
            "A non-leading bid should fail",
        );

        expect_error(
            settle(&mut host, ALICE, 500),
            CustomContractError::AuctionStillActive,
            "Settling before the close should fail",
        );

        end_auction(&mut host, &capability, AUCTION_END).expect("Ending should pass");

        expect_error(
            settle(&mut host, BOB, AUCTION_END),
            CustomContractError::NotAuctionWinner,
            "Only the winner may settle",
        );
        // The failed attempt must not have consumed the receipt.
        claim!(host.state().receipts.get(&AUCTION_0).is_some());

        settle(&mut host, ALICE, AUCTION_END).expect("Settlement should pass");
        claim_eq!(host.get_transfers(), [(CREATOR, micro(150))]);
        {
            let state = host.state();
            let record = state.auctions.get(&AUCTION_0).expect("Record should exist");
            claim!(record.deposit_received);
            claim!(record.bidders.is_empty());
            claim!(state.receipts.get(&AUCTION_0).is_none());
        }

        expect_error(
            settle(&mut host, ALICE, AUCTION_END),
            CustomContractError::UnknownReceipt,
            "Settling a second time should fail",
        );

        mock_item_transfer(&mut host);
        close(&mut host, &capability, AUCTION_END).expect("Closing should pass");
        claim!(host.state().auctions.get(&AUCTION_0).is_none());

        // The record is gone; every later reference fails.
        expect_error(
            close(&mut host, &capability, AUCTION_END),
            CustomContractError::UnknownAuction,
            "Closing a second time should fail",
        );
    }

    /// Two bidders; the displaced one withdraws exactly their own share
    /// before the auction can be fully closed.
    #[concordium_test]
    fn test_close_waits_for_withdrawals() {
        let mut host = new_host();
        let capability = create_auction(&mut host);

        bid(&mut host, ALICE, 150, 10).expect("Opening bid should pass");
        bid(&mut host, BOB, 200, 20).expect("Overbid should pass");
        end_auction(&mut host, &capability, AUCTION_END).expect("Ending should pass");
        mock_item_transfer(&mut host);

        expect_error(
            close(&mut host, &capability, AUCTION_END),
            CustomContractError::DepositPending,
            "Closing before the deposit settled should fail",
        );

        settle(&mut host, BOB, AUCTION_END).expect("Settlement should pass");

        expect_error(
            close(&mut host, &capability, AUCTION_END),
            CustomContractError::PendingWithdrawals,
            "Closing while a loser still holds escrow should fail",
        );

        withdraw(&mut host, ALICE, AUCTION_END).expect("Withdrawal should pass");
        close(&mut host, &capability, AUCTION_END).expect("Closing should pass");

        // The creator got the winning bid, the loser exactly their own share.
        claim_eq!(
            host.get_transfers(),
            [(CREATOR, micro(200)), (ALICE, micro(150))]
        );
    }

    #[concordium_test]
    fn test_withdraw_guards() {
        let mut host = new_host();
        let _capability = create_auction(&mut host);

        expect_error(
            withdraw(&mut host, BOB, 30),
            CustomContractError::NotABidder,
            "Withdrawing without a bid should fail",
        );

        bid(&mut host, ALICE, 150, 10).expect("Opening bid should pass");
        expect_error(
            withdraw(&mut host, ALICE, 30),
            CustomContractError::CurrentHighestBidder,
            "The highest bidder cannot withdraw",
        );

        bid(&mut host, BOB, 200, 20).expect("Overbid should pass");
        withdraw(&mut host, ALICE, 30).expect("Withdrawal should pass");
        claim_eq!(host.get_transfers(), [(ALICE, micro(150))]);
        expect_error(
            withdraw(&mut host, ALICE, 40),
            CustomContractError::NotABidder,
            "Withdrawing twice should fail",
        );

        // A withdrawn bidder may re-enter as a fresh participant.
        bid(&mut host, ALICE, 300, 50).expect("Re-entering bid should pass");
        let state = host.state();
        let record = state.auctions.get(&AUCTION_0).expect("Record should exist");
        claim_eq!(
            record.highest.as_ref().expect("A bid was accepted").account,
            ALICE
        );
        claim_eq!(record.escrow.balance_of(&BOB), micro(200));
    }

    #[concordium_test]
    fn test_auto_bid_computes_minimal_lead() {
        let mut host = new_host();
        let _capability = create_auction(&mut host);

        // First auto bid: starting price plus increment.
        expect_error(
            auto_bid(&mut host, BOB, 149, 10),
            CustomContractError::InsufficientFunds,
            "Attached funds below the computed bid should fail",
        );
        auto_bid(&mut host, BOB, 150, 10).expect("Auto bid should pass");
        {
            let state = host.state();
            let record = state.auctions.get(&AUCTION_0).expect("Record should exist");
            claim_eq!(
                record.highest.as_ref().expect("A bid was accepted").amount,
                micro(150)
            );
        }

        // Excess over the computed bid is refunded immediately.
        auto_bid(&mut host, ALICE, 500, 20).expect("Auto bid should pass");
        {
            let state = host.state();
            let record = state.auctions.get(&AUCTION_0).expect("Record should exist");
            claim_eq!(
                record.highest.as_ref().expect("A bid was accepted").amount,
                micro(200)
            );
        }
        claim_eq!(host.get_transfers(), [(ALICE, micro(300))]);
    }

    #[concordium_test]
    fn test_auto_bid_ceiling() {
        let mut host = new_host();
        let _capability = create_auction(&mut host);

        // Highest close enough to the ceiling that the clamped candidate can
        // no longer satisfy the increment.
        bid(&mut host, ALICE, 980, 10).expect("Opening bid should pass");
        expect_error(
            auto_bid(&mut host, BOB, 2_000, 20),
            CustomContractError::InsufficientFunds,
            "A clamped candidate below the increment should fail",
        );

        // The failed auto bid left no trace.
        let state = host.state();
        let record = state.auctions.get(&AUCTION_0).expect("Record should exist");
        claim_eq!(
            record.highest.as_ref().expect("A bid was accepted").amount,
            micro(980)
        );
        claim!(!record.bidders.contains(&BOB));
    }

    #[concordium_test]
    fn test_close_without_bids_returns_item() {
        let mut host = new_host();
        let capability = create_auction(&mut host);

        end_auction(&mut host, &capability, AUCTION_END).expect("Ending should pass");
        mock_item_transfer(&mut host);
        close(&mut host, &capability, AUCTION_END).expect("Closing should pass");

        claim!(host.state().auctions.get(&AUCTION_0).is_none());
        // No funds moved; only the item went back to the creator.
        claim!(host.get_transfers().is_empty());
    }

    #[concordium_test]
    fn test_views() {
        let mut host = new_host();
        let _capability = create_auction(&mut host);
        let mut long_params = dummy_params();
        long_params.duration = Duration::from_millis(5_000);
        let _capability = create_auction_with(&mut host, long_params);

        bid(&mut host, ALICE, 150, 10).expect("Opening bid should pass");
        bid(&mut host, BOB, 200, 20).expect("Overbid should pass");

        let parameter_bytes = to_bytes(&AUCTION_0);

        let mut ctx = new_ctx(ALICE, AUCTION_END);
        ctx.set_parameter(&parameter_bytes);
        let highest =
            contract_view_winning_bidder(&ctx, &host).expect("Viewing the winner should pass");
        let highest = highest.expect("A bid was accepted");
        claim_eq!(highest.account, BOB);
        claim_eq!(highest.amount, micro(200));
        claim_eq!(highest.timestamp, Timestamp::from_timestamp_millis(20));

        let mut ctx = new_ctx(ALICE, AUCTION_END);
        ctx.set_parameter(&parameter_bytes);
        let bidders =
            contract_view_active_bidders(&ctx, &host).expect("Viewing bidders should pass");
        claim_eq!(bidders, vec![ALICE, BOB]);

        let mut ctx = new_ctx(ALICE, AUCTION_END);
        ctx.set_parameter(&parameter_bytes);
        let history =
            contract_view_bidding_history(&ctx, &host).expect("Viewing history should pass");
        claim_eq!(history.len(), 2);
        claim_eq!(history[0].account, ALICE);
        claim_eq!(history[1].account, BOB);

        // At the first auction's end time, only that auction has ended.
        let ctx = new_ctx(ALICE, AUCTION_END);
        let ended =
            contract_view_ended_auctions(&ctx, &host).expect("Viewing ended auctions should pass");
        claim_eq!(ended, vec![AUCTION_0]);
    }
}
