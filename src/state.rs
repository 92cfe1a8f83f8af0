use concordium_std::{
    collections::{BTreeMap, BTreeSet},
    *,
};

use crate::errors::{ContractResult, CustomContractError};
use crate::external::{BidPolicy, Item, NewAuctionParams};

/// Identifier of an auction hosted by this contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, SchemaType)]
pub struct AuctionId(pub u64);

/// Identifier of a capability token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, SchemaType)]
pub struct CapabilityId(pub u64);

/// Authorization handle over a single auction, issued to the creator exactly
/// once on creation. Gates ending the auction and releasing the item.
///
/// Deliberately neither `Clone` nor `Copy`: within the crate the token is a
/// move-only handle.
#[derive(Debug, PartialEq, Eq, Serialize, SchemaType)]
pub struct CapabilityToken {
    pub id: CapabilityId,
    /// The auction this capability is bound to.
    pub auction: AuctionId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, SchemaType)]
pub enum Status {
    Active,
    Closed,
}

impl Status {
    pub fn is_closed(&self) -> bool {
        matches!(self, Status::Closed)
    }
}

/// A single accepted bid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, SchemaType)]
pub struct Bid {
    pub timestamp: Timestamp,
    pub account: AccountAddress,
    pub amount: Amount,
}

/// Participation set enforcing one bid per identity.
#[derive(Debug, Serialize, SchemaType)]
pub struct BidderRegistry(BTreeSet<AccountAddress>);

impl BidderRegistry {
    pub fn new() -> Self {
        BidderRegistry(BTreeSet::new())
    }

    pub fn contains(&self, account: &AccountAddress) -> bool {
        self.0.contains(account)
    }

    /// Returns false if the identity was already registered.
    pub fn insert(&mut self, account: AccountAddress) -> bool {
        self.0.insert(account)
    }

    pub fn remove(&mut self, account: &AccountAddress) -> bool {
        self.0.remove(account)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn accounts(&self) -> Vec<AccountAddress> {
        self.0.iter().copied().collect()
    }
}

/// Per-identity escrow ledger. Each displaced bidder's funds are credited to
/// their own share; withdrawal drains exactly the caller's share.
///
/// Invariant: `total` equals the sum of all shares.
#[derive(Debug, Serialize, SchemaType)]
pub struct ValueEscrow {
    shares: BTreeMap<AccountAddress, Amount>,
    total: Amount,
}

impl ValueEscrow {
    pub fn new() -> Self {
        ValueEscrow {
            shares: BTreeMap::new(),
            total: Amount::zero(),
        }
    }

    pub fn deposit(&mut self, account: AccountAddress, amount: Amount) {
        let share = self.shares.entry(account).or_insert_with(Amount::zero);
        *share += amount;
        self.total += amount;
    }

    /// Drain the full share of one identity. Zero if the identity holds
    /// nothing.
    pub fn withdraw_all(&mut self, account: &AccountAddress) -> Amount {
        match self.shares.remove(account) {
            Some(share) => {
                self.total -= share;
                share
            }
            None => Amount::zero(),
        }
    }

    pub fn balance_of(&self, account: &AccountAddress) -> Amount {
        self.shares
            .get(account)
            .copied()
            .unwrap_or_else(Amount::zero)
    }

    pub fn total(&self) -> Amount {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }
}

/// Outstanding obligation of the current leading bid: the escrowed funds owed
/// to the seller once the auction closes. Replaced whenever the leader is
/// displaced, consumed exactly once by settlement.
#[derive(Debug, PartialEq, Eq, Serialize, SchemaType)]
pub struct SettlementReceipt {
    pub auction: AuctionId,
    pub winner: AccountAddress,
    pub winning_bid: Amount,
    /// Escrowed funds backing the winning bid. Always equal to `winning_bid`
    /// while the receipt is outstanding.
    pub balance: Amount,
}

/// A single auction: configuration, current high-bid state, time bounds and
/// status, plus the participation set and the losers' escrow ledger.
#[derive(Debug, Serialize, SchemaType)]
pub struct AuctionRecord {
    /// Seller account; receives the settled deposit.
    pub creator: AccountAddress,
    /// Capability bound to this record.
    pub capability: CapabilityId,
    /// The item under auction.
    pub item: Item,
    /// The opening bid must strictly exceed this.
    pub starting_price: Amount,
    /// Bid tuning for this auction.
    pub policy: BidPolicy,
    pub start: Timestamp,
    pub end: Timestamp,
    pub status: Status,
    /// Current highest bid, if any bid was accepted yet.
    pub highest: Option<Bid>,
    /// Set once the winning deposit has been transferred to the creator.
    pub deposit_received: bool,
    pub bidders: BidderRegistry,
    pub escrow: ValueEscrow,
    /// Every accepted bid, in acceptance order.
    pub history: Vec<Bid>,
}

impl AuctionRecord {
    /// Full bid threshold: strictly above the starting price and leading the
    /// current highest bid by at least the configured increment.
    pub fn ensure_qualifying(&self, amount: Amount) -> ContractResult<()> {
        ensure!(
            amount > self.starting_price,
            CustomContractError::InsufficientFunds
        );
        self.ensure_leads(amount)
    }

    fn ensure_leads(&self, amount: Amount) -> ContractResult<()> {
        if let Some(bid) = &self.highest {
            ensure!(
                amount > bid.amount && amount >= bid.amount + self.policy.min_increment,
                CustomContractError::InsufficientFunds
            );
        }
        Ok(())
    }

    pub fn has_ended(&self, now: Timestamp) -> bool {
        self.status.is_closed() || now >= self.end
    }
}

/// Final routing of the item on close.
#[must_use]
pub enum CloseOutcome {
    /// The item goes to the auction winner.
    Winner {
        item: Item,
        winner: AccountAddress,
    },
    /// No bids were placed; the item goes back to the creator.
    NoBids {
        item: Item,
        creator: AccountAddress,
    },
}

/// The contract state.
#[derive(Serial, DeserialWithState, StateClone)]
#[concordium(state_parameter = "S")]
pub struct State<S: HasStateApi> {
    /// All hosted auctions.
    pub auctions: StateMap<AuctionId, AuctionRecord, S>,
    /// At most one outstanding settlement receipt per auction, owned by the
    /// current highest bidder.
    pub receipts: StateMap<AuctionId, SettlementReceipt, S>,
    /// Counter backing auction identifier allocation.
    pub next_auction: u64,
    /// Counter backing capability identifier allocation.
    pub next_capability: u64,
}

impl<S: HasStateApi> State<S> {
    /// Create a new state with no auctions.
    pub fn empty(state_builder: &mut StateBuilder<S>) -> Self {
        State {
            auctions: state_builder.new_map(),
            receipts: state_builder.new_map(),
            next_auction: 0,
            next_capability: 0,
        }
    }

    /// Allocate a fresh auction and issue its capability token.
    pub fn new_auction(
        &mut self,
        creator: AccountAddress,
        params: NewAuctionParams,
        now: Timestamp,
    ) -> (AuctionId, CapabilityToken) {
        let auction = AuctionId(self.next_auction);
        self.next_auction += 1;
        let capability = CapabilityId(self.next_capability);
        self.next_capability += 1;

        let record = AuctionRecord {
            creator,
            capability,
            item: params.item,
            starting_price: params.starting_price,
            policy: params.policy,
            start: now,
            end: now.checked_add(params.duration).unwrap_abort(),
            status: Status::Active,
            highest: None,
            deposit_received: false,
            bidders: BidderRegistry::new(),
            escrow: ValueEscrow::new(),
            history: Vec::new(),
        };
        self.auctions.insert(auction, record);

        (
            auction,
            CapabilityToken {
                id: capability,
                auction,
            },
        )
    }

    /// Accept a bid. Every accepted bid takes the lead; the displaced
    /// leader's funds are credited to their escrow share for withdrawal.
    pub fn place_bid(
        &mut self,
        auction: AuctionId,
        bidder: AccountAddress,
        amount: Amount,
        now: Timestamp,
    ) -> ContractResult<()> {
        let mut record = self
            .auctions
            .get_mut(&auction)
            .ok_or(CustomContractError::UnknownAuction)?;

        // The starting price is an absolute floor, checked regardless of
        // auction state.
        ensure!(
            amount > record.starting_price,
            CustomContractError::InsufficientFunds
        );
        ensure!(
            !record.status.is_closed(),
            CustomContractError::AuctionCompleted
        );
        // A bid exactly at the end time is too late.
        ensure!(now < record.end, CustomContractError::AuctionCompleted);
        ensure!(
            bidder != record.creator,
            CustomContractError::OwnerForbidden
        );
        ensure!(
            !record.bidders.contains(&bidder),
            CustomContractError::AlreadyBid
        );
        record.ensure_leads(amount)?;

        // All checks passed; from here the call must not fail.
        if let Some(displaced) = self.receipts.remove_and_get(&auction) {
            record.escrow.deposit(displaced.winner, displaced.balance);
        }
        self.receipts.insert(
            auction,
            SettlementReceipt {
                auction,
                winner: bidder,
                winning_bid: amount,
                balance: amount,
            },
        );
        record.bidders.insert(bidder);
        let bid = Bid {
            timestamp: now,
            account: bidder,
            amount,
        };
        record.history.push(bid.clone());
        record.highest = Some(bid);
        Ok(())
    }

    /// Compute the amount an auto bid would submit: the current highest bid
    /// (or the starting price) plus the configured increment, clamped to the
    /// auction's auto bid ceiling. Fails if the clamped amount no longer
    /// qualifies as a bid.
    pub fn auto_bid_candidate(&self, auction: AuctionId) -> ContractResult<Amount> {
        let record = self
            .auctions
            .get(&auction)
            .ok_or(CustomContractError::UnknownAuction)?;
        let base = match &record.highest {
            Some(bid) => bid.amount,
            None => record.starting_price,
        };
        let mut candidate = base + record.policy.min_increment;
        if candidate > record.policy.max_auto_bid {
            candidate = record.policy.max_auto_bid;
        }
        record.ensure_qualifying(candidate)?;
        Ok(candidate)
    }

    /// Flip an auction to `Closed`. Requires the creator presenting the
    /// matching capability and the end time to have been reached. Closing an
    /// already closed auction fails.
    pub fn end_auction(
        &mut self,
        capability: &CapabilityToken,
        caller: AccountAddress,
        now: Timestamp,
    ) -> ContractResult<()> {
        let mut record = self
            .auctions
            .get_mut(&capability.auction)
            .ok_or(CustomContractError::UnknownAuction)?;
        // The token value is reconstructible from public state, so the holder
        // identity is part of the check.
        ensure!(
            record.creator == caller,
            CustomContractError::Unauthorized
        );
        ensure!(
            record.capability == capability.id,
            CustomContractError::InvalidCapability
        );
        ensure!(
            !record.status.is_closed(),
            CustomContractError::AuctionCompleted
        );
        ensure!(now >= record.end, CustomContractError::AuctionStillActive);
        record.status = Status::Closed;
        Ok(())
    }

    /// Settlement phase one: consume the receipt and hand out the deposit.
    ///
    /// Only the recorded winner may settle, and only after the auction is
    /// closed. Returns the creator and the amount to transfer to them. The
    /// receipt is destroyed, making a second settlement impossible.
    pub fn settle_deposit(
        &mut self,
        auction: AuctionId,
        caller: AccountAddress,
    ) -> ContractResult<(AccountAddress, Amount)> {
        let mut record = self
            .auctions
            .get_mut(&auction)
            .ok_or(CustomContractError::UnknownAuction)?;
        ensure!(
            record.status.is_closed(),
            CustomContractError::AuctionStillActive
        );
        // Check the caller before consuming anything, so a failed attempt
        // leaves the receipt untouched.
        {
            let receipt = self
                .receipts
                .get(&auction)
                .ok_or(CustomContractError::UnknownReceipt)?;
            ensure!(
                receipt.winner == caller,
                CustomContractError::NotAuctionWinner
            );
        }
        let receipt = self.receipts.remove_and_get(&auction).unwrap_abort();
        record.deposit_received = true;
        record.bidders.remove(&caller);
        Ok((record.creator, receipt.balance))
    }

    /// Settlement phase two: destroy the record and route the item.
    ///
    /// Requires the creator presenting the matching capability, a closed
    /// auction, a settled deposit and an empty registry (all losing bidders
    /// withdrawn). With no bids the item goes back to the creator.
    pub fn close_auction(
        &mut self,
        capability: &CapabilityToken,
        caller: AccountAddress,
    ) -> ContractResult<CloseOutcome> {
        {
            let record = self
                .auctions
                .get(&capability.auction)
                .ok_or(CustomContractError::UnknownAuction)?;
            ensure!(
                record.creator == caller,
                CustomContractError::Unauthorized
            );
            ensure!(
                record.capability == capability.id,
                CustomContractError::InvalidCapability
            );
            ensure!(
                record.status.is_closed(),
                CustomContractError::AuctionStillActive
            );
            if record.highest.is_some() {
                ensure!(record.deposit_received, CustomContractError::DepositPending);
                ensure!(
                    record.bidders.is_empty() && record.escrow.is_empty(),
                    CustomContractError::PendingWithdrawals
                );
            }
        }
        // No dangling record may hold a residual resource: the record leaves
        // the map in the same call that routes the item.
        let record = self
            .auctions
            .remove_and_get(&capability.auction)
            .unwrap_abort();
        Ok(match record.highest {
            Some(bid) => CloseOutcome::Winner {
                item: record.item,
                winner: bid.account,
            },
            None => CloseOutcome::NoBids {
                item: record.item,
                creator: record.creator,
            },
        })
    }

    /// Return a losing bidder's full escrow share and deregister them. The
    /// current highest bidder cannot withdraw; their funds live in the
    /// outstanding receipt.
    pub fn withdraw(
        &mut self,
        auction: AuctionId,
        caller: AccountAddress,
    ) -> ContractResult<Amount> {
        let mut record = self
            .auctions
            .get_mut(&auction)
            .ok_or(CustomContractError::UnknownAuction)?;
        ensure!(
            record.bidders.contains(&caller),
            CustomContractError::NotABidder
        );
        if let Some(receipt) = self.receipts.get(&auction) {
            ensure!(
                receipt.winner != caller,
                CustomContractError::CurrentHighestBidder
            );
        }
        let share = record.escrow.withdraw_all(&caller);
        record.bidders.remove(&caller);
        Ok(share)
    }
}

#[concordium_cfg_test]
mod tests {
    use super::*;
    use crate::external::ItemId;

    const ALICE: AccountAddress = AccountAddress([2u8; 32]);
    const BOB: AccountAddress = AccountAddress([3u8; 32]);

    fn micro(amount: u64) -> Amount {
        Amount::from_micro_ccd(amount)
    }

    fn dummy_record(highest: Option<Bid>) -> AuctionRecord {
        AuctionRecord {
            creator: AccountAddress([1u8; 32]),
            capability: CapabilityId(0),
            item: Item {
                contract: ContractAddress {
                    index: 7,
                    subindex: 0,
                },
                id: ItemId(vec![0, 1]),
            },
            starting_price: micro(100),
            policy: BidPolicy {
                min_increment: micro(50),
                max_auto_bid: micro(1_000),
            },
            start: Timestamp::from_timestamp_millis(0),
            end: Timestamp::from_timestamp_millis(1_000),
            status: Status::Active,
            highest,
            deposit_received: false,
            bidders: BidderRegistry::new(),
            escrow: ValueEscrow::new(),
            history: Vec::new(),
        }
    }

    #[concordium_test]
    fn test_escrow_conservation() {
        let mut escrow = ValueEscrow::new();
        claim!(escrow.is_empty());
        claim_eq!(escrow.total(), Amount::zero());

        escrow.deposit(ALICE, micro(100));
        escrow.deposit(BOB, micro(50));
        escrow.deposit(ALICE, micro(25));
        claim_eq!(escrow.total(), micro(175));
        claim_eq!(escrow.balance_of(&ALICE), micro(125));
        claim_eq!(escrow.balance_of(&BOB), micro(50));

        claim_eq!(escrow.withdraw_all(&ALICE), micro(125));
        claim_eq!(escrow.total(), micro(50));
        // A drained identity holds nothing.
        claim_eq!(escrow.withdraw_all(&ALICE), Amount::zero());
        claim_eq!(escrow.total(), micro(50));

        claim_eq!(escrow.withdraw_all(&BOB), micro(50));
        claim!(escrow.is_empty());
        claim_eq!(escrow.total(), Amount::zero());
    }

    #[concordium_test]
    fn test_registry_one_entry_per_identity() {
        let mut registry = BidderRegistry::new();
        claim!(registry.insert(ALICE));
        claim!(!registry.insert(ALICE));
        claim!(registry.contains(&ALICE));
        claim!(!registry.contains(&BOB));

        claim!(registry.insert(BOB));
        claim_eq!(registry.accounts(), vec![ALICE, BOB]);

        claim!(registry.remove(&ALICE));
        claim!(!registry.remove(&ALICE));
        claim!(!registry.is_empty());
        claim!(registry.remove(&BOB));
        claim!(registry.is_empty());
    }

    #[concordium_test]
    fn test_opening_bid_threshold_is_strict() {
        let record = dummy_record(None);
        claim!(record.ensure_qualifying(micro(100)).is_err());
        claim!(record.ensure_qualifying(micro(101)).is_ok());
    }

    #[concordium_test]
    fn test_bid_must_lead_by_increment() {
        let record = dummy_record(Some(Bid {
            timestamp: Timestamp::from_timestamp_millis(10),
            account: ALICE,
            amount: micro(200),
        }));
        // Equal to the highest bid: a tie never takes the lead.
        claim!(record.ensure_qualifying(micro(200)).is_err());
        // Above the highest bid but below the increment.
        claim!(record.ensure_qualifying(micro(249)).is_err());
        claim!(record.ensure_qualifying(micro(250)).is_ok());
    }

    #[concordium_test]
    fn test_has_ended() {
        let mut record = dummy_record(None);
        claim!(!record.has_ended(Timestamp::from_timestamp_millis(999)));
        claim!(record.has_ended(Timestamp::from_timestamp_millis(1_000)));
        record.status = Status::Closed;
        claim!(record.has_ended(Timestamp::from_timestamp_millis(0)));
    }
}
