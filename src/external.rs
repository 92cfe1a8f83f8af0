use concordium_std::*;

/// Opaque identifier of the auctioned item within its holding contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, SchemaType)]
pub struct ItemId(pub Vec<u8>);

/// The auctioned item: an opaque transferable resource held by another
/// contract, addressed by that contract and an item identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, SchemaType)]
pub struct Item {
    /// Address of the contract holding the item.
    pub contract: ContractAddress,
    /// Item identifier within the holding contract.
    pub id: ItemId,
}

/// Per-auction bid tuning. Kept on the record rather than as process-wide
/// constants so each auction can be configured independently.
#[derive(Debug, Clone, Copy, Serialize, SchemaType)]
pub struct BidPolicy {
    /// Minimum amount a bid must exceed the current highest bid by.
    pub min_increment: Amount,
    /// Upper bound for bids computed by the auto bid entry point.
    pub max_auto_bid: Amount,
}

#[derive(Debug, Clone, Serialize, SchemaType)]
pub struct NewAuctionParams {
    /// The item being auctioned.
    pub item: Item,
    /// Smallest allowed opening bid. The opening bid must strictly exceed it.
    pub starting_price: Amount,
    /// Auction duration, counted from the creation slot time.
    pub duration: Duration,
    /// Bid tuning for this auction.
    pub policy: BidPolicy,
}

/// Parameter forwarded to the item's holding contract when the item is
/// released on close.
#[derive(Debug, Serialize, SchemaType)]
pub struct ItemTransfer {
    /// Item identifier within the holding contract.
    pub id: ItemId,
    /// Current holder, i.e. this contract.
    pub from: Address,
    /// Account receiving the item.
    pub to: AccountAddress,
}
