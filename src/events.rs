use concordium_std::*;

use crate::external::Item;
use crate::state::AuctionId;

pub const NEW_AUCTION_TAG: u8 = 0;
pub const BID_TAG: u8 = 1;
pub const WITHDRAW_TAG: u8 = 2;
pub const END_TAG: u8 = 3;
pub const SETTLE_TAG: u8 = 4;
pub const CLOSE_TAG: u8 = 5;
pub const RETURN_TAG: u8 = 6;

/// Auction creation event data.
#[derive(Debug, Serial)]
pub struct NewAuctionEvent<'a> {
    pub auction: AuctionId,
    /// Creator account; holds the capability.
    pub creator: &'a AccountAddress,
    /// The item under auction.
    pub item: &'a Item,
    /// The opening bid must strictly exceed this.
    pub starting_price: Amount,
    /// Time at which bidding closes.
    pub end: Timestamp,
}

/// Accepted bid event data.
#[derive(Debug, Serial)]
pub struct BidEvent<'a> {
    pub auction: AuctionId,
    /// Bidder account address.
    pub bidder: &'a AccountAddress,
    /// Bid amount.
    pub amount: Amount,
}

/// Losing bid withdrawal event data.
#[derive(Debug, Serial)]
pub struct WithdrawEvent<'a> {
    pub auction: AuctionId,
    /// The withdrawing bidder.
    pub bidder: &'a AccountAddress,
    /// The bidder's refunded escrow share.
    pub amount: Amount,
}

/// Auction end event data.
#[derive(Debug, Serial)]
pub struct EndEvent {
    pub auction: AuctionId,
}

/// Deposit settlement event data.
#[derive(Debug, Serial)]
pub struct SettleEvent<'a> {
    pub auction: AuctionId,
    /// The auction creator receiving the deposit.
    pub seller: &'a AccountAddress,
    /// The settled winning bid.
    pub amount: Amount,
}

/// Auction close event data: the item goes to the winner.
#[derive(Debug, Serial)]
pub struct CloseEvent<'a> {
    pub auction: AuctionId,
    /// The auction winner receiving the item.
    pub winner: &'a AccountAddress,
    /// The released item.
    pub item: &'a Item,
}

/// No-bid close event data: the item goes back to the creator.
#[derive(Debug, Serial)]
pub struct ReturnEvent<'a> {
    pub auction: AuctionId,
    /// The creator the item is returned to.
    pub creator: &'a AccountAddress,
    /// The returned item.
    pub item: &'a Item,
}

/// Tagged custom event to be serialized for the event log.
#[derive(Debug)]
pub enum AuctionEvents<'a> {
    New(NewAuctionEvent<'a>),
    Bid(BidEvent<'a>),
    Withdraw(WithdrawEvent<'a>),
    End(EndEvent),
    Settle(SettleEvent<'a>),
    Close(CloseEvent<'a>),
    Return(ReturnEvent<'a>),
}

impl<'a> AuctionEvents<'a> {
    pub fn new_auction(
        auction: AuctionId,
        creator: &'a AccountAddress,
        item: &'a Item,
        starting_price: Amount,
        end: Timestamp,
    ) -> Self {
        Self::New(NewAuctionEvent {
            auction,
            creator,
            item,
            starting_price,
            end,
        })
    }

    pub fn bid(auction: AuctionId, bidder: &'a AccountAddress, amount: Amount) -> Self {
        Self::Bid(BidEvent {
            auction,
            bidder,
            amount,
        })
    }

    pub fn withdraw(auction: AuctionId, bidder: &'a AccountAddress, amount: Amount) -> Self {
        Self::Withdraw(WithdrawEvent {
            auction,
            bidder,
            amount,
        })
    }

    pub fn end(auction: AuctionId) -> Self {
        Self::End(EndEvent { auction })
    }

    pub fn settle(auction: AuctionId, seller: &'a AccountAddress, amount: Amount) -> Self {
        Self::Settle(SettleEvent {
            auction,
            seller,
            amount,
        })
    }

    pub fn close(auction: AuctionId, winner: &'a AccountAddress, item: &'a Item) -> Self {
        Self::Close(CloseEvent {
            auction,
            winner,
            item,
        })
    }

    pub fn returned(auction: AuctionId, creator: &'a AccountAddress, item: &'a Item) -> Self {
        Self::Return(ReturnEvent {
            auction,
            creator,
            item,
        })
    }
}

impl<'a> Serial for AuctionEvents<'a> {
    fn serial<W: Write>(&self, out: &mut W) -> Result<(), W::Err> {
        match self {
            AuctionEvents::New(event) => {
                out.write_u8(NEW_AUCTION_TAG)?;
                event.serial(out)
            }
            AuctionEvents::Bid(event) => {
                out.write_u8(BID_TAG)?;
                event.serial(out)
            }
            AuctionEvents::Withdraw(event) => {
                out.write_u8(WITHDRAW_TAG)?;
                event.serial(out)
            }
            AuctionEvents::End(event) => {
                out.write_u8(END_TAG)?;
                event.serial(out)
            }
            AuctionEvents::Settle(event) => {
                out.write_u8(SETTLE_TAG)?;
                event.serial(out)
            }
            AuctionEvents::Close(event) => {
                out.write_u8(CLOSE_TAG)?;
                event.serial(out)
            }
            AuctionEvents::Return(event) => {
                out.write_u8(RETURN_TAG)?;
                event.serial(out)
            }
        }
    }
}
