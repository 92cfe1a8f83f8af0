//! Single-item ascending auction contract with a per-bidder escrow ledger.
//!
//! One contract instance hosts many auctions. To bid, participants send CCD
//! using the bid function; every accepted bid must take the lead, and the
//! displaced bid becomes withdrawable by its owner. The auction creator holds
//! a capability token issued on creation, which gates ending the auction and
//! releasing the item. Settlement is two-phase and exactly-once: the winner
//! claims the item price transfer to the seller, then the capability holder
//! closes the auction and the item is released to the winner.
#![cfg_attr(not(feature = "std"), no_std)]

pub mod contract;
pub mod errors;
pub mod events;
pub mod external;
pub mod item;
pub mod state;
