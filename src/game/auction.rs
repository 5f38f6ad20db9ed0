use std::collections::{BTreeMap, BTreeSet};

use rand::{Rng, SeedableRng, rngs::StdRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::game::buildable::{Blueprint, BlueprintId};
use crate::game::player::{Player, PlayerId};

/// Every bid must exceed the current maximum by at least this much, which
/// is what makes winner ties impossible.
pub const BID_INCREMENT: Decimal = dec!(1);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bid {
    pub player_id: PlayerId,
    pub amount: Option<Decimal>,
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueprintBidding {
    pub blueprint_id: BlueprintId,
    pub bids: Vec<Bid>,
}

impl BlueprintBidding {
    pub fn new(blueprint_id: BlueprintId) -> Self {
        Self {
            blueprint_id,
            bids: Vec::new(),
        }
    }

    pub fn has_passed(&self, player_id: PlayerId) -> bool {
        self.bids
            .iter()
            .any(|bid| bid.player_id == player_id && bid.passed)
    }

    pub fn highest_amount(&self) -> Option<Decimal> {
        self.bids.iter().filter_map(|bid| bid.amount).max()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purchase {
    pub player_id: PlayerId,
    pub blueprint_id: BlueprintId,
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Auction {
    pub available_blueprint_ids: Vec<BlueprintId>,
    pub current_blueprint: Option<BlueprintBidding>,
    pub passed_player_ids: BTreeSet<PlayerId>,
    pub purchases: Vec<Purchase>,
    pub is_passing_allowed: bool,
}

impl Auction {
    pub fn new(available_blueprint_ids: Vec<BlueprintId>, is_passing_allowed: bool) -> Self {
        Self {
            available_blueprint_ids,
            current_blueprint: None,
            passed_player_ids: BTreeSet::new(),
            purchases: Vec::new(),
            is_passing_allowed,
        }
    }

    pub fn has_purchased(&self, player_id: PlayerId) -> bool {
        self.purchases
            .iter()
            .any(|purchase| purchase.player_id == player_id)
    }

    /// Passed the whole auction or already bought a blueprint: out of
    /// every remaining turn cycle.
    pub fn is_out(&self, player_id: PlayerId) -> bool {
        self.passed_player_ids.contains(&player_id) || self.has_purchased(player_id)
    }

    /// Passing is always allowed once the pool is empty so the auction
    /// can terminate.
    pub fn passing_allowed(&self) -> bool {
        self.is_passing_allowed || self.available_blueprint_ids.is_empty()
    }
}

/// Players ranked ascending by cumulative power sold; ties broken by a
/// draw from a PRNG seeded on the concatenation of `total_ticks` and
/// `random_seed`. Identical inputs always produce the identical order,
/// and advancing ticks rotates the order among tied players.
pub fn bidder_priority_order(
    players: &BTreeMap<PlayerId, Player>,
    total_ticks: u64,
    random_seed: u64,
) -> Vec<PlayerId> {
    let mut rng = StdRng::seed_from_u64(tie_break_seed(total_ticks, random_seed));
    // Draws are assigned in ascending player-id order, so the mapping is
    // itself deterministic.
    let mut keyed: Vec<(Decimal, u64, PlayerId)> = players
        .values()
        .map(|player| (player.power_sold_kwh, rng.r#gen::<u64>(), player.id))
        .collect();
    keyed.sort();
    keyed.into_iter().map(|(_, _, id)| id).collect()
}

fn tie_break_seed(total_ticks: u64, random_seed: u64) -> u64 {
    // FNV-1a over the decimal concatenation; stable across platforms and
    // rust versions, unlike the std hasher.
    let key = format!("{total_ticks}{random_seed}");
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in key.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// First player in priority order still in the auction. None once
/// everyone has passed or purchased.
pub fn next_initiator(order: &[PlayerId], auction: &Auction) -> Option<PlayerId> {
    order.iter().copied().find(|id| !auction.is_out(*id))
}

/// Whose turn it is in the current bid cycle: the first eligible player
/// if no bids yet, otherwise the next eligible player after the last
/// bid's owner, wrapping. None when no blueprint is open.
pub fn next_bidder(order: &[PlayerId], auction: &Auction) -> Option<PlayerId> {
    let bidding = auction.current_blueprint.as_ref()?;
    let eligible: Vec<PlayerId> = order
        .iter()
        .copied()
        .filter(|id| !auction.is_out(*id) && !bidding.has_passed(*id))
        .collect();
    if eligible.is_empty() {
        return None;
    }
    let last_actor = match bidding.bids.last() {
        None => return eligible.first().copied(),
        Some(bid) => bid.player_id,
    };
    let pos = order.iter().position(|id| *id == last_actor)?;
    (1..=order.len())
        .map(|offset| order[(pos + offset) % order.len()])
        .find(|id| eligible.contains(id))
}

/// Lowest amount the next bid may carry: the blueprint's starting bid
/// when untouched, otherwise the current maximum plus the increment.
pub fn minimum_bid(
    auction: &Auction,
    catalog: &BTreeMap<BlueprintId, Blueprint>,
) -> Option<Decimal> {
    let bidding = auction.current_blueprint.as_ref()?;
    match bidding.highest_amount() {
        Some(highest) => Some(highest + BID_INCREMENT),
        None => catalog
            .get(&bidding.blueprint_id)
            .map(|blueprint| blueprint.starting_bid),
    }
}

/// True when at most one player remains who has neither passed this
/// blueprint nor already bought one this auction.
pub fn should_end_bidding(order: &[PlayerId], auction: &Auction) -> bool {
    let Some(bidding) = auction.current_blueprint.as_ref() else {
        return false;
    };
    let active = order
        .iter()
        .filter(|id| !auction.is_out(**id) && !bidding.has_passed(**id))
        .count();
    active <= 1
}

/// Winner of a finished bid cycle: the highest non-passed bid, if any
/// amount was ever offered.
pub fn blueprint_winner(bidding: &BlueprintBidding) -> Option<(PlayerId, Decimal)> {
    bidding
        .bids
        .iter()
        .filter(|bid| !bid.passed)
        .filter_map(|bid| bid.amount.map(|amount| (amount, bid.player_id)))
        .max_by_key(|(amount, _)| *amount)
        .map(|(amount, player_id)| (player_id, amount))
}

/// True once every player has passed the auction or purchased a
/// blueprint.
pub fn should_end_auction(players: &BTreeMap<PlayerId, Player>, auction: &Auction) -> bool {
    players.keys().all(|id| auction.is_out(*id))
}
