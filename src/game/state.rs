use std::collections::{BTreeMap, BTreeSet};

use rand::{SeedableRng, rngs::StdRng};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::coords::CubeCoord;
use crate::game::auction::{self, Auction, Bid, BlueprintBidding, Purchase};
use crate::game::buildable::{
    BlueprintId, Buildable, BuildableId, POLE_COST, PowerPlant, PowerPole, STANDARD_CATALOG,
};
use crate::game::commands::{BuildPlacement, Command, CommandKind, SERVICE_CALLER};
use crate::game::grid::{self, GridOutcome};
use crate::game::market::CommodityMarket;
use crate::game::player::{Player, PlayerId, SurveyResult};
use crate::map::HexMap;
use crate::types::FuelType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    pub id: Uuid,
    pub random_seed: u64,
    pub map_radius: i32,
    pub is_passing_allowed: bool,
    /// Injected topology; generated from the seed when absent.
    pub map: Option<HexMap>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            id: Uuid::nil(),
            random_seed: 42,
            map_radius: 3,
            is_passing_allowed: true,
            map: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuctionStage {
    InitiatingBid,
    Bidding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GamePhase {
    Lobby,
    Auction(AuctionStage),
    Active,
    Paused,
}

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("command invalid in phase {phase:?}")]
    WrongPhase { phase: GamePhase },
    #[error("unknown caller {0}")]
    UnknownCaller(PlayerId),
    #[error("player {0} already joined")]
    AlreadyJoined(PlayerId),
    #[error("only the host may start the game")]
    NotHost,
    #[error("not player {0}'s turn")]
    OutOfTurn(PlayerId),
    #[error("blueprint {0} is not up for auction")]
    BlueprintUnavailable(BlueprintId),
    #[error("unknown blueprint {0}")]
    UnknownBlueprint(BlueprintId),
    #[error("bid of {amount} is below the minimum of {minimum}")]
    BidTooLow { amount: Decimal, minimum: Decimal },
    #[error("insufficient funds: need {need}, have {have}")]
    InsufficientFunds { need: Decimal, have: Decimal },
    #[error("passing the auction is not allowed")]
    PassingNotAllowed,
    #[error("invalid placement: {0}")]
    InvalidPlacement(&'static str),
    #[error("ghost buildables are client previews, never game state")]
    GhostRejected,
    #[error("ticks are service-originated")]
    NotService,
    #[error("unknown power plant {0}")]
    UnknownPlant(BuildableId),
    #[error("plant {0} is not owned by the caller")]
    NotPlantOwner(BuildableId),
    #[error("plant does not burn {0}")]
    WrongFuelType(FuelType),
    #[error("trade must move at least one unit")]
    ZeroUnits,
    #[error("not enough fuel storage headroom")]
    StorageFull,
    #[error("not enough fuel in storage")]
    InsufficientFuel,
    #[error("cell {0:?} is not on the map")]
    UnknownCell(CubeCoord),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameEvent {
    PlayerJoined {
        player_id: PlayerId,
        name: String,
        is_host: bool,
    },
    GameStarted,
    BiddingOpened {
        player_id: PlayerId,
        blueprint_id: BlueprintId,
    },
    BidPlaced {
        player_id: PlayerId,
        amount: Decimal,
    },
    BidPassed {
        player_id: PlayerId,
    },
    BlueprintWon {
        player_id: PlayerId,
        blueprint_id: BlueprintId,
        price: Decimal,
    },
    BlueprintUnsold {
        blueprint_id: BlueprintId,
    },
    AuctionPassed {
        player_id: PlayerId,
    },
    AuctionCompleted,
    BuildablePlaced {
        player_id: PlayerId,
        buildable_id: BuildableId,
    },
    TickApplied {
        total_ticks: u64,
        outcome: GridOutcome,
    },
    GamePaused,
    GameUnpaused,
    CommodityBought {
        player_id: PlayerId,
        fuel_type: FuelType,
        units: u32,
        total_price: Decimal,
    },
    CommoditySold {
        player_id: PlayerId,
        fuel_type: FuelType,
        units: u32,
        total_price: Decimal,
    },
    HexSurveyed {
        player_id: PlayerId,
        coordinates: CubeCoord,
    },
}

/// The successor snapshot plus everything observable that happened on the
/// way there.
#[derive(Debug, Clone)]
pub struct Applied {
    pub game: Game,
    pub events: Vec<GameEvent>,
}

/// Top-level aggregate for one match. Owned exclusively by the event
/// loop; everything else sees read-only snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: Uuid,
    pub phase: GamePhase,
    pub total_ticks: u64,
    pub random_seed: u64,
    pub players: BTreeMap<PlayerId, Player>,
    pub buildables: Vec<Buildable>,
    pub hex_grid: HexMap,
    pub commodity_market: CommodityMarket,
    pub auction: Option<Auction>,
    is_passing_allowed: bool,
    buildable_seq: u64,
}

impl Game {
    pub fn new(config: GameConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.random_seed);
        let hex_grid = config
            .map
            .unwrap_or_else(|| HexMap::build_with_rng(config.map_radius, &mut rng));
        Self {
            id: config.id,
            phase: GamePhase::Lobby,
            total_ticks: 0,
            random_seed: config.random_seed,
            players: BTreeMap::new(),
            buildables: Vec::new(),
            hex_grid,
            commodity_market: CommodityMarket::standard(),
            auction: None,
            is_passing_allowed: config.is_passing_allowed,
            buildable_seq: 0,
        }
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn plant(&self, id: BuildableId) -> Option<&PowerPlant> {
        self.buildables
            .iter()
            .filter_map(Buildable::as_plant)
            .find(|plant| plant.id == id)
    }

    pub fn plants(&self) -> impl Iterator<Item = &PowerPlant> {
        self.buildables.iter().filter_map(Buildable::as_plant)
    }

    pub fn bidder_order(&self) -> Vec<PlayerId> {
        auction::bidder_priority_order(&self.players, self.total_ticks, self.random_seed)
    }

    pub fn next_initiator(&self) -> Option<PlayerId> {
        let auction = self.auction.as_ref()?;
        auction::next_initiator(&self.bidder_order(), auction)
    }

    pub fn next_bidder(&self) -> Option<PlayerId> {
        let auction = self.auction.as_ref()?;
        auction::next_bidder(&self.bidder_order(), auction)
    }

    pub fn minimum_bid(&self) -> Option<Decimal> {
        let auction = self.auction.as_ref()?;
        auction::minimum_bid(auction, &STANDARD_CATALOG)
    }

    /// The periodic timer runs only while the game is plainly active.
    pub fn timer_should_run(&self) -> bool {
        self.phase == GamePhase::Active
    }

    /// Interpret one command against this snapshot. On success the full
    /// effect is committed into the returned `Game`; on any guard failure
    /// the receiver stays untouched and nothing partial escapes.
    pub fn apply(&self, command: &Command) -> Result<Applied, GameError> {
        let mut next = self.clone();
        let mut events = Vec::new();
        match command.kind.clone() {
            CommandKind::JoinGame { name } => next.join_game(command.caller, name, &mut events)?,
            CommandKind::StartGame => next.start_game(command.caller, &mut events)?,
            CommandKind::AddBuildable { options, ghost } => {
                next.add_buildable(command.caller, options, ghost, &mut events)?
            }
            CommandKind::Tick => next.tick(command.caller, &mut events)?,
            CommandKind::Pause => next.pause(command.caller, &mut events)?,
            CommandKind::Unpause => next.unpause(command.caller, &mut events)?,
            CommandKind::InitiateBid { blueprint_id } => {
                next.initiate_bid(command.caller, blueprint_id, &mut events)?
            }
            CommandKind::PassAuction => next.pass_auction(command.caller, &mut events)?,
            CommandKind::AuctionPlaceBid { amount } => {
                next.place_bid(command.caller, amount, &mut events)?
            }
            CommandKind::AuctionPassBid => next.pass_bid(command.caller, &mut events)?,
            CommandKind::BuyCommodity {
                fuel_type,
                units,
                power_plant_id,
            } => next.buy_commodity(command.caller, fuel_type, units, power_plant_id, &mut events)?,
            CommandKind::SellCommodity {
                fuel_type,
                units,
                power_plant_id,
            } => next.sell_commodity(command.caller, fuel_type, units, power_plant_id, &mut events)?,
            CommandKind::SurveyHexTile { coordinates } => {
                next.survey_hex_tile(command.caller, coordinates, &mut events)?
            }
        }
        Ok(Applied { game: next, events })
    }

    fn require_phase(&self, phase: GamePhase) -> Result<(), GameError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(GameError::WrongPhase { phase: self.phase })
        }
    }

    fn require_player(&self, id: PlayerId) -> Result<&Player, GameError> {
        self.players.get(&id).ok_or(GameError::UnknownCaller(id))
    }

    /// Buildable ids must come out identical for every observer, so they
    /// derive from the game seed and a creation counter rather than
    /// ambient randomness.
    fn mint_buildable_id(&mut self) -> BuildableId {
        self.buildable_seq += 1;
        Uuid::from_u64_pair(self.random_seed, self.buildable_seq)
    }

    fn plant_mut(&mut self, id: BuildableId) -> Option<&mut PowerPlant> {
        self.buildables.iter_mut().find_map(|buildable| match buildable {
            Buildable::PowerPlant(plant) if plant.id == id => Some(plant),
            _ => None,
        })
    }

    fn join_game(
        &mut self,
        caller: PlayerId,
        name: String,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        self.require_phase(GamePhase::Lobby)?;
        if self.players.contains_key(&caller) {
            return Err(GameError::AlreadyJoined(caller));
        }
        // The first successful join is the host; the flag is never
        // assigned again.
        let is_host = self.players.is_empty();
        events.push(GameEvent::PlayerJoined {
            player_id: caller,
            name: name.clone(),
            is_host,
        });
        self.players.insert(caller, Player::new(caller, name, is_host));
        Ok(())
    }

    fn start_game(&mut self, caller: PlayerId, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
        self.require_phase(GamePhase::Lobby)?;
        if !self.require_player(caller)?.is_host {
            return Err(GameError::NotHost);
        }
        let pool: Vec<BlueprintId> = STANDARD_CATALOG.keys().copied().collect();
        self.auction = Some(Auction::new(pool, self.is_passing_allowed));
        self.phase = GamePhase::Auction(AuctionStage::InitiatingBid);
        events.push(GameEvent::GameStarted);
        Ok(())
    }

    fn initiate_bid(
        &mut self,
        caller: PlayerId,
        blueprint_id: BlueprintId,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        self.require_phase(GamePhase::Auction(AuctionStage::InitiatingBid))?;
        self.require_player(caller)?;
        let order = self.bidder_order();
        let phase = self.phase;
        let auction = self.auction.as_mut().ok_or(GameError::WrongPhase { phase })?;
        if auction::next_initiator(&order, auction) != Some(caller) {
            return Err(GameError::OutOfTurn(caller));
        }
        if !auction.available_blueprint_ids.contains(&blueprint_id) {
            return Err(GameError::BlueprintUnavailable(blueprint_id));
        }
        auction.current_blueprint = Some(BlueprintBidding::new(blueprint_id));
        self.phase = GamePhase::Auction(AuctionStage::Bidding);
        events.push(GameEvent::BiddingOpened {
            player_id: caller,
            blueprint_id,
        });
        Ok(())
    }

    fn place_bid(
        &mut self,
        caller: PlayerId,
        amount: Decimal,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        self.require_phase(GamePhase::Auction(AuctionStage::Bidding))?;
        let have = self.require_player(caller)?.money;
        let order = self.bidder_order();
        let phase = self.phase;
        let auction = self.auction.as_mut().ok_or(GameError::WrongPhase { phase })?;
        if auction::next_bidder(&order, auction) != Some(caller) {
            return Err(GameError::OutOfTurn(caller));
        }
        let minimum = auction::minimum_bid(auction, &STANDARD_CATALOG)
            .ok_or(GameError::WrongPhase { phase })?;
        if amount < minimum {
            return Err(GameError::BidTooLow { amount, minimum });
        }
        if have < amount {
            return Err(GameError::InsufficientFunds { need: amount, have });
        }
        let Some(bidding) = auction.current_blueprint.as_mut() else {
            return Err(GameError::WrongPhase { phase });
        };
        bidding.bids.push(Bid {
            player_id: caller,
            amount: Some(amount),
            passed: false,
        });
        events.push(GameEvent::BidPlaced {
            player_id: caller,
            amount,
        });
        self.settle_bidding(&order, events)
    }

    fn pass_bid(&mut self, caller: PlayerId, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
        self.require_phase(GamePhase::Auction(AuctionStage::Bidding))?;
        self.require_player(caller)?;
        let order = self.bidder_order();
        let phase = self.phase;
        let auction = self.auction.as_mut().ok_or(GameError::WrongPhase { phase })?;
        if auction::next_bidder(&order, auction) != Some(caller) {
            return Err(GameError::OutOfTurn(caller));
        }
        let Some(bidding) = auction.current_blueprint.as_mut() else {
            return Err(GameError::WrongPhase { phase });
        };
        bidding.bids.push(Bid {
            player_id: caller,
            amount: None,
            passed: true,
        });
        events.push(GameEvent::BidPassed { player_id: caller });
        self.settle_bidding(&order, events)
    }

    fn pass_auction(
        &mut self,
        caller: PlayerId,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        self.require_phase(GamePhase::Auction(AuctionStage::InitiatingBid))?;
        self.require_player(caller)?;
        let order = self.bidder_order();
        let phase = self.phase;
        let auction = self.auction.as_mut().ok_or(GameError::WrongPhase { phase })?;
        if auction::next_initiator(&order, auction) != Some(caller) {
            return Err(GameError::OutOfTurn(caller));
        }
        if !auction.passing_allowed() {
            return Err(GameError::PassingNotAllowed);
        }
        auction.passed_player_ids.insert(caller);
        events.push(GameEvent::AuctionPassed { player_id: caller });
        self.settle_auction(events);
        Ok(())
    }

    /// After every bid or pass: close the cycle once at most one active
    /// bidder remains, then close the auction once everyone is out.
    fn settle_bidding(
        &mut self,
        order: &[PlayerId],
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        let phase = self.phase;
        let auction = self.auction.as_mut().ok_or(GameError::WrongPhase { phase })?;
        if !auction::should_end_bidding(order, auction) {
            return Ok(());
        }
        let Some(bidding) = auction.current_blueprint.take() else {
            return Ok(());
        };
        let won = auction::blueprint_winner(&bidding);
        if let Some((winner_id, price)) = won {
            auction.available_blueprint_ids.retain(|id| *id != bidding.blueprint_id);
            auction.purchases.push(Purchase {
                player_id: winner_id,
                blueprint_id: bidding.blueprint_id,
                price,
            });
        }
        self.phase = GamePhase::Auction(AuctionStage::InitiatingBid);
        match won {
            Some((winner_id, price)) => {
                let blueprint = STANDARD_CATALOG
                    .get(&bidding.blueprint_id)
                    .ok_or(GameError::UnknownBlueprint(bidding.blueprint_id))?;
                if let Some(player) = self.players.get_mut(&winner_id) {
                    // Affordability was checked when the bid was placed and
                    // a player purchases at most once per auction.
                    player.debit(price);
                    player.blueprints_by_id.insert(blueprint.id, blueprint.clone());
                }
                events.push(GameEvent::BlueprintWon {
                    player_id: winner_id,
                    blueprint_id: bidding.blueprint_id,
                    price,
                });
            }
            // Nobody offered money: the blueprint returns to the pool.
            None => events.push(GameEvent::BlueprintUnsold {
                blueprint_id: bidding.blueprint_id,
            }),
        }
        self.settle_auction(events);
        Ok(())
    }

    fn settle_auction(&mut self, events: &mut Vec<GameEvent>) {
        let Some(auction) = self.auction.as_ref() else {
            return;
        };
        if auction::should_end_auction(&self.players, auction) {
            self.auction = None;
            self.phase = GamePhase::Active;
            events.push(GameEvent::AuctionCompleted);
        }
    }

    fn add_buildable(
        &mut self,
        caller: PlayerId,
        options: BuildPlacement,
        ghost: bool,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        self.require_phase(GamePhase::Active)?;
        if ghost {
            return Err(GameError::GhostRejected);
        }
        let player = self.require_player(caller)?;
        match options {
            BuildPlacement::PowerPlant { blueprint_id, cell } => {
                let blueprint = player
                    .blueprints_by_id
                    .get(&blueprint_id)
                    .ok_or(GameError::UnknownBlueprint(blueprint_id))?
                    .clone();
                if !player.can_afford(blueprint.build_cost) {
                    return Err(GameError::InsufficientFunds {
                        need: blueprint.build_cost,
                        have: player.money,
                    });
                }
                let cell_data = self.hex_grid.cell(cell).ok_or(GameError::UnknownCell(cell))?;
                if !cell_data.terrain.is_buildable() {
                    return Err(GameError::InvalidPlacement("terrain cannot host a plant"));
                }
                if self.plants().any(|plant| plant.cell == cell) {
                    return Err(GameError::InvalidPlacement("cell already hosts a plant"));
                }
                let id = self.mint_buildable_id();
                if let Some(player) = self.players.get_mut(&caller) {
                    player.debit(blueprint.build_cost);
                    player.blueprints_by_id.remove(&blueprint_id);
                }
                self.buildables.push(Buildable::PowerPlant(PowerPlant::from_blueprint(
                    id, caller, &blueprint, cell,
                )));
                events.push(GameEvent::BuildablePlaced {
                    player_id: caller,
                    buildable_id: id,
                });
            }
            BuildPlacement::PowerPole { corner } => {
                if !player.can_afford(POLE_COST) {
                    return Err(GameError::InsufficientFunds {
                        need: POLE_COST,
                        have: player.money,
                    });
                }
                if !corner.touching_cells().iter().any(|coord| {
                    self.hex_grid
                        .cell(*coord)
                        .is_some_and(|cell| cell.terrain.is_buildable())
                }) {
                    return Err(GameError::InvalidPlacement(
                        "corner touches no buildable cell",
                    ));
                }
                if self
                    .buildables
                    .iter()
                    .filter_map(Buildable::as_pole)
                    .any(|pole| pole.corner == corner)
                {
                    return Err(GameError::InvalidPlacement("corner already hosts a pole"));
                }
                let id = self.mint_buildable_id();
                // Wiring happens at placement: edge-adjacent poles and
                // plants on a touched cell, linked symmetrically.
                let neighbor_corners = corner.adjacent_corners();
                let mut connected: BTreeSet<BuildableId> = BTreeSet::new();
                for buildable in &self.buildables {
                    match buildable {
                        Buildable::PowerPole(pole) if neighbor_corners.contains(&pole.corner) => {
                            connected.insert(pole.id);
                        }
                        Buildable::PowerPlant(plant) if corner.touches(plant.cell) => {
                            connected.insert(plant.id);
                        }
                        _ => {}
                    }
                }
                for buildable in &mut self.buildables {
                    if let Buildable::PowerPole(pole) = buildable {
                        if connected.contains(&pole.id) {
                            pole.connected_to_ids.insert(id);
                        }
                    }
                }
                if let Some(player) = self.players.get_mut(&caller) {
                    player.debit(POLE_COST);
                }
                self.buildables.push(Buildable::PowerPole(PowerPole {
                    id,
                    player_id: caller,
                    is_ghost: false,
                    corner,
                    connected_to_ids: connected,
                }));
                events.push(GameEvent::BuildablePlaced {
                    player_id: caller,
                    buildable_id: id,
                });
            }
        }
        Ok(())
    }

    fn tick(&mut self, caller: PlayerId, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
        self.require_phase(GamePhase::Active)?;
        if caller != SERVICE_CALLER {
            return Err(GameError::NotService);
        }
        self.total_ticks += 1;
        let outcome = grid::resolve_hour(&self.hex_grid, &self.buildables);
        for (plant_id, burned) in &outcome.fuel_burned_per_plant {
            if let Some(plant) = self.plant_mut(*plant_id) {
                if let Some(fuel) = plant.current_fuel_storage.as_mut() {
                    *fuel = (*fuel - *burned).max(Decimal::ZERO);
                }
            }
        }
        for (player_id, income) in &outcome.income_per_player {
            if let Some(player) = self.players.get_mut(player_id) {
                player.credit(*income);
            }
        }
        for (player_id, kwh) in &outcome.power_sold_per_player_kwh {
            if let Some(player) = self.players.get_mut(player_id) {
                player.power_sold_kwh += *kwh;
            }
        }
        events.push(GameEvent::TickApplied {
            total_ticks: self.total_ticks,
            outcome,
        });
        Ok(())
    }

    fn pause(&mut self, caller: PlayerId, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
        self.require_phase(GamePhase::Active)?;
        self.require_player(caller)?;
        self.phase = GamePhase::Paused;
        events.push(GameEvent::GamePaused);
        Ok(())
    }

    fn unpause(&mut self, caller: PlayerId, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
        self.require_phase(GamePhase::Paused)?;
        self.require_player(caller)?;
        self.phase = GamePhase::Active;
        events.push(GameEvent::GameUnpaused);
        Ok(())
    }

    fn buy_commodity(
        &mut self,
        caller: PlayerId,
        fuel_type: FuelType,
        units: u32,
        power_plant_id: BuildableId,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        self.require_phase(GamePhase::Active)?;
        if units == 0 {
            return Err(GameError::ZeroUnits);
        }
        let have = self.require_player(caller)?.money;
        let plant = self
            .plant(power_plant_id)
            .ok_or(GameError::UnknownPlant(power_plant_id))?;
        if plant.player_id != caller {
            return Err(GameError::NotPlantOwner(power_plant_id));
        }
        if plant.fuel_type != Some(fuel_type) {
            return Err(GameError::WrongFuelType(fuel_type));
        }
        let quantity = Decimal::from(units);
        if plant.fuel_headroom() < quantity {
            return Err(GameError::StorageFull);
        }
        let total = self.commodity_market.market_rates(fuel_type).buy_price * quantity;
        if have < total {
            return Err(GameError::InsufficientFunds { need: total, have });
        }
        if let Some(player) = self.players.get_mut(&caller) {
            player.debit(total);
        }
        if let Some(plant) = self.plant_mut(power_plant_id) {
            if let Some(fuel) = plant.current_fuel_storage.as_mut() {
                *fuel += quantity;
            }
        }
        self.commodity_market.apply_buy(fuel_type, units);
        events.push(GameEvent::CommodityBought {
            player_id: caller,
            fuel_type,
            units,
            total_price: total,
        });
        Ok(())
    }

    fn sell_commodity(
        &mut self,
        caller: PlayerId,
        fuel_type: FuelType,
        units: u32,
        power_plant_id: BuildableId,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        self.require_phase(GamePhase::Active)?;
        if units == 0 {
            return Err(GameError::ZeroUnits);
        }
        self.require_player(caller)?;
        let plant = self
            .plant(power_plant_id)
            .ok_or(GameError::UnknownPlant(power_plant_id))?;
        if plant.player_id != caller {
            return Err(GameError::NotPlantOwner(power_plant_id));
        }
        if plant.fuel_type != Some(fuel_type) {
            return Err(GameError::WrongFuelType(fuel_type));
        }
        let quantity = Decimal::from(units);
        if plant.current_fuel_storage.unwrap_or(Decimal::ZERO) < quantity {
            return Err(GameError::InsufficientFuel);
        }
        let total = self.commodity_market.market_rates(fuel_type).sell_price * quantity;
        if let Some(player) = self.players.get_mut(&caller) {
            player.credit(total);
        }
        if let Some(plant) = self.plant_mut(power_plant_id) {
            if let Some(fuel) = plant.current_fuel_storage.as_mut() {
                *fuel -= quantity;
            }
        }
        self.commodity_market.apply_sell(fuel_type, units);
        events.push(GameEvent::CommoditySold {
            player_id: caller,
            fuel_type,
            units,
            total_price: total,
        });
        Ok(())
    }

    fn survey_hex_tile(
        &mut self,
        caller: PlayerId,
        coordinates: CubeCoord,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        self.require_phase(GamePhase::Active)?;
        self.require_player(caller)?;
        let cell = self
            .hex_grid
            .cell(coordinates)
            .ok_or(GameError::UnknownCell(coordinates))?;
        let result = SurveyResult {
            coord: cell.coord,
            terrain: cell.terrain,
            deposit: cell.deposit,
            surveyed_at_tick: self.total_ticks,
        };
        if let Some(player) = self.players.get_mut(&caller) {
            player.record_survey(result);
        }
        // The event names the cell but not what the survey found; the
        // reading itself is only in the caller's private view.
        events.push(GameEvent::HexSurveyed {
            player_id: caller,
            coordinates,
        });
        Ok(())
    }
}
