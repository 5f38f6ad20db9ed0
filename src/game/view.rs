use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::coords::CubeCoord;
use crate::game::auction::Auction;
use crate::game::buildable::{Blueprint, Buildable};
use crate::game::market::MarketRates;
use crate::game::player::{PlayerId, SurveyResult};
use crate::game::state::{Game, GamePhase};
use crate::types::{FuelType, Terrain};

#[derive(Debug, Clone, Serialize)]
pub struct PublicPlayerView {
    pub id: PlayerId,
    pub name: String,
    pub money: Decimal,
    pub power_sold_kwh: Decimal,
    pub is_host: bool,
    pub blueprint_count: usize,
}

/// A map cell as every observer sees it. Deposits are withheld; they
/// only surface through a player's own surveys.
#[derive(Debug, Clone, Serialize)]
pub struct PublicCellView {
    pub coord: CubeCoord,
    pub terrain: Terrain,
    pub population: u32,
}

/// The broadcast snapshot: everything every observer may see.
#[derive(Debug, Clone, Serialize)]
pub struct PublicGameView {
    pub id: Uuid,
    pub phase: GamePhase,
    pub total_ticks: u64,
    pub players: Vec<PublicPlayerView>,
    pub buildables: Vec<Buildable>,
    pub map: Vec<PublicCellView>,
    pub market_rates: BTreeMap<FuelType, MarketRates>,
    pub auction: Option<Auction>,
}

/// One player's private snapshot: the broadcast view plus what only they
/// know.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerGameView {
    pub game: PublicGameView,
    pub blueprints: Vec<Blueprint>,
    pub surveys: Vec<SurveyResult>,
}

pub fn public_view(game: &Game) -> PublicGameView {
    PublicGameView {
        id: game.id,
        phase: game.phase,
        total_ticks: game.total_ticks,
        players: game
            .players
            .values()
            .map(|player| PublicPlayerView {
                id: player.id,
                name: player.name.clone(),
                money: player.money,
                power_sold_kwh: player.power_sold_kwh,
                is_host: player.is_host,
                blueprint_count: player.blueprints_by_id.len(),
            })
            .collect(),
        buildables: game.buildables.clone(),
        map: game
            .hex_grid
            .cells
            .values()
            .map(|cell| PublicCellView {
                coord: cell.coord,
                terrain: cell.terrain,
                population: cell.population,
            })
            .collect(),
        market_rates: FuelType::ALL
            .iter()
            .map(|fuel| (*fuel, game.commodity_market.market_rates(*fuel)))
            .collect(),
        auction: game.auction.clone(),
    }
}

pub fn player_view(game: &Game, player_id: PlayerId) -> Option<PlayerGameView> {
    let player = game.player(player_id)?;
    Some(PlayerGameView {
        game: public_view(game),
        blueprints: player.blueprints_by_id.values().cloned().collect(),
        surveys: player.surveys.clone(),
    })
}
