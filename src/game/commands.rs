use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::coords::{CornerCoord, CubeCoord};
use crate::game::buildable::{BlueprintId, BuildableId};
use crate::game::player::PlayerId;
use crate::types::FuelType;

/// Caller identity used by service-originated commands (timer ticks).
pub const SERVICE_CALLER: PlayerId = Uuid::nil();

/// A schema-validated command: deserializing one IS the schema check,
/// anything malformed never reaches the state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub caller: PlayerId,
    #[serde(flatten)]
    pub kind: CommandKind,
}

impl Command {
    pub fn new(caller: PlayerId, kind: CommandKind) -> Self {
        Self { caller, kind }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandKind {
    JoinGame {
        name: String,
    },
    StartGame,
    AddBuildable {
        options: BuildPlacement,
        #[serde(default)]
        ghost: bool,
    },
    Tick,
    Pause,
    Unpause,
    InitiateBid {
        blueprint_id: BlueprintId,
    },
    PassAuction,
    AuctionPlaceBid {
        amount: Decimal,
    },
    AuctionPassBid,
    BuyCommodity {
        fuel_type: FuelType,
        units: u32,
        power_plant_id: BuildableId,
    },
    SellCommodity {
        fuel_type: FuelType,
        units: u32,
        power_plant_id: BuildableId,
    },
    SurveyHexTile {
        coordinates: CubeCoord,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildPlacement {
    PowerPlant {
        blueprint_id: BlueprintId,
        cell: CubeCoord,
    },
    PowerPole {
        corner: CornerCoord,
    },
}
