use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::coords::CubeCoord;
use crate::game::buildable::{Blueprint, BlueprintId};
use crate::types::{FuelType, Terrain};

pub type PlayerId = Uuid;

pub const STARTING_MONEY: Decimal = dec!(150);

/// What a survey revealed about one cell. Private to the surveying
/// player until broader reveal mechanics exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyResult {
    pub coord: CubeCoord,
    pub terrain: Terrain,
    pub deposit: Option<FuelType>,
    pub surveyed_at_tick: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub money: Decimal,
    pub power_sold_kwh: Decimal,
    pub is_host: bool,
    pub blueprints_by_id: BTreeMap<BlueprintId, Blueprint>,
    pub surveys: Vec<SurveyResult>,
}

impl Player {
    pub fn new(id: PlayerId, name: String, is_host: bool) -> Self {
        Self {
            id,
            name,
            money: STARTING_MONEY,
            power_sold_kwh: Decimal::ZERO,
            is_host,
            blueprints_by_id: BTreeMap::new(),
            surveys: Vec::new(),
        }
    }

    /// Re-surveying a cell replaces the earlier reading.
    pub fn record_survey(&mut self, result: SurveyResult) {
        self.surveys.retain(|survey| survey.coord != result.coord);
        self.surveys.push(result);
    }

    pub fn can_afford(&self, amount: Decimal) -> bool {
        self.money >= amount
    }

    pub fn credit(&mut self, amount: Decimal) {
        self.money += amount;
    }

    /// Caller must have checked `can_afford`; money never goes negative.
    pub fn debit(&mut self, amount: Decimal) {
        debug_assert!(self.money >= amount, "debit past zero");
        self.money -= amount;
    }
}
