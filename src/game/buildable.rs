use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::coords::{CornerCoord, CubeCoord};
use crate::game::player::PlayerId;
use crate::types::FuelType;

pub type BuildableId = Uuid;
pub type BlueprintId = u16;

pub const POLE_COST: Decimal = dec!(5);

/// An unbuilt plant design: purchasable at auction, convertible into a
/// PowerPlant via ADD_BUILDABLE.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blueprint {
    pub id: BlueprintId,
    pub name: String,
    pub power_generation_kw: Decimal,
    pub price_per_kwh: Decimal,
    pub fuel_type: Option<FuelType>,
    pub fuel_consumption_per_kwh: Option<Decimal>,
    pub max_fuel_storage: Option<Decimal>,
    pub build_cost: Decimal,
    pub starting_bid: Decimal,
}

pub static STANDARD_CATALOG: Lazy<BTreeMap<BlueprintId, Blueprint>> = Lazy::new(|| {
    let designs = vec![
        Blueprint {
            id: 1,
            name: "Sparrow Wind Turbine".to_string(),
            power_generation_kw: dec!(150),
            price_per_kwh: dec!(0.22),
            fuel_type: None,
            fuel_consumption_per_kwh: None,
            max_fuel_storage: None,
            build_cost: dec!(10),
            starting_bid: dec!(8),
        },
        Blueprint {
            id: 2,
            name: "Breeze Ridge Farm".to_string(),
            power_generation_kw: dec!(250),
            price_per_kwh: dec!(0.20),
            fuel_type: None,
            fuel_consumption_per_kwh: None,
            max_fuel_storage: None,
            build_cost: dec!(18),
            starting_bid: dec!(12),
        },
        Blueprint {
            id: 3,
            name: "Lignite Burner".to_string(),
            power_generation_kw: dec!(400),
            price_per_kwh: dec!(0.12),
            fuel_type: Some(FuelType::Coal),
            fuel_consumption_per_kwh: Some(dec!(0.4)),
            max_fuel_storage: Some(dec!(800)),
            build_cost: dec!(25),
            starting_bid: dec!(15),
        },
        Blueprint {
            id: 4,
            name: "Heavy Oil Peaker".to_string(),
            power_generation_kw: dec!(300),
            price_per_kwh: dec!(0.18),
            fuel_type: Some(FuelType::Oil),
            fuel_consumption_per_kwh: Some(dec!(0.3)),
            max_fuel_storage: Some(dec!(500)),
            build_cost: dec!(20),
            starting_bid: dec!(12),
        },
        Blueprint {
            id: 5,
            name: "Twin Cycle Gas Plant".to_string(),
            power_generation_kw: dec!(500),
            price_per_kwh: dec!(0.10),
            fuel_type: Some(FuelType::Gas),
            fuel_consumption_per_kwh: Some(dec!(0.5)),
            max_fuel_storage: Some(dec!(1000)),
            build_cost: dec!(35),
            starting_bid: dec!(20),
        },
        Blueprint {
            id: 6,
            name: "Hermes Reactor".to_string(),
            power_generation_kw: dec!(900),
            price_per_kwh: dec!(0.08),
            fuel_type: Some(FuelType::Uranium),
            fuel_consumption_per_kwh: Some(dec!(0.02)),
            max_fuel_storage: Some(dec!(60)),
            build_cost: dec!(60),
            starting_bid: dec!(35),
        },
    ];
    designs.into_iter().map(|bp| (bp.id, bp)).collect()
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerPlant {
    pub id: BuildableId,
    pub player_id: PlayerId,
    pub is_ghost: bool,
    pub blueprint_id: BlueprintId,
    pub cell: CubeCoord,
    pub power_generation_kw: Decimal,
    pub price_per_kwh: Decimal,
    pub fuel_type: Option<FuelType>,
    pub fuel_consumption_per_kwh: Option<Decimal>,
    pub max_fuel_storage: Option<Decimal>,
    pub current_fuel_storage: Option<Decimal>,
}

impl PowerPlant {
    pub fn from_blueprint(
        id: BuildableId,
        player_id: PlayerId,
        blueprint: &Blueprint,
        cell: CubeCoord,
    ) -> Self {
        Self {
            id,
            player_id,
            is_ghost: false,
            blueprint_id: blueprint.id,
            cell,
            power_generation_kw: blueprint.power_generation_kw,
            price_per_kwh: blueprint.price_per_kwh,
            fuel_type: blueprint.fuel_type,
            fuel_consumption_per_kwh: blueprint.fuel_consumption_per_kwh,
            max_fuel_storage: blueprint.max_fuel_storage,
            current_fuel_storage: blueprint.fuel_type.map(|_| Decimal::ZERO),
        }
    }

    /// kWh this plant could deliver over one simulated hour, capped by
    /// nameplate capacity and remaining fuel.
    pub fn available_capacity_kwh(&self) -> Decimal {
        match (self.fuel_consumption_per_kwh, self.current_fuel_storage) {
            (Some(per_kwh), Some(fuel)) if per_kwh > Decimal::ZERO => {
                self.power_generation_kw.min(fuel / per_kwh)
            }
            _ => self.power_generation_kw,
        }
    }

    pub fn fuel_headroom(&self) -> Decimal {
        match (self.max_fuel_storage, self.current_fuel_storage) {
            (Some(max), Some(current)) => (max - current).max(Decimal::ZERO),
            _ => Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerPole {
    pub id: BuildableId,
    pub player_id: PlayerId,
    pub is_ghost: bool,
    pub corner: CornerCoord,
    pub connected_to_ids: BTreeSet<BuildableId>,
}

/// A placed, persistent game object. Placement is immutable after
/// creation; only plant fuel levels and pole adjacency mutate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Buildable {
    PowerPlant(PowerPlant),
    PowerPole(PowerPole),
}

impl Buildable {
    pub fn id(&self) -> BuildableId {
        match self {
            Buildable::PowerPlant(plant) => plant.id,
            Buildable::PowerPole(pole) => pole.id,
        }
    }

    pub fn player_id(&self) -> PlayerId {
        match self {
            Buildable::PowerPlant(plant) => plant.player_id,
            Buildable::PowerPole(pole) => pole.player_id,
        }
    }

    pub fn is_ghost(&self) -> bool {
        match self {
            Buildable::PowerPlant(plant) => plant.is_ghost,
            Buildable::PowerPole(pole) => pole.is_ghost,
        }
    }

    pub fn as_plant(&self) -> Option<&PowerPlant> {
        match self {
            Buildable::PowerPlant(plant) => Some(plant),
            Buildable::PowerPole(_) => None,
        }
    }

    pub fn as_pole(&self) -> Option<&PowerPole> {
        match self {
            Buildable::PowerPole(pole) => Some(pole),
            Buildable::PowerPlant(_) => None,
        }
    }
}
