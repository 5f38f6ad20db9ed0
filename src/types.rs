use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FuelType {
    Coal,
    Oil,
    Gas,
    Uranium,
}

impl FuelType {
    pub const ALL: [FuelType; 4] = [
        FuelType::Coal,
        FuelType::Oil,
        FuelType::Gas,
        FuelType::Uranium,
    ];
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, EnumIter,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Terrain {
    Plains,
    Forest,
    Hills,
    Mountain,
    Water,
}

impl Terrain {
    /// Water cells cannot host plants or pole corners.
    pub fn is_buildable(self) -> bool {
        !matches!(self, Terrain::Water)
    }
}
