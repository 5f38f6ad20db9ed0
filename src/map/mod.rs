use std::collections::BTreeMap;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::coords::{CubeCoord, disk};
use crate::types::{FuelType, Terrain};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    pub coord: CubeCoord,
    pub terrain: Terrain,
    pub population: u32,
    pub deposit: Option<FuelType>,
}

/// Read-mostly hex topology: terrain, population demand and fuel deposits.
/// The engine never mutates the map after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HexMap {
    pub radius: i32,
    #[serde(with = "cells_as_list")]
    pub cells: BTreeMap<CubeCoord, Cell>,
}

/// JSON object keys must be strings, so the cell map travels as a list
/// and is re-keyed by coordinate on the way back in.
mod cells_as_list {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serializer};

    use super::Cell;
    use crate::coords::CubeCoord;

    pub fn serialize<S: Serializer>(
        cells: &BTreeMap<CubeCoord, Cell>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(cells.values())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<CubeCoord, Cell>, D::Error> {
        let cells = Vec::<Cell>::deserialize(deserializer)?;
        Ok(cells.into_iter().map(|cell| (cell.coord, cell)).collect())
    }
}

impl HexMap {
    pub fn build_with_rng(radius: i32, rng: &mut impl Rng) -> Self {
        let mut cells = BTreeMap::new();
        for coord in disk(radius) {
            let terrain = roll_terrain(rng);
            cells.insert(
                coord,
                Cell {
                    coord,
                    terrain,
                    population: 0,
                    deposit: None,
                },
            );
        }

        let land: Vec<CubeCoord> = cells
            .values()
            .filter(|cell| cell.terrain.is_buildable())
            .map(|cell| cell.coord)
            .collect();

        let towns = (radius.max(2) as usize) + 1;
        for coord in land.choose_multiple(rng, towns) {
            if let Some(cell) = cells.get_mut(coord) {
                cell.population = rng.gen_range(150..=900);
            }
        }

        for fuel in FuelType::ALL {
            let deposits = (radius as usize / 2) + 1;
            for coord in land.choose_multiple(rng, deposits) {
                if let Some(cell) = cells.get_mut(coord) {
                    if cell.deposit.is_none() {
                        cell.deposit = Some(fuel);
                    }
                }
            }
        }

        Self { radius, cells }
    }

    pub fn cell(&self, coord: CubeCoord) -> Option<&Cell> {
        self.cells.get(&coord)
    }

    pub fn contains(&self, coord: CubeCoord) -> bool {
        self.cells.contains_key(&coord)
    }

    pub fn population_of(&self, coord: CubeCoord) -> u32 {
        self.cell(coord).map_or(0, |cell| cell.population)
    }

    pub fn total_population(&self) -> u32 {
        self.cells.values().map(|cell| cell.population).sum()
    }
}

fn roll_terrain(rng: &mut impl Rng) -> Terrain {
    match rng.gen_range(0..100) {
        0..=39 => Terrain::Plains,
        40..=59 => Terrain::Forest,
        60..=74 => Terrain::Hills,
        75..=84 => Terrain::Mountain,
        _ => Terrain::Water,
    }
}
