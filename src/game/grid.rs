use std::collections::{BTreeMap, BTreeSet, VecDeque};

use itertools::Itertools;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::coords::CubeCoord;
use crate::game::buildable::{Buildable, BuildableId, PowerPlant};
use crate::game::player::PlayerId;
use crate::map::HexMap;

/// Hourly demand per inhabitant of a serviced cell.
pub const KWH_PER_CAPITA: Decimal = dec!(1);

/// What one simulated hour of grid operation produced. Applied
/// atomically by the state machine; the resolver itself mutates nothing.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GridOutcome {
    pub income_per_player: BTreeMap<PlayerId, Decimal>,
    pub power_sold_per_player_kwh: BTreeMap<PlayerId, Decimal>,
    pub power_sold_per_plant_kwh: BTreeMap<BuildableId, Decimal>,
    pub fuel_burned_per_plant: BTreeMap<BuildableId, Decimal>,
}

/// Resolve one simulated hour: connected components over pole adjacency,
/// population-weighted demand of the cells each component services, and
/// cheapest-price-first allocation of capacity against that demand.
pub fn resolve_hour(map: &HexMap, buildables: &[Buildable]) -> GridOutcome {
    let mut outcome = GridOutcome::default();
    let by_id: BTreeMap<BuildableId, &Buildable> = buildables
        .iter()
        .filter(|buildable| !buildable.is_ghost())
        .map(|buildable| (buildable.id(), buildable))
        .collect();

    let adjacency = undirected_adjacency(&by_id);

    let mut visited: BTreeSet<BuildableId> = BTreeSet::new();
    for start in by_id.keys().copied() {
        if visited.contains(&start) {
            continue;
        }
        let component = walk_component(start, &adjacency, &mut visited);
        resolve_component(map, &by_id, &component, &mut outcome);
    }
    outcome
}

fn undirected_adjacency(
    by_id: &BTreeMap<BuildableId, &Buildable>,
) -> BTreeMap<BuildableId, BTreeSet<BuildableId>> {
    let mut adjacency: BTreeMap<BuildableId, BTreeSet<BuildableId>> = BTreeMap::new();
    for id in by_id.keys() {
        adjacency.entry(*id).or_default();
    }
    for buildable in by_id.values() {
        let Some(pole) = buildable.as_pole() else {
            continue;
        };
        for other in &pole.connected_to_ids {
            if !by_id.contains_key(other) {
                continue;
            }
            adjacency.entry(pole.id).or_default().insert(*other);
            adjacency.entry(*other).or_default().insert(pole.id);
        }
    }
    adjacency
}

fn walk_component(
    start: BuildableId,
    adjacency: &BTreeMap<BuildableId, BTreeSet<BuildableId>>,
    visited: &mut BTreeSet<BuildableId>,
) -> Vec<BuildableId> {
    let mut component = Vec::new();
    let mut queue = VecDeque::from([start]);
    while let Some(id) = queue.pop_front() {
        if !visited.insert(id) {
            continue;
        }
        component.push(id);
        if let Some(neighbors) = adjacency.get(&id) {
            queue.extend(neighbors.iter().copied());
        }
    }
    component
}

fn resolve_component(
    map: &HexMap,
    by_id: &BTreeMap<BuildableId, &Buildable>,
    component: &[BuildableId],
    outcome: &mut GridOutcome,
) {
    let plants: Vec<&PowerPlant> = component
        .iter()
        .filter_map(|id| by_id.get(id).and_then(|buildable| buildable.as_plant()))
        // Cheapest sellers are dispatched first; ties broken by id so
        // allocation is identical for every observer.
        .sorted_by_key(|plant| (plant.price_per_kwh, plant.id))
        .collect();
    if plants.is_empty() {
        return;
    }

    let mut remaining_demand = component_demand(map, by_id, component);
    for plant in plants {
        if remaining_demand <= Decimal::ZERO {
            break;
        }
        let sold = plant.available_capacity_kwh().min(remaining_demand);
        if sold <= Decimal::ZERO {
            continue;
        }
        remaining_demand -= sold;

        let income = plant.price_per_kwh * sold;
        *outcome
            .income_per_player
            .entry(plant.player_id)
            .or_default() += income;
        *outcome
            .power_sold_per_player_kwh
            .entry(plant.player_id)
            .or_default() += sold;
        *outcome
            .power_sold_per_plant_kwh
            .entry(plant.id)
            .or_default() += sold;
        if let Some(per_kwh) = plant.fuel_consumption_per_kwh {
            if per_kwh > Decimal::ZERO {
                *outcome
                    .fuel_burned_per_plant
                    .entry(plant.id)
                    .or_default() += per_kwh * sold;
            }
        }
    }
}

/// Population-weighted demand of every cell the component reaches: each
/// plant's own cell plus the cells touching each pole corner.
fn component_demand(
    map: &HexMap,
    by_id: &BTreeMap<BuildableId, &Buildable>,
    component: &[BuildableId],
) -> Decimal {
    let mut serviced: BTreeSet<CubeCoord> = BTreeSet::new();
    for id in component {
        match by_id.get(id) {
            Some(Buildable::PowerPlant(plant)) => {
                serviced.insert(plant.cell);
            }
            Some(Buildable::PowerPole(pole)) => {
                for cell in pole.corner.touching_cells() {
                    if map.contains(cell) {
                        serviced.insert(cell);
                    }
                }
            }
            None => {}
        }
    }
    serviced
        .iter()
        .map(|cell| Decimal::from(map.population_of(*cell)) * KWH_PER_CAPITA)
        .sum()
}
