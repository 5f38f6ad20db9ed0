use clap::Parser;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use uuid::Uuid;

use megawatt::coords::cell_corners;
use megawatt::game::{
    AuctionStage, BlueprintId, BuildPlacement, Command, CommandKind, Game, GameConfig, GamePhase,
    PlayerId, SERVICE_CALLER, STANDARD_CATALOG, public_view,
};

const AUCTION_STEP_LIMIT: usize = 1_000;

#[derive(Debug, Parser)]
#[command(name = "megawatt-sim")]
#[command(about = "Headless match driver - scripted players exercising the full command surface")]
struct Args {
    /// Number of scripted players
    #[arg(short = 'n', long, default_value_t = 3)]
    players: usize,

    /// Simulated hours to run after the opening auction
    #[arg(short = 't', long, default_value_t = 24)]
    ticks: u64,

    /// Random seed for reproducibility
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Map radius in cells
    #[arg(long, default_value_t = 3)]
    radius: i32,

    /// Print the final public snapshot as JSON
    #[arg(long)]
    json: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let config = GameConfig {
        id: Uuid::new_v4(),
        random_seed: args.seed,
        map_radius: args.radius,
        ..GameConfig::default()
    };
    let mut game = Game::new(config);

    let ids: Vec<PlayerId> = (1..=args.players)
        .map(|n| Uuid::from_u128(n as u128))
        .collect();
    for (index, id) in ids.iter().enumerate() {
        submit(
            &mut game,
            Command::new(
                *id,
                CommandKind::JoinGame {
                    name: format!("Player {}", index + 1),
                },
            ),
        );
    }
    submit(&mut game, Command::new(ids[0], CommandKind::StartGame));

    run_opening_auction(&mut game);
    build_starting_grids(&mut game, &ids);
    stock_fuel(&mut game);

    // A pause/unpause round-trip before the clock runs.
    submit(&mut game, Command::new(ids[0], CommandKind::Pause));
    submit(&mut game, Command::new(ids[0], CommandKind::Unpause));

    for _ in 0..args.ticks {
        submit(&mut game, Command::new(SERVICE_CALLER, CommandKind::Tick));
    }

    sell_leftover_fuel(&mut game);

    println!(
        "=== after {} simulated hours ({} inhabitants on the map) ===",
        game.total_ticks,
        game.hex_grid.total_population(),
    );
    for player in game.players.values() {
        println!(
            "{:<12} money {:>8}  sold {:>8} kWh{}",
            player.name,
            player.money.round_dp(2),
            player.power_sold_kwh.round_dp(0),
            if player.is_host { "  (host)" } else { "" },
        );
    }
    if args.json {
        match serde_json::to_string_pretty(&public_view(&game)) {
            Ok(json) => println!("{json}"),
            Err(error) => eprintln!("snapshot serialization failed: {error}"),
        }
    }
}

fn submit(game: &mut Game, command: Command) -> bool {
    match game.apply(&command) {
        Ok(applied) => {
            for event in &applied.events {
                log::info!("{event:?}");
            }
            *game = applied.game;
            true
        }
        Err(error) => {
            log::debug!("dropped {:?}: {error}", command.kind);
            false
        }
    }
}

/// Naive auction script: initiators open the cheapest design they can
/// afford, every bidder raises once at the minimum, then drops out.
fn run_opening_auction(game: &mut Game) {
    for _ in 0..AUCTION_STEP_LIMIT {
        match game.phase {
            GamePhase::Auction(AuctionStage::InitiatingBid) => {
                let Some(initiator) = game.next_initiator() else {
                    break;
                };
                match cheapest_affordable(game, initiator) {
                    Some(blueprint_id) => submit(
                        game,
                        Command::new(initiator, CommandKind::InitiateBid { blueprint_id }),
                    ),
                    None => submit(game, Command::new(initiator, CommandKind::PassAuction)),
                };
            }
            GamePhase::Auction(AuctionStage::Bidding) => {
                let Some(bidder) = game.next_bidder() else {
                    break;
                };
                let minimum = game.minimum_bid().unwrap_or(Decimal::ZERO);
                let wants_one = game
                    .player(bidder)
                    .is_some_and(|player| player.blueprints_by_id.is_empty() && player.money >= minimum);
                if wants_one && !has_bid(game, bidder) {
                    submit(
                        game,
                        Command::new(bidder, CommandKind::AuctionPlaceBid { amount: minimum }),
                    );
                } else {
                    submit(game, Command::new(bidder, CommandKind::AuctionPassBid));
                }
            }
            _ => break,
        }
    }
}

fn cheapest_affordable(game: &Game, player_id: PlayerId) -> Option<BlueprintId> {
    let player = game.player(player_id)?;
    if !player.blueprints_by_id.is_empty() {
        return None;
    }
    let auction = game.auction.as_ref()?;
    auction
        .available_blueprint_ids
        .iter()
        .filter_map(|id| STANDARD_CATALOG.get(id))
        .filter(|blueprint| blueprint.starting_bid <= player.money)
        .min_by_key(|blueprint| (blueprint.starting_bid, blueprint.id))
        .map(|blueprint| blueprint.id)
}

fn has_bid(game: &Game, player_id: PlayerId) -> bool {
    game.auction
        .as_ref()
        .and_then(|auction| auction.current_blueprint.as_ref())
        .is_some_and(|bidding| {
            bidding
                .bids
                .iter()
                .any(|bid| bid.player_id == player_id && bid.amount.is_some())
        })
}

/// Each blueprint owner builds on a free town cell, then surveys it and
/// strings a pole from one of its corners.
fn build_starting_grids(game: &mut Game, ids: &[PlayerId]) {
    for id in ids {
        let Some(blueprint_id) = game
            .player(*id)
            .and_then(|player| player.blueprints_by_id.keys().next().copied())
        else {
            continue;
        };
        let Some(cell) = game
            .hex_grid
            .cells
            .values()
            .filter(|cell| cell.terrain.is_buildable() && cell.population > 0)
            .map(|cell| cell.coord)
            .find(|coord| game.plants().all(|plant| plant.cell != *coord))
        else {
            continue;
        };
        submit(
            game,
            Command::new(
                *id,
                CommandKind::AddBuildable {
                    options: BuildPlacement::PowerPlant { blueprint_id, cell },
                    ghost: false,
                },
            ),
        );
        submit(
            game,
            Command::new(*id, CommandKind::SurveyHexTile { coordinates: cell }),
        );
        submit(
            game,
            Command::new(
                *id,
                CommandKind::AddBuildable {
                    options: BuildPlacement::PowerPole {
                        corner: cell_corners(cell)[0],
                    },
                    ghost: false,
                },
            ),
        );
    }
}

fn stock_fuel(game: &mut Game) {
    let orders: Vec<(PlayerId, megawatt::FuelType, u32, uuid::Uuid)> = game
        .plants()
        .filter_map(|plant| {
            let fuel = plant.fuel_type?;
            let units = plant.fuel_headroom().min(dec!(50)).trunc().to_u32()?;
            (units > 0).then_some((plant.player_id, fuel, units, plant.id))
        })
        .collect();
    for (player_id, fuel_type, units, power_plant_id) in orders {
        submit(
            game,
            Command::new(
                player_id,
                CommandKind::BuyCommodity {
                    fuel_type,
                    units,
                    power_plant_id,
                },
            ),
        );
    }
}

fn sell_leftover_fuel(game: &mut Game) {
    let orders: Vec<(PlayerId, megawatt::FuelType, uuid::Uuid)> = game
        .plants()
        .filter_map(|plant| {
            let fuel = plant.fuel_type?;
            let stored = plant.current_fuel_storage.unwrap_or(Decimal::ZERO);
            (stored >= dec!(5)).then_some((plant.player_id, fuel, plant.id))
        })
        .collect();
    for (player_id, fuel_type, power_plant_id) in orders {
        submit(
            game,
            Command::new(
                player_id,
                CommandKind::SellCommodity {
                    fuel_type,
                    units: 5,
                    power_plant_id,
                },
            ),
        );
    }
}
