#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    use super::super::buildable::{BlueprintId, Buildable};
    use super::super::commands::{BuildPlacement, Command, CommandKind, SERVICE_CALLER};
    use super::super::player::PlayerId;
    use super::super::state::{AuctionStage, Game, GameConfig, GameError, GamePhase};
    use super::super::view::{player_view, public_view};
    use crate::coords::{CornerCoord, CubeCoord};
    use crate::map::{Cell, HexMap};
    use crate::types::{FuelType, Terrain};

    fn pid(n: u128) -> PlayerId {
        Uuid::from_u128(n)
    }

    fn town() -> CubeCoord {
        CubeCoord::new(0, 0, 0)
    }

    fn coal_field() -> CubeCoord {
        CubeCoord::new(1, 0, -1)
    }

    fn water() -> CubeCoord {
        CubeCoord::new(-1, 0, 1)
    }

    fn test_map() -> HexMap {
        let layout = [
            (town(), Terrain::Plains, 200, None),
            (coal_field(), Terrain::Plains, 0, Some(FuelType::Coal)),
            (CubeCoord::new(0, 1, -1), Terrain::Plains, 0, None),
            (CubeCoord::new(0, -1, 1), Terrain::Plains, 120, None),
            (water(), Terrain::Water, 0, None),
        ];
        let cells: BTreeMap<CubeCoord, Cell> = layout
            .into_iter()
            .map(|(coord, terrain, population, deposit)| {
                (
                    coord,
                    Cell {
                        coord,
                        terrain,
                        population,
                        deposit,
                    },
                )
            })
            .collect();
        HexMap { radius: 1, cells }
    }

    fn lobby() -> Game {
        Game::new(GameConfig {
            map: Some(test_map()),
            ..GameConfig::default()
        })
    }

    fn ok(game: &Game, caller: PlayerId, kind: CommandKind) -> Game {
        match game.apply(&Command::new(caller, kind)) {
            Ok(applied) => applied.game,
            Err(error) => panic!("command unexpectedly dropped: {error}"),
        }
    }

    fn err(game: &Game, caller: PlayerId, kind: CommandKind) -> GameError {
        match game.apply(&Command::new(caller, kind)) {
            Ok(_) => panic!("command unexpectedly accepted"),
            Err(error) => error,
        }
    }

    fn joined(count: u128) -> Game {
        let mut game = lobby();
        for n in 1..=count {
            game = ok(
                &game,
                pid(n),
                CommandKind::JoinGame {
                    name: format!("Player {n}"),
                },
            );
        }
        game
    }

    fn started(count: u128) -> Game {
        ok(&joined(count), pid(1), CommandKind::StartGame)
    }

    /// Runs the opening auction so that exactly one player wins
    /// `blueprint_id` at its starting bid and everyone else passes.
    fn active_with_owner(blueprint_id: BlueprintId) -> (Game, PlayerId) {
        let mut game = started(2);
        let initiator = game.next_initiator().unwrap();
        game = ok(&game, initiator, CommandKind::InitiateBid { blueprint_id });
        let winner = game.next_bidder().unwrap();
        let minimum = game.minimum_bid().unwrap();
        game = ok(
            &game,
            winner,
            CommandKind::AuctionPlaceBid { amount: minimum },
        );
        let other = game.next_bidder().unwrap();
        game = ok(&game, other, CommandKind::AuctionPassBid);
        while let Some(passer) = game.next_initiator() {
            game = ok(&game, passer, CommandKind::PassAuction);
        }
        assert_eq!(game.phase, GamePhase::Active);
        (game, winner)
    }

    #[test]
    fn first_joiner_becomes_host_exactly_once() {
        let game = joined(3);
        assert_eq!(game.players.len(), 3);
        let hosts: Vec<PlayerId> = game
            .players
            .values()
            .filter(|player| player.is_host)
            .map(|player| player.id)
            .collect();
        assert_eq!(hosts, vec![pid(1)]);
        assert_eq!(game.players[&pid(2)].name, "Player 2");
    }

    #[test]
    fn duplicate_join_is_dropped() {
        let game = joined(1);
        assert!(matches!(
            err(&game, pid(1), CommandKind::JoinGame { name: "Again".into() }),
            GameError::AlreadyJoined(_)
        ));
    }

    #[test]
    fn join_is_lobby_only() {
        let game = started(2);
        assert!(matches!(
            err(&game, pid(9), CommandKind::JoinGame { name: "Late".into() }),
            GameError::WrongPhase { .. }
        ));
    }

    #[test]
    fn only_the_host_may_start() {
        let game = joined(2);
        assert!(matches!(
            err(&game, pid(2), CommandKind::StartGame),
            GameError::NotHost
        ));
        assert_eq!(game.phase, GamePhase::Lobby);

        let started = ok(&game, pid(1), CommandKind::StartGame);
        assert_eq!(started.phase, GamePhase::Auction(AuctionStage::InitiatingBid));
        let auction = started.auction.as_ref().unwrap();
        assert_eq!(auction.available_blueprint_ids.len(), 6);
        assert!(auction.purchases.is_empty());
    }

    #[test]
    fn start_from_stranger_is_dropped() {
        let game = joined(2);
        assert!(matches!(
            err(&game, pid(9), CommandKind::StartGame),
            GameError::UnknownCaller(_)
        ));
    }

    #[test]
    fn bid_cycle_resolves_to_the_highest_bidder() {
        let mut game = started(2);
        let initiator = game.next_initiator().unwrap();
        game = ok(&game, initiator, CommandKind::InitiateBid { blueprint_id: 1 });
        assert_eq!(game.phase, GamePhase::Auction(AuctionStage::Bidding));

        let first = game.next_bidder().unwrap();
        game = ok(&game, first, CommandKind::AuctionPlaceBid { amount: dec!(8) });
        let second = game.next_bidder().unwrap();
        assert_ne!(first, second);
        game = ok(&game, second, CommandKind::AuctionPlaceBid { amount: dec!(9) });
        // Turn wraps back to the opening bidder, who drops out.
        assert_eq!(game.next_bidder(), Some(first));
        game = ok(&game, first, CommandKind::AuctionPassBid);

        let auction = game.auction.as_ref().unwrap();
        assert!(auction.current_blueprint.is_none());
        assert_eq!(auction.purchases.len(), 1);
        assert_eq!(auction.purchases[0].player_id, second);
        assert_eq!(auction.purchases[0].price, dec!(9));
        assert!(!auction.available_blueprint_ids.contains(&1));
        assert_eq!(game.players[&second].money, dec!(141));
        assert!(game.players[&second].blueprints_by_id.contains_key(&1));
        assert_eq!(game.phase, GamePhase::Auction(AuctionStage::InitiatingBid));
    }

    #[test]
    fn out_of_turn_and_low_bids_are_dropped() {
        let mut game = started(2);
        let initiator = game.next_initiator().unwrap();
        game = ok(&game, initiator, CommandKind::InitiateBid { blueprint_id: 1 });
        let bidder = game.next_bidder().unwrap();
        let bystander = game
            .players
            .keys()
            .copied()
            .find(|id| *id != bidder)
            .unwrap();

        assert!(matches!(
            err(&game, bystander, CommandKind::AuctionPlaceBid { amount: dec!(8) }),
            GameError::OutOfTurn(_)
        ));
        assert!(matches!(
            err(&game, bidder, CommandKind::AuctionPlaceBid { amount: dec!(7) }),
            GameError::BidTooLow { .. }
        ));
        assert!(matches!(
            err(&game, bidder, CommandKind::AuctionPlaceBid { amount: dec!(7000) }),
            GameError::InsufficientFunds { .. }
        ));
    }

    #[test]
    fn unsold_blueprint_returns_to_the_pool() {
        let mut game = started(2);
        let initiator = game.next_initiator().unwrap();
        game = ok(&game, initiator, CommandKind::InitiateBid { blueprint_id: 5 });
        while let Some(bidder) = game.next_bidder() {
            game = ok(&game, bidder, CommandKind::AuctionPassBid);
        }
        let auction = game.auction.as_ref().unwrap();
        assert!(auction.purchases.is_empty());
        assert!(auction.available_blueprint_ids.contains(&5));
        assert_eq!(game.phase, GamePhase::Auction(AuctionStage::InitiatingBid));
    }

    #[test]
    fn auction_completes_once_everyone_is_out() {
        let (game, winner) = active_with_owner(1);
        assert!(game.auction.is_none());
        assert_eq!(game.phase, GamePhase::Active);
        assert_eq!(game.players[&winner].money, dec!(142));
        assert!(game.timer_should_run());
    }

    #[test]
    fn passing_is_refused_when_configured_off() {
        let mut game = Game::new(GameConfig {
            map: Some(test_map()),
            is_passing_allowed: false,
            ..GameConfig::default()
        });
        for n in 1..=2 {
            game = ok(
                &game,
                pid(n),
                CommandKind::JoinGame {
                    name: format!("Player {n}"),
                },
            );
        }
        game = ok(&game, pid(1), CommandKind::StartGame);
        let initiator = game.next_initiator().unwrap();
        assert!(matches!(
            err(&game, initiator, CommandKind::PassAuction),
            GameError::PassingNotAllowed
        ));
    }

    #[test]
    fn plant_placement_pays_and_converts_the_blueprint() {
        let (game, owner) = active_with_owner(1);
        let before = game.players[&owner].money;
        let game = ok(
            &game,
            owner,
            CommandKind::AddBuildable {
                options: BuildPlacement::PowerPlant {
                    blueprint_id: 1,
                    cell: town(),
                },
                ghost: false,
            },
        );
        assert_eq!(game.players[&owner].money, before - dec!(10));
        assert!(game.players[&owner].blueprints_by_id.is_empty());
        let plant = game.plants().next().unwrap();
        assert_eq!(plant.cell, town());
        assert_eq!(plant.player_id, owner);
    }

    #[test]
    fn broke_players_cannot_build() {
        let (mut game, owner) = active_with_owner(1);
        if let Some(player) = game.players.get_mut(&owner) {
            player.money = dec!(3);
        }
        assert!(matches!(
            err(
                &game,
                owner,
                CommandKind::AddBuildable {
                    options: BuildPlacement::PowerPlant {
                        blueprint_id: 1,
                        cell: town(),
                    },
                    ghost: false,
                },
            ),
            GameError::InsufficientFunds { .. }
        ));
        assert!(game.buildables.is_empty());
    }

    #[test]
    fn invalid_placements_are_dropped() {
        let (game, owner) = active_with_owner(1);
        assert!(matches!(
            err(
                &game,
                owner,
                CommandKind::AddBuildable {
                    options: BuildPlacement::PowerPlant {
                        blueprint_id: 1,
                        cell: water(),
                    },
                    ghost: false,
                },
            ),
            GameError::InvalidPlacement(_)
        ));
        assert!(matches!(
            err(
                &game,
                owner,
                CommandKind::AddBuildable {
                    options: BuildPlacement::PowerPlant {
                        blueprint_id: 1,
                        cell: CubeCoord::new(5, -5, 0),
                    },
                    ghost: false,
                },
            ),
            GameError::UnknownCell(_)
        ));
        // The south corner of the water cell touches nothing buildable.
        assert!(matches!(
            err(
                &game,
                owner,
                CommandKind::AddBuildable {
                    options: BuildPlacement::PowerPole {
                        corner: CornerCoord::south(water()),
                    },
                    ghost: false,
                },
            ),
            GameError::InvalidPlacement(_)
        ));
    }

    #[test]
    fn ghost_buildables_never_become_state() {
        let (game, owner) = active_with_owner(1);
        assert!(matches!(
            err(
                &game,
                owner,
                CommandKind::AddBuildable {
                    options: BuildPlacement::PowerPlant {
                        blueprint_id: 1,
                        cell: town(),
                    },
                    ghost: true,
                },
            ),
            GameError::GhostRejected
        ));
    }

    #[test]
    fn pole_wiring_is_symmetric() {
        let (game, owner) = active_with_owner(1);
        let game = ok(
            &game,
            owner,
            CommandKind::AddBuildable {
                options: BuildPlacement::PowerPlant {
                    blueprint_id: 1,
                    cell: town(),
                },
                ghost: false,
            },
        );
        let plant_id = game.plants().next().unwrap().id;

        let first_corner = CornerCoord::north(town());
        let game = ok(
            &game,
            owner,
            CommandKind::AddBuildable {
                options: BuildPlacement::PowerPole {
                    corner: first_corner,
                },
                ghost: false,
            },
        );
        let second_corner = first_corner.adjacent_corners()[0];
        let game = ok(
            &game,
            owner,
            CommandKind::AddBuildable {
                options: BuildPlacement::PowerPole {
                    corner: second_corner,
                },
                ghost: false,
            },
        );

        let pole_at = |corner: CornerCoord| {
            game.buildables
                .iter()
                .filter_map(Buildable::as_pole)
                .find(|pole| pole.corner == corner)
                .unwrap()
        };
        let first = pole_at(first_corner);
        let second = pole_at(second_corner);
        assert!(first.connected_to_ids.contains(&plant_id));
        assert!(first.connected_to_ids.contains(&second.id));
        assert!(second.connected_to_ids.contains(&first.id));
    }

    #[test]
    fn tick_credits_income_and_advances_the_clock() {
        let (game, owner) = active_with_owner(1);
        let game = ok(
            &game,
            owner,
            CommandKind::AddBuildable {
                options: BuildPlacement::PowerPlant {
                    blueprint_id: 1,
                    cell: town(),
                },
                ghost: false,
            },
        );
        let before = game.players[&owner].money;
        let game = ok(&game, SERVICE_CALLER, CommandKind::Tick);
        assert_eq!(game.total_ticks, 1);
        // 150 kW nameplate against 200 kWh of demand at 0.22/kWh.
        assert_eq!(game.players[&owner].power_sold_kwh, dec!(150));
        assert_eq!(game.players[&owner].money, before + dec!(33));
    }

    #[test]
    fn ticks_are_service_only() {
        let (game, owner) = active_with_owner(1);
        assert!(matches!(
            err(&game, owner, CommandKind::Tick),
            GameError::NotService
        ));
    }

    #[test]
    fn ticks_are_dropped_during_the_auction() {
        let game = started(2);
        assert!(matches!(
            err(&game, SERVICE_CALLER, CommandKind::Tick),
            GameError::WrongPhase { .. }
        ));
        assert_eq!(game.total_ticks, 0);
    }

    #[test]
    fn commodity_buy_moves_money_fuel_and_rate() {
        let (game, owner) = active_with_owner(3);
        let game = ok(
            &game,
            owner,
            CommandKind::AddBuildable {
                options: BuildPlacement::PowerPlant {
                    blueprint_id: 3,
                    cell: coal_field(),
                },
                ghost: false,
            },
        );
        let plant_id = game.plants().next().unwrap().id;
        // 150 starting - 15 winning bid - 25 build cost.
        assert_eq!(game.players[&owner].money, dec!(110));

        let game = ok(
            &game,
            owner,
            CommandKind::BuyCommodity {
                fuel_type: FuelType::Coal,
                units: 10,
                power_plant_id: plant_id,
            },
        );
        // 10 units at 2.00 * 1.05 spread.
        assert_eq!(game.players[&owner].money, dec!(89));
        assert_eq!(
            game.plant(plant_id).unwrap().current_fuel_storage,
            Some(dec!(10))
        );
        // One standard lot nudges the rate 5% of the way to the cap.
        assert_eq!(
            game.commodity_market.current_rate(FuelType::Coal),
            dec!(2.3)
        );
    }

    #[test]
    fn commodity_sell_reverses_the_flow() {
        let (game, owner) = active_with_owner(3);
        let game = ok(
            &game,
            owner,
            CommandKind::AddBuildable {
                options: BuildPlacement::PowerPlant {
                    blueprint_id: 3,
                    cell: coal_field(),
                },
                ghost: false,
            },
        );
        let plant_id = game.plants().next().unwrap().id;
        let game = ok(
            &game,
            owner,
            CommandKind::BuyCommodity {
                fuel_type: FuelType::Coal,
                units: 10,
                power_plant_id: plant_id,
            },
        );
        let game = ok(
            &game,
            owner,
            CommandKind::SellCommodity {
                fuel_type: FuelType::Coal,
                units: 4,
                power_plant_id: plant_id,
            },
        );
        // 4 units at 2.30 * 0.95 spread on top of the 89 left after buying.
        assert_eq!(game.players[&owner].money, dec!(97.74));
        assert_eq!(
            game.plant(plant_id).unwrap().current_fuel_storage,
            Some(dec!(6))
        );
        let rate = game.commodity_market.current_rate(FuelType::Coal);
        assert!(rate < dec!(2.3));
        assert!(rate >= dec!(1));
    }

    #[test]
    fn commodity_guards_hold() {
        let (game, owner) = active_with_owner(3);
        let game = ok(
            &game,
            owner,
            CommandKind::AddBuildable {
                options: BuildPlacement::PowerPlant {
                    blueprint_id: 3,
                    cell: coal_field(),
                },
                ghost: false,
            },
        );
        let plant_id = game.plants().next().unwrap().id;
        let stranger = game
            .players
            .keys()
            .copied()
            .find(|id| *id != owner)
            .unwrap();

        assert!(matches!(
            err(
                &game,
                stranger,
                CommandKind::BuyCommodity {
                    fuel_type: FuelType::Coal,
                    units: 5,
                    power_plant_id: plant_id,
                },
            ),
            GameError::NotPlantOwner(_)
        ));
        assert!(matches!(
            err(
                &game,
                owner,
                CommandKind::BuyCommodity {
                    fuel_type: FuelType::Gas,
                    units: 5,
                    power_plant_id: plant_id,
                },
            ),
            GameError::WrongFuelType(_)
        ));
        assert!(matches!(
            err(
                &game,
                owner,
                CommandKind::BuyCommodity {
                    fuel_type: FuelType::Coal,
                    units: 801,
                    power_plant_id: plant_id,
                },
            ),
            GameError::StorageFull
        ));
        assert!(matches!(
            err(
                &game,
                owner,
                CommandKind::SellCommodity {
                    fuel_type: FuelType::Coal,
                    units: 1,
                    power_plant_id: plant_id,
                },
            ),
            GameError::InsufficientFuel
        ));
        assert!(matches!(
            err(
                &game,
                owner,
                CommandKind::BuyCommodity {
                    fuel_type: FuelType::Coal,
                    units: 0,
                    power_plant_id: plant_id,
                },
            ),
            GameError::ZeroUnits
        ));
    }

    #[test]
    fn surveys_stay_private_to_the_surveyor() {
        let (game, owner) = active_with_owner(1);
        let other = game
            .players
            .keys()
            .copied()
            .find(|id| *id != owner)
            .unwrap();
        let game = ok(
            &game,
            owner,
            CommandKind::SurveyHexTile {
                coordinates: coal_field(),
            },
        );

        let mine = player_view(&game, owner).unwrap();
        assert_eq!(mine.surveys.len(), 1);
        assert_eq!(mine.surveys[0].deposit, Some(FuelType::Coal));

        let theirs = player_view(&game, other).unwrap();
        assert!(theirs.surveys.is_empty());

        let broadcast = serde_json::to_string(&public_view(&game)).unwrap();
        assert!(!broadcast.contains("deposit"));
    }

    #[test]
    fn pause_stops_the_world_until_unpause() {
        let (game, owner) = active_with_owner(1);
        let paused = ok(&game, owner, CommandKind::Pause);
        assert_eq!(paused.phase, GamePhase::Paused);
        assert!(!paused.timer_should_run());

        assert!(matches!(
            err(&paused, SERVICE_CALLER, CommandKind::Tick),
            GameError::WrongPhase { .. }
        ));
        assert!(matches!(
            err(
                &paused,
                owner,
                CommandKind::SurveyHexTile {
                    coordinates: town(),
                },
            ),
            GameError::WrongPhase { .. }
        ));

        let resumed = ok(&paused, owner, CommandKind::Unpause);
        assert_eq!(resumed.phase, GamePhase::Active);
        assert!(resumed.timer_should_run());
    }

    #[test]
    fn apply_never_mutates_the_receiver() {
        let game = lobby();
        let _ = game.apply(&Command::new(
            pid(1),
            CommandKind::JoinGame {
                name: "Player 1".into(),
            },
        ));
        assert!(game.players.is_empty());
        assert_eq!(game.phase, GamePhase::Lobby);
    }

    #[test]
    fn money_never_goes_negative_across_a_match() {
        let (game, owner) = active_with_owner(3);
        let mut game = ok(
            &game,
            owner,
            CommandKind::AddBuildable {
                options: BuildPlacement::PowerPlant {
                    blueprint_id: 3,
                    cell: coal_field(),
                },
                ghost: false,
            },
        );
        let plant_id = game.plants().next().unwrap().id;
        game = ok(
            &game,
            owner,
            CommandKind::BuyCommodity {
                fuel_type: FuelType::Coal,
                units: 30,
                power_plant_id: plant_id,
            },
        );
        for _ in 0..10 {
            game = ok(&game, SERVICE_CALLER, CommandKind::Tick);
        }
        for player in game.players.values() {
            assert!(player.money >= Decimal::ZERO, "{} went negative", player.name);
        }
    }

    #[test]
    fn deterministic_replay_yields_identical_state() {
        let build = || {
            let (game, owner) = active_with_owner(1);
            let game = ok(
                &game,
                owner,
                CommandKind::AddBuildable {
                    options: BuildPlacement::PowerPlant {
                        blueprint_id: 1,
                        cell: town(),
                    },
                    ghost: false,
                },
            );
            ok(&game, SERVICE_CALLER, CommandKind::Tick)
        };
        let first = serde_json::to_string(&build()).unwrap();
        let second = serde_json::to_string(&build()).unwrap();
        assert_eq!(first, second);
    }
}
