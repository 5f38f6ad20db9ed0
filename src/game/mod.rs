pub mod auction;
pub mod buildable;
pub mod commands;
pub mod grid;
pub mod market;
pub mod player;
pub mod state;
pub mod view;

#[cfg(test)]
mod state_test;

pub use auction::{Auction, Bid, BlueprintBidding, Purchase};
pub use buildable::{
    Blueprint, BlueprintId, Buildable, BuildableId, POLE_COST, PowerPlant, PowerPole,
    STANDARD_CATALOG,
};
pub use commands::{BuildPlacement, Command, CommandKind, SERVICE_CALLER};
pub use grid::{GridOutcome, resolve_hour};
pub use market::{CommodityMarket, MarketRates};
pub use player::{Player, PlayerId, SurveyResult};
pub use state::{Applied, AuctionStage, Game, GameConfig, GameError, GameEvent, GamePhase};
pub use view::{PlayerGameView, PublicGameView, player_view, public_view};
