#![warn(clippy::all)]
#![deny(rust_2018_idioms)]

pub mod coords;
pub mod game;
pub mod map;
pub mod runtime;
pub mod timer;
pub mod types;

pub use game::{
    Applied, Auction, Command, CommandKind, Game, GameConfig, GameError, GameEvent, GamePhase,
};
pub use map::HexMap;
pub use runtime::GameHandle;
pub use timer::TickTimer;
pub use types::{FuelType, Terrain};
