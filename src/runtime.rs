use std::sync::{Arc, PoisonError, RwLock, mpsc};
use std::thread;
use std::time::Duration;

use log::debug;

use crate::game::commands::{Command, CommandKind, SERVICE_CALLER};
use crate::game::state::{Game, GameConfig};
use crate::timer::TickTimer;

enum Envelope {
    Command(Command),
    Tick,
    Shutdown,
}

/// Handle to one running game actor. Commands and timer ticks are
/// serialized into a single channel and applied one at a time to
/// completion; observers read complete snapshots, never intermediate
/// state.
pub struct GameHandle {
    sender: mpsc::Sender<Envelope>,
    snapshot: Arc<RwLock<Arc<Game>>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl GameHandle {
    pub fn spawn(config: GameConfig, tick_interval: Duration) -> Self {
        let game = Game::new(config);
        let snapshot = Arc::new(RwLock::new(Arc::new(game.clone())));
        let (sender, receiver) = mpsc::channel();
        let tick_sender = sender.clone();
        let shared = snapshot.clone();
        let worker =
            thread::spawn(move || run_loop(game, receiver, tick_sender, shared, tick_interval));
        Self {
            sender,
            snapshot,
            worker: Some(worker),
        }
    }

    /// Enqueue a command. Delivery is fire-and-forget: guard failures are
    /// dropped by the loop without any observable effect.
    pub fn submit(&self, command: Command) {
        let _ = self.sender.send(Envelope::Command(command));
    }

    /// The most recently published complete snapshot.
    pub fn snapshot(&self) -> Arc<Game> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn shutdown(mut self) {
        self.stop_worker();
    }

    fn stop_worker(&mut self) {
        let _ = self.sender.send(Envelope::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for GameHandle {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

fn run_loop(
    mut game: Game,
    receiver: mpsc::Receiver<Envelope>,
    tick_sender: mpsc::Sender<Envelope>,
    shared: Arc<RwLock<Arc<Game>>>,
    tick_interval: Duration,
) {
    let mut timer = TickTimer::new(tick_interval, move || {
        let _ = tick_sender.send(Envelope::Tick);
    });
    while let Ok(envelope) = receiver.recv() {
        let command = match envelope {
            Envelope::Shutdown => break,
            Envelope::Tick => Command::new(SERVICE_CALLER, CommandKind::Tick),
            Envelope::Command(command) => command,
        };
        match game.apply(&command) {
            Ok(applied) => {
                game = applied.game;
                for event in &applied.events {
                    debug!("game {}: {event:?}", game.id);
                }
                publish(&shared, &game);
            }
            // Guard failures are silent no-ops: no state change, no
            // broadcast, nothing leaked to other observers.
            Err(error) => debug!("game {}: dropped {:?}: {error}", game.id, command.kind),
        }
        if game.timer_should_run() {
            timer.start();
        } else {
            timer.stop();
        }
    }
    timer.stop();
}

fn publish(shared: &Arc<RwLock<Arc<Game>>>, game: &Game) {
    let mut slot = shared.write().unwrap_or_else(PoisonError::into_inner);
    *slot = Arc::new(game.clone());
}
