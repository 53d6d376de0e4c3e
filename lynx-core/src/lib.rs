pub mod bits;
mod bytes;
pub mod creature;
pub mod diff;
pub mod dir;
pub mod export;
pub mod grid;
pub mod input;
pub mod levelset;
pub mod link;
pub mod logic;
pub mod movelaws;
pub mod params;
pub mod rng;
pub mod session;
pub mod solution;
pub mod sound;
pub mod state;
pub mod tile;
pub mod time;

pub use dir::Dir;
pub use input::DirProvider;
pub use levelset::{Level, Levelset};
pub use logic::Lynx;
pub use params::SessionParams;
pub use session::{verify_solution, Session, Verdict};
pub use solution::{Solution, SolutionFile};
pub use state::{GameState, Outcome};
