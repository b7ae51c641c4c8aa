pub mod action;
pub mod atom;
pub mod state;

pub use action::{Action, Direction};
pub use atom::{Atom, Color, Pos};
pub use state::{Occupancy, State};
