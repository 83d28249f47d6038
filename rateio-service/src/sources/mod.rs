pub mod roster_file;

pub use roster_file::{RosterEntry, RosterFileSource};
