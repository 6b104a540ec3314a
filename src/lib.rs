//! Cell Arena simulation core
//!
//! Per-tick simulation of an agar-style arena: circular cells that move,
//! grow, split, remerge, collide and consume one another inside a bounded
//! rectangular world.
//!
//! The world is a single-threaded arena ([`game::state::World`]) passed by
//! reference into every operation. Game-mode rules and collision resolution
//! plug in through the traits in [`game::hooks`].

pub mod config;
pub mod error;
pub mod util;
pub mod game;
