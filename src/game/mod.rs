pub mod constants;
pub mod entity;
pub mod player;
pub mod state;
pub mod hooks;
pub mod systems;
pub mod game_loop;
