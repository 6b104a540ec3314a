pub mod movement;
pub mod collision;
pub mod mass;
pub mod merge;
