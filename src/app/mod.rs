pub mod action_map;
pub mod controller;
