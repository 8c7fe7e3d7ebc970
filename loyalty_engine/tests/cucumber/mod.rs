mod steps;
mod world;

pub use world::{LoyaltySystem, LoyaltyWorld};
