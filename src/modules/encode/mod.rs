pub mod events;
pub mod ladder;
pub mod service;
