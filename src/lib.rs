pub mod app;
pub mod cache;
pub mod canvas;
pub mod color;
pub mod config;
pub mod effects;
pub mod render;
pub mod stage;
pub mod terminal;
