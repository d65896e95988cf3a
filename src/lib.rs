#![allow(clippy::new_without_default)]

#[macro_use]
extern crate log;
#[macro_use]
extern crate anyhow;

pub mod canvas;
pub mod color;
pub mod config;
pub mod dataset;
pub mod error;
pub mod logs;
pub mod model;
pub mod overlay;
pub mod render;
pub mod table;
pub mod utils;
pub mod viewer;
