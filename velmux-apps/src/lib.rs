#![doc = include_str!("../README.md")]

mod error;
mod mux_config;
mod transport;
pub mod utils;

pub use crate::{error::*, mux_config::*, transport::*};
