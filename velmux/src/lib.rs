#![doc = include_str!("../README.md")]

mod arbitrator;
mod error;
mod move_base;
mod mux;
mod source;
mod traced;
mod velocity;
mod velocity_limiter;

pub use crate::{
    arbitrator::*, error::*, move_base::*, mux::*, source::*, traced::Tracing, velocity::*,
    velocity_limiter::*,
};
