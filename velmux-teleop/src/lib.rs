#![doc = include_str!("../README.md")]

mod discrete_commands;
mod joy;
mod joy_node;
mod joy_velocity;
mod robot_mode;

pub use crate::{
    discrete_commands::*, joy::*, joy_node::*, joy_velocity::*, robot_mode::*,
};
