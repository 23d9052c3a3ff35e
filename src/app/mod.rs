//! The application layer: shared state, background tasks and the command
//! handlers a front end drives.

pub mod commands;
pub mod events;
pub mod helpers;
pub mod proxy;
pub mod state;
pub mod tasks;
pub mod view_model;
