#![allow(clippy::too_many_arguments)]

pub mod app;
pub mod cli;
pub mod io;
pub mod logger;
pub mod ops;
pub mod settings;
pub mod viewer;
pub mod viewport;
