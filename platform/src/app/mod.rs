//! Process wiring and configuration

pub mod options;
pub mod run;
