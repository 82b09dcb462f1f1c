pub mod config;
pub mod gettext;
pub mod progress;
pub mod rpy;
pub mod textutil;
