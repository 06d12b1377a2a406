pub mod catalog;
pub mod config;
pub mod index;
pub mod localindex;
pub mod output;
pub mod reconcile;
pub mod technique;
