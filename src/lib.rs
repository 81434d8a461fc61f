#![allow(clippy::collapsible_if)]

pub mod audit;
pub mod config;
pub mod error;
pub mod language;
pub mod lint;
pub mod logging;
pub mod tools;
pub mod typeinfo;

#[cfg(test)]
mod tests;
