//! A keyboard-driven slideshow with built-in and scripted slide transitions.
//!
//! The core ([`navigator`], [`transition`], [`layout`], [`media`]) drives any
//! [`renderer::Renderer`]; [`app`] hosts it in an egui window.

pub mod app;
pub mod cli;
pub mod color;
pub mod commands;
pub mod config;
pub mod deck;
pub mod error;
pub mod input;
pub mod layout;
pub mod media;
pub mod navigator;
pub mod reload;
pub mod remote;
pub mod renderer;
pub mod transition;

#[cfg(test)]
mod test_support;
