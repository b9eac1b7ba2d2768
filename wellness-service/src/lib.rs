//! Wellness assistant service: HTTP endpoints that turn wellness questions
//! and their attachments into prompts for a remote generative model.

pub mod config;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod prompts;
pub mod services;
pub mod startup;
