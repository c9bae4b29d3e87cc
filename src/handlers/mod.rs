// src/handlers/mod.rs

pub mod admin;
pub mod auth;
pub mod health;
pub mod quiz;
pub mod subjects;
pub mod user;
