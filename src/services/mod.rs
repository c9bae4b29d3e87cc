// src/services/mod.rs

pub mod quiz_service;

pub use quiz_service::QuizService;
