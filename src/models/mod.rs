// src/models/mod.rs

pub mod question;
pub mod quiz_answer;
pub mod quiz_session;
pub mod subject;
pub mod user;
