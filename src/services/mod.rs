pub mod audio;
pub mod auth;
pub mod controller;
pub mod export;
pub mod llm;
pub mod repository;
pub mod storage;
