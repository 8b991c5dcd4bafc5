// src/utils/mod.rs

pub mod access_key;
pub mod json;
pub mod jwt;
