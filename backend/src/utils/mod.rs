// src/utils/mod.rs

pub mod hash;
pub mod html;
pub mod image;
pub mod jwt;
pub mod token;
