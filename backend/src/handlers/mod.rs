// src/handlers/mod.rs

use serde::Serialize;

pub mod auth;
pub mod users;
pub mod verification;

/// `{"data": ...}` envelope for single resources and messages.
/// Collections are returned as bare arrays.
#[derive(Debug, Serialize)]
pub struct Data<T> {
    pub data: T,
}

impl<T> Data<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}
