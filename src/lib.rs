mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    pub mod memory;
    pub mod pagination;
    pub mod postgres;
    pub mod schema;
    pub mod store;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
mod scoring {
    pub mod popularity;
    pub mod rating;
}
mod constants;

mod cache {
    pub mod cache;
}

pub mod config;
pub mod export;
pub mod routes;
pub mod server;

pub use authentication::*;
pub use cache::cache::*;
pub use constants::*;
pub use database::*;
pub use scoring::*;
