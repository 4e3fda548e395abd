pub mod collection;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod fetch;
pub mod links;
pub mod location;
pub mod photos;
pub mod position;
pub mod surface;
pub mod tasks {
    pub mod gallery;
    pub mod preload;
}

pub use error::{Error, Result};
