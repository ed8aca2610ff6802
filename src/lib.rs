pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod ratesapi;
pub mod refresh;
pub mod service;
pub mod validator;

pub use config::Config;
pub use db::{init_db, RateRepository, RateUpdateRepository};
pub use domain::{
    AppliedRateUpdate, PendingRateUpdate, Rate, RatePair, RateView, UpdateStatus,
};
pub use error::AppError;
