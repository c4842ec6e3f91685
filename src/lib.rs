pub mod config;
pub mod controller;
pub mod disc;
pub mod driver;
pub mod error;
pub mod export;
pub mod filter;
pub mod frame;
pub mod generators;
pub mod reshape;
pub mod tasks;
pub mod transform;
pub mod transition;

pub use config::{Mode, SignSettings};
pub use controller::SignController;
pub use driver::{MockSign, SignDriver};
pub use error::Error;
