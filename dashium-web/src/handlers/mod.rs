pub mod api;
pub mod auth;
pub mod views;

pub use api::{api_get, api_post};
pub use auth::{login, logout};
pub use views::view_handler;
