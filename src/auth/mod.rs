//! Authentication Module
//! Registration, password login and bearer-token protection for the game API

pub mod api;
pub mod jwt;
pub mod middleware;
pub mod models;

pub use api::AuthState;
pub use jwt::JwtHandler;
pub use middleware::auth_middleware;
pub use models::Claims;
