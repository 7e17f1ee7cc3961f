pub mod database;
pub mod email;
pub mod jwt;
pub mod metrics;
pub mod pdf;

pub use database::Database;
pub use email::{EmailProvider, EmailService};
pub use jwt::{AccessTokenClaims, JwtService, TokenResponse};
