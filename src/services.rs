pub mod auth;
pub mod category_service;
pub mod hooks;
pub mod product_service;
pub mod profile_service;
pub mod rate_limiter;
pub mod tag_service;
