pub mod audit;
pub mod auth;
pub mod category;
pub mod product;
pub mod profile;
pub mod tag;
