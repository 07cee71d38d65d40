//! Core business logic, independent of any transport.
//!
//! Every operation takes the database connection and the calling [`Actor`](access::Actor)
//! explicitly; nothing here reads global state.

/// Roles, capabilities and the seller visibility predicate
pub mod access;
/// Authorization of stored image paths
pub mod assets;
/// Global and seller-local categories
pub mod category;
/// City directory
pub mod city;
/// Dashboard statistics
pub mod dashboard;
/// Client favorites
pub mod favorite;
/// Seller status transitions and the daily sweeps
pub mod lifecycle;
/// Seller catalog products
pub mod product;
/// Client ratings and the per-seller aggregate
pub mod rating;
/// Seller CRUD, directory reads and images
pub mod seller;
/// The request-to-seller workflow
pub mod seller_request;
/// URL slug generation
pub mod slug;
/// Staff accounts, clients and the owner bootstrap
pub mod user;
