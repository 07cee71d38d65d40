//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod category;
pub mod city;
pub mod client;
pub mod favorite;
pub mod product;
pub mod seller;
pub mod seller_global_category;
pub mod seller_rating;
pub mod seller_request;
pub mod user;

// Re-export specific types to avoid conflicts
pub use category::{Column as CategoryColumn, Entity as Category, Model as CategoryModel};
pub use city::{Column as CityColumn, Entity as City, Model as CityModel};
pub use client::{Column as ClientColumn, Entity as Client, Model as ClientModel};
pub use favorite::{Column as FavoriteColumn, Entity as Favorite, Model as FavoriteModel};
pub use product::{Column as ProductColumn, Entity as Product, Model as ProductModel};
pub use seller::{Column as SellerColumn, Entity as Seller, Model as SellerModel, SellerStatus};
pub use seller_global_category::{
    Column as SellerGlobalCategoryColumn, Entity as SellerGlobalCategory,
    Model as SellerGlobalCategoryModel,
};
pub use seller_rating::{
    Column as SellerRatingColumn, Entity as SellerRating, Model as SellerRatingModel,
};
pub use seller_request::{
    Column as SellerRequestColumn, Entity as SellerRequest, Model as SellerRequestModel,
    RequestStatus,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel, Role};
