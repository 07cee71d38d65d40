//! Database configuration module.
//!
//! Handles the `SQLite` connection and table creation using `SeaORM`'s
//! `Schema::create_table_from_entity`, so the schema always matches the entity
//! definitions without hand-written SQL. Tables are created in foreign-key
//! dependency order.

use crate::entities::{
    Category, City, Client, Favorite, Product, Seller, SellerGlobalCategory, SellerRating,
    SellerRequest, User,
};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};

/// Default database location when neither the environment nor the config file names one.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/market_admin.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable, falling
/// back to [`DEFAULT_DATABASE_URL`].
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database at `database_url`.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    Database::connect(database_url).await.map_err(Into::into)
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates every table used by the crate if it does not exist yet.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, User).await?;
    create_table(db, &schema, City).await?;
    create_table(db, &schema, Client).await?;
    create_table(db, &schema, Seller).await?;
    create_table(db, &schema, Category).await?;
    create_table(db, &schema, SellerGlobalCategory).await?;
    create_table(db, &schema, SellerRequest).await?;
    create_table(db, &schema, Product).await?;
    create_table(db, &schema, SellerRating).await?;
    create_table(db, &schema, Favorite).await?;

    Ok(())
}
