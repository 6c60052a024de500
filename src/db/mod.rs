pub mod cache;
pub mod catalog;
pub mod postgres;

pub use cache::{create_redis_client, Cache, CacheKey, CacheWriterHandle};
pub use catalog::{BookCatalog, PgCatalog};
pub use postgres::create_pool;

#[cfg(test)]
pub use catalog::MockBookCatalog;
