//! # Repository Layer
//!
//! Repository implementations that encapsulate SeaORM operations for the
//! marketplace entities. Each repository borrows the shared connection pool.

pub mod cart;
pub mod category;
pub mod media;
pub mod order;
pub mod product;
pub mod review;
pub mod session;
pub mod tag;
pub mod tenant;
pub mod user;

pub use cart::CartRepository;
pub use category::CategoryRepository;
pub use media::MediaRepository;
pub use order::OrderRepository;
pub use product::ProductRepository;
pub use review::ReviewRepository;
pub use session::SessionRepository;
pub use tag::TagRepository;
pub use tenant::TenantRepository;
pub use user::UserRepository;
