//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument. Operations that must be atomic
//! across statements (exchange creation, cancellation, handoff completion)
//! open their transaction inside the repository method.

pub mod achievement_repo;
pub mod badge_repo;
pub mod exchange_repo;
pub mod item_repo;
pub mod user_repo;

pub use achievement_repo::AchievementRepo;
pub use badge_repo::BadgeRepo;
pub use exchange_repo::ExchangeRepo;
pub use item_repo::ItemRepo;
pub use user_repo::UserRepo;
