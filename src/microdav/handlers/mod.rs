pub mod health;
pub use self::health::health;

pub mod dav;
pub use self::dav::dav;
