//! Configuration module

mod site;

pub use site::CalendarConfig;
pub use site::GameConfig;
pub use site::ServerConfig;
pub use site::SiteConfig;
