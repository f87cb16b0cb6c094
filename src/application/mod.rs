pub mod index_service;
pub mod matcher;

pub use index_service::IndexService;
pub use matcher::Matcher;
