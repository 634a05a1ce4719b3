pub mod db;
pub mod gigachat;

pub use db::DbAdapter;
pub use gigachat::GigaChatAdapter;
