pub mod progress;
pub mod settings;
pub mod table;
