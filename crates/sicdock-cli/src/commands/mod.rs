pub mod library;
pub mod score;
