pub mod export;
pub mod inventory;
pub mod pack;
