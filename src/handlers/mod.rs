pub mod callbacks;
pub mod commands;
pub mod description;
pub mod photo;
