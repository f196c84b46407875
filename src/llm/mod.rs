pub mod imagegen;
pub mod media;
pub mod openrouter;

pub use imagegen::ImageGenerator;
pub use openrouter::OpenRouterClient;
