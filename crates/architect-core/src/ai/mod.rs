pub mod genui;
pub mod openai;
pub(crate) mod wire;

pub use genui::GenUiClient;
pub use openai::OpenAIClient;
pub use wire::TEMPERATURE;
