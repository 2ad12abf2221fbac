pub mod app;
pub mod audio;
pub mod morse;
pub mod ws;
