pub mod cli;
pub mod config;
pub mod convert;
pub mod cropper;
pub mod error;
pub mod export;
pub mod identify;
pub mod pipeline;
pub mod progress;
pub mod scanner;
pub mod session;
