pub mod config;
pub mod core;
pub mod graph;
pub mod handlers;

pub use config::Configuration;
pub use core::{JulepClient, ResponseGenerator};
pub use graph::RdfGraph;
pub use handlers::PdfHandler;
