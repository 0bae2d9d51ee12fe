pub mod engine;
pub mod server;

pub use engine::Engine;
pub use server::Server;
