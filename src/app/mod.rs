// Application layer: turns configuration into a running router and HTTP server.

pub mod bootstrap;

pub use bootstrap::Application;
