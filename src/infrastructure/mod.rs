// Infrastructure layer - External dependencies and adapters
pub mod central_client;
pub mod config;
pub mod console_store;
pub mod dispatcher;
pub mod frame_renderer;
