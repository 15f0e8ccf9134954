// Presentation layer - view loop and HTTP surface
pub mod app_state;
pub mod console_view;
pub mod handlers;
