// Platform console - panel tree reconciliation and live point charts
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
