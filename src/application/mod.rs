// Application layer - tree reconciliation, series reshaping and chart refresh
pub mod chart_assembly;
pub mod panel_store;
pub mod panel_tree;
pub mod platform_source;
pub mod refresh_scheduler;
pub mod reshaper;
