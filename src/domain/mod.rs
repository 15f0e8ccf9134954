// Domain layer - plain data shared by the core and its collaborators
pub mod chart;
pub mod panel;
pub mod series;
