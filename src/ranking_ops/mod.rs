pub mod dedup;
pub mod enrichment;
pub mod join;
pub mod kinolights;
pub mod layout;
pub mod model;
pub mod registry;
pub mod snapshot;
pub mod wikipedia;
