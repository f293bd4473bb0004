pub mod filter;
pub mod route;
pub mod track;

pub use filter::PathFilter;
pub use route::{normalize_path, route_pattern};
pub use track::track;
