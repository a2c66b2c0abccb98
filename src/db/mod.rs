pub mod connection;
pub mod findings;
pub mod schema;
pub mod scans;
pub mod store;

pub use connection::Database;
pub use scans::ScanListing;
pub use store::{merge_patch, ScanStore};
