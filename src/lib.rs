
pub mod attachment;
pub mod config;
pub mod draft;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod records;
pub mod review;
pub mod session;
pub mod step;
pub mod store;
pub mod submission;
pub mod types;
pub mod utils;

pub use draft::Draft;
pub use session::FormSession;
