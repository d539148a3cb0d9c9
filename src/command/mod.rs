mod site_info;
mod upload;
mod upload_recent;

pub use site_info::site_info;
pub use upload::{report_failure, upload};
pub use upload_recent::upload_recent;
