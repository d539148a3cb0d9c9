pub mod ftp;
pub mod notify;
