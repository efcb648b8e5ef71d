pub mod init;
pub mod pack;
