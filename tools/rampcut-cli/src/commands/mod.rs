pub mod check;
pub mod edit;
pub mod export;
pub mod init;
pub mod plan;
pub mod recent;
