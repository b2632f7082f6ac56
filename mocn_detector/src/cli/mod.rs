pub mod check;
pub mod export;
pub mod interval;
pub mod purge;
pub mod recent;
pub mod server;
