pub mod backup;
pub mod hooks;
pub mod logging;
