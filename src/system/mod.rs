pub mod collector;
pub mod cpu;
pub mod kill;
pub mod platform;
pub mod process;
pub mod procfs;
pub mod scheduler;
pub mod snapshot;
