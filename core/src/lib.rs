mod lenient;
mod messaging;

pub use messaging::*;

pub static CORE_VERSION: &str = env!("CARGO_PKG_VERSION");
