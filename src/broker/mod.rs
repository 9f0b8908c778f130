pub mod broadcaster;
pub mod message;
pub mod registry;

pub use broadcaster::Broadcaster;
pub use registry::{Member, Registry};

#[cfg(test)]
mod tests;
