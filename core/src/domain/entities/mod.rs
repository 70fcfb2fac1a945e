//! Domain entities representing core business objects.

mod channel;
mod session;

#[cfg(test)]
mod tests;

pub use channel::Channel;
pub use session::{SessionStatus, VerificationSession};
