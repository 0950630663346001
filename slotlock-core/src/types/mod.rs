mod claim;
mod lease;

pub use claim::{Claim, SlotStatus};
pub use lease::Lease;
