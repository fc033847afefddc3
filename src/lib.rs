pub mod bridge;
pub mod prelude;

pub use ledgerdex_core as core;
pub use ledgerdex_redb3 as redb3;
