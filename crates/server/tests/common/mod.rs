//! Common test utilities for critique-server integration tests.

pub mod fixtures;
pub mod server;
pub mod store;

#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use server::*;
#[allow(unused_imports)]
pub use store::*;
