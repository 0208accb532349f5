#![allow(dead_code)]

pub use stallguard_test_utils::{init_tracing, with_timeout};
pub use stallguard_test_utils::builders::{DetectorConfigBuilder, RequestBuilder};
