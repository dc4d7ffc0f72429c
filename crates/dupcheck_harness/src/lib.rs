#![forbid(unsafe_code)]

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod loopback;
pub mod scenario;

pub use client::{CreatedRecord, Endpoint, RemoteClientRuntime, RemoteError};
pub use config::HarnessConfig;
pub use dispatcher::{dispatch, DispatchMode};
pub use loopback::LoopbackRemote;
pub use scenario::{ScenarioSuiteRuntime, SuiteConfig};
