pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod policy;
pub mod render;
pub mod server;

pub use policy::{AuthPolicy, policy_for};
pub use server::{AppState, MitzMockServer, ServerBuilder, build_app};
