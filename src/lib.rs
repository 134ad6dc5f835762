pub mod app;
pub mod domain;
pub mod infra;
pub mod storage;
pub mod transport;

// Convenience re-exports (keeps call-sites clean)
pub use app::action_map::{Action, ActionMap};
pub use app::controller::{Controller, Operations, Resource};
pub use domain::model::{Filter, ResourceModel};
pub use storage::{InMemoryModel, PostgresModel};
pub use transport::http::{
    gate_fn, mount_controller, HtmlResourceController, JsonResourceController, PreGate,
    SharedGate,
};
