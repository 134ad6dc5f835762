pub mod error;
pub mod gates;
pub mod router;
pub mod types;
pub mod views;
pub mod handlers {
    pub mod common;
    pub mod html;
    pub mod json;
}

pub use error::HttpError;
pub use gates::{gate_fn, AcceptGate, MediaFlavor, PreGate, SharedGate};
pub use handlers::html::HtmlResourceController;
pub use handlers::json::JsonResourceController;
pub use router::{create_router, mount_controller, openapi};
pub use types::ActionRequest;
pub use views::{TemplateDir, ViewRenderer};
