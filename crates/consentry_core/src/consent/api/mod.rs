//! Service API surfaces of the consent engine.
pub mod admin;
pub mod types;

pub use types::{
    AdminRequest, AdminResponse, DirectoryRequest, DirectoryResponse, LifecycleRequest,
    LifecycleResponse,
};
