pub mod auth;
pub mod callback;
pub mod error_body;
pub mod gateway;
pub mod mapping;
pub mod request;
pub mod service;

pub use crate::core::gateway::{RestResponse, WatsonGateway};
pub use crate::core::mapping::{FieldKind, FieldSpec, Mapped, MappingError};
pub use crate::core::request::{MediaType, MultipartPart, RestRequest};
pub use crate::core::service::{ServiceContext, WatsonService};
pub use crate::domain::ports::AuthenticationStrategy;
pub use crate::utils::error::Result;
