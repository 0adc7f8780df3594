#![deny(unsafe_code)]

mod error;
mod front_door;
mod guard;
mod handler;
mod request;
mod response;
mod route;

pub use error::HandlerError;
pub use front_door::GuardedFrontDoor;
pub use guard::{Access, AllowAll, GuardedRequest, RequestGuard};
pub use handler::RequestHandler;
pub use request::{Method, RestRequest};
pub use response::{Envelope, ErrorEnvelope, PageMeta, RestError, RestResponse};

pub type Result<T> = std::result::Result<T, HandlerError>;
