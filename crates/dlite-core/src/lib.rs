pub mod clock;
pub mod config;
pub mod control;
pub mod credentials;
pub mod endpoints;
pub mod error;
pub mod executor;
pub mod logging;
pub mod retry;
pub mod transport;

pub use control::{CancelReason, CancelScope};
pub use credentials::{CredentialError, StaticToken, TokenCache, TokenMinter, TokenSource};
pub use endpoints::{
    ClientOptions, ManagerClient, RegisterRequest, RegisterResponse, Task, TaskCode, TaskEvent,
    TaskEventsResponse, TaskResponse,
};
pub use error::{ClientError, TransportError, TransportErrorKind};
