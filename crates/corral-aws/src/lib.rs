//! AWS resource wrappers for deploying Python handlers.
//!
//! Each wrapper (`Role`, `LambdaFunction`, `ApiGateway`) standardizes on
//! the same surface: `exists`/`load` fetch current state and treat lookup
//! failures as "absent", `save` creates or updates, `delete` removes. The
//! [`serverless`] module chains them into a single deploy.

pub mod client;
pub mod gateway;
pub mod lambda;
pub mod region;
pub mod role;
pub mod serverless;
