//! # Schema Bridge - one declarative schema, three surfaces
//!
//! `schema_bridge` lets a single [`Schema`] drive request validation, OpenAPI
//! documents and GraphQL type definitions.
//!
//! ## Core Features:
//!
//! - **DTO factory**: [`Bridge::dto`] wraps a schema in a [`DtoClass`] that
//!   validates (`parse`, `safe_parse`, `validate`) and derives new DTOs
//!   (`partial`, `pick`, `extend`, ...) through [`SchemaAlgebra`].
//!
//! - **`#[object_type]` / `#[input_type]`**: declare a GraphQL type from a
//!   static schema. Fields are registered in declaration order with the
//!   configured [`GraphqlHost`]; references to schemas declared later resolve
//!   once declarations settle.
//!
//! - **Validation hooks**: [`ValidationPipe`] and [`ValidationGuard`] reject
//!   bad input with a [`ValidationException`] that renders as a `400` in `axum`.
//!
//! - **OpenAPI**: [`schema_to_openapi`] and [`OpenApiDocBuilder`] produce
//!   `utoipa` documents from the same schemas.
//!
//! Metadata generation never fails the caller: anything that cannot be typed
//! precisely degrades to a best-effort type and a [`Diagnostic`].

pub mod bridge;
pub mod class;
pub mod config;
pub mod declare;
pub mod decorate;
pub mod diagnostics;
pub mod dto;
#[cfg(feature = "async-graphql")]
pub mod dynamic;
pub mod enums;
pub mod error;
pub mod host;
pub mod introspect;
mod mapper;
pub mod openapi;
pub mod pipe;
pub mod registry;
pub mod schema;
pub mod types;

pub use bridge::{Bridge, BridgeBuilder};
pub use class::{DecorationState, DtoClass, FieldMeta};
pub use config::{BridgeConfig, EquivalenceMode, RegistryConfig};
pub use declare::{DeclaredDto, DtoDeclaration};
pub use decorate::TypeArgs;
pub use diagnostics::{CollectingDiagnostics, Diagnostic, DiagnosticsSink, Fallback, Reason, TracingDiagnostics};
pub use dto::{create_dto, DtoOptions, GraphqlOptions, SchemaAlgebra, SchemaDto};
pub use error::{Error, Result, ValidationException};
pub use host::{GraphqlHost, HostError, TypeCollector};
pub use openapi::{schema_to_openapi, OpenApiDocBuilder};
pub use pipe::{ArgumentKind, ArgumentMetadata, RequestSource, ValidationGuard, ValidationPipe};
pub use registry::{DrainReport, RegisterOutcome, Registry};
pub use schema::{Issue, IssueCode, NativeEnum, PathSegment, SafeParse, Schema, SchemaId, ValidationError};
pub use types::{EnumType, Scalar, TargetType, TypeFlavor, TypeThunk};

#[cfg(feature = "macros")]
pub use schema_bridge_macros::{input_type, object_type};

// Re-exported for macro-generated code.
pub use inventory;
pub use utoipa;
