//! Core domain layer for dmplan.
//!
//! This crate contains the domain models, port traits (interfaces), and
//! services of the data-management-plan backend: the dual-mode pagination
//! engine shared by every search endpoint, and the association
//! reconciliation used by every many-to-many relationship edit. It follows
//! hexagonal architecture principles - this is the innermost layer with
//! no dependencies on infrastructure.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      dmplan (binary)                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │        dmplan-graphql          │       dmplan-storage        │
//! │          (API)                 │        (PostgreSQL)         │
//! ├────────────────────────────────┴────────────────────────────┤
//! │                     dmplan-core  ← YOU ARE HERE             │
//! │               (models, ports, services)                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`models`] - Domain models (Affiliation, Template, Project, ...)
//! - [`ports`] - Interface traits for adapters to implement
//! - [`services`] - Pagination engine, cursor codec, association sync
//! - [`error`] - Domain error types
//! - [`metrics`] - Prometheus metrics definitions
//!
//! # Key Concepts
//!
//! ## Pagination
//!
//! Every search goes through [`services::PaginationEngine::paginate`], which
//! serves both cursor ("infinite scroll") and offset ("page N of M")
//! requests from one [`ports::PaginationOptions`] input and answers with a
//! [`ports::PaginatedResult`]. Stores only implement [`ports::PageFetcher`].
//!
//! ## Association Sync
//!
//! Relationship edits compute a delta with [`services::reconcile`] and apply
//! it through an [`ports::AssociationStore`] with
//! [`services::AssociationSyncCoordinator`]. Per-id failures are collected,
//! never raised.

pub mod error;
pub mod metrics;
pub mod models;
pub mod ports;
pub mod services;
