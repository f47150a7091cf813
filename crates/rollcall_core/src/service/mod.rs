//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Enforce cross-collection rules (class existence, deletion blocking).
//! - Host the attendance reconciler.
//!
//! # Invariants
//! - Services never bypass repository validation or persistence contracts.
//! - Services are storage-agnostic: they only see repository traits.

pub mod attendance_service;
pub mod class_service;
pub mod student_service;
