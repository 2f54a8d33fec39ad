//! RouterOS configuration migration across device models and firmware dialects.
//!
//! Given an exported configuration for one router, this library produces an
//! equivalent configuration for a different model and/or firmware while
//! making sure no address, secret, user or firewall rule is silently lost.
//! RouterOS 6 and 7 share a command language but differ in how routing
//! protocols, MPLS and bridging are expressed, and port names change between
//! hardware generations. This library automates the rewrite and reports
//! everything it could not carry over.
//!
//! # Architecture
//!
//! ## Parsing & Classification
//!
//! - [`source`] — Tokenize export text into lines with version/model detection
//! - [`detect`] — Firmware version, model and dialect detection
//! - [`section`] — Canonical sections and per-dialect headers
//! - [`classify`] — Section assignment, re-homing of misplaced lines, dedupe
//! - [`extract`] — IPv4 literal and secret extraction
//!
//! ## Transformation
//!
//! - [`devices`] — Device port catalog (embedded, with directory overrides)
//! - [`interface_map`] — Source → target port mapping
//! - [`rules`] — Declarative rewrite rules per target dialect
//! - [`transform`] — Structural passes (OSPF, BGP, VPLS, LDP, bridge, routes)
//! - [`assemble`] — Grouping under target headers in canonical order
//! - [`fallback`] — Deterministic translation path
//!
//! ## Orchestration & Validation
//!
//! - [`engine`] — Request pipeline with optional assisted rewriting
//! - [`assist`] — External assistant seam with timeout
//! - [`validate`] — Completeness report and severity policy
//! - [`settings`] — Engine settings file
//! - [`compliance`] — Baseline block appended on request
//!
//! ## Reporting
//!
//! - [`report`] — Terminal-friendly colored output
//! - [`inspect`] — Source inventory
//! - [`conversion_summary`] — Post-translation counts
//!
//! # Examples
//!
//! ```ignore
//! use ros_migrate::engine::{Engine, TranslationRequest};
//!
//! let engine = Engine::new()?;
//! let source = std::fs::read_to_string("core1.rsc")?;
//! let outcome = engine.translate(&TranslationRequest::new(source, "CCR2216-1G-12XS-2XQ", "7.15"))?;
//! println!("severity={:?}", outcome.validation.severity);
//! std::fs::write("core1-v7.rsc", outcome.config)?;
//! ```
//!
//! # Built on ros-config-core
//!
//! Line splitting, statement parsing and output writing live in
//! `ros-config-core`. All migration logic is contained in this crate.

pub mod assemble;
pub mod assist;
pub mod classify;
pub mod compliance;
pub mod conversion_summary;
pub mod detect;
pub mod devices;
pub mod engine;
pub mod extract;
pub mod fallback;
pub mod inspect;
pub mod interface_map;
pub mod report;
pub mod rules;
pub mod section;
pub mod settings;
pub mod source;
pub mod transform;
pub mod validate;
