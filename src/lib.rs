//! FASTag BBPS Recharge Library
//!
//! This library provides the biller-discovery flow for FASTag recharges over
//! the Bharat Bill Payment System: a proxy in front of the BBPS aggregator,
//! normalization of its loosely-typed payloads, a paginated biller directory
//! and the four-step recharge wizard.
//!
//! # Modules
//!
//! - `api`: API definitions.
//! - `core`: Core business logic.
//! - `integrations`: External service integrations.
//! - `classify`: Business-error detection in aggregator bodies.
//! - `config`: Configuration management.
//! - `directory`: Paginated biller directory state.
//! - `errors`: Error handling types.
//! - `gateway_client`: BBPS aggregator HTTP client.
//! - `handlers`: Proxy and directory HTTP handlers.
//! - `models`: Normalized domain models.
//! - `normalize`: Raw payload to domain model conversion.
//! - `presentation`: Status tones and balance figures for display.
//! - `routes`: Route table.
//! - `services`: `BillerApi` and its HTTP implementation.
//! - `upstream_models`: Lenient accessors over raw aggregator JSON.
//! - `validation`: Input-parameter validation.
//! - `wizard`: Recharge wizard state machine.
//! - `wizard_handler`: Wizard session HTTP handlers.

pub mod api;
pub mod core;
pub mod integrations;

// Re-export primary modules for shared use in tests and the binary
pub mod classify;
pub mod config;
pub mod directory;
pub mod errors;
pub mod gateway_client;
pub mod handlers;
pub mod models;
pub mod normalize;
pub mod presentation;
pub mod routes;
pub mod services;
pub mod upstream_models;
pub mod validation;
pub mod wizard;
pub mod wizard_handler;
