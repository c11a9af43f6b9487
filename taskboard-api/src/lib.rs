//! # Task Board API Server Library
//!
//! HTTP layer of the task board: configuration, routing, request/response
//! mapping. Authentication and storage live in `taskboard-shared`.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `cookies`: `Set-Cookie` construction for the auth and CSRF cookies
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: JSON/query extractors that reject with `ApiError`
//! - `middleware`: Security headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod cookies;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
