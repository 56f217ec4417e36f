// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Realtime camera endpoint
//!
//! Provides GET /realtime for running the violation pipeline over the
//! configured capture device until a stop condition is reached.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::realtime_handler;
pub use request::RealtimeParams;
pub use response::RealtimeResponse;
