// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Upload API endpoint module
//!
//! Provides POST /v1/upload for storing a vehicle photo.

pub mod handler;
pub mod response;

pub use handler::upload_handler;
pub use response::UploadResponse;
