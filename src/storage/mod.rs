// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod image_store;

pub use image_store::{ImageStore, StorageError, StoredImage, ALLOWED_EXTENSIONS, RESULT_PREFIX};
