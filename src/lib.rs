// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod cli;
pub mod commands;
pub mod config;
pub mod cost_basis;
pub mod db;
pub mod error;
pub mod loader;
pub mod models;
pub mod persist;
pub mod quotes;
pub mod reconcile;
pub mod review;
pub mod rules;
pub mod utils;
