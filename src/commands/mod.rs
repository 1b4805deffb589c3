// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod binance;
pub mod doctor;
pub mod quotes;
pub mod review;
pub mod settings;
pub mod stocks;
