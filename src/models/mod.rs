// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod settings;
pub mod stats;

pub use activity::{Activity, TrackPoint, HEART_RATE_UNAVAILABLE};
pub use settings::{Settings, SettingsUpdate};
pub use stats::ActivityStats;
