// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared application services for Strata tools.
//! Keeps the CLI and embedding hosts thin and storage-agnostic.

pub mod config;
