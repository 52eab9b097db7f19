//! Silicon model for the Darius convolution / max-pool accelerator.
//!
//! This crate has **no dependencies** and **no hardware access**. It is a
//! pure model of the IP core: the processing-element grid, the structural
//! limits baked into its line buffers and counters, and the positional
//! layout of the command descriptor its control logic parses.
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`grid`] | PE grid dimensions (8 rows × 8 columns) and MAC throughput |
//! | [`limits`] | Structural limits: address/iteration widths, BTT, size ranges |
//! | [`command`] | Command descriptor wire layout (conv-only and conv+pool) |

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod command;
pub mod grid;
pub mod limits;
