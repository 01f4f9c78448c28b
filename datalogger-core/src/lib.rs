//! IMU data logger core
//!
//! Hardware independent part of the data logger firmware. Everything that decides *what*
//! the logger does lives here; the firmware crate only supplies the drivers behind the
//! traits in [`interface`] and calls [`controller::SystemController::poll`] from its loop.
//!
//! # Components
//! - [`input`]: debounced button tracker, safe to feed from interrupt context
//! - [`indicator`]: prioritized LED pattern table and the buzzer motif sequencer
//! - [`storage`]: mount/unmount lifecycle and health polling of the removable card
//! - [`recording`]: the open CSV log file and its sample counter
//! - [`sampler`]: fixed period sensor read with consecutive failure escalation
//! - [`controller`]: the cooperative scheduler owning the authoritative [`state::SystemState`]

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod config;
pub mod console;
pub mod controller;
pub mod display;
pub mod error;
pub mod indicator;
pub mod input;
pub mod interface;
pub mod mpu6050;
pub mod recording;
pub mod sample;
pub mod sampler;
pub mod schedule;
pub mod state;
pub mod storage;

#[cfg(test)]
mod testing;
