//! Button handling
//!
//! Waits for falling edges on the two active low buttons and records them in the shared
//! input tracker. Debouncing and dispatch happen in the controller.

use datalogger_core::input::ButtonId;
use defmt::debug;
use embassy_rp::gpio::{Input, Pull};
use embassy_time::Instant;

use crate::system::event;
use crate::system::resources::{ButtonAResources, ButtonBResources};

/// Button A handler
#[embassy_executor::task]
pub async fn button_a_handle(r: ButtonAResources) {
    let mut btn = Input::new(r.pin, Pull::Up);
    handle_button(&mut btn, ButtonId::A).await;
}

/// Button B handler
#[embassy_executor::task]
pub async fn button_b_handle(r: ButtonBResources) {
    let mut btn = Input::new(r.pin, Pull::Up);
    handle_button(&mut btn, ButtonId::B).await;
}

/// Records every falling edge of a button in the shared input tracker
///
/// # Arguments
///
/// * `button` - A mutable reference to the Input representing the button
/// * `id` - The `ButtonId` associated with this button
///
/// # Events
///
/// An accepted edge leaves one pending press for the controller. Edges inside the
/// debounce window are dropped by the tracker.
async fn handle_button(button: &mut Input<'static>, id: ButtonId) {
    loop {
        button.wait_for_falling_edge().await;
        if event::INPUTS.on_edge(id, Instant::now()) {
            debug!("Button {:?} pressed", id);
        }
    }
}
