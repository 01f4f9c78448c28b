//! Buzzer playback
//!
//! Plays one square wave tone per request on the PWM output. A request arriving while a
//! tone is still sounding replaces it.

use defmt::debug;
use embassy_futures::select::{select, Either};
use embassy_rp::pwm::{self, Pwm};
use embassy_time::Timer;

use crate::system::event::{self, ToneRequest};
use crate::system::resources::BuzzerResources;

/// Buzzer task
///
/// Idles until the controller requests a tone, then drives the PWM output for the
/// requested duration and silences it again.
///
/// # Arguments
///
/// * `r` - PWM slice 2 and its channel B pin
#[embassy_executor::task]
pub async fn buzzer_play(r: BuzzerResources) {
    let mut config = pwm::Config::default();
    let mut pwm = Pwm::new_output_b(r.slice, r.pin, config.clone());

    let mut next = event::wait_tone().await;
    loop {
        let tone = next;
        debug!("Tone {:?}", tone);
        configure_tone(&mut config, &tone);
        pwm.set_config(&config);

        next = match select(Timer::after(tone.duration), event::wait_tone()).await {
            Either::First(()) => {
                config.compare_b = 0;
                pwm.set_config(&config);
                event::wait_tone().await
            }
            Either::Second(request) => request,
        };
    }
}

/// 50 % duty square wave at the requested frequency, silence for 0 Hz
///
/// # Arguments
///
/// * `config` - PWM configuration updated in place
/// * `tone` - Requested frequency, 0 for silence
fn configure_tone(config: &mut pwm::Config, tone: &ToneRequest) {
    if tone.freq_hz == 0 {
        config.compare_b = 0;
        return;
    }

    let desired_freq_hz = tone.freq_hz as u32;
    let clock_freq_hz = embassy_rp::clocks::clk_sys_freq(); // 150MHz

    // Calculate minimum divider needed to keep period under 16-bit limit (65535)
    let divider = ((clock_freq_hz / desired_freq_hz) / 65535 + 1) as u8;
    let period = (clock_freq_hz / (desired_freq_hz * divider as u32)) as u16 - 1;

    config.divider = divider.into();
    config.top = period;
    config.compare_b = period / 2;
}
