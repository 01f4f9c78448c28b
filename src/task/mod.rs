pub mod button_handle;
pub mod buzzer_play;
pub mod orchestrate;
pub mod serial_read;
