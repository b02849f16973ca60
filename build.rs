use std::env;

/// Clock used when `MCU_FREQ_HZ` is not given in the environment.
const DEFAULT_MCU_FREQ_HZ: &str = "16000000";

fn main() {
    println!("cargo:rerun-if-env-changed=MCU_FREQ_HZ");

    // Pass CPU frequency for timing calculations
    let freq = env::var("MCU_FREQ_HZ").unwrap_or_else(|_| DEFAULT_MCU_FREQ_HZ.into());
    if freq.parse::<u32>().is_err() {
        panic!("MCU_FREQ_HZ must be a frequency in Hz, got {freq:?}");
    }
    println!("cargo:rustc-env=MCU_FREQ_HZ={freq}");

    // Host builds only run the simulated tests
    let target = env::var("TARGET").unwrap_or_default();
    if target.contains("avr") {
        println!("cargo:rustc-link-arg=-mmcu=atmega328p");
        println!("cargo:warning=Building for ATmega328P at {freq} Hz");
    }
}
