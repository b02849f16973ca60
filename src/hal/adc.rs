use core::convert::Infallible;

/// ADMUX value measuring the 1.1V bandgap with AVcc as reference.
pub const BANDGAP_MUX: u8 = 0x4E;

/// Analog front end as used by the sleep core and the supply estimator.
pub trait AdcControl {
    /// Powers the converter up.
    fn enable_adc(&mut self);

    /// Powers the converter down; it draws current even when idle.
    fn disable_adc(&mut self);

    /// Enable bit and clock prescaler, as found.
    fn adc_settings(&self) -> u8;

    fn restore_adc(&mut self, settings: u8);

    /// Enables the converter with its clock inside the 50-200kHz window.
    /// After reset the prescaler is /2, far too fast for a valid reading.
    fn prepare_adc(&mut self);

    /// Current reference/channel selection.
    fn adc_mux(&self) -> u8;

    fn set_adc_mux(&mut self, mux: u8);

    /// Measures the internal bandgap against AVcc as reference.
    fn select_bandgap(&mut self);

    fn start_conversion(&mut self);

    /// `WouldBlock` while a conversion is running.
    fn read_conversion(&mut self) -> nb::Result<u16, Infallible>;
}

#[cfg(target_arch = "avr")]
mod avr {
    use super::{AdcControl, BANDGAP_MUX};
    use crate::hal::Mcu;
    use avr_device::atmega328p::ADC;
    use core::convert::Infallible;

    const ADEN: u8 = 0x80;
    const ADSC: u8 = 0x40;
    const ADPS_MASK: u8 = 0x07;
    // /128: 125kHz at 16MHz, 62.5kHz at 8MHz
    const ADPS_DIV128: u8 = 0x07;

    impl AdcControl for Mcu {
        fn enable_adc(&mut self) {
            unsafe {
                let p = ADC::ptr();
                (*p).adcsra.modify(|r, w| w.bits(r.bits() | ADEN));
            }
        }

        fn disable_adc(&mut self) {
            unsafe {
                let p = ADC::ptr();
                (*p).adcsra.modify(|r, w| w.bits(r.bits() & !ADEN));
            }
        }

        fn adc_settings(&self) -> u8 {
            unsafe { (*ADC::ptr()).adcsra.read().bits() & (ADEN | ADPS_MASK) }
        }

        fn restore_adc(&mut self, settings: u8) {
            unsafe {
                let p = ADC::ptr();
                (*p).adcsra.write(|w| w.bits(settings & (ADEN | ADPS_MASK)));
            }
        }

        fn prepare_adc(&mut self) {
            unsafe {
                let p = ADC::ptr();
                (*p).adcsra.write(|w| w.bits(ADEN | ADPS_DIV128));
            }
        }

        fn adc_mux(&self) -> u8 {
            unsafe { (*ADC::ptr()).admux.read().bits() }
        }

        fn set_adc_mux(&mut self, mux: u8) {
            unsafe {
                let p = ADC::ptr();
                (*p).admux.write(|w| w.bits(mux));
            }
        }

        fn select_bandgap(&mut self) {
            self.set_adc_mux(BANDGAP_MUX);
        }

        fn start_conversion(&mut self) {
            unsafe {
                let p = ADC::ptr();
                (*p).adcsra.modify(|r, w| w.bits(r.bits() | ADSC));
            }
        }

        fn read_conversion(&mut self) -> nb::Result<u16, Infallible> {
            unsafe {
                let p = ADC::ptr();
                if (*p).adcsra.read().bits() & ADSC != 0 {
                    return Err(nb::Error::WouldBlock);
                }
                // 16-bit access reads ADCL before ADCH
                Ok((*p).adc.read().bits())
            }
        }
    }
}
