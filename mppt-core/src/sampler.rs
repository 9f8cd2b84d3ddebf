//! Load-voltage acquisition.
//!
//! [`Sampler`] triggers a conversion on an injected [`AnalogSource`] and scales
//! the raw code back to the voltage in front of the measurement divider.

use crate::power::Volts;

/// Abstraction over a single analog input channel.
pub trait AnalogSource {
    /// Performs a conversion and returns the raw code.
    fn convert(&mut self) -> u16;
}

impl<T: AnalogSource + ?Sized> AnalogSource for &mut T {
    fn convert(&mut self) -> u16 {
        (**self).convert()
    }
}

/// Conversion from converter codes to volts.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AdcScale {
    reference_volts: Volts,
    max_code: u16,
    divider_ratio: f32,
}

impl AdcScale {
    #[must_use]
    pub const fn new(reference_volts: Volts, max_code: u16, divider_ratio: f32) -> Self {
        Self {
            reference_volts,
            max_code,
            divider_ratio,
        }
    }

    /// Voltage before the divider for a raw `code`.
    ///
    /// Codes above full scale are read as full scale.
    #[must_use]
    pub fn to_volts(&self, code: u16) -> Volts {
        let code = code.min(self.max_code);
        f32::from(code) * self.reference_volts / f32::from(self.max_code) / self.divider_ratio
    }

    /// Code the converter reports for `volts` in front of the divider.
    ///
    /// Voltages outside the converter range read as the nearest rail.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn to_code(&self, volts: Volts) -> u16 {
        let full_scale = f32::from(self.max_code);
        let code = volts * self.divider_ratio / self.reference_volts * full_scale;
        (code + 0.5).clamp(0.0, full_scale) as u16
    }
}

/// Samples the load voltage through an [`AnalogSource`].
#[derive(Debug)]
pub struct Sampler<A> {
    source: A,
    scale: AdcScale,
}

impl<A: AnalogSource> Sampler<A> {
    #[must_use]
    pub const fn new(source: A, scale: AdcScale) -> Self {
        Self { source, scale }
    }

    /// Triggers a conversion and returns the pre-divider voltage.
    pub fn acquire(&mut self) -> Volts {
        let code = self.source.convert();
        self.scale.to_volts(code)
    }
}
