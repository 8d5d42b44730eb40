//! Instrument response models

pub mod effective_area;

pub use effective_area::{ConversionType, EffectiveAreaCurve, EffectiveAreaError};
