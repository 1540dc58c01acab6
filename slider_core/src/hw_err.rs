//! Mapping from boxed driver errors to the typed domain error.

use crate::error::SliderError;
use slider_hardware::HwError;

/// Downcast to `HwError` when the boxed error came from the GPIO backend so
/// the status text stays precise; anything else keeps its display form.
pub(crate) fn map_driver_error(e: &(dyn std::error::Error + Send + Sync + 'static)) -> SliderError {
    if let Some(hw) = e.downcast_ref::<HwError>() {
        return SliderError::Hardware(hw.to_string());
    }
    SliderError::Hardware(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hw_errors_keep_their_kind_prefix() {
        let boxed: Box<dyn std::error::Error + Send + Sync> =
            Box::new(HwError::Gpio("pin 18 busy".to_string()));
        let mapped = map_driver_error(&*boxed);
        assert_eq!(
            mapped.to_string(),
            "hardware error: gpio error: pin 18 busy"
        );
    }

    #[test]
    fn foreign_errors_pass_through_display() {
        let boxed: Box<dyn std::error::Error + Send + Sync> =
            Box::new(std::io::Error::other("weird"));
        assert_eq!(map_driver_error(&*boxed).to_string(), "hardware error: weird");
    }
}
