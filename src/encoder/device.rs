//! Compute device selection.
//!
//! The device is chosen once and shared for the process lifetime: CUDA when
//! available, CPU otherwise. The encoder is the only tensor consumer, so a
//! single global device keeps every weight and activation co-located.

use std::sync::OnceLock;

use candle_core::Device;

static DEVICE: OnceLock<Device> = OnceLock::new();

/// Initialize (once) and return the global compute device.
///
/// Safe to call from multiple threads; only the first call selects.
pub fn init_device() -> &'static Device {
    DEVICE.get_or_init(|| match Device::cuda_if_available(0) {
        Ok(device) => {
            if device.is_cuda() {
                tracing::info!("CUDA device 0 initialized");
            } else {
                tracing::info!("No CUDA device available, using CPU");
            }
            device
        }
        Err(e) => {
            tracing::warn!(error = %e, "CUDA probe failed, using CPU");
            Device::Cpu
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_device_is_stable() {
        let a = init_device() as *const Device;
        let b = init_device() as *const Device;
        assert_eq!(a, b);
        println!("[PASS] init_device returns the same singleton");
    }
}
