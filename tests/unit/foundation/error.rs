use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        VgError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        VgError::out_of_memory("x")
            .to_string()
            .contains("out of memory:")
    );
    assert!(
        VgError::unsupported_format("x")
            .to_string()
            .contains("unsupported format:")
    );
    assert!(
        VgError::from(DeviceError::Timeout)
            .to_string()
            .contains("accelerator unsupported: device timeout")
    );
}

#[test]
fn only_device_and_mask_errors_fall_back() {
    assert!(VgError::from(DeviceError::OutOfDeviceMemory).is_fallback_eligible());
    assert!(VgError::MaskUnsupported.is_fallback_eligible());
    assert!(!VgError::DegenerateGeometry.is_fallback_eligible());
    assert!(!VgError::unsupported_format("i3").is_fallback_eligible());
    assert!(!VgError::out_of_memory("scratch").is_fallback_eligible());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = VgError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
