/// A `(vendor id, product id)` pair offered to the platform's device chooser.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct DeviceFilter {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl DeviceFilter {
    pub const fn new(vendor_id: u16, product_id: u16) -> Self {
        DeviceFilter {
            vendor_id,
            product_id,
        }
    }
}

/// Filters used when [`SerialPortOptions`][crate::SerialPortOptions] does not set any.
pub const DEFAULT_FILTERS: [DeviceFilter; 3] = [
    DeviceFilter::new(0x2341, 0x8036), // Arduino Leonardo
    DeviceFilter::new(0x2341, 0x8037), // Arduino Micro
    DeviceFilter::new(0x239a, 0x8011), // Adafruit Circuit Playground
];

#[test]
fn test_default_filters() {
    assert!(DEFAULT_FILTERS.contains(&DeviceFilter::new(0x2341, 0x8036)));
    assert!(DEFAULT_FILTERS.contains(&DeviceFilter::new(0x2341, 0x8037)));
    assert!(DEFAULT_FILTERS.contains(&DeviceFilter::new(0x239a, 0x8011)));
    assert!(!DEFAULT_FILTERS.contains(&DeviceFilter::new(0x239a, 0x8036)));
}
