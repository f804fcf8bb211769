//! Control transfer setup and the CDC-ACM wire constants.

/// Interface carrying the serial line, claimed during acquisition.
pub const SERIAL_INTERFACE: u8 = 2;

/// Configuration the device must be in before the interface is claimed.
pub const SERIAL_CONFIGURATION: u8 = 1;

/// Bulk OUT endpoint for outgoing bytes.
pub const ENDPOINT_OUT: u8 = 4;

/// Bulk IN endpoint for incoming bytes.
pub const ENDPOINT_IN: u8 = 5;

/// Number of bytes requested by each bulk IN transfer.
pub const READ_CHUNK_SIZE: usize = 64;

/// CDC `SET_CONTROL_LINE_STATE` request code.
pub const SET_CONTROL_LINE_STATE: u8 = 0x22;

pub(crate) const SETUP_PACKET_SIZE: usize = 8;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum ControlType {
    Standard = 0,
    Class = 1,
    Vendor = 2,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum Recipient {
    Device = 0,
    Interface = 1,
    Endpoint = 2,
    Other = 3,
}

/// Host-to-device control transfer.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ControlOut<'a> {
    #[doc(alias = "bmRequestType")]
    pub control_type: ControlType,

    #[doc(alias = "bmRequestType")]
    pub recipient: Recipient,

    #[doc(alias = "bRequest")]
    pub request: u8,

    #[doc(alias = "wValue")]
    pub value: u16,

    #[doc(alias = "wIndex")]
    pub index: u16,

    #[doc(alias = "wLength")]
    pub data: &'a [u8],
}

impl ControlOut<'static> {
    /// `SET_CONTROL_LINE_STATE` for the serial interface.
    ///
    /// `active` asserts DTR (value `0x01`), otherwise the line is
    /// deasserted (value `0x00`).
    pub fn set_control_line_state(active: bool) -> Self {
        ControlOut {
            control_type: ControlType::Class,
            recipient: Recipient::Interface,
            request: SET_CONTROL_LINE_STATE,
            value: active as u16,
            index: SERIAL_INTERFACE as u16,
            data: &[],
        }
    }
}

impl ControlOut<'_> {
    /// Pack the 8-byte setup packet, or `None` if `data` is too long for `wLength`.
    pub fn setup_packet(&self) -> Option<[u8; SETUP_PACKET_SIZE]> {
        Some(pack_setup(
            self.control_type,
            self.recipient,
            self.request,
            self.value,
            self.index,
            self.data.len().try_into().ok()?,
        ))
    }

    #[doc(alias = "bmRequestType")]
    pub fn request_type(&self) -> u8 {
        request_type(self.control_type, self.recipient)
    }
}

fn pack_setup(
    control_type: ControlType,
    recipient: Recipient,
    request: u8,
    value: u16,
    index: u16,
    length: u16,
) -> [u8; SETUP_PACKET_SIZE] {
    let bmrequesttype = request_type(control_type, recipient);

    [
        bmrequesttype,
        request,
        (value & 0xFF) as u8,
        (value >> 8) as u8,
        (index & 0xFF) as u8,
        (index >> 8) as u8,
        (length & 0xFF) as u8,
        (length >> 8) as u8,
    ]
}

/// `bmRequestType` for a host-to-device request; the direction bit is clear.
fn request_type(control_type: ControlType, recipient: Recipient) -> u8 {
    ((control_type as u8) << 5) | (recipient as u8)
}

#[test]
fn test_line_state_setup() {
    let on = ControlOut::set_control_line_state(true);
    assert_eq!(on.request_type(), 0x21);
    assert_eq!(
        on.setup_packet(),
        Some([0x21, 0x22, 0x01, 0x00, 0x02, 0x00, 0x00, 0x00])
    );

    let off = ControlOut::set_control_line_state(false);
    assert_eq!(off.value, 0x00);
    assert_eq!(off.index, 0x02);
    assert_eq!(
        off.setup_packet(),
        Some([0x21, 0x22, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00])
    );
}

#[test]
fn test_setup_length() {
    let data = [0u8; 7];
    let c = ControlOut {
        control_type: ControlType::Vendor,
        recipient: Recipient::Device,
        request: 0x81,
        value: 0x9999,
        index: 0x1234,
        data: &data,
    };
    assert_eq!(
        c.setup_packet(),
        Some([0x40, 0x81, 0x99, 0x99, 0x34, 0x12, 0x07, 0x00])
    );
}
