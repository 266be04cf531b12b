use libdot11::{decode, ssid, FrameType, MacAddress, MgmtSubtype, Subtype};

const BEACON_PAYLOAD: [u8; 66] = [
    // Header
    128, 0, // FrameControl
    0, 0, // Duration id
    255, 255, 255, 255, 255, 255, // First address
    248, 50, 228, 173, 71, 184, // Second address
    248, 50, 228, 173, 71, 184, // Third address
    96, 119, // SequencControl
    // Data start
    151, 161, 39, 206, 165, 0, 0, 0, // timestamp
    100, 0, // interval
    17, 4, // capability
    0, 15, 77, 121, 32, 102, 97, 99, 101, 32, 119, 104, 101, 110, 32, 73, 80, // SSID
    1, 8, 130, 132, 139, 150, 36, 48, 72, 108, // Supported rates
    3, 1, 9, // DS parameter set
];

#[test]
fn test_beacon() {
    let header = decode(&BEACON_PAYLOAD).expect("Payload should be valid");

    assert_eq!(header.frame_type(), FrameType::Management);
    assert_eq!(header.subtype(), Subtype::Management(MgmtSubtype::Beacon));
    assert_eq!(header.addr1(), MacAddress::broadcast());
    assert_eq!(header.bssid(), Some(MacAddress([248, 50, 228, 173, 71, 184])));
    assert_eq!(header.sequence_number(), Some(1910));

    let ssid = ssid(header.bytes()).unwrap();
    assert_eq!(ssid, Some(&b"My face when IP"[..]));
}

#[test]
fn test_probe_response_hidden() {
    let mut payload = BEACON_PAYLOAD;
    payload[0] = 0x50;
    // Zero out the SSID but keep the declared length
    for byte in payload[0x26..0x26 + 15].iter_mut() {
        *byte = 0;
    }

    let header = decode(&payload).expect("Payload should be valid");
    assert_eq!(
        header.subtype(),
        Subtype::Management(MgmtSubtype::ProbeResponse)
    );
    assert_eq!(ssid(header.bytes()).unwrap(), None);
}
