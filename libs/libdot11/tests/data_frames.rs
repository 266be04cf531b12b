use libdot11::{decode, eapol_stage, DataSubtype, EthertypeOffset, FrameType, MacAddress, Stage, Subtype};

#[test]
fn test_data() {
    let payload = [
        8, 98, // FrameControl
        0, 0, // Duration id
        51, 51, 255, 75, 207, 58, // First address
        248, 50, 228, 173, 71, 184, // Second address
        192, 238, 251, 75, 207, 58, // Third address
        80, 2, // SequencControl
        // The rest is data
        90, 7, 0, 96, 0, 0, 0, 0, 239, 46, 109, 235, 61, 58, 89, 37, 181, 238, 23, 98, 108, 29, 99,
        170, 28, 132, 136, 248, 109, 194, 64, 139, 35, 219, 22, 195, 40, 100, 32, 6, 7, 230, 5,
    ];

    let header = decode(&payload).expect("Payload should be valid");
    assert_eq!(header.frame_type(), FrameType::Data);
    assert_eq!(header.subtype(), Subtype::Data(DataSubtype::Data));
    assert!(header.from_ds());
    assert!(!header.to_ds());
    assert!(header.protected());
    assert_eq!(header.sequence_number(), Some(37));
    assert_eq!(header.bssid(), Some(MacAddress([248, 50, 228, 173, 71, 184])));
    assert_eq!(header.station(), Some(MacAddress([51, 51, 255, 75, 207, 58])));
    assert_eq!(eapol_stage(&header, EthertypeOffset::default()), None);
}

#[test]
fn test_qos_null() {
    let payload = [
        200, 1, // FrameControl
        58, 1, // Duration id
        248, 50, 228, 173, 71, 184, // First Address
        192, 238, 251, 75, 207, 58, // Second Address
        248, 50, 228, 173, 71, 184, // Third Address
        80, 106, // Sequence Control
        0, 0, // QoS Header
    ];

    let header = decode(&payload).expect("Payload should be valid");
    assert_eq!(header.subtype(), Subtype::Data(DataSubtype::QosNull));
    assert!(header.to_ds());
    assert_eq!(header.header_len(), 26);
    assert_eq!(header.bssid(), Some(MacAddress([248, 50, 228, 173, 71, 184])));
    assert_eq!(header.station(), Some(MacAddress([192, 238, 251, 75, 207, 58])));
}

#[test]
/// Message 2 of a handshake as seen on air: station to AP, sequence number 0.
fn test_eapol_message_two() {
    let payload = [
        136, 1, // FrameControl: QoS data, to_ds
        58, 1, // Duration id
        16, 32, 48, 64, 80, 96, // AP
        2, 17, 34, 51, 68, 85, // Station
        16, 32, 48, 64, 80, 96, // AP
        0, 0, // SequenceControl
        0, 0, // QoS
        170, 170, 3, 0, 0, 0, 136, 142, // LLC/SNAP, EAPOL
        1, 3, 0, 117, 2, 1, 10, 0, 0, 0, 0, 0, 0, 0, 0, 1,
    ];

    let header = decode(&payload).expect("Payload should be valid");
    assert_eq!(
        eapol_stage(&header, EthertypeOffset::default()),
        Some(Stage::Eapol2)
    );
    assert_eq!(
        eapol_stage(&header, EthertypeOffset::Fixed(0x20)),
        Some(Stage::Eapol2)
    );

    // Offsets past the end of any frame are simply not EAPOL
    for offset in [payload.len() - 1, usize::MAX - 1, usize::MAX] {
        assert_eq!(eapol_stage(&header, EthertypeOffset::Fixed(offset)), None);
    }
}

#[test]
fn test_truncated_data() {
    let payload = [8, 2, 0, 0, 1, 2, 3, 4, 5, 6, 7, 8];
    assert!(matches!(
        decode(&payload),
        Err(libdot11::error::Error::TooShort {
            needed: 24,
            actual: 12
        })
    ));
}
