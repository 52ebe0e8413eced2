pub mod services {
    use btleplug::api::bleuuid::uuid_from_u16;
    use uuid::Uuid;

    pub const CYCLING_POWER: Uuid = uuid_from_u16(0x1818);
}

pub mod characteristics {
    use btleplug::api::bleuuid::uuid_from_u16;
    use uuid::Uuid;

    pub const CYCLING_POWER_MEASUREMENT: Uuid = uuid_from_u16(0x2A63);
    /// Exposed by the Cycling Power Service but not used for streaming.
    pub const CYCLING_POWER_CONTROL_POINT: Uuid = uuid_from_u16(0x2A66);
}

pub mod descriptors {
    use btleplug::api::bleuuid::uuid_from_u16;
    use uuid::Uuid;

    /// Written with the notify bit to enable notifications.
    pub const CLIENT_CHARACTERISTIC_CONFIGURATION: Uuid = uuid_from_u16(0x2902);
}
