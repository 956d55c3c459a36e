use crate::error::{Error, Result};

/// Marks every packet of this protocol ("MSCP" as a little-endian u32)
pub const PROTOCOL_ID: u32 = 0x504D_4353;

/// Bumped whenever the wire schema changes incompatibly
pub const PROTOCOL_VERSION: i32 = 3;

/// Maximum packet size accepted by the datagram transports
pub const MAX_PACKET_SIZE: usize = 64 * 1024;

/// Size of the protocol id + message id prefix
pub const HEADER_SIZE: usize = 5;

/// Message ids. New ids are appended only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageId {
    Handshake = 0,
    Heartbeat = 1,
    HeartbeatResponse = 2,
    Disconnect = 3,
    PlayerSync = 4,
    VehicleSync = 5,
    OpenDoors = 6,
    FullWorldSync = 7,
    AskForWorldState = 8,
    VehicleEnter = 9,
    VehicleLeave = 10,
    PickupObject = 11,
    ReleaseObject = 12,
    PickupableSpawn = 13,
    PickupableDestroy = 14,
    PickupableActivate = 15,
    PickupableSetPosition = 16,
    WorldPeriodicalUpdate = 17,
    RemoveBottle = 18,
    LightSwitch = 19,
    ObjectSync = 20,
    ObjectSyncResponse = 21,
    ObjectSyncRequest = 22,
    EventHookSync = 23,
    VehicleState = 24,
    VehicleSwitch = 25,
    WeatherSync = 26,
    AnimSync = 27,
}

impl MessageId {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Handshake),
            1 => Some(Self::Heartbeat),
            2 => Some(Self::HeartbeatResponse),
            3 => Some(Self::Disconnect),
            4 => Some(Self::PlayerSync),
            5 => Some(Self::VehicleSync),
            6 => Some(Self::OpenDoors),
            7 => Some(Self::FullWorldSync),
            8 => Some(Self::AskForWorldState),
            9 => Some(Self::VehicleEnter),
            10 => Some(Self::VehicleLeave),
            11 => Some(Self::PickupObject),
            12 => Some(Self::ReleaseObject),
            13 => Some(Self::PickupableSpawn),
            14 => Some(Self::PickupableDestroy),
            15 => Some(Self::PickupableActivate),
            16 => Some(Self::PickupableSetPosition),
            17 => Some(Self::WorldPeriodicalUpdate),
            18 => Some(Self::RemoveBottle),
            19 => Some(Self::LightSwitch),
            20 => Some(Self::ObjectSync),
            21 => Some(Self::ObjectSyncResponse),
            22 => Some(Self::ObjectSyncRequest),
            23 => Some(Self::EventHookSync),
            24 => Some(Self::VehicleState),
            25 => Some(Self::VehicleSwitch),
            26 => Some(Self::WeatherSync),
            27 => Some(Self::AnimSync),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Handshake => "Handshake",
            Self::Heartbeat => "Heartbeat",
            Self::HeartbeatResponse => "HeartbeatResponse",
            Self::Disconnect => "Disconnect",
            Self::PlayerSync => "PlayerSync",
            Self::VehicleSync => "VehicleSync",
            Self::OpenDoors => "OpenDoors",
            Self::FullWorldSync => "FullWorldSync",
            Self::AskForWorldState => "AskForWorldState",
            Self::VehicleEnter => "VehicleEnter",
            Self::VehicleLeave => "VehicleLeave",
            Self::PickupObject => "PickupObject",
            Self::ReleaseObject => "ReleaseObject",
            Self::PickupableSpawn => "PickupableSpawn",
            Self::PickupableDestroy => "PickupableDestroy",
            Self::PickupableActivate => "PickupableActivate",
            Self::PickupableSetPosition => "PickupableSetPosition",
            Self::WorldPeriodicalUpdate => "WorldPeriodicalUpdate",
            Self::RemoveBottle => "RemoveBottle",
            Self::LightSwitch => "LightSwitch",
            Self::ObjectSync => "ObjectSync",
            Self::ObjectSyncResponse => "ObjectSyncResponse",
            Self::ObjectSyncRequest => "ObjectSyncRequest",
            Self::EventHookSync => "EventHookSync",
            Self::VehicleState => "VehicleState",
            Self::VehicleSwitch => "VehicleSwitch",
            Self::WeatherSync => "WeatherSync",
            Self::AnimSync => "AnimSync",
        }
    }
}

/// Delivery mode requested from the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendMode {
    Reliable,
    Unreliable,
}

/// Parsed packet header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub message_id: MessageId,
}

impl PacketHeader {
    /// Parse header from raw packet data, returns header and payload start position
    pub fn parse(data: &[u8]) -> Result<(Self, usize)> {
        if data.len() < HEADER_SIZE {
            return Err(Error::UnexpectedEof);
        }

        let protocol_id = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        if protocol_id != PROTOCOL_ID {
            return Err(Error::ForeignProtocol { found: protocol_id });
        }

        let message_id = MessageId::from_u8(data[4]).ok_or(Error::InvalidMessageType(data[4]))?;
        Ok((Self { message_id }, HEADER_SIZE))
    }
}

/// Build a packet for sending
pub struct PacketBuilder {
    data: Vec<u8>,
}

impl PacketBuilder {
    pub fn new(message_id: MessageId) -> Self {
        let mut data = Vec::with_capacity(64);
        data.extend_from_slice(&PROTOCOL_ID.to_le_bytes());
        data.push(message_id as u8);
        Self { data }
    }

    pub fn payload(mut self, payload: &[u8]) -> Self {
        self.data.extend_from_slice(payload);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.data
    }
}
