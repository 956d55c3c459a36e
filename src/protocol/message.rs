//! Game session messages
//!
//! Every message is a `[protocol id][message id][payload]` packet. Payload
//! fields are little-endian and written in declaration order; messages that
//! carry optional fields start with an [`OptionalMask`] byte.

use bitflags::bitflags;

use crate::codec::{BinaryReader, BinaryWriter, Quat, Transform, Vec3, Weather};
use crate::error::{Error, Result};
use super::packet::{MessageId, PacketBuilder, PacketHeader, SendMode};

bitflags! {
    /// Presence bits for optional fields (bit n = n-th optional of the message)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct OptionalMask: u8 {
        const FIELD_0 = 0x01;
        const FIELD_1 = 0x02;
        const FIELD_2 = 0x04;
        const FIELD_3 = 0x08;
    }
}

impl OptionalMask {
    fn with(mut self, flag: Self, present: bool) -> Self {
        self.set(flag, present);
        self
    }

    fn read(reader: &mut BinaryReader) -> Result<Self> {
        Ok(Self::from_bits_retain(reader.read_u8()?))
    }
}

/// How an `ObjectSync` message should be interpreted by the receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum SyncType {
    GenericSync = 0,
    SetOwner = 1,
    RemoveOwner = 2,
    ForceSetOwner = 3,
    PeriodicSync = 4,
}

impl SyncType {
    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            0 => Some(Self::GenericSync),
            1 => Some(Self::SetOwner),
            2 => Some(Self::RemoveOwner),
            3 => Some(Self::ForceSetOwner),
            4 => Some(Self::PeriodicSync),
            _ => None,
        }
    }

    /// Ownership transitions must arrive; state streaming may be lost.
    pub fn send_mode(self) -> SendMode {
        match self {
            Self::GenericSync | Self::PeriodicSync => SendMode::Unreliable,
            Self::SetOwner | Self::RemoveOwner | Self::ForceSetOwner => SendMode::Reliable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handshake {
    pub protocol_version: i32,
    pub clock: u64,
}

impl Handshake {
    pub fn read(reader: &mut BinaryReader) -> Result<Self> {
        Ok(Self {
            protocol_version: reader.read_i32_le()?,
            clock: reader.read_u64_le()?,
        })
    }

    pub fn write(&self, writer: &mut BinaryWriter) {
        writer.write_i32_le(self.protocol_version);
        writer.write_u64_le(self.clock);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Heartbeat {
    /// Sender clock, echoed back to measure round trip
    pub client_clock: u64,
}

impl Heartbeat {
    pub fn read(reader: &mut BinaryReader) -> Result<Self> {
        Ok(Self { client_clock: reader.read_u64_le()? })
    }

    pub fn write(&self, writer: &mut BinaryWriter) {
        writer.write_u64_le(self.client_clock);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeartbeatResponse {
    pub client_clock: u64,
    pub clock: u64,
}

impl HeartbeatResponse {
    pub fn read(reader: &mut BinaryReader) -> Result<Self> {
        Ok(Self {
            client_clock: reader.read_u64_le()?,
            clock: reader.read_u64_le()?,
        })
    }

    pub fn write(&self, writer: &mut BinaryWriter) {
        writer.write_u64_le(self.client_clock);
        writer.write_u64_le(self.clock);
    }
}

/// Transform of the object the player is carrying
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickedUpSync {
    pub position: Vec3,
    pub rotation: Quat,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerSync {
    pub position: Vec3,
    pub rotation: Quat,
    pub picked_up: Option<PickedUpSync>,
}

impl PlayerSync {
    pub fn read(reader: &mut BinaryReader) -> Result<Self> {
        let mask = OptionalMask::read(reader)?;
        let position = reader.read_vec3()?;
        let rotation = reader.read_quat()?;
        let picked_up = if mask.contains(OptionalMask::FIELD_0) {
            Some(PickedUpSync {
                position: reader.read_vec3()?,
                rotation: reader.read_quat()?,
            })
        } else {
            None
        };
        Ok(Self { position, rotation, picked_up })
    }

    pub fn write(&self, writer: &mut BinaryWriter) {
        let mask = OptionalMask::empty().with(OptionalMask::FIELD_0, self.picked_up.is_some());
        writer.write_u8(mask.bits());
        writer.write_vec3(self.position);
        writer.write_quat(self.rotation);
        if let Some(picked) = &self.picked_up {
            writer.write_vec3(picked.position);
            writer.write_quat(picked.rotation);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleSync {
    pub vehicle_id: u8,
    pub position: Vec3,
    pub rotation: Quat,
    pub steering: f32,
    pub throttle: f32,
    pub brake: f32,
    pub clutch: f32,
    pub fuel: f32,
    pub gear: Option<i32>,
    pub range: Option<bool>,
    pub hydraulic: Option<f32>,
}

impl VehicleSync {
    pub fn read(reader: &mut BinaryReader) -> Result<Self> {
        let mask = OptionalMask::read(reader)?;
        Ok(Self {
            vehicle_id: reader.read_u8()?,
            position: reader.read_vec3()?,
            rotation: reader.read_quat()?,
            steering: reader.read_f32_le()?,
            throttle: reader.read_f32_le()?,
            brake: reader.read_f32_le()?,
            clutch: reader.read_f32_le()?,
            fuel: reader.read_f32_le()?,
            gear: read_optional(reader, mask, OptionalMask::FIELD_0, BinaryReader::read_i32_le)?,
            range: read_optional(reader, mask, OptionalMask::FIELD_1, BinaryReader::read_bool)?,
            hydraulic: read_optional(reader, mask, OptionalMask::FIELD_2, BinaryReader::read_f32_le)?,
        })
    }

    pub fn write(&self, writer: &mut BinaryWriter) {
        let mask = OptionalMask::empty()
            .with(OptionalMask::FIELD_0, self.gear.is_some())
            .with(OptionalMask::FIELD_1, self.range.is_some())
            .with(OptionalMask::FIELD_2, self.hydraulic.is_some());
        writer.write_u8(mask.bits());
        writer.write_u8(self.vehicle_id);
        writer.write_vec3(self.position);
        writer.write_quat(self.rotation);
        writer.write_f32_le(self.steering);
        writer.write_f32_le(self.throttle);
        writer.write_f32_le(self.brake);
        writer.write_f32_le(self.clutch);
        writer.write_f32_le(self.fuel);
        if let Some(gear) = self.gear {
            writer.write_i32_le(gear);
        }
        if let Some(range) = self.range {
            writer.write_bool(range);
        }
        if let Some(hydraulic) = self.hydraulic {
            writer.write_f32_le(hydraulic);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenDoors {
    pub position: Vec3,
    pub open: bool,
}

impl OpenDoors {
    pub fn read(reader: &mut BinaryReader) -> Result<Self> {
        Ok(Self {
            position: reader.read_vec3()?,
            open: reader.read_bool()?,
        })
    }

    pub fn write(&self, writer: &mut BinaryWriter) {
        writer.write_vec3(self.position);
        writer.write_bool(self.open);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoorState {
    pub position: Vec3,
    pub open: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSwitchState {
    pub position: Vec3,
    pub on: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleTransform {
    pub id: u8,
    pub transform: Transform,
}

/// Complete world snapshot sent by the host to a joining peer
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FullWorldSync {
    pub hour: i32,
    pub minutes: f32,
    pub day: i32,
    pub mailbox_name: String,
    pub doors: Vec<DoorState>,
    pub light_switches: Vec<LightSwitchState>,
    pub weather: Weather,
    pub vehicles: Vec<VehicleTransform>,
    pub pickupables: Vec<PickupableSpawn>,
}

impl FullWorldSync {
    pub fn read(reader: &mut BinaryReader) -> Result<Self> {
        Ok(Self {
            hour: reader.read_i32_le()?,
            minutes: reader.read_f32_le()?,
            day: reader.read_i32_le()?,
            mailbox_name: reader.read_string()?,
            doors: reader.read_array(|r| {
                Ok(DoorState { position: r.read_vec3()?, open: r.read_bool()? })
            })?,
            light_switches: reader.read_array(|r| {
                Ok(LightSwitchState { position: r.read_vec3()?, on: r.read_bool()? })
            })?,
            weather: reader.read_weather()?,
            vehicles: reader.read_array(|r| {
                Ok(VehicleTransform { id: r.read_u8()?, transform: r.read_transform()? })
            })?,
            pickupables: reader.read_array(PickupableSpawn::read)?,
        })
    }

    pub fn write(&self, writer: &mut BinaryWriter) {
        writer.write_i32_le(self.hour);
        writer.write_f32_le(self.minutes);
        writer.write_i32_le(self.day);
        writer.write_string(&self.mailbox_name);
        writer.write_array(&self.doors, |w, door| {
            w.write_vec3(door.position);
            w.write_bool(door.open);
        });
        writer.write_array(&self.light_switches, |w, light| {
            w.write_vec3(light.position);
            w.write_bool(light.on);
        });
        writer.write_weather(self.weather);
        writer.write_array(&self.vehicles, |w, vehicle| {
            w.write_u8(vehicle.id);
            w.write_transform(vehicle.transform);
        });
        writer.write_array(&self.pickupables, |w, pickupable| pickupable.write(w));
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleEnter {
    pub vehicle_id: u8,
    pub passenger: bool,
}

impl VehicleEnter {
    pub fn read(reader: &mut BinaryReader) -> Result<Self> {
        Ok(Self {
            vehicle_id: reader.read_u8()?,
            passenger: reader.read_bool()?,
        })
    }

    pub fn write(&self, writer: &mut BinaryWriter) {
        writer.write_u8(self.vehicle_id);
        writer.write_bool(self.passenger);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickupObject {
    pub id: u16,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReleaseObject {
    pub id: u16,
    /// Dropped (true) or thrown
    pub drop: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PickupableSpawn {
    pub id: u16,
    pub prefab_id: i32,
    pub transform: Transform,
    pub active: bool,
    /// Prefab-specific payload, e.g. remaining bottles of a beer case
    pub data: Option<Vec<f32>>,
}

impl PickupableSpawn {
    pub fn read(reader: &mut BinaryReader) -> Result<Self> {
        let mask = OptionalMask::read(reader)?;
        Ok(Self {
            id: reader.read_u16_le()?,
            prefab_id: reader.read_i32_le()?,
            transform: reader.read_transform()?,
            active: reader.read_bool()?,
            data: read_optional(reader, mask, OptionalMask::FIELD_0, BinaryReader::read_f32_array)?,
        })
    }

    pub fn write(&self, writer: &mut BinaryWriter) {
        let mask = OptionalMask::empty().with(OptionalMask::FIELD_0, self.data.is_some());
        writer.write_u8(mask.bits());
        writer.write_u16_le(self.id);
        writer.write_i32_le(self.prefab_id);
        writer.write_transform(self.transform);
        writer.write_bool(self.active);
        if let Some(data) = &self.data {
            writer.write_f32_array(data);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickupableDestroy {
    pub id: u16,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickupableActivate {
    pub id: u16,
    pub activate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickupableSetPosition {
    pub id: u16,
    pub position: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldPeriodicalUpdate {
    /// Hour of day with two-hour precision
    pub sun_clock: u8,
    pub world_day: u8,
    pub weather: Weather,
}

impl WorldPeriodicalUpdate {
    pub fn read(reader: &mut BinaryReader) -> Result<Self> {
        Ok(Self {
            sun_clock: reader.read_u8()?,
            world_day: reader.read_u8()?,
            weather: reader.read_weather()?,
        })
    }

    pub fn write(&self, writer: &mut BinaryWriter) {
        writer.write_u8(self.sun_clock);
        writer.write_u8(self.world_day);
        writer.write_weather(self.weather);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemoveBottle {
    pub id: u16,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSwitch {
    pub position: Vec3,
    pub on: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSync {
    pub object_id: i32,
    pub position: Vec3,
    pub rotation: Quat,
    pub sync_type: Option<SyncType>,
    pub synced_variables: Option<Vec<f32>>,
}

impl ObjectSync {
    pub fn read(reader: &mut BinaryReader) -> Result<Self> {
        let mask = OptionalMask::read(reader)?;
        let object_id = reader.read_i32_le()?;
        let position = reader.read_vec3()?;
        let rotation = reader.read_quat()?;
        let sync_type = match read_optional(reader, mask, OptionalMask::FIELD_0, BinaryReader::read_i32_le)? {
            Some(raw) => Some(SyncType::from_i32(raw).ok_or_else(|| {
                Error::InvalidPacket(format!("invalid sync type: {raw}"))
            })?),
            None => None,
        };
        let synced_variables =
            read_optional(reader, mask, OptionalMask::FIELD_1, BinaryReader::read_f32_array)?;
        Ok(Self { object_id, position, rotation, sync_type, synced_variables })
    }

    pub fn write(&self, writer: &mut BinaryWriter) {
        let mask = OptionalMask::empty()
            .with(OptionalMask::FIELD_0, self.sync_type.is_some())
            .with(OptionalMask::FIELD_1, self.synced_variables.is_some());
        writer.write_u8(mask.bits());
        writer.write_i32_le(self.object_id);
        writer.write_vec3(self.position);
        writer.write_quat(self.rotation);
        if let Some(sync_type) = self.sync_type {
            writer.write_i32_le(sync_type as i32);
        }
        if let Some(vars) = &self.synced_variables {
            writer.write_f32_array(vars);
        }
    }

    /// Absent sync type means plain state streaming
    pub fn sync_type(&self) -> SyncType {
        self.sync_type.unwrap_or(SyncType::GenericSync)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectSyncResponse {
    pub object_id: i32,
    pub accepted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectSyncRequest {
    pub object_id: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventHookSync {
    pub fsm_id: i32,
    /// -1 when the event is carried by name
    pub fsm_event_id: i32,
    pub request: bool,
    pub fsm_event_name: Option<String>,
}

impl EventHookSync {
    pub fn read(reader: &mut BinaryReader) -> Result<Self> {
        let mask = OptionalMask::read(reader)?;
        Ok(Self {
            fsm_id: reader.read_i32_le()?,
            fsm_event_id: reader.read_i32_le()?,
            request: reader.read_bool()?,
            fsm_event_name: read_optional(reader, mask, OptionalMask::FIELD_0, BinaryReader::read_string)?,
        })
    }

    pub fn write(&self, writer: &mut BinaryWriter) {
        let mask = OptionalMask::empty().with(OptionalMask::FIELD_0, self.fsm_event_name.is_some());
        writer.write_u8(mask.bits());
        writer.write_i32_le(self.fsm_id);
        writer.write_i32_le(self.fsm_event_id);
        writer.write_bool(self.request);
        if let Some(name) = &self.fsm_event_name {
            writer.write_string(name);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleState {
    pub vehicle_id: u8,
    pub state: i32,
    pub dash_state: i32,
    pub start_time: Option<f32>,
}

impl VehicleState {
    pub fn read(reader: &mut BinaryReader) -> Result<Self> {
        let mask = OptionalMask::read(reader)?;
        Ok(Self {
            vehicle_id: reader.read_u8()?,
            state: reader.read_i32_le()?,
            dash_state: reader.read_i32_le()?,
            start_time: read_optional(reader, mask, OptionalMask::FIELD_0, BinaryReader::read_f32_le)?,
        })
    }

    pub fn write(&self, writer: &mut BinaryWriter) {
        let mask = OptionalMask::empty().with(OptionalMask::FIELD_0, self.start_time.is_some());
        writer.write_u8(mask.bits());
        writer.write_u8(self.vehicle_id);
        writer.write_i32_le(self.state);
        writer.write_i32_le(self.dash_state);
        if let Some(start_time) = self.start_time {
            writer.write_f32_le(start_time);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleSwitch {
    pub vehicle_id: u8,
    pub switch_id: i32,
    pub switch_value: bool,
    pub switch_value_float: Option<f32>,
}

impl VehicleSwitch {
    pub fn read(reader: &mut BinaryReader) -> Result<Self> {
        let mask = OptionalMask::read(reader)?;
        Ok(Self {
            vehicle_id: reader.read_u8()?,
            switch_id: reader.read_i32_le()?,
            switch_value: reader.read_bool()?,
            switch_value_float: read_optional(reader, mask, OptionalMask::FIELD_0, BinaryReader::read_f32_le)?,
        })
    }

    pub fn write(&self, writer: &mut BinaryWriter) {
        let mask = OptionalMask::empty().with(OptionalMask::FIELD_0, self.switch_value_float.is_some());
        writer.write_u8(mask.bits());
        writer.write_u8(self.vehicle_id);
        writer.write_i32_le(self.switch_id);
        writer.write_bool(self.switch_value);
        if let Some(value) = self.switch_value_float {
            writer.write_f32_le(value);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimSync {
    pub is_leaning: bool,
    pub is_grounded: bool,
    pub active_hand_state: u8,
    pub aim_rotation: f32,
    pub is_drunk: bool,
}

impl AnimSync {
    pub fn read(reader: &mut BinaryReader) -> Result<Self> {
        Ok(Self {
            is_leaning: reader.read_bool()?,
            is_grounded: reader.read_bool()?,
            active_hand_state: reader.read_u8()?,
            aim_rotation: reader.read_f32_le()?,
            is_drunk: reader.read_bool()?,
        })
    }

    pub fn write(&self, writer: &mut BinaryWriter) {
        writer.write_bool(self.is_leaning);
        writer.write_bool(self.is_grounded);
        writer.write_u8(self.active_hand_state);
        writer.write_f32_le(self.aim_rotation);
        writer.write_bool(self.is_drunk);
    }
}

fn read_optional<'a, T>(
    reader: &mut BinaryReader<'a>,
    mask: OptionalMask,
    flag: OptionalMask,
    read: impl FnOnce(&mut BinaryReader<'a>) -> Result<T>,
) -> Result<Option<T>> {
    if mask.contains(flag) {
        read(reader).map(Some)
    } else {
        Ok(None)
    }
}

/// Every message of the protocol
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Handshake(Handshake),
    Heartbeat(Heartbeat),
    HeartbeatResponse(HeartbeatResponse),
    Disconnect,
    PlayerSync(PlayerSync),
    VehicleSync(VehicleSync),
    OpenDoors(OpenDoors),
    FullWorldSync(FullWorldSync),
    AskForWorldState,
    VehicleEnter(VehicleEnter),
    VehicleLeave,
    PickupObject(PickupObject),
    ReleaseObject(ReleaseObject),
    PickupableSpawn(PickupableSpawn),
    PickupableDestroy(PickupableDestroy),
    PickupableActivate(PickupableActivate),
    PickupableSetPosition(PickupableSetPosition),
    WorldPeriodicalUpdate(WorldPeriodicalUpdate),
    RemoveBottle(RemoveBottle),
    LightSwitch(LightSwitch),
    ObjectSync(ObjectSync),
    ObjectSyncResponse(ObjectSyncResponse),
    ObjectSyncRequest(ObjectSyncRequest),
    EventHookSync(EventHookSync),
    VehicleState(VehicleState),
    VehicleSwitch(VehicleSwitch),
    WeatherSync(Weather),
    AnimSync(AnimSync),
}

impl Message {
    pub fn id(&self) -> MessageId {
        match self {
            Message::Handshake(_) => MessageId::Handshake,
            Message::Heartbeat(_) => MessageId::Heartbeat,
            Message::HeartbeatResponse(_) => MessageId::HeartbeatResponse,
            Message::Disconnect => MessageId::Disconnect,
            Message::PlayerSync(_) => MessageId::PlayerSync,
            Message::VehicleSync(_) => MessageId::VehicleSync,
            Message::OpenDoors(_) => MessageId::OpenDoors,
            Message::FullWorldSync(_) => MessageId::FullWorldSync,
            Message::AskForWorldState => MessageId::AskForWorldState,
            Message::VehicleEnter(_) => MessageId::VehicleEnter,
            Message::VehicleLeave => MessageId::VehicleLeave,
            Message::PickupObject(_) => MessageId::PickupObject,
            Message::ReleaseObject(_) => MessageId::ReleaseObject,
            Message::PickupableSpawn(_) => MessageId::PickupableSpawn,
            Message::PickupableDestroy(_) => MessageId::PickupableDestroy,
            Message::PickupableActivate(_) => MessageId::PickupableActivate,
            Message::PickupableSetPosition(_) => MessageId::PickupableSetPosition,
            Message::WorldPeriodicalUpdate(_) => MessageId::WorldPeriodicalUpdate,
            Message::RemoveBottle(_) => MessageId::RemoveBottle,
            Message::LightSwitch(_) => MessageId::LightSwitch,
            Message::ObjectSync(_) => MessageId::ObjectSync,
            Message::ObjectSyncResponse(_) => MessageId::ObjectSyncResponse,
            Message::ObjectSyncRequest(_) => MessageId::ObjectSyncRequest,
            Message::EventHookSync(_) => MessageId::EventHookSync,
            Message::VehicleState(_) => MessageId::VehicleState,
            Message::VehicleSwitch(_) => MessageId::VehicleSwitch,
            Message::WeatherSync(_) => MessageId::WeatherSync,
            Message::AnimSync(_) => MessageId::AnimSync,
        }
    }

    pub fn send_mode(&self) -> SendMode {
        match self {
            Message::PlayerSync(_)
            | Message::VehicleSync(_)
            | Message::AnimSync(_)
            | Message::WorldPeriodicalUpdate(_) => SendMode::Unreliable,
            Message::ObjectSync(sync) => sync.sync_type().send_mode(),
            _ => SendMode::Reliable,
        }
    }

    pub fn write_payload(&self, writer: &mut BinaryWriter) {
        match self {
            Message::Handshake(m) => m.write(writer),
            Message::Heartbeat(m) => m.write(writer),
            Message::HeartbeatResponse(m) => m.write(writer),
            Message::Disconnect | Message::AskForWorldState | Message::VehicleLeave => {}
            Message::PlayerSync(m) => m.write(writer),
            Message::VehicleSync(m) => m.write(writer),
            Message::OpenDoors(m) => m.write(writer),
            Message::FullWorldSync(m) => m.write(writer),
            Message::VehicleEnter(m) => m.write(writer),
            Message::PickupObject(m) => writer.write_u16_le(m.id),
            Message::ReleaseObject(m) => {
                writer.write_u16_le(m.id);
                writer.write_bool(m.drop);
            }
            Message::PickupableSpawn(m) => m.write(writer),
            Message::PickupableDestroy(m) => writer.write_u16_le(m.id),
            Message::PickupableActivate(m) => {
                writer.write_u16_le(m.id);
                writer.write_bool(m.activate);
            }
            Message::PickupableSetPosition(m) => {
                writer.write_u16_le(m.id);
                writer.write_vec3(m.position);
            }
            Message::WorldPeriodicalUpdate(m) => m.write(writer),
            Message::RemoveBottle(m) => writer.write_u16_le(m.id),
            Message::LightSwitch(m) => {
                writer.write_vec3(m.position);
                writer.write_bool(m.on);
            }
            Message::ObjectSync(m) => m.write(writer),
            Message::ObjectSyncResponse(m) => {
                writer.write_i32_le(m.object_id);
                writer.write_bool(m.accepted);
            }
            Message::ObjectSyncRequest(m) => writer.write_i32_le(m.object_id),
            Message::EventHookSync(m) => m.write(writer),
            Message::VehicleState(m) => m.write(writer),
            Message::VehicleSwitch(m) => m.write(writer),
            Message::WeatherSync(w) => writer.write_weather(*w),
            Message::AnimSync(m) => m.write(writer),
        }
    }

    /// Encode as a complete packet
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = BinaryWriter::with_capacity(64);
        self.write_payload(&mut writer);
        PacketBuilder::new(self.id()).payload(writer.as_slice()).build()
    }

    /// Decode the payload of a message whose id is already known
    pub fn decode(id: MessageId, reader: &mut BinaryReader) -> Result<Self> {
        let message = match id {
            MessageId::Handshake => Message::Handshake(Handshake::read(reader)?),
            MessageId::Heartbeat => Message::Heartbeat(Heartbeat::read(reader)?),
            MessageId::HeartbeatResponse => Message::HeartbeatResponse(HeartbeatResponse::read(reader)?),
            MessageId::Disconnect => Message::Disconnect,
            MessageId::PlayerSync => Message::PlayerSync(PlayerSync::read(reader)?),
            MessageId::VehicleSync => Message::VehicleSync(VehicleSync::read(reader)?),
            MessageId::OpenDoors => Message::OpenDoors(OpenDoors::read(reader)?),
            MessageId::FullWorldSync => Message::FullWorldSync(FullWorldSync::read(reader)?),
            MessageId::AskForWorldState => Message::AskForWorldState,
            MessageId::VehicleEnter => Message::VehicleEnter(VehicleEnter::read(reader)?),
            MessageId::VehicleLeave => Message::VehicleLeave,
            MessageId::PickupObject => Message::PickupObject(PickupObject { id: reader.read_u16_le()? }),
            MessageId::ReleaseObject => Message::ReleaseObject(ReleaseObject {
                id: reader.read_u16_le()?,
                drop: reader.read_bool()?,
            }),
            MessageId::PickupableSpawn => Message::PickupableSpawn(PickupableSpawn::read(reader)?),
            MessageId::PickupableDestroy => {
                Message::PickupableDestroy(PickupableDestroy { id: reader.read_u16_le()? })
            }
            MessageId::PickupableActivate => Message::PickupableActivate(PickupableActivate {
                id: reader.read_u16_le()?,
                activate: reader.read_bool()?,
            }),
            MessageId::PickupableSetPosition => Message::PickupableSetPosition(PickupableSetPosition {
                id: reader.read_u16_le()?,
                position: reader.read_vec3()?,
            }),
            MessageId::WorldPeriodicalUpdate => {
                Message::WorldPeriodicalUpdate(WorldPeriodicalUpdate::read(reader)?)
            }
            MessageId::RemoveBottle => Message::RemoveBottle(RemoveBottle { id: reader.read_u16_le()? }),
            MessageId::LightSwitch => Message::LightSwitch(LightSwitch {
                position: reader.read_vec3()?,
                on: reader.read_bool()?,
            }),
            MessageId::ObjectSync => Message::ObjectSync(ObjectSync::read(reader)?),
            MessageId::ObjectSyncResponse => Message::ObjectSyncResponse(ObjectSyncResponse {
                object_id: reader.read_i32_le()?,
                accepted: reader.read_bool()?,
            }),
            MessageId::ObjectSyncRequest => {
                Message::ObjectSyncRequest(ObjectSyncRequest { object_id: reader.read_i32_le()? })
            }
            MessageId::EventHookSync => Message::EventHookSync(EventHookSync::read(reader)?),
            MessageId::VehicleState => Message::VehicleState(VehicleState::read(reader)?),
            MessageId::VehicleSwitch => Message::VehicleSwitch(VehicleSwitch::read(reader)?),
            MessageId::WeatherSync => Message::WeatherSync(reader.read_weather()?),
            MessageId::AnimSync => Message::AnimSync(AnimSync::read(reader)?),
        };
        Ok(message)
    }

    /// Parse a complete packet
    pub fn parse(data: &[u8]) -> Result<Self> {
        let (header, payload_start) = PacketHeader::parse(data)?;
        let mut reader = BinaryReader::new(&data[payload_start..]);
        Self::decode(header.message_id, &mut reader)
    }
}
