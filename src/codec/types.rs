/// World-space vector (three consecutive f32 on the wire)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn sqr_magnitude(self) -> f32 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    pub fn distance_to(self, other: Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Positions closer than `epsilon` address the same world fixture.
    pub fn approx_eq(self, other: Self, epsilon: f32) -> bool {
        self.distance_to(other) <= epsilon
    }
}

impl From<[f32; 3]> for Vec3 {
    fn from(v: [f32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// Rotation quaternion (four consecutive f32 on the wire, x y z w)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quat {
    pub const IDENTITY: Self = Self { x: 0.0, y: 0.0, z: 0.0, w: 1.0 };

    pub fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Position + rotation of a synchronized object
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Transform {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn at(position: Vec3) -> Self {
        Self { position, rotation: Quat::IDENTITY }
    }
}

/// Weather kinds known to the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum WeatherType {
    Rain = 0,
    Thunder = 1,
    #[default]
    Sunny = 2,
}

impl WeatherType {
    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            0 => Some(Self::Rain),
            1 => Some(Self::Thunder),
            2 => Some(Self::Sunny),
            _ => None,
        }
    }
}

/// Full weather descriptor: kind plus cloud placement
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Weather {
    pub kind: WeatherType,
    /// Cloud object X position
    pub position_x: f32,
    /// Cloud object Z position
    pub position_z: f32,
    /// Cloud texture offset
    pub offset: f32,
    /// Cloud object rotation
    pub rotation: f32,
}
