/// Gameplay tuning for the platformer physics step.
///
/// Keep this separate from runtime/server configuration (tick rates, buffer sizes, etc.).
/// All speeds are in world units per tick; the kernel integrates one Euler step per tick.

#[derive(Debug, Clone, Copy)]
pub struct PhysicsTuning {
    /// Horizontal acceleration applied while Left or Right is held.
    pub accel: f32,

    /// Absolute cap on horizontal speed.
    pub max_speed_x: f32,

    /// Multiplier applied to horizontal speed when no direction is held (0.0..1.0).
    pub friction: f32,

    /// Downward acceleration (+Y is down).
    pub gravity: f32,

    /// Terminal downward speed.
    pub max_fall_speed: f32,

    /// Upward speed set when jumping from the ground.
    pub jump_impulse: f32,
}

impl Default for PhysicsTuning {
    fn default() -> Self {
        Self {
            accel: 1.5,
            max_speed_x: 6.0,
            friction: 0.7,
            gravity: 1.2,
            max_fall_speed: 12.0,
            jump_impulse: 14.0,
        }
    }
}

/// Default collision box for newly spawned players.
pub const PLAYER_SIZE: crate::domain::Vector2 = crate::domain::Vector2::new(16.0, 16.0);
