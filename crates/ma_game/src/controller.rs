use crate::collision::{Aabb, CollisionMoveResult, SolidSet};
use crate::config::PhysicsConfig;

#[derive(Debug, Clone, Copy, Default)]
pub struct PlayerIntent {
    /// -1.0 (left), 0.0 or 1.0 (right) from held keys.
    pub move_x: f32,
    /// Edge-triggered; honored only while `can_jump`.
    pub jump_pressed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Facing {
    Left,
    #[default]
    Right,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContactState {
    pub left: bool,
    pub right: bool,
    pub down: bool,
    pub up: bool,
}

/// Platformer body: gravity plus move-and-slide against a `SolidSet`.
#[derive(Debug, Clone, Copy)]
pub struct PlatformerBody {
    pub aabb: Aabb,
    pub velocity_x: f32,
    pub velocity_y: f32,
    pub facing: Facing,
    /// Ground contact from the last step.
    pub can_jump: bool,
    pub contacts: ContactState,
    pub config: PhysicsConfig,
}

impl PlatformerBody {
    pub fn new(aabb: Aabb, config: PhysicsConfig) -> Self {
        Self {
            aabb,
            velocity_x: 0.0,
            velocity_y: 0.0,
            facing: Facing::default(),
            can_jump: false,
            contacts: ContactState::default(),
            config,
        }
    }

    /// Teleport the body's center to `(center_x, center_y)` and stop it.
    pub fn reset_at(&mut self, center_x: f32, center_y: f32) {
        self.aabb.center_x = center_x;
        self.aabb.center_y = center_y;
        self.velocity_x = 0.0;
        self.velocity_y = 0.0;
        self.can_jump = false;
        self.contacts = ContactState::default();
    }

    /// Resize around the current bottom edge so the body stays on its floor.
    pub fn resize(&mut self, width: f32, height: f32) {
        let bottom = self.aabb.bottom();
        self.aabb.half_w = width * 0.5;
        self.aabb.half_h = height * 0.5;
        self.aabb.center_y = bottom + self.aabb.half_h;
    }

    /// Held direction sets horizontal velocity directly; there is no
    /// acceleration ramp. Returns true when a jump started.
    pub fn apply_intent(&mut self, intent: PlayerIntent) -> bool {
        self.velocity_x = intent.move_x.clamp(-1.0, 1.0) * self.config.run_speed;
        if self.velocity_x < 0.0 {
            self.facing = Facing::Left;
        } else if self.velocity_x > 0.0 {
            self.facing = Facing::Right;
        }

        if intent.jump_pressed && self.can_jump {
            self.velocity_y = self.config.jump_speed;
            self.can_jump = false;
            return true;
        }
        false
    }

    pub fn clamp_x(&mut self, min_x: f32, max_x: f32) {
        if self.aabb.left() < min_x {
            self.aabb.center_x = min_x + self.aabb.half_w;
        }
        if self.aabb.right() > max_x {
            self.aabb.center_x = max_x - self.aabb.half_w;
        }
    }

    pub fn step(&mut self, dt: f32, solids: &SolidSet) {
        self.velocity_y =
            (self.velocity_y + self.config.gravity * dt).max(self.config.max_fall_speed);

        let dx = self.velocity_x * dt;
        let dy = self.velocity_y * dt;
        let result = solids.move_and_collide(self.aabb, dx, dy);
        self.apply_collision_result(result);
    }

    fn apply_collision_result(&mut self, result: CollisionMoveResult) {
        self.aabb = result.aabb;
        self.contacts = ContactState {
            left: result.blocked_left,
            right: result.blocked_right,
            down: result.blocked_down,
            up: result.blocked_up,
        };

        if (result.blocked_left && self.velocity_x < 0.0)
            || (result.blocked_right && self.velocity_x > 0.0)
        {
            self.velocity_x = 0.0;
        }

        if result.blocked_up && self.velocity_y > 0.0 {
            self.velocity_y = 0.0;
        }
        // Ground contact comes from the resolver, not from comparing heights.
        if result.blocked_down && self.velocity_y < 0.0 {
            self.velocity_y = 0.0;
            self.can_jump = true;
        } else {
            if result.collided_y {
                self.velocity_y = 0.0;
            }
            self.can_jump = false;
        }
    }
}
