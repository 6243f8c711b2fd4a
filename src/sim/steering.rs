//! Stuck detection for walking AI
//!
//! When an actor barely moves for a while (blocked by a pillar or a crowd) it
//! strafes perpendicular to its goal for a short burst.

use glam::Vec3;

use crate::ground_perpendicular;
use crate::tuning::SteeringTuning;

/// Strafe side picked from the position: +1 right, -1 left
pub fn strafe_sign(pos: Vec3) -> f32 {
    // `%` keeps the dividend's sign, so negative sums always strafe left
    if (pos.x + pos.z) % 2.0 > 1.0 { 1.0 } else { -1.0 }
}

#[derive(Debug, Clone)]
pub struct Steering {
    last_checked: Vec3,
    stuck_timer: f32,
    strafe_timer: f32,
    strafe_dir: f32,
    strafing: bool,
}

impl Steering {
    pub fn new(pos: Vec3) -> Self {
        Self {
            last_checked: pos,
            stuck_timer: 0.0,
            strafe_timer: 0.0,
            strafe_dir: 1.0,
            strafing: false,
        }
    }

    pub fn is_strafing(&self) -> bool {
        self.strafing
    }

    pub fn strafe_dir(&self) -> f32 {
        self.strafe_dir
    }

    /// Forget any stuck history, e.g. after standing still on purpose
    pub fn reset(&mut self, pos: Vec3) {
        self.last_checked = pos;
        self.stuck_timer = 0.0;
        self.strafing = false;
        self.strafe_timer = 0.0;
    }

    /// Walk direction for this frame given the normalized goal direction
    pub fn steer(&mut self, dt: f32, pos: Vec3, goal_dir: Vec3, cfg: &SteeringTuning) -> Vec3 {
        if self.strafing {
            let dir = ground_perpendicular(goal_dir) * self.strafe_dir;
            self.strafe_timer -= dt;
            if self.strafe_timer <= 0.0 {
                self.strafing = false;
                self.stuck_timer = 0.0;
                self.last_checked = pos;
            }
            return dir;
        }

        if pos.distance(self.last_checked) < cfg.stuck_distance {
            self.stuck_timer += dt;
            if self.stuck_timer >= cfg.stuck_time {
                self.strafing = true;
                self.strafe_timer = cfg.strafe_duration;
                self.strafe_dir = strafe_sign(pos);
                log::debug!("stuck at ({:.0}, {:.0}), strafing {}", pos.x, pos.z, self.strafe_dir);
            }
        } else {
            self.stuck_timer = 0.0;
            self.last_checked = pos;
        }
        goal_dir
    }
}
