//! The set of falling answer blocks
//!
//! Blocks fall under constant acceleration and leave the field exactly one
//! way: caught, fallen past the miss line, or destroyed by Clear. Removal
//! here is what makes "resolved exactly once" hold for every block.

use serde::{Deserialize, Serialize};

use super::collision::Aabb;
use super::state::AnswerEntity;
use crate::consts::MISS_Y;

/// Falling answer blocks for the current round, in spawn order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityField {
    entities: Vec<AnswerEntity>,
}

impl EntityField {
    pub fn spawn(&mut self, entity: AnswerEntity) {
        self.entities.push(entity);
    }

    /// Advance every block one step of constant-acceleration fall
    /// (semi-implicit Euler)
    pub fn integrate(&mut self, gravity: f32, dt: f32) {
        for e in &mut self.entities {
            e.vel_y += gravity * dt;
            e.pos.y += e.vel_y * dt;
        }
    }

    /// Remove and return blocks overlapping the catcher. A caught block is
    /// gone no matter how the catch resolves.
    pub fn take_caught(&mut self, catcher: &Aabb) -> Vec<AnswerEntity> {
        let mut caught = Vec::new();
        self.entities.retain(|e| {
            if catcher.overlaps(&e.aabb()) {
                caught.push(e.clone());
                false
            } else {
                true
            }
        });
        caught
    }

    /// Remove and return blocks at or past the miss line (inclusive, so no
    /// block can hover on the boundary forever)
    pub fn take_missed(&mut self) -> Vec<AnswerEntity> {
        let mut missed = Vec::new();
        self.entities.retain(|e| {
            if e.pos.y >= MISS_Y {
                missed.push(e.clone());
                false
            } else {
                true
            }
        });
        missed
    }

    /// Destroy every distractor block (Clear power-up). Returns the number
    /// removed.
    pub fn clear_distractors(&mut self) -> usize {
        let before = self.entities.len();
        self.entities.retain(|e| e.is_correct);
        before - self.entities.len()
    }

    /// Drop everything (round resolved, session reset)
    pub fn clear(&mut self) {
        self.entities.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnswerEntity> {
        self.entities.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{FIELD_HEIGHT, SIM_DT};
    use crate::sim::difficulty;
    use glam::Vec2;

    fn block(id: u32, value: i32, is_correct: bool, x: f32, y: f32) -> AnswerEntity {
        let mut e = AnswerEntity::new(id, value, is_correct, x);
        e.pos.y = y;
        e
    }

    #[test]
    fn test_fall_covers_field_in_fall_time() {
        // At level 1 a block starting at the top should cross the field
        // height in fall_time seconds, give or take a tick of integration
        // error.
        let mut field = EntityField::default();
        field.spawn(block(1, 2, true, 400.0, 0.0));
        let g = difficulty::gravity(1);
        let ticks = (difficulty::fall_time(1) / SIM_DT) as u32;

        for _ in 0..ticks.saturating_sub(5) {
            field.integrate(g, SIM_DT);
        }
        let y_early = field.iter().next().map(|e| e.pos.y).unwrap();
        assert!(y_early < FIELD_HEIGHT);

        for _ in 0..10 {
            field.integrate(g, SIM_DT);
        }
        let y_late = field.iter().next().map(|e| e.pos.y).unwrap();
        assert!(y_late >= FIELD_HEIGHT);
    }

    #[test]
    fn test_take_missed_is_boundary_inclusive() {
        let mut field = EntityField::default();
        field.spawn(block(1, 4, false, 200.0, MISS_Y));
        field.spawn(block(2, 5, false, 200.0, MISS_Y - 0.1));

        let missed = field.take_missed();
        assert_eq!(missed.len(), 1);
        assert_eq!(missed[0].id, 1);
        assert_eq!(field.len(), 1);
    }

    #[test]
    fn test_take_missed_reports_once() {
        let mut field = EntityField::default();
        field.spawn(block(1, 4, true, 200.0, MISS_Y + 10.0));

        assert_eq!(field.take_missed().len(), 1);
        assert!(field.take_missed().is_empty());
        assert!(field.is_empty());
    }

    #[test]
    fn test_take_caught_removes_overlapping_only() {
        let mut field = EntityField::default();
        field.spawn(block(1, 2, true, 400.0, 300.0));
        field.spawn(block(2, -2, false, 100.0, 300.0));

        let catcher = Aabb::from_center(Vec2::new(400.0, 300.0), Vec2::new(60.0, 15.0));
        let caught = field.take_caught(&catcher);
        assert_eq!(caught.len(), 1);
        assert_eq!(caught[0].id, 1);
        assert_eq!(field.len(), 1);
        assert_eq!(field.iter().next().map(|e| e.id), Some(2));
    }

    #[test]
    fn test_clear_distractors_leaves_correct_blocks() {
        let mut field = EntityField::default();
        field.spawn(block(1, 2, true, 100.0, 50.0));
        field.spawn(block(2, -2, false, 200.0, 50.0));
        field.spawn(block(3, 3, true, 300.0, 50.0));
        field.spawn(block(4, -3, false, 400.0, 50.0));

        assert_eq!(field.clear_distractors(), 2);
        assert_eq!(field.len(), 2);
        assert!(field.iter().all(|e| e.is_correct));
    }
}
