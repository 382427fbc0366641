//! # Temporal Value Pairs
//!
//! Everything the interpolator touches is held twice: the value committed at
//! the previous logic tick and the value staged during the current one.
//!
//! ```text
//!   tick N-1 ──commit──► prev ─┐
//!                              ├── lerp(t) ──► sub-frame
//!   tick N   ──set_new──► new ─┘
//! ```
//!
//! Matrices are interpolated component by component. That is not a proper
//! rotation blend; large rotations are caught by the tick commit guards
//! instead.

use tickframe_shared::{Matrix4, Rect, Vec3, Vec4};

/// `a + t·(b − a)`.
#[inline]
#[must_use]
pub fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a + t * (b - a)
}

/// Integer lerp, rounding the step to nearest (half away from zero).
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn lerp_i32(a: i32, b: i32, t: f32) -> i32 {
    let step = (f64::from(t) * (f64::from(b) - f64::from(a))).round();
    (f64::from(a) + step) as i32
}

/// Values that can be blended between two ticks.
pub trait Lerp: Copy {
    /// Blend from `a` (t = 0) to `b` (t = 1).
    fn lerp(a: Self, b: Self, t: f32) -> Self;
}

impl Lerp for f32 {
    #[inline]
    fn lerp(a: Self, b: Self, t: f32) -> Self {
        lerp_f32(a, b, t)
    }
}

impl Lerp for Vec3 {
    #[inline]
    fn lerp(a: Self, b: Self, t: f32) -> Self {
        Self::new(lerp_f32(a.x, b.x, t), lerp_f32(a.y, b.y, t), lerp_f32(a.z, b.z, t))
    }
}

impl Lerp for Vec4 {
    #[inline]
    fn lerp(a: Self, b: Self, t: f32) -> Self {
        Self::new(
            lerp_f32(a.x, b.x, t),
            lerp_f32(a.y, b.y, t),
            lerp_f32(a.z, b.z, t),
            lerp_f32(a.w, b.w, t),
        )
    }
}

impl Lerp for Rect {
    #[inline]
    fn lerp(a: Self, b: Self, t: f32) -> Self {
        Self::new(
            lerp_i32(a.x, b.x, t),
            lerp_i32(a.y, b.y, t),
            lerp_i32(a.w, b.w, t),
            lerp_i32(a.h, b.h, t),
        )
    }
}

impl Lerp for Matrix4 {
    fn lerp(a: Self, b: Self, t: f32) -> Self {
        let mut out = a;
        for (row, b_row) in out.m.iter_mut().zip(b.m.iter()) {
            for (cell, &b_cell) in row.iter_mut().zip(b_row.iter()) {
                *cell = lerp_f32(*cell, b_cell, t);
            }
        }
        out
    }
}

/// A value as of the previous tick and as staged for the current tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interpolated<T> {
    prev: T,
    new: T,
    prev_valid: bool,
    new_valid: bool,
}

impl<T: Lerp> Interpolated<T> {
    /// Both sides start at `value`; neither is valid yet.
    #[must_use]
    pub const fn new(value: T) -> Self {
        Self {
            prev: value,
            new: value,
            prev_valid: false,
            new_valid: false,
        }
    }

    /// Stages the current tick's value.
    #[inline]
    pub fn set_new(&mut self, value: T) {
        self.new = value;
        self.new_valid = true;
    }

    /// Overwrites the previous value.
    #[inline]
    pub fn set_prev(&mut self, value: T) {
        self.prev = value;
    }

    /// Drops interpolation for this tick: prev ← new.
    #[inline]
    pub fn snap(&mut self) {
        self.prev = self.new;
    }

    /// Forgets the previous value; sampling returns the current one until
    /// the next commit.
    #[inline]
    pub fn invalidate_prev(&mut self) {
        self.prev_valid = false;
    }

    /// Blended value at weight `t`, or the current value if there is no
    /// valid previous one.
    #[inline]
    #[must_use]
    pub fn sample(&self, t: f32) -> T {
        if self.prev_valid {
            T::lerp(self.prev, self.new, t)
        } else {
            self.new
        }
    }

    /// Folds the staged value into the previous one.
    #[inline]
    pub fn commit(&mut self) {
        self.prev = self.new;
        self.prev_valid = true;
        self.new_valid = false;
    }

    /// Value from the previous tick.
    #[inline]
    #[must_use]
    pub const fn prev(&self) -> T {
        self.prev
    }

    /// Value staged this tick.
    #[inline]
    #[must_use]
    pub const fn current(&self) -> T {
        self.new
    }

    /// Returns true once a tick has been committed.
    #[inline]
    #[must_use]
    pub const fn prev_valid(&self) -> bool {
        self.prev_valid
    }

    /// Returns true if a value was staged this tick.
    #[inline]
    #[must_use]
    pub const fn new_valid(&self) -> bool {
        self.new_valid
    }
}

impl<T: Lerp + Default> Default for Interpolated<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp_f32_endpoints() {
        assert_eq!(lerp_f32(2.0, 6.0, 0.0), 2.0);
        assert_eq!(lerp_f32(2.0, 6.0, 1.0), 6.0);
        assert_eq!(lerp_f32(2.0, 6.0, 0.5), 4.0);
    }

    #[test]
    fn test_lerp_i32_rounds_half_away_from_zero() {
        assert_eq!(lerp_i32(0, 3, 0.5), 2); // 1.5 → 2
        assert_eq!(lerp_i32(3, 0, 0.5), 1); // 3 + round(-1.5) = 3 - 2
        assert_eq!(lerp_i32(10, 20, 0.25), 13); // 2.5 → 3
    }

    #[test]
    fn test_rect_lerp() {
        let a = Rect::new(0, 0, 100, 100);
        let b = Rect::new(10, 20, 200, 50);
        assert_eq!(Rect::lerp(a, b, 0.5), Rect::new(5, 10, 150, 75));
        assert_eq!(Rect::lerp(a, b, 1.0), b);
    }

    #[test]
    fn test_matrix_lerp_componentwise() {
        let a = Matrix4::IDENTITY;
        let b = Matrix4::translation(4.0, 8.0, -2.0);
        let mid = Matrix4::lerp(a, b, 0.5);
        assert_eq!(mid.m[3], [2.0, 4.0, -1.0, 1.0]);
        assert_eq!(mid.m[0], [1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_interpolated_without_prev_returns_current() {
        let mut v = Interpolated::new(0.0_f32);
        v.set_new(10.0);
        assert!(!v.prev_valid());
        assert_eq!(v.sample(0.5), 10.0);
    }

    #[test]
    fn test_interpolated_commit_cycle() {
        let mut v = Interpolated::new(Vec3::ZERO);
        v.set_new(Vec3::new(2.0, 0.0, 0.0));
        assert!(v.new_valid());
        v.commit();
        assert!(!v.new_valid());

        v.set_new(Vec3::new(4.0, 0.0, 0.0));
        assert_eq!(v.sample(0.5), Vec3::new(3.0, 0.0, 0.0));

        v.snap();
        assert_eq!(v.sample(0.5), Vec3::new(4.0, 0.0, 0.0));
    }
}
