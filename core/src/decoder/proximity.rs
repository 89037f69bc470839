//! `ProximityState`: the abstract interface over per-sample key matches and
//! gesture geometry (§6.2). The source treats the spatial input
//! preprocessor as out of scope; this crate still needs at least one
//! concrete implementation of each flavor to exercise `Weighting`
//! end-to-end, so it provides a simple rectangular key grid
//! (`GridProximityState`) and a raw-sample path carrier
//! (`SampledPathProximityState`).

use super::types::{CodePoint, ProximityType};

/// A single key's geometry on a keyboard layout.
#[derive(Debug, Clone, Copy)]
pub struct Key {
    pub code_point: CodePoint,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Shared key-geometry lookup used by both concrete `ProximityState` impls.
#[derive(Debug, Clone)]
pub struct KeyGrid {
    keys: Vec<Key>,
}

impl KeyGrid {
    pub fn new(keys: Vec<Key>) -> Self {
        KeyGrid { keys }
    }

    pub fn key_for(&self, cp: CodePoint) -> Option<&Key> {
        self.keys.iter().find(|k| k.code_point == cp)
    }

    pub fn center_of(&self, cp: CodePoint) -> Option<(i32, i32)> {
        self.key_for(cp).map(|k| (k.x, k.y))
    }

    pub fn nearest_key(&self, x: i32, y: i32) -> Option<&Key> {
        self.keys.iter().min_by_key(|k| {
            let dx = (k.x - x) as i64;
            let dy = (k.y - y) as i64;
            dx * dx + dy * dy
        })
    }

    /// The most frequently occurring key width, used by the Gesture
    /// Weighting policy's deviation threshold (`thresholdBase =
    /// mostCommonKeyWidth / 48`, spec §4.6).
    pub fn most_common_key_width(&self) -> i32 {
        if self.keys.is_empty() {
            return 1;
        }
        let mut widths: Vec<i32> = self.keys.iter().map(|k| k.width).collect();
        widths.sort_unstable();
        let mut best = widths[0];
        let mut best_count = 1usize;
        let mut current = widths[0];
        let mut current_count = 1usize;
        for &w in &widths[1..] {
            if w == current {
                current_count += 1;
            } else {
                current = w;
                current_count = 1;
            }
            if current_count > best_count {
                best_count = current_count;
                best = current;
            }
        }
        best.max(1)
    }

    fn geometric_proximity(&self, primary: CodePoint, candidate: CodePoint) -> ProximityType {
        if primary == candidate {
            return ProximityType::Match;
        }
        let (Some(a), Some(b)) = (self.key_for(primary), self.key_for(candidate)) else {
            return ProximityType::Unrelated;
        };
        let dx = (a.x - b.x) as f32;
        let dy = (a.y - b.y) as f32;
        let dist = (dx * dx + dy * dy).sqrt();
        let unit = ((a.width + a.height) as f32 / 2.0).max(1.0);
        let ratio = dist / unit;
        if ratio <= 1.2 {
            ProximityType::Proximity
        } else if ratio <= 2.0 {
            ProximityType::AdditionalProximity
        } else if ratio <= 3.5 {
            ProximityType::Substitution
        } else {
            ProximityType::Unrelated
        }
    }
}

/// Per-sample key matches and gesture geometry consumed by `Weighting`.
/// Wire-level input capture is out of scope (§1); this trait is the seam.
pub trait ProximityState {
    fn size(&self) -> usize;
    fn primary_code_point_at(&self, index: usize) -> CodePoint;
    fn primary_original_code_point_at(&self, index: usize) -> CodePoint;
    fn proximity_type(&self, index: usize, code_point: CodePoint, check_proximity: bool) -> ProximityType;
    fn input_x(&self, index: usize) -> i32;
    fn input_y(&self, index: usize) -> i32;
    fn is_used(&self) -> bool;
    fn is_continuous_suggestion_possible(&self) -> bool;
    fn touch_position_correction_enabled(&self) -> bool;
}

/// A typed sequence of key presses on a rectangular key grid. Each input
/// sample is exactly one key; case is preserved separately from the
/// case-folded primary code point so `Weighting` can classify case-only
/// mismatches.
pub struct GridProximityState {
    grid: KeyGrid,
    typed: Vec<CodePoint>,
    touch_position_correction_enabled: bool,
}

impl GridProximityState {
    pub fn new(grid: KeyGrid, typed: Vec<CodePoint>) -> Self {
        GridProximityState { grid, typed, touch_position_correction_enabled: true }
    }

    pub fn with_touch_correction(mut self, enabled: bool) -> Self {
        self.touch_position_correction_enabled = enabled;
        self
    }

    pub fn grid(&self) -> &KeyGrid {
        &self.grid
    }
}

impl ProximityState for GridProximityState {
    fn size(&self) -> usize {
        self.typed.len()
    }

    fn primary_code_point_at(&self, index: usize) -> CodePoint {
        self.typed[index].to_ascii_lowercase()
    }

    fn primary_original_code_point_at(&self, index: usize) -> CodePoint {
        self.typed[index]
    }

    fn proximity_type(&self, index: usize, code_point: CodePoint, check_proximity: bool) -> ProximityType {
        let primary = self.primary_code_point_at(index);
        if !check_proximity {
            return if code_point == primary { ProximityType::Match } else { ProximityType::Unrelated };
        }
        self.grid.geometric_proximity(primary, code_point)
    }

    fn input_x(&self, index: usize) -> i32 {
        self.grid.center_of(self.primary_code_point_at(index)).map(|(x, _)| x).unwrap_or(0)
    }

    fn input_y(&self, index: usize) -> i32 {
        self.grid.center_of(self.primary_code_point_at(index)).map(|(_, y)| y).unwrap_or(0)
    }

    fn is_used(&self) -> bool {
        !self.typed.is_empty()
    }

    fn is_continuous_suggestion_possible(&self) -> bool {
        true
    }

    fn touch_position_correction_enabled(&self) -> bool {
        self.touch_position_correction_enabled
    }
}

/// A raw (x, y, time) gesture sample.
#[derive(Debug, Clone, Copy)]
pub struct GestureSample {
    pub x: i32,
    pub y: i32,
    pub time_ms: u32,
}

/// A swipe-typed path: raw samples plus the key grid they were drawn over.
/// `Weighting::Gesture` reads `samples()`/`grid()` directly to compute
/// perpendicular distances and direction-reversal penalties (§4.6).
pub struct SampledPathProximityState {
    grid: KeyGrid,
    samples: Vec<GestureSample>,
}

impl SampledPathProximityState {
    pub fn new(grid: KeyGrid, samples: Vec<GestureSample>) -> Self {
        SampledPathProximityState { grid, samples }
    }

    pub fn grid(&self) -> &KeyGrid {
        &self.grid
    }

    pub fn samples(&self) -> &[GestureSample] {
        &self.samples
    }

    fn nearest_key_code_point(&self, index: usize) -> CodePoint {
        let s = self.samples[index];
        self.grid.nearest_key(s.x, s.y).map(|k| k.code_point).unwrap_or(super::types::NOT_A_CODE_POINT)
    }
}

impl ProximityState for SampledPathProximityState {
    fn size(&self) -> usize {
        self.samples.len()
    }

    fn primary_code_point_at(&self, index: usize) -> CodePoint {
        self.nearest_key_code_point(index)
    }

    fn primary_original_code_point_at(&self, index: usize) -> CodePoint {
        self.nearest_key_code_point(index)
    }

    fn proximity_type(&self, index: usize, code_point: CodePoint, check_proximity: bool) -> ProximityType {
        let primary = self.primary_code_point_at(index);
        if !check_proximity {
            return if code_point == primary { ProximityType::Match } else { ProximityType::Unrelated };
        }
        self.grid.geometric_proximity(primary, code_point)
    }

    fn input_x(&self, index: usize) -> i32 {
        self.samples[index].x
    }

    fn input_y(&self, index: usize) -> i32 {
        self.samples[index].y
    }

    fn is_used(&self) -> bool {
        !self.samples.is_empty()
    }

    fn is_continuous_suggestion_possible(&self) -> bool {
        false
    }

    fn touch_position_correction_enabled(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qwerty_row() -> KeyGrid {
        KeyGrid::new(vec![
            Key { code_point: 'q', x: 0, y: 0, width: 10, height: 10 },
            Key { code_point: 'w', x: 10, y: 0, width: 10, height: 10 },
            Key { code_point: 'e', x: 20, y: 0, width: 10, height: 10 },
            Key { code_point: 'r', x: 30, y: 0, width: 10, height: 10 },
        ])
    }

    #[test]
    fn adjacent_keys_report_proximity() {
        let grid = qwerty_row();
        let state = GridProximityState::new(grid, vec!['w']);
        assert_eq!(state.proximity_type(0, 'w', true), ProximityType::Match);
        assert_eq!(state.proximity_type(0, 'q', true), ProximityType::Proximity);
        assert_eq!(state.proximity_type(0, 'r', true), ProximityType::Unrelated);
    }

    #[test]
    fn most_common_key_width_is_a_mode() {
        let grid = qwerty_row();
        assert_eq!(grid.most_common_key_width(), 10);
    }
}
