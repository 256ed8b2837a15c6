use std::collections::{HashMap, HashSet};

use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub type Rgb8 = [u8; 3];

pub const COLOR_SEED: u64 = 42;
pub const MIN_COLOR_DISTANCE: f64 = 50.0;
pub const MAX_COLOR_ATTEMPTS: usize = 1000;
const BOLD_SATURATION: f64 = 0.9;
const BOLD_VALUE: f64 = 1.0;

/// Per-session class id to color table.
///
/// Assignments are never evicted: once a class has a color it keeps it for the
/// lifetime of the value, so the same class looks the same on every page.
#[derive(Debug, Clone)]
pub struct ClassColors {
    assigned: HashMap<i64, Rgb8>,
    used: Vec<Rgb8>,
    fallbacks: HashSet<i64>,
    min_distance: f64,
}

impl Default for ClassColors {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassColors {
    pub fn new() -> Self {
        Self::with_min_distance(MIN_COLOR_DISTANCE)
    }

    pub fn with_min_distance(min_distance: f64) -> Self {
        Self {
            assigned: HashMap::new(),
            used: Vec::new(),
            fallbacks: HashSet::new(),
            min_distance,
        }
    }

    pub fn color_for(&mut self, class_id: i64) -> Rgb8 {
        if let Some(color) = self.get(class_id) {
            return color;
        }

        let (color, fell_back) = self.generate_bold_color();
        if fell_back {
            warn!(
                "No color at least {} away from {} used colors for class {class_id}, using {color:?}",
                self.min_distance,
                self.used.len()
            );
            self.fallbacks.insert(class_id);
        } else {
            debug!("Assigned color {color:?} to class {class_id}");
        }
        self.used.push(color);
        self.assigned.insert(class_id, color);
        color
    }

    pub fn get(&self, class_id: i64) -> Option<Rgb8> {
        self.assigned.get(&class_id).copied()
    }

    pub fn is_fallback(&self, class_id: i64) -> bool {
        self.fallbacks.contains(&class_id)
    }

    /// Class ids with a color, ascending.
    pub fn class_ids(&self) -> Vec<i64> {
        let mut ids = self.assigned.keys().copied().collect::<Vec<_>>();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }

    // Reseeded on every call, so the result depends only on what is already used.
    fn generate_bold_color(&self) -> (Rgb8, bool) {
        let mut rng = StdRng::seed_from_u64(COLOR_SEED);
        for _ in 0..MAX_COLOR_ATTEMPTS {
            let hue = rng.gen::<f64>();
            let (r, g, b) = hsv_to_rgb(hue, BOLD_SATURATION, BOLD_VALUE);
            let candidate = [
                (r * 255.0) as u8,
                (g * 255.0) as u8,
                (b * 255.0) as u8,
            ];
            if self
                .used
                .iter()
                .all(|used| color_distance(candidate, *used) > self.min_distance)
            {
                return (candidate, false);
            }
        }

        let fallback = [rng.gen::<u8>(), rng.gen::<u8>(), rng.gen::<u8>()];
        (fallback, true)
    }
}

pub fn color_distance(a: Rgb8, b: Rgb8) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let delta = f64::from(*x) - f64::from(*y);
            delta * delta
        })
        .sum::<f64>()
        .sqrt()
}

/// HSV in [0,1] to RGB in [0,1].
pub fn hsv_to_rgb(h: f64, s: f64, v: f64) -> (f64, f64, f64) {
    if s <= 0.0 {
        return (v, v, v);
    }
    let sector = (h * 6.0).floor();
    let f = h * 6.0 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match (sector as i64).rem_euclid(6) {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    }
}
