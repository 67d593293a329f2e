//! # Noise Field
//!
//! Deterministic hash-based value noise for terrain height and biome moisture.
//!
//! Every function here is a pure function of the seed and the input
//! coordinates: no global state, no entropy, safe to call from any number of
//! worker threads at once. Identical inputs give bit-identical outputs across
//! runs and platforms because the hash runs on wrapping 32-bit integers.
//!
//! The height and moisture pipelines look alike but deliberately differ:
//!
//! | stage        | height                          | moisture                 |
//! |--------------|---------------------------------|--------------------------|
//! | hash mix     | `x + 57z + 131·seed`            | `13x + 37z + 97·(seed+12345)` |
//! | smoothing    | corners/10, sides/8, center/4   | corners/5, sides/4, center/4 |
//! | lattice      | (0,0) (+3,0) (0,+2) (+2,+4)     | (0,0) (1,0) (0,1) (1,1)  |
//!
//! These constants define the look of the terrain and are kept as-is.

use noise::NoiseFn;

/// Divisors applied to the neighbourhood of a lattice point when smoothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingWeights {
    /// Divisor for the sum of the four diagonal neighbours
    pub corners: f32,
    /// Divisor for the sum of the four orthogonal neighbours
    pub sides: f32,
    /// Divisor for the center sample
    pub center: f32,
}

/// Smoothing used by the height field.
pub const HEIGHT_SMOOTHING: SmoothingWeights = SmoothingWeights {
    corners: 10.0,
    sides: 8.0,
    center: 4.0,
};

/// Smoothing used by the moisture field.
pub const MOISTURE_SMOOTHING: SmoothingWeights = SmoothingWeights {
    corners: 5.0,
    sides: 4.0,
    center: 4.0,
};

/// Lattice offsets sampled by height interpolation, in (x, z) order:
/// the two x-interpolated pairs are `[0],[1]` and `[2],[3]`.
pub const HEIGHT_LATTICE_OFFSETS: [(i32, i32); 4] = [(0, 0), (3, 0), (0, 2), (2, 4)];

/// Lattice offsets sampled by moisture interpolation.
pub const MOISTURE_LATTICE_OFFSETS: [(i32, i32); 4] = [(0, 0), (1, 0), (0, 1), (1, 1)];

/// Offset added to the seed for the moisture hash.
const MOISTURE_SEED_OFFSET: i64 = 12345;

/// Mixes a lattice key through the fixed polynomial hash into `(-1, 1]`.
fn hash_to_unit(n: i32) -> f32 {
    let n = (n << 13) ^ n;
    let mixed = n
        .wrapping_mul(
            n.wrapping_mul(n)
                .wrapping_mul(15731)
                .wrapping_add(789221),
        )
        .wrapping_add(1376312589)
        & 0x7fff_ffff;
    1.0 - mixed as f32 / 1_073_741_824.0
}

/// Cosine interpolation between `a` and `b`.
fn interpolate(a: f32, b: f32, t: f32) -> f32 {
    let ft = t * std::f32::consts::PI;
    let f = (1.0 - ft.cos()) * 0.5;
    a * (1.0 - f) + b * f
}

fn smooth(weights: SmoothingWeights, sample: impl Fn(i32, i32) -> f32, x: i32, z: i32) -> f32 {
    let (left, right) = (x.wrapping_sub(1), x.wrapping_add(1));
    let (back, front) = (z.wrapping_sub(1), z.wrapping_add(1));
    let corners =
        (sample(left, back) + sample(right, back) + sample(left, front) + sample(right, front))
            / weights.corners;
    let sides =
        (sample(left, z) + sample(right, z) + sample(x, back) + sample(x, front)) / weights.sides;
    let center = sample(x, z) / weights.center;
    corners + sides + center
}

/// Samples the four lattice points and blends along x, then z.
///
/// Coordinates are truncated towards zero, so for negative inputs the
/// fractional part is negative as well. The cosine blend is symmetric, which
/// keeps the field continuous across zero.
fn interpolate_lattice(
    offsets: &[(i32, i32); 4],
    smoothed: impl Fn(i32, i32) -> f32,
    x: f32,
    z: f32,
) -> f32 {
    let int_x = x as i32;
    let int_z = z as i32;
    let frac_x = x - int_x as f32;
    let frac_z = z - int_z as f32;

    let [v1, v2, v3, v4] =
        offsets.map(|(dx, dz)| smoothed(int_x.wrapping_add(dx), int_z.wrapping_add(dz)));

    let i1 = interpolate(v1, v2, frac_x);
    let i2 = interpolate(v3, v4, frac_x);
    interpolate(i1, i2, frac_z)
}

/// A seeded source of height and moisture noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoiseField {
    seed: i64,
}

impl NoiseField {
    /// Creates a noise field for the given world seed.
    pub fn new(seed: i64) -> Self {
        NoiseField { seed }
    }

    /// The world seed.
    pub fn seed(&self) -> i64 {
        self.seed
    }

    fn lattice_noise(&self, x: i32, z: i32) -> f32 {
        let n = x
            .wrapping_add(z.wrapping_mul(57))
            .wrapping_add((self.seed as i32).wrapping_mul(131));
        hash_to_unit(n)
    }

    fn lattice_moisture(&self, x: i32, z: i32) -> f32 {
        let seed = self.seed.wrapping_add(MOISTURE_SEED_OFFSET) as i32;
        let n = x
            .wrapping_mul(13)
            .wrapping_add(z.wrapping_mul(37))
            .wrapping_add(seed.wrapping_mul(97));
        hash_to_unit(n)
    }

    /// Raw height noise at the integer-truncated coordinates.
    pub fn base_noise(&self, x: f32, z: f32) -> f32 {
        self.lattice_noise(x as i32, z as i32)
    }

    /// Raw moisture noise at the integer-truncated coordinates.
    pub fn moisture_noise(&self, x: f32, z: f32) -> f32 {
        self.lattice_moisture(x as i32, z as i32)
    }

    /// Height noise averaged over the 3x3 neighbourhood of a lattice point.
    pub fn smoothed_noise(&self, x: i32, z: i32) -> f32 {
        smooth(HEIGHT_SMOOTHING, |x, z| self.lattice_noise(x, z), x, z)
    }

    /// Moisture noise averaged over the 3x3 neighbourhood of a lattice point.
    pub fn smoothed_moisture_noise(&self, x: i32, z: i32) -> f32 {
        smooth(MOISTURE_SMOOTHING, |x, z| self.lattice_moisture(x, z), x, z)
    }

    /// Continuous height noise, used for terrain elevation.
    pub fn interpolated_noise(&self, x: f32, z: f32) -> f32 {
        interpolate_lattice(
            &HEIGHT_LATTICE_OFFSETS,
            |x, z| self.smoothed_noise(x, z),
            x,
            z,
        )
    }

    /// Continuous moisture noise, used for biome classification.
    pub fn interpolated_moisture_noise(&self, x: f32, z: f32) -> f32 {
        interpolate_lattice(
            &MOISTURE_LATTICE_OFFSETS,
            |x, z| self.smoothed_moisture_noise(x, z),
            x,
            z,
        )
    }

    /// The height pipeline as a `noise` crate source.
    pub fn height_field(&self) -> HeightField {
        HeightField(*self)
    }

    /// The moisture pipeline as a `noise` crate source.
    pub fn moisture_field(&self) -> MoistureField {
        MoistureField(*self)
    }
}

/// [`NoiseField::interpolated_noise`] exposed through [`NoiseFn`], sampled at `[x, z]`.
#[derive(Debug, Clone, Copy)]
pub struct HeightField(NoiseField);

impl NoiseFn<f64, 2> for HeightField {
    fn get(&self, point: [f64; 2]) -> f64 {
        self.0.interpolated_noise(point[0] as f32, point[1] as f32) as f64
    }
}

/// [`NoiseField::interpolated_moisture_noise`] exposed through [`NoiseFn`], sampled at `[x, z]`.
#[derive(Debug, Clone, Copy)]
pub struct MoistureField(NoiseField);

impl NoiseFn<f64, 2> for MoistureField {
    fn get(&self, point: [f64; 2]) -> f64 {
        self.0.interpolated_moisture_noise(point[0] as f32, point[1] as f32) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_noise_matches_reference_values() {
        // n = 0 hashes to 1 - 1376312589 / 2^30
        let field = NoiseField::new(0);
        let expected = 1.0 - 1_376_312_589_f32 / 1_073_741_824.0;
        assert_eq!(field.base_noise(0.0, 0.0), expected);
        // Truncation: every point in [0, 1) shares a lattice cell
        assert_eq!(field.base_noise(0.9, 0.2), expected);
    }

    #[test]
    fn noise_is_deterministic_across_instances() {
        let a = NoiseField::new(987_654_321);
        let b = NoiseField::new(987_654_321);
        for i in -50..50 {
            let x = i as f32 * 1.37;
            let z = i as f32 * -0.73;
            assert_eq!(a.base_noise(x, z).to_bits(), b.base_noise(x, z).to_bits());
            assert_eq!(
                a.interpolated_noise(x, z).to_bits(),
                b.interpolated_noise(x, z).to_bits()
            );
            assert_eq!(
                a.interpolated_moisture_noise(x, z).to_bits(),
                b.interpolated_moisture_noise(x, z).to_bits()
            );
        }
    }

    #[test]
    fn base_noise_stays_in_unit_range() {
        let field = NoiseField::new(42);
        for x in -200..200 {
            for z in [-1000, -3, 0, 7, 99_999] {
                let value = field.base_noise(x as f32, z as f32);
                assert!((-1.0..=1.0).contains(&value), "{value} at ({x}, {z})");
                let moisture = field.moisture_noise(x as f32, z as f32);
                assert!((-1.0..=1.0).contains(&moisture));
            }
        }
    }

    #[test]
    fn seeds_change_the_field() {
        let a = NoiseField::new(1);
        let b = NoiseField::new(2);
        let differs = (0..32).any(|x| a.base_noise(x as f32, 5.0) != b.base_noise(x as f32, 5.0));
        assert!(differs);
    }

    #[test]
    fn height_and_moisture_are_independent_pipelines() {
        let field = NoiseField::new(7);
        let differs = (0..32)
            .any(|x| field.base_noise(x as f32, 3.0) != field.moisture_noise(x as f32, 3.0));
        assert!(differs);
    }

    #[test]
    fn smoothing_uses_separate_weights() {
        let field = NoiseField::new(99);
        let manual = {
            let n = |x: i32, z: i32| field.base_noise(x as f32, z as f32);
            (n(-1, -1) + n(1, -1) + n(-1, 1) + n(1, 1)) / 10.0
                + (n(-1, 0) + n(1, 0) + n(0, -1) + n(0, 1)) / 8.0
                + n(0, 0) / 4.0
        };
        assert_eq!(field.smoothed_noise(0, 0), manual);

        let manual_moisture = {
            let n = |x: i32, z: i32| field.moisture_noise(x as f32, z as f32);
            (n(4, 4) + n(6, 4) + n(4, 6) + n(6, 6)) / 5.0
                + (n(4, 5) + n(6, 5) + n(5, 4) + n(5, 6)) / 4.0
                + n(5, 5) / 4.0
        };
        assert_eq!(field.smoothed_moisture_noise(5, 5), manual_moisture);
    }

    #[test]
    fn interpolation_hits_lattice_values_at_integer_points() {
        let field = NoiseField::new(31337);
        for x in -5..5 {
            for z in -5..5 {
                assert_eq!(
                    field.interpolated_noise(x as f32, z as f32),
                    field.smoothed_noise(x, z)
                );
                assert_eq!(
                    field.interpolated_moisture_noise(x as f32, z as f32),
                    field.smoothed_moisture_noise(x, z)
                );
            }
        }
    }

    #[test]
    fn height_interpolation_uses_non_uniform_lattice() {
        let field = NoiseField::new(5);
        // Halfway along x the blend weight is exactly 0.5 between (0,0) and (+3,0)
        let expected = {
            let f = (1.0 - (0.5 * std::f32::consts::PI).cos()) * 0.5;
            field.smoothed_noise(0, 0) * (1.0 - f) + field.smoothed_noise(3, 0) * f
        };
        assert_eq!(field.interpolated_noise(0.5, 0.0), expected);
    }

    #[test]
    fn noise_fn_adapters_agree_with_direct_calls() {
        let field = NoiseField::new(11);
        let height = field.height_field();
        let moisture = field.moisture_field();
        assert_eq!(
            height.get([2.25, -7.5]),
            field.interpolated_noise(2.25, -7.5) as f64
        );
        assert_eq!(
            moisture.get([2.25, -7.5]),
            field.interpolated_moisture_noise(2.25, -7.5) as f64
        );
    }
}
