//! Pixel data for the demo textures: 2D gradient noise, one colour mask per
//! texture.

use glam::Vec2;

/// Width and height of every demo texture.
pub const TEXTURE_SIZE: u32 = 512;

/// Channel masks, cycled by texture index.
pub const MASKS: [[bool; 3]; 4] = [
    [true, false, false],
    [false, true, false],
    [false, false, true],
    [true, true, false],
];

const FREQUENCY: f32 = 16.0;
const INDEX_OFFSET: f32 = 3.0;

const GRADIENTS: [[f32; 2]; 8] = [
    [1.0, 0.0],
    [-1.0, 0.0],
    [0.0, 1.0],
    [0.0, -1.0],
    [std::f32::consts::FRAC_1_SQRT_2, std::f32::consts::FRAC_1_SQRT_2],
    [-std::f32::consts::FRAC_1_SQRT_2, std::f32::consts::FRAC_1_SQRT_2],
    [std::f32::consts::FRAC_1_SQRT_2, -std::f32::consts::FRAC_1_SQRT_2],
    [-std::f32::consts::FRAC_1_SQRT_2, -std::f32::consts::FRAC_1_SQRT_2],
];

/// Tightly packed RGBA8 texels for texture `index`, row-major.
///
/// Negative noise values are clamped to black; alpha is always opaque.
pub fn noise_texture(index: usize, width: u32, height: u32) -> Vec<u8> {
    let mask = MASKS[index % MASKS.len()];
    let offset = Vec2::splat(index as f32 * INDEX_OFFSET);

    let mut data = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height {
        for x in 0..width {
            let pos = Vec2::new(x as f32 / width as f32, y as f32 / height as f32);
            let value = gradient_noise(pos * FREQUENCY + offset);
            let level = (value * 255.0).clamp(0.0, 255.0) as u8;

            for channel in mask {
                data.push(if channel { level } else { 0 });
            }
            data.push(u8::MAX);
        }
    }
    data
}

/// Gradient noise in roughly [-1, 1], zero on integer lattice points.
pub fn gradient_noise(p: Vec2) -> f32 {
    let cell = p.floor();
    let f = p - cell;
    let (ix, iy) = (cell.x as i32, cell.y as i32);

    let corner = |dx: i32, dy: i32| {
        let g = Vec2::from(GRADIENTS[(hash(ix + dx, iy + dy) % 8) as usize]);
        g.dot(f - Vec2::new(dx as f32, dy as f32))
    };

    let u = f * f * f * (f * (f * 6.0 - 15.0) + 10.0);
    let bottom = lerp(corner(0, 0), corner(1, 0), u.x);
    let top = lerp(corner(0, 1), corner(1, 1), u.x);
    lerp(bottom, top, u.y)
}

fn hash(x: i32, y: i32) -> u32 {
    let mut h = (x as u32).wrapping_mul(0x8da6_b343) ^ (y as u32).wrapping_mul(0xd816_3841);
    h ^= h >> 13;
    h = h.wrapping_mul(0x5bd1_e995);
    h ^ (h >> 15)
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
