use image::Rgba;

/// Ordered set of fill colors handed out to regions in scan order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Palette {
    colors: Vec<Rgba<u8>>,
}

impl Palette {
    pub fn new(colors: Vec<Rgba<u8>>) -> Self {
        Self { colors }
    }

    /// `count` hues evenly spaced around the wheel at fixed saturation/value,
    /// then shuffled. The shuffle is seeded, so the same arguments always
    /// give the same palette.
    pub fn generate(count: usize, saturation: f32, value: f32, seed: u32) -> Self {
        if count == 0 {
            return Self::default();
        }
        let hue_step = 1.0 / count as f32;
        let mut colors: Vec<Rgba<u8>> = (0..count)
            .map(|i| {
                let (r, g, b) = hsv_to_rgb(i as f32 * hue_step, saturation, value);
                Rgba([to_u8(r), to_u8(g), to_u8(b), 255])
            })
            .collect();

        // Fisher–Yates, indices drawn from a positional hash
        for i in (1..colors.len()).rev() {
            let j = (shuffle_hash(i as u32, seed) % (i as u32 + 1)) as usize;
            colors.swap(i, j);
        }
        Self { colors }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[Rgba<u8>] {
        &self.colors
    }

    pub fn get(&self, index: usize) -> Option<Rgba<u8>> {
        self.colors.get(index).copied()
    }

    /// Cycling lookup used when recoloring decoded forms by file order.
    /// An empty palette yields opaque black.
    pub fn color_for(&self, index: usize) -> Rgba<u8> {
        if self.colors.is_empty() {
            return Rgba([0, 0, 0, 255]);
        }
        self.colors[index % self.colors.len()]
    }
}

#[inline]
fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// HSV (H: 0..1, S: 0..1, V: 0..1) → RGB (0..1)
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    if s.abs() < 1e-6 {
        return (v, v, v);
    }
    let h6 = (h.fract() + if h < 0.0 { 1.0 } else { 0.0 }) * 6.0;
    let sector = h6.floor();
    let f = h6 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match sector as i32 % 6 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    }
}

fn shuffle_hash(i: u32, seed: u32) -> u32 {
    let mut h = i
        .wrapping_mul(374761393)
        .wrapping_add(seed.wrapping_mul(668265263))
        .wrapping_add(1013904223);
    h ^= h >> 13;
    h = h.wrapping_mul(1274126177);
    h ^= h >> 16;
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_deterministic() {
        let a = Palette::generate(12, 0.8, 0.9, 7);
        let b = Palette::generate(12, 0.8, 0.9, 7);
        assert_eq!(a, b);
        assert_eq!(a.len(), 12);
    }

    #[test]
    fn test_generate_keeps_every_hue() {
        let shuffled = Palette::generate(6, 0.8, 0.9, 3);
        let mut got: Vec<[u8; 4]> = shuffled.colors().iter().map(|c| c.0).collect();
        let mut want: Vec<[u8; 4]> = (0..6)
            .map(|i| {
                let (r, g, b) = hsv_to_rgb(i as f32 / 6.0, 0.8, 0.9);
                [to_u8(r), to_u8(g), to_u8(b), 255]
            })
            .collect();
        got.sort();
        want.sort();
        assert_eq!(got, want);
    }

    #[test]
    fn test_hsv_primaries() {
        assert_eq!(hsv_to_rgb(0.0, 1.0, 1.0), (1.0, 0.0, 0.0));
        let (r, g, b) = hsv_to_rgb(1.0 / 3.0, 1.0, 1.0);
        assert!(r.abs() < 1e-5 && (g - 1.0).abs() < 1e-5 && b.abs() < 1e-5);
    }

    #[test]
    fn test_color_for_cycles() {
        let p = Palette::new(vec![Rgba([1, 0, 0, 255]), Rgba([2, 0, 0, 255])]);
        assert_eq!(p.color_for(3), Rgba([2, 0, 0, 255]));
        assert_eq!(Palette::default().color_for(5), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_zero_count_is_empty() {
        assert!(Palette::generate(0, 0.8, 0.9, 0).is_empty());
    }
}
