/// Piecewise-linear evaluation over ascending (x, y) points. Clamps outside
/// the defined range
pub(crate) fn eval(points: &[(u32, f32)], x: u32) -> f32 {
    let mut prev: Option<(u32, f32)> = None;

    for &(px, py) in points {
        match prev {
            _ if x <= px && prev.is_none() => return py,
            Some((lx, ly)) if x <= px => {
                let t = (x - lx) as f32 / (px - lx) as f32;
                return ly + (py - ly) * t;
            }
            _ => prev = Some((px, py)),
        }
    }

    prev.map(|(_, y)| y).unwrap_or(1.0)
}
