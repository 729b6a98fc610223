use crate::braille::BrailleCanvas;

/// A polygon ring projected to pixel space
pub type PixelRing = Vec<(i32, i32)>;

/// Draw a line using Bresenham's algorithm
pub fn draw_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut x = x0;
    let mut y = y0;

    loop {
        canvas.set_pixel_signed(x, y);

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;

        if e2 >= dy {
            if x == x1 {
                break;
            }
            err += dy;
            x += sx;
        }

        if e2 <= dx {
            if y == y1 {
                break;
            }
            err += dx;
            y += sy;
        }
    }
}

/// Stroke a closed ring outline
pub fn draw_ring(canvas: &mut BrailleCanvas, ring: &PixelRing) {
    if ring.len() < 2 {
        return;
    }
    for pair in ring.windows(2) {
        draw_line(canvas, pair[0].0, pair[0].1, pair[1].0, pair[1].1);
    }
    // Close the ring if the data didn't repeat the first point
    let (first, last) = (ring[0], ring[ring.len() - 1]);
    if first != last {
        draw_line(canvas, last.0, last.1, first.0, first.1);
    }
}

/// Fill a polygon given all its rings, using even-odd scanline filling.
/// Passing exterior and interior rings together renders holes correctly.
pub fn fill_rings(canvas: &mut BrailleCanvas, rings: &[PixelRing]) {
    let (mut min_y, mut max_y) = (i32::MAX, i32::MIN);
    for ring in rings {
        for &(_, y) in ring {
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
    }
    if min_y > max_y {
        return;
    }
    min_y = min_y.max(0);
    max_y = max_y.min(canvas.pixel_height() as i32 - 1);

    let mut crossings: Vec<f64> = Vec::new();
    for y in min_y..=max_y {
        crossings.clear();
        let scan = y as f64 + 0.5;

        for ring in rings {
            if ring.len() < 3 {
                continue;
            }
            let n = ring.len();
            for i in 0..n {
                let (x0, y0) = ring[i];
                let (x1, y1) = ring[(i + 1) % n];
                let (y0, y1) = (y0 as f64, y1 as f64);
                // Half-open edge test avoids double-counting shared vertices
                if (y0 <= scan && y1 > scan) || (y1 <= scan && y0 > scan) {
                    let t = (scan - y0) / (y1 - y0);
                    crossings.push(x0 as f64 + t * (x1 as f64 - x0 as f64));
                }
            }
        }

        crossings.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        for span in crossings.chunks_exact(2) {
            let start = span[0].ceil().max(0.0) as i32;
            let end = span[1].floor().min(canvas.pixel_width() as f64) as i32;
            for x in start..=end {
                canvas.set_pixel_signed(x, y);
            }
        }
    }
}

/// Even-odd point-in-polygon test over a set of rings in (lon, lat) space.
/// A point inside a hole ring counts as outside.
pub fn point_in_rings(rings: &[Vec<Vec<f64>>], lon: f64, lat: f64) -> bool {
    let mut inside = false;
    for ring in rings {
        let n = ring.len();
        if n < 3 {
            continue;
        }
        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = (ring[i][0], ring[i][1]);
            let (xj, yj) = (ring[j][0], ring[j][1]);
            if (yi > lat) != (yj > lat) {
                let x_cross = xj + (lat - yj) / (yi - yj) * (xi - xj);
                if lon < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
    }
    inside
}
