// Morphological cleanup and connected-region extraction for binary masks.
//
// Foreground blobs are 8-connected, background 4-connected, so every blob
// has a single well-defined outer boundary. A blob counts as "external"
// when it touches the background that reaches the image border; blobs
// sitting inside a hole of another blob are skipped. The area of a blob
// is the area of the polygon through the centres of its outer boundary
// pixels, so a solid w x h rectangle measures (w - 1) * (h - 1).

use super::types::{Region, BACKGROUND, FOREGROUND};
use image::{GrayImage, Luma};
use std::collections::VecDeque;

/// Side of the square structuring element used to grow blobs
pub const DILATION_KERNEL: u32 = 5;

/// Dilation passes applied to every mask
pub const DILATION_ITERATIONS: u32 = 2;

// Clockwise neighbour offsets (y grows downwards), starting east
const NEIGHBOURS: [(i64, i64); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// One external connected component of a mask
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Component {
    pub bounds: Region,
    /// Area enclosed by the outer boundary
    pub area: f64,
}

/// Grow foreground with a square `kernel` x `kernel` element, `iterations` times
pub fn dilate(mask: &GrayImage, kernel: u32, iterations: u32) -> GrayImage {
    let _span = tracing::debug_span!("dilate").entered();

    let radius = kernel / 2;
    let mut current = mask.clone();
    for _ in 0..iterations {
        // Square elements separate into a horizontal and a vertical pass
        let horizontal = max_filter(&current, radius, true);
        current = max_filter(&horizontal, radius, false);
    }
    current
}

fn max_filter(mask: &GrayImage, radius: u32, horizontal: bool) -> GrayImage {
    let (width, height) = mask.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let (pos, len) = if horizontal { (x, width) } else { (y, height) };
        let lo = pos.saturating_sub(radius);
        let hi = (pos + radius).min(len - 1);
        let hit = (lo..=hi).any(|i| {
            let (sx, sy) = if horizontal { (i, y) } else { (x, i) };
            mask.get_pixel(sx, sy)[0] != BACKGROUND
        });
        Luma([if hit { FOREGROUND } else { BACKGROUND }])
    })
}

/// Find the external connected components of a binary mask
///
/// Components are returned in raster order of their top-left-most pixel.
pub fn external_components(mask: &GrayImage) -> Vec<Component> {
    let _span = tracing::debug_span!("components").entered();

    let (width, height) = mask.dimensions();
    let (w, h) = (width as usize, height as usize);
    let is_fg = |x: usize, y: usize| mask.get_pixel(x as u32, y as u32)[0] != BACKGROUND;

    let outside = outer_background(mask);

    let mut labels = vec![0u32; w * h];
    let mut components = Vec::new();
    let mut next_label = 1u32;

    for y in 0..h {
        for x in 0..w {
            if !is_fg(x, y) || labels[y * w + x] != 0 {
                continue;
            }

            // Flood the 8-connected component starting at its top-left-most pixel
            let label = next_label;
            next_label += 1;
            labels[y * w + x] = label;

            let mut stack = vec![(x, y)];
            let (mut min_x, mut min_y, mut max_x, mut max_y) = (x, y, x, y);
            let mut external = false;

            while let Some((cx, cy)) = stack.pop() {
                min_x = min_x.min(cx);
                min_y = min_y.min(cy);
                max_x = max_x.max(cx);
                max_y = max_y.max(cy);

                for (i, &(dx, dy)) in NEIGHBOURS.iter().enumerate() {
                    let nx = cx as i64 + dx;
                    let ny = cy as i64 + dy;
                    if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                        external = true;
                        continue;
                    }
                    let (nx, ny) = (nx as usize, ny as usize);
                    if is_fg(nx, ny) {
                        if labels[ny * w + nx] == 0 {
                            labels[ny * w + nx] = label;
                            stack.push((nx, ny));
                        }
                    } else if i % 2 == 0 && outside[ny * w + nx] {
                        external = true;
                    }
                }
            }

            if !external {
                continue;
            }

            let boundary = trace_boundary(&labels, w, h, (x, y), label);
            components.push(Component {
                bounds: Region::new(
                    min_x as u32,
                    min_y as u32,
                    (max_x - min_x + 1) as u32,
                    (max_y - min_y + 1) as u32,
                ),
                area: polygon_area(&boundary),
            });
        }
    }

    components
}

/// Mark background pixels 4-connected to the image border
fn outer_background(mask: &GrayImage) -> Vec<bool> {
    let (width, height) = mask.dimensions();
    let (w, h) = (width as usize, height as usize);
    let mut outside = vec![false; w * h];
    let mut queue = VecDeque::new();
    if w == 0 || h == 0 {
        return outside;
    }

    let seed = |x: usize, y: usize, outside: &mut [bool], queue: &mut VecDeque<(usize, usize)>| {
        if mask.get_pixel(x as u32, y as u32)[0] == BACKGROUND && !outside[y * w + x] {
            outside[y * w + x] = true;
            queue.push_back((x, y));
        }
    };

    for x in 0..w {
        seed(x, 0, &mut outside, &mut queue);
        seed(x, h - 1, &mut outside, &mut queue);
    }
    for y in 0..h {
        seed(0, y, &mut outside, &mut queue);
        seed(w - 1, y, &mut outside, &mut queue);
    }

    while let Some((x, y)) = queue.pop_front() {
        for &(dx, dy) in NEIGHBOURS.iter().step_by(2) {
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                continue;
            }
            seed(nx as usize, ny as usize, &mut outside, &mut queue);
        }
    }

    outside
}

/// Moore-neighbour trace of a component's outer boundary
///
/// `start` must be the component's top-left-most pixel, whose west,
/// north-west, north and north-east neighbours are all outside it.
fn trace_boundary(
    labels: &[u32],
    w: usize,
    h: usize,
    start: (usize, usize),
    label: u32,
) -> Vec<(i64, i64)> {
    let inside = |x: i64, y: i64| {
        x >= 0 && y >= 0 && x < w as i64 && y < h as i64 && labels[y as usize * w + x as usize] == label
    };

    // Find the next boundary pixel clockwise from `from`
    let step = |(x, y): (i64, i64), from: usize| -> Option<((i64, i64), usize)> {
        (0..8).map(|i| (from + i) % 8).find_map(|dir| {
            let (dx, dy) = NEIGHBOURS[dir];
            inside(x + dx, y + dy).then_some(((x + dx, y + dy), dir))
        })
    };

    // Direction to resume scanning from after moving along `dir`
    let resume = |dir: usize| if dir % 2 == 0 { (dir + 7) % 8 } else { (dir + 6) % 8 };

    let origin = (start.0 as i64, start.1 as i64);
    let mut boundary = vec![origin];

    let Some((first, first_dir)) = step(origin, 5) else {
        // Isolated pixel
        return boundary;
    };

    let mut current = first;
    let mut dir = first_dir;
    loop {
        let Some((next, next_dir)) = step(current, resume(dir)) else {
            break;
        };
        if current == origin && next == first {
            break;
        }
        boundary.push(current);
        current = next;
        dir = next_dir;
    }

    boundary
}

/// Shoelace area of a closed polygon
fn polygon_area(points: &[(i64, i64)]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(&(x0, y0), &(x1, y1))| x0 * y1 - x1 * y0)
        .sum();
    twice.abs() as f64 / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_with(width: u32, height: u32, rects: &[(u32, u32, u32, u32)]) -> GrayImage {
        let mut mask = GrayImage::new(width, height);
        for &(rx, ry, rw, rh) in rects {
            for y in ry..ry + rh {
                for x in rx..rx + rw {
                    mask.put_pixel(x, y, Luma([FOREGROUND]));
                }
            }
        }
        mask
    }

    #[test]
    fn test_dilate_grows_single_pixel() {
        let mask = mask_with(20, 20, &[(10, 10, 1, 1)]);

        let once = dilate(&mask, 5, 1);
        let fg: Vec<_> = once.enumerate_pixels().filter(|(_, _, p)| p[0] == FOREGROUND).collect();
        assert_eq!(fg.len(), 25);

        let twice = dilate(&mask, 5, 2);
        let components = external_components(&twice);
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].bounds, Region::new(6, 6, 9, 9));
    }

    #[test]
    fn test_dilate_clips_at_border() {
        let mask = mask_with(10, 10, &[(0, 0, 1, 1)]);
        let grown = dilate(&mask, 5, 1);
        assert_eq!(grown.pixels().filter(|p| p[0] == FOREGROUND).count(), 9);
    }

    #[test]
    fn test_rectangle_area_matches_boundary_polygon() {
        let mask = mask_with(50, 50, &[(10, 20, 30, 10)]);

        let components = external_components(&mask);

        assert_eq!(components.len(), 1);
        assert_eq!(components[0].bounds, Region::new(10, 20, 30, 10));
        assert_eq!(components[0].area, 29.0 * 9.0);
    }

    #[test]
    fn test_isolated_pixel_and_line_have_no_area() {
        let mask = mask_with(20, 20, &[(2, 2, 1, 1), (5, 10, 10, 1)]);

        let components = external_components(&mask);

        assert_eq!(components.len(), 2);
        assert!(components.iter().all(|c| c.area == 0.0));
    }

    #[test]
    fn test_diagonal_pixels_are_one_component() {
        let mask = mask_with(10, 10, &[(2, 2, 1, 1), (3, 3, 1, 1), (4, 4, 1, 1)]);

        let components = external_components(&mask);

        assert_eq!(components.len(), 1);
        assert_eq!(components[0].bounds, Region::new(2, 2, 3, 3));
    }

    #[test]
    fn test_components_inside_holes_are_skipped() {
        // Ring with a blob in the middle
        let mut mask = mask_with(40, 40, &[(5, 5, 30, 30)]);
        for y in 8..32 {
            for x in 8..32 {
                mask.put_pixel(x, y, Luma([BACKGROUND]));
            }
        }
        for y in 15..20 {
            for x in 15..20 {
                mask.put_pixel(x, y, Luma([FOREGROUND]));
            }
        }

        let components = external_components(&mask);

        assert_eq!(components.len(), 1);
        assert_eq!(components[0].bounds, Region::new(5, 5, 30, 30));
        // Holes do not reduce the outer area
        assert_eq!(components[0].area, 29.0 * 29.0);
    }

    #[test]
    fn test_concave_shape_area() {
        // L shape: 10x10 square minus its top-right 5x5 quarter
        let mask = mask_with(30, 30, &[(5, 5, 5, 10), (10, 10, 5, 5)]);

        let components = external_components(&mask);

        assert_eq!(components.len(), 1);
        assert_eq!(components[0].bounds, Region::new(5, 5, 10, 10));
        // The 8-connected boundary cuts the inner corner diagonally from (9,9) to (10,10)
        assert_eq!(components[0].area, 56.5);
    }
}
