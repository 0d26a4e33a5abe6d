// THEORY:
// The `contour` module is the spatial grouping layer of the sorter. It turns a
// binary foreground mask into a list of connected regions, each summarized by
// its image moments. This is the bridge between per-pixel thresholding and the
// object-level questions the locator and classifier ask ("where is the biscuit,
// and how big is it").
//
// Key architectural principles:
// 1.  **Scan-order discovery**: Regions are seeded by scanning the mask row by
//     row and grown with a breadth-first flood fill over the 8-connected
//     neighborhood. Discovery order is deterministic, which is what makes the
//     largest-region tie-break well defined.
// 2.  **Moments, not outlines**: Downstream only needs the zeroth moment (area)
//     and the first moments (centroid), so each region aggregates those while
//     it grows and the pixel coordinates themselves are discarded.
// 3.  **Stateless utility**: `find_regions` maps one mask to one region list.
//     It has no memory between frames.

/// A connected foreground region summarized by its image moments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    /// Zeroth moment: the number of foreground pixels in the region.
    pub area: u32,
    /// First moment over x (sum of the x coordinates of every pixel).
    pub moment_x: u64,
    /// First moment over y (sum of the y coordinates of every pixel).
    pub moment_y: u64,
}

impl Region {
    /// Centroid from the first-order moments, or `None` for a degenerate
    /// region with a zero area moment.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.area == 0 {
            return None;
        }
        Some((
            self.moment_x as f64 / self.area as f64,
            self.moment_y as f64 / self.area as f64,
        ))
    }
}

/// Finds every 8-connected foreground region in the mask, in scan order.
pub fn find_regions(mask: &[bool], width: u32, height: u32) -> Vec<Region> {
    let width = width as usize;
    let height = height as usize;
    debug_assert_eq!(mask.len(), width * height);

    let mut visited = vec![false; mask.len()];
    let mut regions = Vec::new();
    let mut queue: Vec<(usize, usize)> = Vec::new();

    for seed_y in 0..height {
        for seed_x in 0..width {
            let seed = seed_y * width + seed_x;
            if !mask[seed] || visited[seed] {
                continue;
            }

            // Grow a new region from this unvisited foreground seed.
            let mut region = Region {
                area: 0,
                moment_x: 0,
                moment_y: 0,
            };
            visited[seed] = true;
            queue.push((seed_x, seed_y));

            while let Some((x, y)) = queue.pop() {
                region.area += 1;
                region.moment_x += x as u64;
                region.moment_y += y as u64;

                for dy in -1i64..=1 {
                    for dx in -1i64..=1 {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        let nx = x as i64 + dx;
                        let ny = y as i64 + dy;
                        if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                            continue;
                        }
                        let neighbor = ny as usize * width + nx as usize;
                        if mask[neighbor] && !visited[neighbor] {
                            visited[neighbor] = true;
                            queue.push((nx as usize, ny as usize));
                        }
                    }
                }
            }

            regions.push(region);
        }
    }

    regions
}

/// Selects the region with the maximum area. Ties break toward the region
/// discovered first.
pub fn largest_region(regions: &[Region]) -> Option<&Region> {
    let mut best: Option<&Region> = None;
    for region in regions {
        match best {
            Some(current) if region.area <= current.area => {}
            _ => best = Some(region),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from_rows(rows: &[&str]) -> (Vec<bool>, u32, u32) {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        let mask = rows
            .iter()
            .flat_map(|row| row.chars().map(|c| c == '#'))
            .collect();
        (mask, width, height)
    }

    #[test]
    fn empty_mask_yields_no_regions() {
        let (mask, w, h) = mask_from_rows(&["....", "....", "...."]);
        assert!(find_regions(&mask, w, h).is_empty());
        assert!(largest_region(&[]).is_none());
    }

    #[test]
    fn diagonal_pixels_join_one_region() {
        let (mask, w, h) = mask_from_rows(&["#...", ".#..", "..#."]);
        let regions = find_regions(&mask, w, h);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].area, 3);
    }

    #[test]
    fn separate_blobs_stay_separate() {
        let (mask, w, h) = mask_from_rows(&["##...", "##...", ".....", "...##"]);
        let regions = find_regions(&mask, w, h);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].area, 4);
        assert_eq!(regions[1].area, 2);
    }

    #[test]
    fn centroid_comes_from_first_moments() {
        let (mask, w, h) = mask_from_rows(&[".....", ".###.", "....."]);
        let regions = find_regions(&mask, w, h);
        let (cx, cy) = regions[0].centroid().unwrap();
        assert_eq!((cx, cy), (2.0, 1.0));
    }

    #[test]
    fn equal_area_tie_keeps_the_first_discovered() {
        let (mask, w, h) = mask_from_rows(&["##..##", "......"]);
        let regions = find_regions(&mask, w, h);
        assert_eq!(regions.len(), 2);
        let best = largest_region(&regions).unwrap();
        assert_eq!(best.moment_x, regions[0].moment_x);
    }

    #[test]
    fn degenerate_region_has_no_centroid() {
        let region = Region {
            area: 0,
            moment_x: 0,
            moment_y: 0,
        };
        assert!(region.centroid().is_none());
    }
}
