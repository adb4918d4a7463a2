//! Detail level ladder and the policies that pick a level for a region.
//!
//! A level is an index into a descending resolution ladder: level 0 is the
//! finest grid, the last level the coarsest. Every finer resolution must
//! refine the next coarser one cell-for-cell so seams between neighboring
//! levels can be stitched without T-junctions.

/// Assumed view tilt when projecting a cell edge to screen space. A camera
/// looking straight down sees edges at full length, a grazing view collapses
/// them; a fixed mid-range cosine keeps selection stable while the camera
/// pitches.
const TILT_COSINE: f64 = 0.5;

/// Inputs for screen-space-error level selection.
#[derive(Clone, Copy, Debug)]
pub struct ScreenSpaceParams {
    /// Width of one region in world units, shared by every level.
    pub region_width: f64,
    /// Viewport height in pixels.
    pub viewport_height_px: f64,
    /// Vertical field of view in radians.
    pub vertical_fov_rad: f64,
    /// Smallest acceptable projected size of one grid cell edge, in pixels.
    pub target_edge_px: f64,
}

/// The resolution ladder with one distance threshold per level.
///
/// `select_by_distance` maps a distance to the level whose band contains it;
/// the final threshold doubles as the view radius beyond which regions are
/// not loaded at all.
#[derive(Clone, Debug)]
pub struct LevelTable {
    resolutions: Vec<u32>,
    thresholds: Vec<f64>,
}

impl LevelTable {
    /// Builds a table from per-level vertex resolutions and distance
    /// thresholds, finest first.
    ///
    /// # Panics
    ///
    /// Panics if the ladders are empty or of unequal length, if resolutions
    /// are not strictly decreasing values of at least 2, if any finer cell
    /// count is not a multiple of the next coarser one, or if thresholds are
    /// not positive and strictly increasing.
    #[must_use]
    pub fn new(resolutions: Vec<u32>, thresholds: Vec<f64>) -> Self {
        assert!(!resolutions.is_empty(), "level table must not be empty");
        assert_eq!(
            resolutions.len(),
            thresholds.len(),
            "one distance threshold per level"
        );
        for (level, &res) in resolutions.iter().enumerate() {
            assert!(res >= 2, "level {level} resolution {res} must be at least 2");
            if level > 0 {
                let finer = resolutions[level - 1];
                assert!(
                    finer > res,
                    "resolutions must strictly decrease, got {finer} then {res}"
                );
                assert_eq!(
                    (finer - 1) % (res - 1),
                    0,
                    "level {level} cells must evenly divide the finer level"
                );
            }
        }
        for (level, &dist) in thresholds.iter().enumerate() {
            assert!(dist > 0.0, "threshold for level {level} must be positive");
            if level > 0 {
                assert!(
                    dist > thresholds[level - 1],
                    "thresholds must strictly increase"
                );
            }
        }
        Self {
            resolutions,
            thresholds,
        }
    }

    #[must_use]
    pub fn level_count(&self) -> usize {
        self.resolutions.len()
    }

    /// Index of the coarsest level.
    #[must_use]
    pub fn max_level(&self) -> u8 {
        (self.resolutions.len() - 1) as u8
    }

    /// Vertex resolution of one region at `level`.
    #[must_use]
    pub fn resolution(&self, level: u8) -> u32 {
        self.resolutions[level as usize]
    }

    #[must_use]
    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    /// Distance beyond which regions are dropped entirely.
    #[must_use]
    pub fn view_radius(&self) -> f64 {
        *self.thresholds.last().unwrap()
    }

    /// Picks the level whose distance band contains `distance`, or `None`
    /// past the view radius.
    #[must_use]
    pub fn select_by_distance(&self, distance: f64) -> Option<u8> {
        for (level, &threshold) in self.thresholds.iter().enumerate() {
            if distance < threshold {
                return Some(level as u8);
            }
        }
        None
    }

    /// Picks the finest level whose grid cells still project to at least
    /// `target_edge_px` on screen, falling back to the coarsest level when
    /// even that undershoots. Returns `None` past the view radius.
    #[must_use]
    pub fn select_by_screen_space(
        &self,
        distance: f64,
        params: &ScreenSpaceParams,
    ) -> Option<u8> {
        if distance >= self.view_radius() {
            return None;
        }
        // Pixels covered by one world unit at this distance for a standard
        // perspective projection.
        let half_fov_tan = (params.vertical_fov_rad * 0.5).tan();
        let px_per_unit =
            params.viewport_height_px / (2.0 * half_fov_tan * distance.max(1.0));
        for (level, &res) in self.resolutions.iter().enumerate() {
            let edge_world = params.region_width / f64::from(res - 1);
            let edge_px = edge_world * TILT_COSINE * px_per_unit;
            if edge_px >= params.target_edge_px {
                return Some(level as u8);
            }
        }
        Some(self.max_level())
    }
}
