use glam::DVec3;
use std::f64::consts::PI;

use super::config::Rotation;

/// Globe viewport using orthographic projection of a rotating sphere.
/// Orientation stored as a rotation matrix (3 column vectors) for
/// efficient point transformation.
#[derive(Clone, Debug)]
pub struct GlobeViewport {
    /// Forward direction (what points at the camera)
    forward: DVec3,
    /// Right direction
    right: DVec3,
    /// Up direction
    up: DVec3,
    /// Sphere radius in pixels
    pub radius: f64,
    pub width: f64,
    pub height: f64,
}

impl GlobeViewport {
    /// Build a globe viewport centered on (lon, lat) with given radius.
    pub fn new(center_lon: f64, center_lat: f64, radius: f64, width: f64, height: f64) -> Self {
        let lon_rad = center_lon.to_radians();
        let lat_rad = center_lat.to_radians();

        // Forward = direction from origin to (lon, lat) on unit sphere
        let forward = lonlat_to_vec3(center_lon, center_lat);

        // Up = derivative of forward w.r.t. latitude (points north on sphere)
        let raw_up = DVec3::new(
            -lat_rad.sin() * lon_rad.cos(),
            -lat_rad.sin() * lon_rad.sin(),
            lat_rad.cos(),
        );

        // Right = up × forward (points east when seen from outside)
        let right = raw_up.cross(forward).normalize();
        let up = forward.cross(right).normalize();

        Self { forward, right, up, radius, width, height }
    }

    /// Fit the globe into a canvas, leaving `margin` pixels around the disk,
    /// and apply the configured roll around the view axis.
    pub fn fit(rotation: &Rotation, width: f64, height: f64, margin: f64) -> Self {
        let radius = (width.min(height) / 2.0 - margin).max(1.0);
        let mut globe = Self::new(rotation.lon, rotation.lat, radius, width, height);
        globe.roll(rotation.roll.to_radians());
        globe
    }

    /// Rotate the image plane around the view axis
    pub fn roll(&mut self, angle: f64) {
        if angle.abs() < 1e-10 {
            return;
        }
        let (sin_a, cos_a) = angle.sin_cos();
        let new_right = self.right * cos_a + self.up * sin_a;
        let new_up = self.up * cos_a - self.right * sin_a;
        self.right = new_right.normalize();
        self.up = new_up.normalize();
    }

    pub fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }

    /// Signed depth of a point: positive on the visible hemisphere
    pub fn depth(&self, lon: f64, lat: f64) -> f64 {
        lonlat_to_vec3(lon, lat).dot(self.forward)
    }

    /// Project a geographic point to canvas coordinates.
    /// Returns `None` for back-face points (behind the visible hemisphere).
    pub fn project(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        let p = lonlat_to_vec3(lon, lat);
        if p.dot(self.forward) < 0.0 {
            return None;
        }
        Some(self.to_screen(p))
    }

    /// Project onto the image plane regardless of visibility
    fn to_screen(&self, p: DVec3) -> (f64, f64) {
        let sx = p.dot(self.right);
        let sy = p.dot(self.up);
        (
            self.width / 2.0 + sx * self.radius,
            self.height / 2.0 - sy * self.radius,
        )
    }

    /// Project a back-face point onto the limb (the visible disk edge)
    pub fn project_to_limb(&self, lon: f64, lat: f64) -> (f64, f64) {
        let p = lonlat_to_vec3(lon, lat);
        let on_plane = p - self.forward * p.dot(self.forward);
        if on_plane.length_squared() < 1e-20 {
            return self.center();
        }
        self.to_screen(on_plane.normalize())
    }

    /// Points along a graticule line, for drawing the grid
    pub fn graticule(step_deg: f64) -> Vec<Vec<(f64, f64)>> {
        let mut lines = Vec::new();
        let mut lon = -180.0;
        while lon < 180.0 {
            lines.push((-90..=90).map(|lat| (lon, lat as f64)).collect());
            lon += step_deg;
        }
        let mut lat = -90.0 + step_deg;
        while lat < 90.0 {
            lines.push((-180..=180).map(|lon| (lon as f64, lat)).collect());
            lat += step_deg;
        }
        lines
    }
}

/// Convert lon/lat (degrees) to a unit sphere vector.
#[inline(always)]
fn lonlat_to_vec3(lon: f64, lat: f64) -> DVec3 {
    let lon_rad = lon.to_radians();
    let lat_rad = lat.to_radians();
    DVec3::new(
        lat_rad.cos() * lon_rad.cos(),
        lat_rad.cos() * lon_rad.sin(),
        lat_rad.sin(),
    )
}

/// Interpolate along a great circle arc and call a visitor for each subdivision point.
/// Subdivides into segments of at most `step_deg` so polygon edges curve with the sphere.
#[inline]
pub fn walk_great_circle(
    lon0: f64, lat0: f64,
    lon1: f64, lat1: f64,
    step_deg: f64,
    mut visitor: impl FnMut(f64, f64),
) {
    let a = lonlat_to_vec3(lon0, lat0);
    let b = lonlat_to_vec3(lon1, lat1);

    let dot = a.dot(b).clamp(-1.0, 1.0);
    let angle = dot.acos(); // angular distance in radians

    // exact multiples of the step must not gain an extra segment
    let steps = ((angle.to_degrees() / step_deg - 1e-9).ceil() as usize).max(1);

    if steps == 1 {
        // Short segment, just emit endpoint
        visitor(lon1, lat1);
        return;
    }

    let sin_angle = angle.sin();
    if sin_angle.abs() < 1e-10 {
        // Points are nearly identical or antipodal
        visitor(lon1, lat1);
        return;
    }

    for i in 1..=steps {
        let t = i as f64 / steps as f64;
        let sa = ((1.0 - t) * angle).sin() / sin_angle;
        let sb = (t * angle).sin() / sin_angle;
        let p = a * sa + b * sb;

        let lat = p.z.clamp(-1.0, 1.0).asin().to_degrees();
        let lon = p.y.atan2(p.x).to_degrees();
        visitor(lon, lat);
    }
}

/// Sample the limb circle between two screen angles, for closing clipped rings
pub fn limb_arc(globe: &GlobeViewport, from: (f64, f64), to: (f64, f64)) -> Vec<(f64, f64)> {
    let (cx, cy) = globe.center();
    let a0 = (from.1 - cy).atan2(from.0 - cx);
    let a1 = (to.1 - cy).atan2(to.0 - cx);
    let mut delta = a1 - a0;
    // shortest way around
    if delta > PI {
        delta -= 2.0 * PI;
    } else if delta < -PI {
        delta += 2.0 * PI;
    }
    let steps = ((delta.abs() / 0.05).ceil() as usize).max(1);
    (1..steps)
        .map(|i| {
            let a = a0 + delta * i as f64 / steps as f64;
            (cx + globe.radius * a.cos(), cy + globe.radius * a.sin())
        })
        .collect()
}
