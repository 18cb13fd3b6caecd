use nalgebra::Point3;

/// Squared-area threshold below which a triangle is considered degenerate.
const DEGENERATE_AREA_SQ: f32 = 1.0e-12;

/// Indexed triangle soup as delivered by the asset loader.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Point3<f32>>,
    pub indices: Vec<[u32; 3]>,
}

impl MeshData {
    pub fn new(vertices: Vec<Point3<f32>>, indices: Vec<[u32; 3]>) -> Self {
        Self { vertices, indices }
    }

    /// Triangles with in-range indices and non-zero area, as world-free corner triples.
    pub fn valid_triangles(&self) -> impl Iterator<Item = [Point3<f32>; 3]> + '_ {
        self.indices.iter().filter_map(|tri| {
            let a = *self.vertices.get(tri[0] as usize)?;
            let b = *self.vertices.get(tri[1] as usize)?;
            let c = *self.vertices.get(tri[2] as usize)?;
            let area_sq = (b - a).cross(&(c - a)).norm_squared();
            (area_sq > DEGENERATE_AREA_SQ).then_some([a, b, c])
        })
    }

    pub fn valid_triangle_count(&self) -> usize {
        self.valid_triangles().count()
    }

    /// Axis-aligned bounds of all vertices, `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Point3<f32>, Point3<f32>)> {
        let first = *self.vertices.first()?;
        Some(self.vertices.iter().fold((first, first), |(lo, hi), v| {
            (lo.inf(v), hi.sup(v))
        }))
    }
}
