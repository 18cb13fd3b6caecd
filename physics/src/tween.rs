//! Tween geometry: the vertical faces that close the gaps between adjacent
//! sectors whose surfaces sit at different heights.
//!
//! A tween is described by four corners along the shared edge of sectors A
//! and B, running from edge point P to edge point Q:
//!
//! ```text
//! c0 = A at P    c1 = B at P    c2 = B at Q    c3 = A at Q
//! ```
//!
//! Only the heights decide the shape; see [`TweenType::classify`].

use level::{HEIGHT_EPS, PenetrationConfig, Room, Sector};
use nalgebra::Point3;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TweenType {
    /// Surfaces meet along the whole edge.
    #[default]
    None,
    /// Heights differ only at P.
    TriangleLeft,
    /// Heights differ only at Q.
    TriangleRight,
    Quad,
    /// Surfaces cross between P and Q; two triangles meeting at the crossing.
    TwoTriangles,
}

impl TweenType {
    pub fn classify(c: &[Point3<f32>; 4]) -> Self {
        let at_p = c[0].y - c[1].y;
        let at_q = c[3].y - c[2].y;
        let differ_p = at_p.abs() > HEIGHT_EPS;
        let differ_q = at_q.abs() > HEIGHT_EPS;
        let crossed = (at_p > HEIGHT_EPS && at_q < -HEIGHT_EPS) || (at_p < -HEIGHT_EPS && at_q > HEIGHT_EPS);
        if crossed {
            TweenType::TwoTriangles
        } else if differ_p && differ_q {
            TweenType::Quad
        } else if differ_p {
            TweenType::TriangleLeft
        } else if differ_q {
            TweenType::TriangleRight
        } else {
            TweenType::None
        }
    }

    pub fn triangle_count(self) -> usize {
        match self {
            TweenType::None => 0,
            TweenType::TriangleLeft | TweenType::TriangleRight => 1,
            TweenType::Quad | TweenType::TwoTriangles => 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SectorTween {
    pub floor_corners: [Point3<f32>; 4],
    pub floor_type: TweenType,
    pub ceiling_corners: [Point3<f32>; 4],
    pub ceiling_type: TweenType,
}

/// Append the triangles of one tween face.
pub fn tween_triangles(c: &[Point3<f32>; 4], kind: TweenType, out: &mut Vec<[Point3<f32>; 3]>) {
    match kind {
        TweenType::None => {}
        TweenType::TriangleLeft => out.push([c[0], c[1], c[3]]),
        TweenType::TriangleRight => out.push([c[2], c[1], c[3]]),
        TweenType::Quad => {
            out.push([c[0], c[1], c[3]]);
            out.push([c[2], c[1], c[3]]);
        }
        TweenType::TwoTriangles => {
            let at_p = (c[0].y - c[1].y).abs();
            let at_q = (c[3].y - c[2].y).abs();
            // Fraction along P->Q where the two surfaces cross.
            let s = 1.0 / (1.0 + at_q / at_p);
            let o = c[0] + (c[3] - c[0]) * s;
            out.push([c[0], c[1], o]);
            out.push([c[3], c[2], o]);
        }
    }
}

#[derive(Clone, Copy)]
enum Edge {
    /// Shared edge with the +X neighbor.
    East,
    /// Shared edge with the +Z neighbor.
    North,
}

impl Edge {
    /// Corner indices (start, end) on A and on B along the shared edge.
    fn corners(self) -> ([usize; 2], [usize; 2]) {
        match self {
            Edge::East => ([1, 2], [0, 3]),
            Edge::North => ([3, 2], [0, 1]),
        }
    }
}

fn between(a: &[Point3<f32>; 4], ai: [usize; 2], b: &[Point3<f32>; 4], bi: [usize; 2]) -> [Point3<f32>; 4] {
    [a[ai[0]], b[bi[0]], b[bi[1]], a[ai[1]]]
}

fn wall_face(s: &Sector, idx: [usize; 2]) -> [Point3<f32>; 4] {
    [
        s.floor_corners[idx[0]],
        s.ceiling_corners[idx[0]],
        s.ceiling_corners[idx[1]],
        s.floor_corners[idx[1]],
    ]
}

fn tween_for(a: &Sector, b: &Sector, edge: Edge) -> Option<SectorTween> {
    if a.portal_to_room.is_some() || b.portal_to_room.is_some() {
        return None;
    }
    let (ai, bi) = edge.corners();
    let a_wall = a.floor_penetration == PenetrationConfig::Wall;
    let b_wall = b.floor_penetration == PenetrationConfig::Wall;
    let (floor_corners, ceiling_corners) = match (a_wall, b_wall) {
        (true, true) => return None,
        (false, false) => (
            between(&a.floor_corners, ai, &b.floor_corners, bi),
            between(&a.ceiling_corners, ai, &b.ceiling_corners, bi),
        ),
        // Open sector facing a wall column: the wall face spans its floor to ceiling.
        (false, true) => (wall_face(a, ai), wall_face(a, ai)),
        (true, false) => (wall_face(b, bi), wall_face(b, bi)),
    };
    let floor_type = TweenType::classify(&floor_corners);
    let ceiling_type = if a_wall || b_wall {
        TweenType::None
    } else {
        TweenType::classify(&ceiling_corners)
    };
    (floor_type != TweenType::None || ceiling_type != TweenType::None).then_some(SectorTween {
        floor_corners,
        floor_type,
        ceiling_corners,
        ceiling_type,
    })
}

/// Tweens between every pair of grid-adjacent sectors of the room.
pub fn generate_room_tweens(room: &Room) -> Vec<SectorTween> {
    let mut out = Vec::new();
    for gx in 0..room.grid.sectors_x {
        for gz in 0..room.grid.sectors_z {
            let Some(a) = room.sector(gx, gz) else {
                continue;
            };
            let neighbors = [
                (Edge::East, gx.checked_add(1).and_then(|x| room.sector(x, gz))),
                (Edge::North, gz.checked_add(1).and_then(|z| room.sector(gx, z))),
            ];
            for (edge, b) in neighbors {
                if let Some(t) = b.and_then(|b| tween_for(a, b, edge)) {
                    out.push(t);
                }
            }
        }
    }
    out
}
