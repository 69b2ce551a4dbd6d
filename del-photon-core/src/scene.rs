//! Scenes made of closed triangle meshes, each enclosing a homogeneous medium

use crate::error::{PhotonError, Result};
use crate::kdtree::{KdTree, KdTreeParams, SegmentHit};
use crate::material::BulkMaterial;
use crate::vec3;
use crate::vec3::Vec3;
use num_traits::AsPrimitive;

/// fixed oblique direction of the parity ray used to locate points
const PROBE_DIRECTION: [f64; 3] = [
    0.267_261_241_912_424_4,
    0.534_522_483_824_848_8,
    0.801_783_725_737_273_2,
];

/// crossings of the same region closer than this are counted once
const DUPLICATE_HIT_DISTANCE: f64 = 1.0e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitTestOptions {
    /// report only the nearest surface
    pub closest_only: bool,
    /// order the hits by increasing distance
    pub sorted: bool,
    /// skip faces whose normal points along the segment
    pub back_face_culling: bool,
    /// skip the surfaces of hidden regions
    pub ignore_hidden: bool,
}

impl Default for HitTestOptions {
    fn default() -> Self {
        Self {
            closest_only: false,
            sorted: true,
            back_face_culling: false,
            ignore_hidden: false,
        }
    }
}

impl HitTestOptions {
    /// options used by the photon walk
    pub fn closest() -> Self {
        Self {
            closest_only: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit<T> {
    /// parameter along the query segment
    pub t: T,
    pub position: [T; 3],
    /// outward unit normal of the triangle hit
    pub normal: [T; 3],
    pub i_region: usize,
}

pub trait Geometry<T> {
    /// Surfaces crossed by the segment from `from` to `to`.
    fn intersect_segment(
        &self,
        from: &[T; 3],
        to: &[T; 3],
        options: &HitTestOptions,
    ) -> Result<Vec<SurfaceHit<T>>>;
}

pub trait MaterialLookup<T>
where
    T: num_traits::Float,
{
    fn material_at(&self, point: &[T; 3]) -> Result<&BulkMaterial<T>>;

    /// Media on both sides of the interface hit at `hit_position` by a photon at `from`
    /// travelling along `direction`: `(incident, transmitted)`.
    fn materials_across(
        &self,
        from: &[T; 3],
        hit_position: &[T; 3],
        direction: &[T; 3],
        safety_distance: T,
    ) -> Result<(&BulkMaterial<T>, &BulkMaterial<T>)> {
        let beyond = vec3::axpy(safety_distance, direction, hit_position);
        Ok((self.material_at(from)?, self.material_at(&beyond)?))
    }
}

/// A closed, outward-oriented triangle mesh filled with one medium.
#[derive(Debug, Clone)]
pub struct Region<T> {
    pub name: String,
    pub tri2vtx: Vec<usize>,
    pub vtx2xyz: Vec<T>,
    pub material: BulkMaterial<T>,
    pub hidden: bool,
}

impl<T> Region<T>
where
    T: num_traits::Float,
{
    pub fn new(name: &str, tri2vtx: Vec<usize>, vtx2xyz: Vec<T>, material: BulkMaterial<T>) -> Self {
        Region {
            name: name.to_string(),
            tri2vtx,
            vtx2xyz,
            material,
            hidden: false,
        }
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn num_triangles(&self) -> usize {
        self.tri2vtx.len() / 3
    }

    fn validate(&self) -> Result<()> {
        let err = |msg: &str| {
            Err(PhotonError::Configuration(format!(
                "region '{}': {}",
                self.name, msg
            )))
        };
        if self.tri2vtx.len() % 3 != 0 || self.vtx2xyz.len() % 3 != 0 {
            return err("mesh arrays must hold triples");
        }
        let num_vtx = self.vtx2xyz.len() / 3;
        if self.tri2vtx.iter().any(|&i_vtx| i_vtx >= num_vtx) {
            return err("triangle refers to a missing vertex");
        }
        if self.vtx2xyz.iter().any(|v| !v.is_finite()) {
            return err("non-finite vertex coordinate");
        }
        Ok(())
    }
}

/// Regions sharing one kd-tree, surrounded by an ambient medium.
///
/// Regions may be nested but their surfaces must not intersect each other.
#[derive(Debug, Clone)]
pub struct Scene<T> {
    regions: Vec<Region<T>>,
    ambient: BulkMaterial<T>,
    tree: KdTree<T>,
    tri2region: Vec<usize>,
    /// `None` for a scene without triangles
    aabb: Option<([T; 3], [T; 3])>,
}

impl<T> Scene<T>
where
    T: num_traits::Float + 'static + Copy + std::fmt::Debug,
    f64: AsPrimitive<T>,
{
    pub fn new(regions: Vec<Region<T>>, ambient: BulkMaterial<T>, params: &KdTreeParams) -> Result<Self> {
        params.validate()?;
        let mut triangles = vec![];
        let mut tri2region = vec![];
        for (i_region, region) in regions.iter().enumerate() {
            region.validate()?;
            triangles.extend(crate::triangle::triangles_from_trimesh(
                &region.tri2vtx,
                &region.vtx2xyz,
            ));
            tri2region.resize(triangles.len(), i_region);
        }
        let aabb = triangles.iter().fold(None, |aabb: Option<([T; 3], [T; 3])>, tri| {
            let Some((mut min, mut max)) = aabb else {
                return Some((tri.min, tri.max));
            };
            for i in 0..3 {
                min[i] = min[i].min(tri.min[i]);
                max[i] = max[i].max(tri.max[i]);
            }
            Some((min, max))
        });
        log::info!(
            "scene with {} regions and {} triangles",
            regions.len(),
            triangles.len()
        );
        let tree = KdTree::new(triangles, params);
        Ok(Scene {
            regions,
            ambient,
            tree,
            tri2region,
            aabb,
        })
    }

    /// scene filled with a single medium
    pub fn homogeneous(material: BulkMaterial<T>) -> Self {
        Scene {
            regions: vec![],
            ambient: material,
            tree: KdTree::new(vec![], &KdTreeParams::default()),
            tri2region: vec![],
            aabb: None,
        }
    }

    pub fn regions(&self) -> &[Region<T>] {
        &self.regions
    }

    pub fn ambient(&self) -> &BulkMaterial<T> {
        &self.ambient
    }

    pub fn kdtree(&self) -> &KdTree<T> {
        &self.tree
    }

    pub fn region_of_triangle(&self, i_tri: usize) -> usize {
        self.tri2region[i_tri]
    }

    /// Region enclosing `point`, `None` for the ambient medium.
    ///
    /// A ray is cast from the point past the scene bounds; the nearest region whose
    /// surface it crosses an odd number of times contains the point.
    pub fn region_containing(&self, point: &[T; 3]) -> Result<Option<usize>> {
        if point.iter().any(|v| !v.is_finite()) {
            return Err(PhotonError::MalformedQuery(format!(
                "non-finite point {:?}",
                point
            )));
        }
        let Some((min, max)) = self.aabb else {
            return Ok(None);
        };
        if (0..3).any(|i| point[i] < min[i] || point[i] > max[i]) {
            return Ok(None);
        }
        let mut length = T::zero();
        for corner in 0..8 {
            let c = [
                if corner & 1 == 0 { min[0] } else { max[0] },
                if corner & 2 == 0 { min[1] } else { max[1] },
                if corner & 4 == 0 { min[2] } else { max[2] },
            ];
            length = length.max(vec3::distance(&c, point));
        }
        let probe: [T; 3] = PROBE_DIRECTION.map(|v| v.as_());
        let far = vec3::axpy(length + T::one(), &probe, point);
        let mut hits = self.tree.intersections_segment(point, &far);
        crate::kdtree::sort_by_parameter(&mut hits);
        //
        let dir = far.sub(point);
        let tol: T = DUPLICATE_HIT_DISTANCE.as_();
        let mut crossings: Vec<(usize, [T; 3])> = vec![];
        for SegmentHit { t, i_tri } in hits {
            let i_region = self.tri2region[i_tri];
            let position = vec3::axpy(t, &dir, point);
            let duplicate = crossings
                .iter()
                .any(|(i, p)| *i == i_region && vec3::distance(p, &position) < tol);
            if !duplicate {
                crossings.push((i_region, position));
            }
        }
        for (i_region, _) in &crossings {
            let count = crossings.iter().filter(|(i, _)| i == i_region).count();
            if count % 2 == 1 {
                return Ok(Some(*i_region));
            }
        }
        Ok(None)
    }
}

impl<T> MaterialLookup<T> for Scene<T>
where
    T: num_traits::Float + 'static + Copy + std::fmt::Debug,
    f64: AsPrimitive<T>,
{
    fn material_at(&self, point: &[T; 3]) -> Result<&BulkMaterial<T>> {
        Ok(match self.region_containing(point)? {
            Some(i_region) => &self.regions[i_region].material,
            None => &self.ambient,
        })
    }
}

impl<T> Geometry<T> for Scene<T>
where
    T: num_traits::Float + 'static + Copy + std::fmt::Debug,
    f64: AsPrimitive<T>,
{
    fn intersect_segment(
        &self,
        from: &[T; 3],
        to: &[T; 3],
        options: &HitTestOptions,
    ) -> Result<Vec<SurfaceHit<T>>> {
        if from.iter().chain(to.iter()).any(|v| !v.is_finite()) {
            return Err(PhotonError::MalformedQuery(format!(
                "non-finite segment {:?} -> {:?}",
                from, to
            )));
        }
        if from == to {
            return Err(PhotonError::MalformedQuery(
                "segment has zero length".to_string(),
            ));
        }
        let dir = to.sub(from);
        let mut candidates: Vec<SegmentHit<T>> =
            if options.closest_only && !options.back_face_culling && !options.ignore_hidden {
                self.tree.first_intersection_segment(from, to).into_iter().collect()
            } else {
                self.tree.intersections_segment(from, to)
            };
        if options.sorted || options.closest_only {
            crate::kdtree::sort_by_parameter(&mut candidates);
        }
        let mut hits = vec![];
        for SegmentHit { t, i_tri } in candidates {
            let i_region = self.tri2region[i_tri];
            if options.ignore_hidden && self.regions[i_region].hidden {
                continue;
            }
            let Some(normal) = self.tree.triangles()[i_tri].unit_normal() else {
                continue;
            };
            if options.back_face_culling && normal.dot(&dir) > T::zero() {
                continue;
            }
            hits.push(SurfaceHit {
                t,
                position: vec3::axpy(t, &dir, from),
                normal,
                i_region,
            });
            if options.closest_only {
                break;
            }
        }
        Ok(hits)
    }
}
