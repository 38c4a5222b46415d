use nalgebra as na;

/// A scene entity the grab can move, unless it is part of the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct ManipulableObject {
    pub id: String,
    pub position: na::Point3<f32>,
    /// Static world geometry. Never resolved or moved.
    pub is_environment: bool,
}

impl ManipulableObject {
    pub fn new(id: impl Into<String>, position: na::Point3<f32>) -> Self {
        Self {
            id: id.into(),
            position,
            is_environment: false,
        }
    }

    pub fn environment(id: impl Into<String>, position: na::Point3<f32>) -> Self {
        Self {
            id: id.into(),
            position,
            is_environment: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nearest {
    /// Index into the roster that was searched.
    pub index: usize,
    pub distance: f32,
}

/// Closest non environment object to `target`, with no distance limit.
///
/// Ties go to the object seen first.
pub fn nearest(objects: &[ManipulableObject], target: &na::Point3<f32>) -> Option<Nearest> {
    let mut best: Option<Nearest> = None;
    for (index, object) in objects.iter().enumerate() {
        if object.is_environment {
            continue;
        }
        let distance = na::distance(&object.position, target);
        if best.map_or(true, |current| distance < current.distance) {
            best = Some(Nearest { index, distance });
        }
    }
    best
}

/// Closest non environment object strictly within `threshold` of `target`.
pub fn resolve(
    objects: &[ManipulableObject],
    target: &na::Point3<f32>,
    threshold: f32,
) -> Option<Nearest> {
    nearest(objects, target).filter(|found| found.distance < threshold)
}
