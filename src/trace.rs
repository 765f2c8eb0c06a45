use crate::geometry::{ImagePoint, Mapper, ViewPoint};

/// Freehand region tracing on the canvas.
///
/// Points are recorded in view space as the pointer moves. Releasing the
/// pointer closes the loop and fixes the image-space polygon using the mapper
/// that was in effect at that moment.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum PathTracer {
    #[default]
    Idle,
    Tracing {
        points: Vec<ViewPoint>,
    },
    Closed {
        points: Vec<ViewPoint>,
        polygon: Vec<ImagePoint>,
    },
}

impl PathTracer {
    /// Pointer pressed. Any previous path, open or closed, is discarded.
    pub fn begin(&mut self, at: ViewPoint) {
        *self = PathTracer::Tracing { points: vec![at] };
    }

    /// Pointer moved while held. Returns the new segment to draw, if tracing.
    pub fn extend(&mut self, to: ViewPoint) -> Option<[ViewPoint; 2]> {
        let PathTracer::Tracing { points } = self else {
            return None;
        };
        let from = *points.last()?;
        points.push(to);
        Some([from, to])
    }

    /// Pointer released: close the loop back to its first point.
    pub fn finish(&mut self, mapper: &Mapper) {
        let PathTracer::Tracing { points } = self else {
            return;
        };
        let mut points = std::mem::take(points);
        if let Some(&first) = points.first() {
            points.push(first);
        }
        let polygon = points.iter().map(|&p| mapper.to_image_space(p)).collect();
        *self = PathTracer::Closed { points, polygon };
    }

    /// Drop the path (Escape).
    pub fn cancel(&mut self) {
        *self = PathTracer::Idle;
    }

    /// Hand the closed polygon over for compositing and return to idle.
    /// Does nothing unless the path is closed.
    pub fn take_polygon(&mut self) -> Option<Vec<ImagePoint>> {
        match std::mem::take(self) {
            PathTracer::Closed { polygon, .. } => Some(polygon),
            other => {
                *self = other;
                None
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, PathTracer::Closed { .. })
    }

    pub fn is_tracing(&self) -> bool {
        matches!(self, PathTracer::Tracing { .. })
    }

    /// View-space points for drawing the current path.
    pub fn view_points(&self) -> &[ViewPoint] {
        match self {
            PathTracer::Idle => &[],
            PathTracer::Tracing { points } | PathTracer::Closed { points, .. } => points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Viewport, ZoomRegion};

    fn unit_mapper() -> Mapper {
        Mapper::new(Viewport::new(100.0, 100.0), (100, 100), None)
    }

    #[test]
    fn trace_closes_back_to_first_point() {
        let mut tracer = PathTracer::default();
        tracer.begin(ViewPoint::new(10.0, 10.0));
        let hint = tracer.extend(ViewPoint::new(90.0, 10.0));
        assert_eq!(hint, Some([ViewPoint::new(10.0, 10.0), ViewPoint::new(90.0, 10.0)]));
        tracer.extend(ViewPoint::new(50.0, 90.0));
        tracer.finish(&unit_mapper());

        assert!(tracer.is_closed());
        assert_eq!(tracer.view_points().len(), 4);
        assert_eq!(tracer.view_points()[3], ViewPoint::new(10.0, 10.0));
        assert_eq!(
            tracer.take_polygon().unwrap(),
            vec![
                ImagePoint::new(10, 10),
                ImagePoint::new(90, 10),
                ImagePoint::new(50, 90),
                ImagePoint::new(10, 10),
            ]
        );
        assert_eq!(tracer, PathTracer::Idle);
    }

    #[test]
    fn closed_path_cannot_be_extended() {
        let mut tracer = PathTracer::default();
        tracer.begin(ViewPoint::new(1.0, 1.0));
        tracer.finish(&unit_mapper());
        assert_eq!(tracer.extend(ViewPoint::new(5.0, 5.0)), None);
        assert_eq!(tracer.view_points().len(), 2);
    }

    #[test]
    fn single_point_trace_closes_degenerate() {
        let mut tracer = PathTracer::default();
        tracer.begin(ViewPoint::new(3.0, 4.0));
        tracer.finish(&unit_mapper());
        let polygon = tracer.take_polygon().unwrap();
        assert_eq!(polygon, vec![ImagePoint::new(3, 4), ImagePoint::new(3, 4)]);
    }

    #[test]
    fn polygon_uses_zoom_at_release_time() {
        let zoom = ZoomRegion::new(ImagePoint::new(40, 40), ImagePoint::new(60, 60), 100, 100);
        let mapper = Mapper::new(Viewport::new(100.0, 100.0), (100, 100), zoom);
        let mut tracer = PathTracer::default();
        tracer.begin(ViewPoint::new(0.0, 0.0));
        tracer.extend(ViewPoint::new(50.0, 0.0));
        tracer.extend(ViewPoint::new(50.0, 50.0));
        tracer.finish(&mapper);
        let polygon = tracer.take_polygon().unwrap();
        assert_eq!(polygon[0], ImagePoint::new(40, 40));
        assert_eq!(polygon[2], ImagePoint::new(50, 50));
    }

    #[test]
    fn cancel_and_take_while_open() {
        let mut tracer = PathTracer::default();
        assert!(tracer.take_polygon().is_none());
        tracer.begin(ViewPoint::new(0.0, 0.0));
        assert!(tracer.take_polygon().is_none());
        assert!(tracer.is_tracing());
        tracer.cancel();
        assert_eq!(tracer, PathTracer::Idle);
        assert!(tracer.view_points().is_empty());
    }
}
