//! Conversions between document space and render space.
//!
//! Document space: points, origin at the page's bottom-left, Y grows upward,
//! a rect's `y` is its bottom edge. Render space: pixels of the image as it
//! is actually displayed, origin top-left, Y grows downward, a rect's `y` is
//! its top edge.
//!
//! Zoom is already folded into the measured render size, so the only scale
//! factors are render size / document size. Applying zoom a second time is
//! exactly the bug the round-trip tests guard against.

use crate::errors::ConfigurationError;
use crate::types::{DocRect, Pt, Px, RenderRect, Scalar, Size};

/// Scale + flip between one page's document and render spaces
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoordinateSpace {
    doc: Size<Pt>,
    render: Size<Px>,
    /// Pixels per point, horizontally
    scale_x: Scalar,
    /// Pixels per point, vertically
    scale_y: Scalar,
}

impl CoordinateSpace {
    /// Build a coordinate space from a page's document size and its measured render size.
    pub fn new(doc: Size<Pt>, render: Size<Px>) -> Result<Self, ConfigurationError> {
        if !(doc.w.is_finite() && doc.h.is_finite() && doc.w.0 > 0.0 && doc.h.0 > 0.0) {
            return Err(ConfigurationError::InvalidPageSize {
                width: doc.w.0,
                height: doc.h.0,
            });
        }
        if !(render.w.is_finite() && render.h.is_finite() && render.w.0 > 0.0 && render.h.0 > 0.0) {
            return Err(ConfigurationError::InvalidRenderSize {
                width: render.w.0,
                height: render.h.0,
            });
        }
        Ok(CoordinateSpace {
            doc,
            render,
            scale_x: Scalar(render.w.0 / doc.w.0),
            scale_y: Scalar(render.h.0 / doc.h.0),
        })
    }

    pub fn document_size(&self) -> Size<Pt> {
        self.doc
    }

    pub fn render_size(&self) -> Size<Px> {
        self.render
    }

    pub fn scale_x(&self) -> Scalar {
        self.scale_x
    }

    pub fn scale_y(&self) -> Scalar {
        self.scale_y
    }

    fn pt_to_px_x(&self, v: Pt) -> Px {
        Px(v.0 * self.scale_x.0)
    }

    fn pt_to_px_y(&self, v: Pt) -> Px {
        Px(v.0 * self.scale_y.0)
    }

    fn px_to_pt_x(&self, v: Px) -> Pt {
        Pt(v.0 / self.scale_x.0)
    }

    fn px_to_pt_y(&self, v: Px) -> Pt {
        Pt(v.0 / self.scale_y.0)
    }

    /// Project a document rect onto the displayed image.
    pub fn to_render(&self, r: DocRect) -> RenderRect {
        let top = self.doc.h - r.y - r.h;
        RenderRect {
            x: self.pt_to_px_x(r.x),
            y: self.pt_to_px_y(top),
            w: self.pt_to_px_x(r.w),
            h: self.pt_to_px_y(r.h),
        }
    }

    /// Inverse of [`to_render`](Self::to_render).
    pub fn to_document(&self, r: RenderRect) -> DocRect {
        let h = self.px_to_pt_y(r.h);
        DocRect {
            x: self.px_to_pt_x(r.x),
            y: self.doc.h - self.px_to_pt_y(r.y) - h,
            w: self.px_to_pt_x(r.w),
            h,
        }
    }

    /// True if the rect lies entirely on the page
    pub fn contains(&self, r: &DocRect) -> bool {
        r.x.0 >= 0.0 && r.y.0 >= 0.0 && (r.x + r.w) <= self.doc.w && (r.y + r.h) <= self.doc.h
    }

    /// Shift (and if necessary shrink) a rect so it lies on the page.
    pub fn clamp_to_page(&self, r: DocRect) -> DocRect {
        let w = r.w.min(self.doc.w);
        let h = r.h.min(self.doc.h);
        DocRect {
            x: r.x.max(Pt::ZERO).min(self.doc.w - w),
            y: r.y.max(Pt::ZERO).min(self.doc.h - h),
            w,
            h,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn letter(render_w: f64, render_h: f64) -> CoordinateSpace {
        CoordinateSpace::new(Size::new(Pt(612.0), Pt(792.0)), Size::new(Px(render_w), Px(render_h)))
            .unwrap()
    }

    #[test]
    fn identity_scale_flips_y() {
        let space = letter(612.0, 792.0);
        let r = space.to_render(DocRect::pt(50.0, 712.0, 150.0, 30.0));
        assert!(r.approx_eq(&RenderRect::px(50.0, 50.0, 150.0, 30.0), EPS));
    }

    #[test]
    fn bottom_of_page_renders_at_bottom() {
        let space = letter(306.0, 396.0);
        let h = 40.0;
        let r = space.to_render(DocRect::pt(0.0, 0.0, 100.0, h));
        let expected_top = 396.0 - 396.0 * (h / 792.0);
        assert!((r.y.0 - expected_top).abs() < EPS);
    }

    #[test]
    fn top_of_page_renders_at_zero() {
        let space = letter(1000.0, 1294.0);
        let h = 25.0;
        let r = space.to_render(DocRect::pt(10.0, 792.0 - h, 100.0, h));
        assert!(r.y.0.abs() < EPS);
    }

    #[test]
    fn round_trip_over_many_scales() {
        let rects = [
            DocRect::pt(0.0, 0.0, 612.0, 792.0),
            DocRect::pt(50.0, 50.0, 150.0, 30.0),
            DocRect::pt(0.125, 700.5, 33.3, 91.7),
            DocRect::pt(611.0, 0.0, 1.0, 1.0),
        ];
        let renders = [(612.0, 792.0), (1224.0, 1584.0), (300.0, 388.2), (937.0, 1213.0), (17.0, 22.0)];
        for (rw, rh) in renders {
            let space = letter(rw, rh);
            for rect in rects {
                let back = space.to_document(space.to_render(rect));
                assert!(back.approx_eq(&rect, EPS), "{rect:?} at {rw}x{rh} came back as {back:?}");
            }
        }
    }

    #[test]
    fn non_uniform_scale_uses_each_axis() {
        let space = letter(1224.0, 396.0);
        let r = space.to_render(DocRect::pt(100.0, 0.0, 50.0, 100.0));
        assert!(r.approx_eq(&RenderRect::px(200.0, 346.0, 100.0, 50.0), EPS));
    }

    #[test]
    fn rejects_degenerate_page() {
        let err = CoordinateSpace::new(Size::new(Pt(0.0), Pt(792.0)), Size::new(Px(10.0), Px(10.0)));
        assert_eq!(err, Err(ConfigurationError::InvalidPageSize { width: 0.0, height: 792.0 }));
    }

    #[test]
    fn rejects_degenerate_render() {
        let err = CoordinateSpace::new(Size::new(Pt(612.0), Pt(792.0)), Size::new(Px(640.0), Px(-1.0)));
        assert!(matches!(err, Err(ConfigurationError::InvalidRenderSize { .. })));
    }

    #[test]
    fn clamp_pulls_rect_onto_page() {
        let space = letter(612.0, 792.0);
        let clamped = space.clamp_to_page(DocRect::pt(-10.0, 780.0, 100.0, 30.0));
        assert_eq!(clamped, DocRect::pt(0.0, 762.0, 100.0, 30.0));
        assert!(space.contains(&clamped));

        let huge = space.clamp_to_page(DocRect::pt(5.0, 5.0, 700.0, 900.0));
        assert_eq!(huge, DocRect::pt(0.0, 0.0, 612.0, 792.0));
    }
}
