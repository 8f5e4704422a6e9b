//! Small tree and geometry helpers used alongside merged refs.

use crate::error::DomError;

/// Viewport-relative rectangle of one fragment of a range
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ClientRect {
    /// Top edge
    pub top: f64,
    /// Bottom edge
    pub bottom: f64,
    /// Left edge
    pub left: f64,
    /// Right edge
    pub right: f64,
}

impl ClientRect {
    /// Rectangle from its four edges
    pub fn new(top: f64, bottom: f64, left: f64, right: f64) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    /// Horizontal extent
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    /// Vertical extent
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

/// Height spanned by a range's rectangles: lowest bottom minus highest top.
///
/// Zero-width rectangles count, unlike a plain union of the rectangles.
/// Returns `None` for an empty range.
pub fn range_height(rects: &[ClientRect]) -> Option<f64> {
    let first = rects.first()?;
    let (top, bottom) = rects[1..]
        .iter()
        .fold((first.top, first.bottom), |(top, bottom), rect| {
            (top.min(rect.top), bottom.max(rect.bottom))
        });
    Some(bottom - top)
}

/// Insert `new_node` as the next sibling of `reference` in `children`.
///
/// A node already among `children` is moved rather than duplicated.
/// Fails if `reference` is not one of `children`.
pub fn insert_after<N: PartialEq>(
    children: &mut Vec<N>,
    new_node: N,
    reference: &N,
) -> Result<(), DomError> {
    if !children.contains(reference) {
        return Err(DomError::ReferenceNotFound);
    }
    if new_node == *reference {
        return Ok(());
    }

    children.retain(|child| *child != new_node);
    let index = children
        .iter()
        .position(|child| child == reference)
        .ok_or(DomError::ReferenceNotFound)?;
    children.insert(index + 1, new_node);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_range_has_no_height() {
        assert_eq!(range_height(&[]), None);
    }

    #[test]
    fn height_spans_all_rects_including_zero_width() {
        let rects = [
            ClientRect::new(10.0, 20.0, 0.0, 50.0),
            ClientRect::new(30.0, 42.0, 5.0, 5.0),
            ClientRect::new(15.0, 25.0, 0.0, 10.0),
        ];

        assert_eq!(rects[1].width(), 0.0);
        assert_eq!(range_height(&rects), Some(32.0));
    }

    #[test]
    fn insert_after_places_next_sibling() {
        let mut children = vec!["a", "b", "c"];

        insert_after(&mut children, "x", &"a").unwrap();
        assert_eq!(children, vec!["a", "x", "b", "c"]);

        insert_after(&mut children, "y", &"c").unwrap();
        assert_eq!(children, vec!["a", "x", "b", "c", "y"]);
    }

    #[test]
    fn insert_after_moves_existing_child() {
        let mut children = vec!["a", "b", "c"];

        insert_after(&mut children, "a", &"c").unwrap();
        assert_eq!(children, vec!["b", "c", "a"]);
    }

    #[test]
    fn insert_after_missing_reference_fails() {
        let mut children = vec!["a"];

        assert!(matches!(
            insert_after(&mut children, "x", &"z"),
            Err(DomError::ReferenceNotFound)
        ));
        assert_eq!(children, vec!["a"]);
    }
}
