//! Spatial key model.
//!
//! Provides the quad-tree key types used as cache keys throughout the engine
//! and the rectangle math that maps a key to its place on the map.

mod rect;
mod types;

pub use rect::Rect;
pub use types::{CellKey, CoordError, FragmentKey, QuadKey, RegionId, MAX_DEPTH};

/// Unit-square rectangle a key occupies inside the tree root.
///
/// Applied to a relative key (for example a `suffix_after` result) this is
/// the sub-rectangle inside the ancestor tile.
#[inline]
pub fn key_unit_rect(digits: impl Iterator<Item = u8>) -> Rect {
    let mut rect = Rect::unit();
    for digit in digits {
        rect.width /= 2.0;
        rect.height /= 2.0;
        rect.x += (digit & 1) as f64 * rect.width;
        rect.y += (digit >> 1) as f64 * rect.height;
    }
    rect
}

/// Unit-square rectangle of a cell key.
#[inline]
pub fn cell_unit_rect(cell: &CellKey) -> Rect {
    key_unit_rect(cell.digits())
}

/// World rectangle of a cell inside the map rectangle.
#[inline]
pub fn tile_rect(map_rect: &Rect, cell: &CellKey) -> Rect {
    cell_unit_rect(cell).within(map_rect)
}

/// Convert a world-space dimension to screen pixels at `zoom`.
///
/// World space is the map at zoom 0; every zoom level doubles the scale.
#[inline]
pub fn world_to_screen(dimension: (f64, f64), zoom: u8) -> (f64, f64) {
    let scale = 2.0_f64.powi(zoom as i32);
    (dimension.0 * scale, dimension.1 * scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(s: &str) -> CellKey {
        s.parse().unwrap()
    }

    fn quad(s: &str) -> QuadKey {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display_roundtrip() {
        let key = quad("0123");
        assert_eq!(key.to_string(), "0123");
        assert_eq!(key.zoom(), 4);
        assert_eq!(key.digits().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_parse_rejects_invalid_digit() {
        let result: Result<QuadKey, _> = "0124".parse();
        assert_eq!(result.unwrap_err(), CoordError::InvalidDigit('4'));
    }

    #[test]
    fn test_parse_rejects_too_deep() {
        let long = "0".repeat(MAX_DEPTH as usize + 1);
        let result: Result<CellKey, _> = long.parse();
        assert!(matches!(result, Err(CoordError::TooDeep { len: 31, .. })));
    }

    #[test]
    fn test_root_key() {
        assert!(QuadKey::ROOT.is_empty());
        assert_eq!(QuadKey::ROOT.to_string(), "");
        assert_eq!(QuadKey::ROOT.parent(), None);
        assert_eq!(quad(""), QuadKey::ROOT);
    }

    #[test]
    fn test_parent_and_child() {
        let key = quad("021");
        assert_eq!(key.parent(), Some(quad("02")));
        assert_eq!(quad("02").child(1).unwrap(), key);
        assert_eq!(
            quad("02").child(4).unwrap_err(),
            CoordError::InvalidDigitValue(4)
        );
    }

    #[test]
    fn test_children_in_digit_order() {
        let children = quad("3").children();
        assert_eq!(
            children,
            vec![quad("30"), quad("31"), quad("32"), quad("33")]
        );
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let ancestors: Vec<_> = cell("012").ancestors().collect();
        assert_eq!(ancestors, vec![cell("01"), cell("0"), CellKey::ROOT]);
    }

    #[test]
    fn test_is_ancestor_of() {
        assert!(cell("0").is_ancestor_of(&cell("012")));
        assert!(CellKey::ROOT.is_ancestor_of(&cell("3")));
        assert!(!cell("01").is_ancestor_of(&cell("01")));
        assert!(!cell("1").is_ancestor_of(&cell("012")));
    }

    #[test]
    fn test_suffix_after_and_concat_are_inverse() {
        let key = cell("01230");
        let ancestor = cell("01");

        let suffix = key.suffix_after(&ancestor).unwrap();
        assert_eq!(suffix, cell("230"));
        assert_eq!(ancestor.concat(&suffix).unwrap(), key);
    }

    #[test]
    fn test_suffix_after_self_is_root() {
        let key = cell("12");
        assert_eq!(key.suffix_after(&key).unwrap(), CellKey::ROOT);
    }

    #[test]
    fn test_suffix_after_non_ancestor_fails() {
        let result = cell("01").suffix_after(&cell("1"));
        assert!(matches!(result, Err(CoordError::NotAncestor { .. })));
    }

    #[test]
    fn test_concat_rejects_overflow() {
        let deep = cell(&"1".repeat(20));
        let tail = cell(&"2".repeat(11));
        assert!(matches!(
            deep.concat(&tail),
            Err(CoordError::TooDeep { len: 31, .. })
        ));
    }

    #[test]
    fn test_keys_with_leading_zeros_are_distinct() {
        assert_ne!(quad("0"), quad("00"));
        assert_ne!(quad("0"), QuadKey::ROOT);
    }

    #[test]
    fn test_quad_cell_conversion() {
        let quad_key = quad("0312");
        let cell_key: CellKey = quad_key.into();
        assert_eq!(cell_key.to_string(), "0312");
        assert_eq!(QuadKey::from(cell_key), quad_key);
    }

    #[test]
    fn test_fragment_key_display_and_zoom() {
        let key = FragmentKey::new("foo", quad("01"));
        assert_eq!(key.zoom(), 2);
        assert_eq!(key.to_string(), "fragment_foo_01");
    }

    #[test]
    fn test_unit_rect_quadrants() {
        assert_eq!(cell_unit_rect(&cell("0")), Rect::new(0.0, 0.0, 0.5, 0.5));
        assert_eq!(cell_unit_rect(&cell("1")), Rect::new(0.5, 0.0, 0.5, 0.5));
        assert_eq!(cell_unit_rect(&cell("2")), Rect::new(0.0, 0.5, 0.5, 0.5));
        assert_eq!(
            cell_unit_rect(&cell("31")),
            Rect::new(0.75, 0.5, 0.25, 0.25)
        );
    }

    #[test]
    fn test_tile_rect_in_world_space() {
        let map_rect = Rect::new(0.0, 0.0, 256.0, 256.0);
        assert_eq!(
            tile_rect(&map_rect, &cell("3")),
            Rect::new(128.0, 128.0, 128.0, 128.0)
        );
    }

    #[test]
    fn test_world_to_screen_doubles_per_zoom() {
        assert_eq!(world_to_screen((16.0, 8.0), 0), (16.0, 8.0));
        assert_eq!(world_to_screen((16.0, 8.0), 4), (256.0, 128.0));
    }
}
