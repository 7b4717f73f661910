use geo::{Geometry, Rect};
use ndarray::{Array2, Array3, Axis};
use proptest::prelude::*;

use crate::{
    burn::{BurnOptions, Burner, MergeAlgorithm},
    rasterize::{rasterize, BaseGrid},
    table::GeometryTable,
    trace::Connectivity,
    vectorize::{vectorize, ValueFilter, VectorizeParams},
    window::{Crs, GeoTransform, SpatialWindow},
};

const UTM: Crs = Crs::new(32633);

/// 与网格对齐、像素边长为1的变换
fn unit_transform(height: usize, width: usize) -> GeoTransform {
    let window = SpatialWindow::new((0., 0.), (width as f64, height as f64), UTM).unwrap();
    GeoTransform::from_bounds(&window, height, width).unwrap()
}

fn small_grid(max_value: u8) -> impl Strategy<Value = Array3<u8>> {
    (1usize..12, 1usize..12, 1usize..3).prop_flat_map(move |(height, width, channels)| {
        proptest::collection::vec(0..=max_value, height * width * channels).prop_map(
            move |values| Array3::from_shape_vec((height, width, channels), values).unwrap(),
        )
    })
}

fn connectivity() -> impl Strategy<Value = Connectivity> {
    prop_oneof![Just(Connectivity::Four), Just(Connectivity::Eight)]
}

fn rect() -> impl Strategy<Value = Rect<f64>> {
    (-5f64..15., -5f64..15., 0.1f64..8., 0.1f64..8.)
        .prop_map(|(x, y, w, h)| Rect::new((x, y), (x + w, y + h)))
}

proptest! {
    #[test]
    fn redundant_burn_is_idempotent(
        rects in proptest::collection::vec(rect(), 1..5),
        all_touched in any::<bool>(),
    ) {
        let transform = unit_transform(10, 10);
        let table = GeometryTable::from_geometries(UTM, rects);
        let options = BurnOptions { all_touched, merge_algorithm: MergeAlgorithm::Replace };
        let base = BaseGrid::New { height: 10, width: 10, fill: 0u8 };

        let once = rasterize(&table, base, 1, &transform, &options).unwrap();
        let again = BaseGrid::Existing(once.index_axis(Axis(2), 0).to_owned());
        let twice = rasterize(&table, again, 1, &transform, &options).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn filter_contains_every_value(
        grid in small_grid(4),
        permitted in proptest::collection::vec(0u8..=4, 0..4),
        connectivity in connectivity(),
    ) {
        let (height, width, _) = grid.dim();
        let filter: ValueFilter = permitted.iter().copied().collect();
        let params = VectorizeParams {
            values: Some(filter.clone()),
            connectivity,
            ..Default::default()
        };
        let transform = unit_transform(height, width);
        let table = vectorize(grid.view(), &transform, UTM, &params, None).unwrap();
        if permitted.is_empty() {
            let unfiltered = VectorizeParams { connectivity, ..Default::default() };
            let everything = vectorize(grid.view(), &transform, UTM, &unfiltered, None).unwrap();
            prop_assert_eq!(table, everything);
        } else {
            for row in &table {
                prop_assert!(filter.contains(row.value.unwrap()));
            }
        }
    }

    #[test]
    fn vectorized_mask_burns_back_exactly(
        grid in small_grid(1),
        connectivity in connectivity(),
    ) {
        let (height, width, _) = grid.dim();
        let band = grid.index_axis(Axis(2), 0).to_owned();
        let transform = unit_transform(height, width);
        let params = VectorizeParams {
            values: Some(ValueFilter::new([1.])),
            connectivity,
            ..Default::default()
        };
        let slice = band.view().insert_axis(Axis(2));
        let table = vectorize(slice, &transform, UTM, &params, None).unwrap();

        let mut burner = Burner::new(
            Array2::zeros((height, width)),
            Some(transform.geo_to_pix()),
            BurnOptions::default(),
        )
        .unwrap();
        for row in &table {
            prop_assert!(matches!(row.geometry, Geometry::Polygon(_) | Geometry::MultiPolygon(_)));
            burner.burn(&row.geometry, 1u8).unwrap();
        }
        prop_assert_eq!(burner.finish(), band);
    }

    #[test]
    fn channels_are_independent(
        grid in small_grid(3),
        connectivity in connectivity(),
    ) {
        let (height, width, channels) = grid.dim();
        let transform = unit_transform(height, width);
        let params = VectorizeParams { connectivity, ..Default::default() };
        let together = vectorize(grid.view(), &transform, UTM, &params, None).unwrap();

        let separately = (0..channels)
            .map(|channel| {
                let band = grid.index_axis(Axis(2), channel).insert_axis(Axis(2));
                vectorize(band, &transform, UTM, &params, None)
            })
            .collect::<crate::Result<Vec<_>>>()
            .unwrap();
        let joined = GeometryTable::concat(UTM, params.schema(false), separately).unwrap();
        prop_assert_eq!(together, joined);
    }

    #[test]
    fn unfiltered_components_tile_the_grid(
        grid in small_grid(2),
        connectivity in connectivity(),
    ) {
        use geo::Area;

        let (height, width, channels) = grid.dim();
        let params = VectorizeParams { connectivity, ..Default::default() };
        let table = vectorize(grid.view(), &unit_transform(height, width), UTM, &params, None)
            .unwrap();
        let total: f64 = table.iter().map(|row| row.geometry.unsigned_area()).sum();
        prop_assert!((total - (height * width * channels) as f64).abs() < 1e-9);
    }
}
