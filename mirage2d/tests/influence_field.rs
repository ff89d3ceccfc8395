use mirage2d::{
    propagate, Direction, GridConfig, InfluenceGrid, OpenField, PropagationRange, Vec2,
};

fn arena() -> InfluenceGrid {
    InfluenceGrid::build(&GridConfig::default(), &OpenField).expect("default grid is valid")
}

#[test]
fn cardinals_feel_an_agent_more_than_diagonals() {
    let mut grid = arena();
    let origin = grid.node_at(Vec2::new(0.3, -0.7)).expect("on grid");
    propagate(&mut grid, origin, -1.0, PropagationRange::Hops(2));

    let node = grid.node(origin);
    for (cardinal, diagonals) in [
        (Direction::North, [Direction::NorthEast, Direction::NorthWest]),
        (Direction::South, [Direction::SouthEast, Direction::SouthWest]),
    ] {
        let c = grid.node(node.neighbor(cardinal).expect("interior")).desirability();
        assert!(c < 0.0);
        for diagonal in diagonals {
            let d = grid.node(node.neighbor(diagonal).expect("interior")).desirability();
            assert!(d < 0.0);
            assert!(c.abs() > d.abs());
        }
    }
}

#[test]
fn desirability_fades_without_fresh_influence() {
    let mut grid = arena();
    let origin = grid.node_at(Vec2::ZERO).expect("on grid");
    propagate(&mut grid, origin, 1.0, PropagationRange::Fraction(0.5));
    let start = grid.node(origin).desirability();

    for _ in 0..50 {
        grid.refresh(&OpenField);
    }
    let faded = grid.node(origin).desirability();
    assert!(faded > 0.0);
    assert!(faded < start * 0.01);
}

#[test]
fn values_stay_clamped_under_heavy_traffic() {
    let mut grid = arena();
    let mut rng = fastrand::Rng::with_seed(2024);
    for _ in 0..500 {
        let position = Vec2::new(rng.f32() * 6.0 - 3.0, rng.f32() * 6.0 - 3.0);
        let Ok(origin) = grid.node_at(position) else {
            continue;
        };
        let value = if rng.bool() { 5.0 } else { -5.0 };
        propagate(&mut grid, origin, value, PropagationRange::Fraction(rng.f32()));
    }
    assert!(grid
        .iter()
        .all(|(_, node)| (-1.0..=1.0).contains(&node.desirability())));
}
