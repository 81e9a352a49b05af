//! Coordinate transform tests

#[cfg(test)]
mod tests {
    use world_bridge::transform::{
        transform_entity_position, transform_facing, transform_position, transform_state,
        transform_yaw,
    };
    use world_bridge::{
        BlockPos, BlockState, Direction, Mirror, Rotation, Size, TransformSettings, Vec3,
    };

    fn settings(mirror: Mirror, steps: i32, pivot: (i32, i32)) -> TransformSettings {
        TransformSettings::identity()
            .with_mirror(mirror)
            .with_rotation(Rotation::from_steps(steps))
            .with_pivot(pivot.0, pivot.1)
    }

    fn sample_positions() -> impl Iterator<Item = BlockPos> {
        Size::new(4, 2, 5)
            .positions()
            .map(|p| p + BlockPos::new(-2, 0, -1))
    }

    // -----------------------------------------------------------------------
    // Positions
    // -----------------------------------------------------------------------

    #[test]
    fn four_quarter_turns_are_identity() {
        for pivot in [(0, 0), (3, -2), (-5, 7)] {
            let quarter = settings(Mirror::None, 1, pivot);
            for pos in sample_positions() {
                let mut p = pos;
                for _ in 0..4 {
                    p = transform_position(p, &quarter);
                }
                assert_eq!(p, pos, "pivot {:?}", pivot);
            }
        }
    }

    #[test]
    fn two_mirrors_are_identity() {
        for mirror in [Mirror::FrontBack, Mirror::LeftRight] {
            let s = settings(mirror, 0, (0, 0));
            for pos in sample_positions() {
                assert_eq!(transform_position(transform_position(pos, &s), &s), pos);
            }
        }
    }

    #[test]
    fn half_turn_equals_two_quarter_turns() {
        let quarter = settings(Mirror::None, 1, (2, 1));
        let half = settings(Mirror::None, 2, (2, 1));
        for pos in sample_positions() {
            let twice = transform_position(transform_position(pos, &quarter), &quarter);
            assert_eq!(twice, transform_position(pos, &half));
        }
    }

    #[test]
    fn y_never_changes() {
        for steps in 0..4 {
            for mirror in [Mirror::None, Mirror::FrontBack, Mirror::LeftRight] {
                let s = settings(mirror, steps, (1, 1));
                for pos in sample_positions() {
                    assert_eq!(transform_position(pos, &s).y, pos.y);
                }
            }
        }
    }

    #[test]
    fn rotate_four_is_no_rotation() {
        assert_eq!(Rotation::from_steps(4).steps(), 0);
        let s = settings(Mirror::None, 4, (9, 9));
        assert!(s.is_identity());
        assert_eq!(transform_position(BlockPos::new(1, 2, 3), &s), BlockPos::new(1, 2, 3));
    }

    // -----------------------------------------------------------------------
    // Orientation
    // -----------------------------------------------------------------------

    #[test]
    fn facing_matches_position_offsets() {
        let offsets = [
            (Direction::North, BlockPos::new(0, 0, -1)),
            (Direction::South, BlockPos::new(0, 0, 1)),
            (Direction::West, BlockPos::new(-1, 0, 0)),
            (Direction::East, BlockPos::new(1, 0, 0)),
        ];
        for steps in 0..4 {
            for mirror in [Mirror::None, Mirror::FrontBack, Mirror::LeftRight] {
                let s = settings(mirror, steps, (0, 0));
                let origin = transform_position(BlockPos::ORIGIN, &s);
                for (dir, offset) in offsets {
                    let moved = transform_position(offset, &s) - origin;
                    let facing = transform_facing(dir, &s);
                    let expected = offsets.iter().find(|(d, _)| *d == facing).unwrap().1;
                    assert_eq!(moved, expected, "{:?} {:?} steps={}", dir, mirror, steps);
                }
            }
        }
    }

    #[test]
    fn stairs_keep_unrelated_properties() {
        let stairs = BlockState::new("oak_stairs")
            .with("facing", "north")
            .with("half", "top")
            .with("shape", "straight");
        let out = transform_state(&stairs, &settings(Mirror::None, 2, (0, 0)));
        assert_eq!(out.property("facing"), Some("south"));
        assert_eq!(out.property("half"), Some("top"));
        assert_eq!(out.property("shape"), Some("straight"));
    }

    #[test]
    fn fence_connections_rotate() {
        let fence = BlockState::new("oak_fence")
            .with("north", "true")
            .with("east", "false")
            .with("south", "false")
            .with("west", "false");
        let out = transform_state(&fence, &settings(Mirror::None, 1, (0, 0)));
        assert_eq!(out.property("east"), Some("true"));
        assert_eq!(out.property("north"), Some("false"));
    }

    // -----------------------------------------------------------------------
    // Entities
    // -----------------------------------------------------------------------

    #[test]
    fn entity_at_block_centre_stays_at_block_centre() {
        let s = settings(Mirror::FrontBack, 3, (2, -1));
        for pos in sample_positions() {
            let centre = Vec3::new(pos.x as f64 + 0.5, pos.y as f64, pos.z as f64 + 0.5);
            let moved = transform_entity_position(centre, &s);
            assert_eq!(moved.block_pos(), transform_position(pos, &s));
        }
    }

    #[test]
    fn yaw_follows_rotation() {
        let quarter = settings(Mirror::None, 1, (0, 0));
        assert_eq!(transform_yaw(0.0, &quarter), 90.0);
        assert_eq!(transform_yaw(135.0, &quarter), -135.0);
        let back = settings(Mirror::FrontBack, 0, (0, 0));
        assert_eq!(transform_yaw(30.0, &back), -30.0);
    }
}
