// Unit tests for planning and naming rules

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use crate::domain::errors::*;
    use crate::domain::model::*;
    use crate::domain::rules::*;

    fn triples(plan: &SegmentPlan) -> Vec<(usize, f64, f64)> {
        plan.ranges()
            .iter()
            .map(|r| (r.index, r.start_seconds, r.length_seconds))
            .collect()
    }

    fn assert_plan_invariants(total: f64, nominal: f64) {
        let plan = SegmentPlanner::plan(total, nominal).unwrap();
        let ranges = plan.ranges();
        assert!(!ranges.is_empty());

        let mut expected_start = 0.0;
        for (position, range) in ranges.iter().enumerate() {
            assert_eq!(range.index, position + 1, "indices must be dense from 1");
            assert!((range.start_seconds - expected_start).abs() < 1e-6);
            assert!(range.length_seconds > 0.0);
            assert!(range.length_seconds <= nominal + 1e-6);
            expected_start = range.end_seconds();
        }

        let sum: f64 = ranges.iter().map(|r| r.length_seconds).sum();
        assert!((sum - total).abs() < 1e-6, "lengths {} != total {}", sum, total);

        let remainder = total % nominal;
        let last = ranges.last().unwrap().length_seconds;
        if remainder > REMAINDER_EPSILON_SECONDS {
            assert!((last - remainder).abs() < 1e-6);
        } else {
            assert!((last - nominal).abs() < 1e-6);
        }
    }

    #[test]
    fn test_plan_with_short_final_segment() {
        let plan = SegmentPlanner::plan(320.0, 140.0).unwrap();
        assert_eq!(
            triples(&plan),
            vec![(1, 0.0, 140.0), (2, 140.0, 140.0), (3, 280.0, 40.0)]
        );
    }

    #[test]
    fn test_plan_single_exact_segment() {
        let plan = SegmentPlanner::plan(140.0, 140.0).unwrap();
        assert_eq!(triples(&plan), vec![(1, 0.0, 140.0)]);
    }

    #[test]
    fn test_plan_exact_multiple_has_no_empty_tail() {
        let plan = SegmentPlanner::plan(600.0, 150.0).unwrap();
        assert_eq!(plan.len(), 4);
        assert_eq!(plan.ranges().last().unwrap().length_seconds, 150.0);
    }

    #[test]
    fn test_plan_source_shorter_than_segment() {
        let plan = SegmentPlanner::plan(12.5, 150.0).unwrap();
        assert_eq!(triples(&plan), vec![(1, 0.0, 12.5)]);
    }

    #[test]
    fn test_plan_keeps_tiny_final_segment() {
        let plan = SegmentPlanner::plan(300.4, 150.0).unwrap();
        assert_eq!(plan.len(), 3);
        let last = plan.ranges()[2];
        assert!((last.length_seconds - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_plan_preserves_sub_second_precision() {
        let plan = SegmentPlanner::plan(10.75, 2.5).unwrap();
        assert_eq!(plan.len(), 5);
        assert_eq!(plan.ranges()[4].start_seconds, 10.0);
        assert!((plan.ranges()[4].length_seconds - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_plan_ignores_rounding_noise_remainder() {
        // 0.3 / 0.1 does not divide evenly in binary floating point
        let plan = SegmentPlanner::plan(0.3, 0.1).unwrap();
        assert_eq!(plan.len(), 3);
        assert_plan_invariants(0.3, 0.1);
    }

    #[test]
    fn test_plan_invariants_across_inputs() {
        let totals = [1.0, 59.9, 60.0, 61.0, 320.0, 3599.97, 7200.0, 10_000.5];
        let nominals = [0.5, 1.0, 7.0, 30.0, 140.0, 150.0, 3600.0];
        for total in totals {
            for nominal in nominals {
                assert_plan_invariants(total, nominal);
            }
        }
    }

    #[test]
    fn test_plan_is_idempotent() {
        let first = SegmentPlanner::plan(1234.56, 45.0).unwrap();
        let second = SegmentPlanner::plan(1234.56, 45.0).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_plan_rejects_runaway_segment_count() {
        assert_eq!(
            SegmentPlanner::plan(1e12, 1e-3),
            Err(PlanError::TooManySegments(1e-3, MAX_SEGMENTS))
        );
        assert!(matches!(
            SegmentPlanner::plan(MAX_SEGMENTS as f64 + 0.5, 1.0),
            Err(PlanError::TooManySegments(_, _))
        ));

        let at_limit = SegmentPlanner::plan(MAX_SEGMENTS as f64, 1.0).unwrap();
        assert_eq!(at_limit.ranges().len(), MAX_SEGMENTS);
    }

    #[test]
    fn test_plan_rejects_invalid_segment_length() {
        assert_eq!(
            SegmentPlanner::plan(100.0, 0.0),
            Err(PlanError::InvalidSegmentLength(0.0))
        );
        assert!(matches!(
            SegmentPlanner::plan(100.0, -5.0),
            Err(PlanError::InvalidSegmentLength(_))
        ));
        assert!(matches!(
            SegmentPlanner::plan(100.0, f64::NAN),
            Err(PlanError::InvalidSegmentLength(_))
        ));
    }

    #[test]
    fn test_plan_rejects_empty_source() {
        assert_eq!(
            SegmentPlanner::plan(0.0, 10.0),
            Err(PlanError::EmptySource(0.0))
        );
        assert!(matches!(
            SegmentPlanner::plan(-1.0, 10.0),
            Err(PlanError::EmptySource(_))
        ));
    }

    #[test]
    fn test_plan_source_requires_probe() {
        let source = SourceMedia::unprobed("clip.mov");
        assert!(matches!(
            SegmentPlanner::plan_source(&source, 30.0),
            Err(PlanError::SourceNotProbed(_))
        ));

        let source = SourceMedia::probed("clip.mov", 95.0);
        assert_eq!(SegmentPlanner::plan_source(&source, 30.0).unwrap().len(), 4);
    }

    #[test]
    fn test_nominal_length_from_minutes_and_seconds() {
        assert_eq!(SegmentPlanner::nominal_length(2, 30.0), 150.0);
        assert_eq!(SegmentPlanner::nominal_length(0, 0.0), 0.0);
    }

    #[test]
    fn test_segment_file_name_is_zero_padded() {
        let source = Path::new("/videos/holiday.trip.mov");
        assert_eq!(
            OutputNaming::segment_file_name(source, 1),
            "holiday.trip_part_001.mp4"
        );
        assert_eq!(
            OutputNaming::segment_file_name(source, 42),
            "holiday.trip_part_042.mp4"
        );
        assert_eq!(
            OutputNaming::segment_file_name(source, 1234),
            "holiday.trip_part_1234.mp4"
        );
    }

    #[test]
    fn test_default_output_dir_is_beside_source() {
        assert_eq!(
            OutputNaming::default_output_dir(Path::new("/videos/a.mp4")),
            PathBuf::from("/videos/video_segments")
        );
        assert_eq!(
            OutputNaming::default_output_dir(Path::new("a.mp4")),
            PathBuf::from("video_segments")
        );
    }

    #[test]
    fn test_segment_path_joins_output_directory() {
        let path = OutputNaming::segment_path(Path::new("/out"), Path::new("/in/talk.mkv"), 3);
        assert_eq!(path, PathBuf::from("/out/talk_part_003.mp4"));
    }
}
