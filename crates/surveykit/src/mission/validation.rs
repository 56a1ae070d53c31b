use super::types::{IssueSeverity, MissionFrame, MissionIssue, MissionItem, MissionPlan};

pub const MAX_MISSION_ITEMS: usize = 4096;

pub fn validate_plan(plan: &MissionPlan) -> Vec<MissionIssue> {
    let mut issues = Vec::new();

    if plan.items.is_empty() {
        issues.push(MissionIssue {
            code: "plan.empty".to_string(),
            message: "Mission has no items".to_string(),
            seq: None,
            severity: IssueSeverity::Warning,
        });
    }

    if plan.items.len() > MAX_MISSION_ITEMS {
        issues.push(MissionIssue {
            code: "plan.too_many_items".to_string(),
            message: format!(
                "Mission exceeds maximum supported item count ({MAX_MISSION_ITEMS})"
            ),
            seq: None,
            severity: IssueSeverity::Error,
        });
    }

    for (expected, item) in plan.items.iter().enumerate() {
        if u16::try_from(expected).ok() != Some(item.seq) {
            issues.push(item_issue(
                item,
                "plan.non_contiguous_sequence",
                format!("Expected sequence {expected} but found {}", item.seq),
            ));
        }

        let non_finite = [item.param1, item.param2, item.param3, item.param4, item.z]
            .into_iter()
            .zip(["param1", "param2", "param3", "param4", "z"])
            .filter(|(value, _)| !value.is_finite())
            .map(|(_, name)| name);
        for name in non_finite {
            issues.push(item_issue(
                item,
                "item.non_finite_value",
                format!("{name} must be finite"),
            ));
        }

        // NED: positive z is below the home plane.
        if item.frame == MissionFrame::LocalNed && item.z > 0.0 {
            issues.push(item_issue(
                item,
                "item.below_ground",
                format!("Local waypoint z {} is below home", item.z),
            ));
        }
    }

    issues
}

fn item_issue(item: &MissionItem, code: &str, message: String) -> MissionIssue {
    MissionIssue {
        code: code.to_string(),
        message,
        seq: Some(item.seq),
        severity: IssueSeverity::Error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_item(seq: u16) -> MissionItem {
        MissionItem {
            seq,
            command: 16,
            frame: MissionFrame::LocalNed,
            current: seq == 0,
            autocontinue: true,
            param1: 0.0,
            param2: 0.0,
            param3: 0.0,
            param4: 0.0,
            x: 20_000,
            y: -50_000,
            z: -12.5,
        }
    }

    #[test]
    fn detects_non_contiguous_sequence() {
        let plan = MissionPlan {
            items: vec![sample_item(0), sample_item(2)],
        };

        let issues = validate_plan(&plan);
        assert!(issues
            .iter()
            .any(|issue| issue.code == "plan.non_contiguous_sequence"));
    }

    #[test]
    fn detects_nan_and_waypoints_below_home() {
        let mut item = sample_item(0);
        item.param2 = f32::NAN;
        item.z = 3.0;
        let plan = MissionPlan { items: vec![item] };

        let issues = validate_plan(&plan);
        assert!(issues
            .iter()
            .any(|issue| issue.code == "item.non_finite_value"));
        assert!(issues.iter().any(|issue| issue.code == "item.below_ground"));
    }

    #[test]
    fn empty_plan_is_only_a_warning() {
        let issues = validate_plan(&MissionPlan { items: Vec::new() });
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, IssueSeverity::Warning);
    }

    #[test]
    fn flags_oversized_plans() {
        let items = (0..=MAX_MISSION_ITEMS as u16).map(sample_item).collect();
        let issues = validate_plan(&MissionPlan { items });
        assert!(issues.iter().any(|issue| issue.code == "plan.too_many_items"));
    }

    #[test]
    fn sequence_wrapping_past_u16_is_not_contiguous() {
        let items: Vec<_> = (0..=usize::from(u16::MAX) + 1)
            .map(|index| sample_item(index as u16))
            .collect();
        let issues = validate_plan(&MissionPlan { items });

        let gaps: Vec<_> = issues
            .iter()
            .filter(|issue| issue.code == "plan.non_contiguous_sequence")
            .collect();
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].seq, Some(0));
        assert_eq!(gaps[0].message, "Expected sequence 65536 but found 0");
    }
}
