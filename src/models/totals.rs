use serde::Serialize;

use crate::models::session::{ExerciseSessionDetail, SessionItem, WorkoutChild, WorkoutChildContent};

/// Derived counters stored on workouts and templates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WorkoutTotals {
    pub total_exercises: i32,
    pub total_sets: i32,
    pub total_volume: f64,
}

impl WorkoutTotals {
    /// Walks the child tree. Every set counts towards `total_sets`; only sets
    /// of non-cardio exercises add `weight * reps` to the volume. Rests and
    /// intervals contribute nothing.
    pub fn from_children(children: &[WorkoutChild]) -> Self {
        let mut totals = WorkoutTotals {
            total_exercises: children.len() as i32,
            ..Default::default()
        };

        for child in children {
            match &child.content {
                WorkoutChildContent::Exercise(session) => totals.add_session(session),
                WorkoutChildContent::Superset(superset) => {
                    for session in &superset.exercises {
                        totals.add_session(session);
                    }
                }
            }
        }

        totals
    }

    fn add_session(&mut self, session: &ExerciseSessionDetail) {
        for entry in &session.session_data {
            if let SessionItem::Set(set) = &entry.item {
                self.total_sets += 1;
                if !session.exercise.is_cardio {
                    self.total_volume += set.volume();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::session::{
        ExerciseSummary, IntervalData, RestData, SessionItemDetail, SetData, SupersetDetail,
    };
    use chrono::{NaiveTime, Utc};
    use uuid::Uuid;

    fn item(position: i32, item: SessionItem) -> SessionItemDetail {
        SessionItemDetail {
            id: Uuid::new_v4(),
            position,
            created_by: Uuid::nil(),
            item,
            updated_at: Utc::now(),
        }
    }

    fn set(weight: Option<f64>, reps: Option<i32>) -> SessionItem {
        SessionItem::Set(SetData {
            weight,
            reps,
            ..Default::default()
        })
    }

    fn session(is_cardio: bool, items: Vec<SessionItem>) -> ExerciseSessionDetail {
        ExerciseSessionDetail {
            id: Uuid::new_v4(),
            exercise: ExerciseSummary {
                id: Uuid::new_v4(),
                name: "Squat".to_string(),
                is_cardio,
                bodyweight: false,
            },
            notes: None,
            created_by: Uuid::nil(),
            session_data: items
                .into_iter()
                .enumerate()
                .map(|(i, it)| item(i as i32, it))
                .collect(),
            updated_at: Utc::now(),
        }
    }

    fn child(position: i32, content: WorkoutChildContent) -> WorkoutChild {
        WorkoutChild {
            link_id: Uuid::new_v4(),
            position,
            content,
        }
    }

    #[test]
    fn test_rest_items_contribute_nothing() {
        let children = vec![child(
            0,
            WorkoutChildContent::Exercise(session(
                false,
                vec![
                    set(Some(100.0), Some(5)),
                    SessionItem::Rest(RestData { minutes: 3, seconds: 0 }),
                    set(Some(100.0), Some(5)),
                ],
            )),
        )];

        let totals = WorkoutTotals::from_children(&children);
        assert_eq!(totals.total_exercises, 1);
        assert_eq!(totals.total_sets, 2);
        assert_eq!(totals.total_volume, 1000.0);
    }

    #[test]
    fn test_cardio_sets_count_but_add_no_volume() {
        let interval = SessionItem::Interval(IntervalData {
            time: NaiveTime::from_hms_opt(0, 10, 0).unwrap(),
            distance: 2000,
            level: 4,
            pace: 5,
        });
        let children = vec![child(
            0,
            WorkoutChildContent::Exercise(session(true, vec![set(Some(10.0), Some(10)), interval])),
        )];

        let totals = WorkoutTotals::from_children(&children);
        assert_eq!(totals.total_sets, 1);
        assert_eq!(totals.total_volume, 0.0);
    }

    #[test]
    fn test_superset_members_are_summed() {
        let superset = SupersetDetail {
            id: Uuid::new_v4(),
            notes: None,
            created_by: Uuid::nil(),
            exercises: vec![
                session(false, vec![set(Some(20.0), Some(10))]),
                session(false, vec![set(None, Some(15)), set(Some(30.0), Some(8))]),
            ],
            updated_at: Utc::now(),
        };
        let children = vec![
            child(0, WorkoutChildContent::Exercise(session(false, vec![set(Some(50.0), Some(2))]))),
            child(1, WorkoutChildContent::Superset(superset)),
        ];

        let totals = WorkoutTotals::from_children(&children);
        assert_eq!(totals.total_exercises, 2);
        assert_eq!(totals.total_sets, 4);
        assert_eq!(totals.total_volume, 100.0 + 200.0 + 240.0);
    }

    #[test]
    fn test_empty_workout() {
        assert_eq!(WorkoutTotals::from_children(&[]), WorkoutTotals::default());
    }
}
