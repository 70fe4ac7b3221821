use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

/// A catalogue exercise available to every profile.
pub struct BuiltinExercise {
    pub name: &'static str,
    pub muscle_groups: &'static [&'static str],
    pub is_cardio: bool,
    pub bodyweight: bool,
    pub instructions: &'static [&'static str],
}

pub const MUSCLE_GROUPS: &[&str] = &[
    "Abs",
    "Back",
    "Biceps",
    "Calves",
    "Chest",
    "Forearms",
    "Glutes",
    "Hamstrings",
    "Quadriceps",
    "Shoulders",
    "Triceps",
    "Cardio",
];

pub const BUILTIN_EXERCISES: &[BuiltinExercise] = &[
    BuiltinExercise {
        name: "Bench Press",
        muscle_groups: &["Chest", "Triceps", "Shoulders"],
        is_cardio: false,
        bodyweight: false,
        instructions: &[
            "Lie on the bench with your eyes under the bar.",
            "Lower the bar to mid chest with control.",
            "Press back up until your arms are locked out.",
        ],
    },
    BuiltinExercise {
        name: "Back Squat",
        muscle_groups: &["Quadriceps", "Glutes", "Hamstrings"],
        is_cardio: false,
        bodyweight: false,
        instructions: &[
            "Rest the bar on your upper back.",
            "Sit down between your hips until thighs are parallel.",
            "Drive up through your mid foot.",
        ],
    },
    BuiltinExercise {
        name: "Deadlift",
        muscle_groups: &["Back", "Glutes", "Hamstrings"],
        is_cardio: false,
        bodyweight: false,
        instructions: &[
            "Stand with the bar over your mid foot.",
            "Grip the bar and flatten your back.",
            "Stand up by pushing the floor away.",
        ],
    },
    BuiltinExercise {
        name: "Overhead Press",
        muscle_groups: &["Shoulders", "Triceps"],
        is_cardio: false,
        bodyweight: false,
        instructions: &["Press the bar from your collarbones to overhead lockout."],
    },
    BuiltinExercise {
        name: "Barbell Row",
        muscle_groups: &["Back", "Biceps"],
        is_cardio: false,
        bodyweight: false,
        instructions: &["Hinge forward and pull the bar to your lower chest."],
    },
    BuiltinExercise {
        name: "Pull Up",
        muscle_groups: &["Back", "Biceps"],
        is_cardio: false,
        bodyweight: true,
        instructions: &["Hang from the bar and pull until your chin clears it."],
    },
    BuiltinExercise {
        name: "Push Up",
        muscle_groups: &["Chest", "Triceps"],
        is_cardio: false,
        bodyweight: true,
        instructions: &["Keep a straight line from head to heels and lower your chest to the floor."],
    },
    BuiltinExercise {
        name: "Dip",
        muscle_groups: &["Chest", "Triceps"],
        is_cardio: false,
        bodyweight: true,
        instructions: &[],
    },
    BuiltinExercise {
        name: "Barbell Curl",
        muscle_groups: &["Biceps", "Forearms"],
        is_cardio: false,
        bodyweight: false,
        instructions: &[],
    },
    BuiltinExercise {
        name: "Triceps Pushdown",
        muscle_groups: &["Triceps"],
        is_cardio: false,
        bodyweight: false,
        instructions: &[],
    },
    BuiltinExercise {
        name: "Standing Calf Raise",
        muscle_groups: &["Calves"],
        is_cardio: false,
        bodyweight: false,
        instructions: &[],
    },
    BuiltinExercise {
        name: "Plank",
        muscle_groups: &["Abs"],
        is_cardio: false,
        bodyweight: true,
        instructions: &[],
    },
    BuiltinExercise {
        name: "Treadmill",
        muscle_groups: &["Cardio"],
        is_cardio: true,
        bodyweight: false,
        instructions: &[],
    },
    BuiltinExercise {
        name: "Stationary Bike",
        muscle_groups: &["Cardio", "Quadriceps"],
        is_cardio: true,
        bodyweight: false,
        instructions: &[],
    },
    BuiltinExercise {
        name: "Rowing Machine",
        muscle_groups: &["Cardio", "Back"],
        is_cardio: true,
        bodyweight: false,
        instructions: &[],
    },
];

pub struct DatabaseSeeder {
    pool: PgPool,
}

impl DatabaseSeeder {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts the muscle groups and built-in exercises that are missing.
    /// Running it again changes nothing.
    pub async fn seed_all(&self) -> Result<()> {
        tracing::info!("Starting database seeding...");

        let groups = self.seed_muscle_groups().await?;
        let exercises = self.seed_exercises().await?;

        tracing::info!(
            "Database seeding completed: {} muscle groups, {} exercises added",
            groups,
            exercises
        );
        Ok(())
    }

    async fn seed_muscle_groups(&self) -> Result<u64> {
        let mut added = 0;
        for name in MUSCLE_GROUPS {
            let result = sqlx::query("INSERT INTO muscle_groups (id, name) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING")
                .bind(Uuid::new_v4())
                .bind(name)
                .execute(&self.pool)
                .await?;
            added += result.rows_affected();
        }
        Ok(added)
    }

    async fn seed_exercises(&self) -> Result<u64> {
        let mut added = 0;

        for exercise in BUILTIN_EXERCISES {
            let mut tx = self.pool.begin().await?;

            let inserted: Option<Uuid> = sqlx::query_scalar(
                "INSERT INTO exercises (id, name, is_cardio, bodyweight, is_published)
                 VALUES ($1, $2, $3, $4, TRUE)
                 ON CONFLICT (name) WHERE created_by IS NULL DO NOTHING
                 RETURNING id",
            )
            .bind(Uuid::new_v4())
            .bind(exercise.name)
            .bind(exercise.is_cardio)
            .bind(exercise.bodyweight)
            .fetch_optional(&mut *tx)
            .await?;

            let Some(exercise_id) = inserted else { continue };

            sqlx::query(
                "INSERT INTO exercise_muscle_groups (exercise_id, muscle_group_id)
                 SELECT $1, id FROM muscle_groups WHERE name = ANY($2)",
            )
            .bind(exercise_id)
            .bind(exercise.muscle_groups)
            .execute(&mut *tx)
            .await?;

            for (position, text) in exercise.instructions.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO exercise_instructions (id, exercise_id, position, text) VALUES ($1, $2, $3, $4)",
                )
                .bind(Uuid::new_v4())
                .bind(exercise_id)
                .bind(position as i32)
                .bind(text)
                .execute(&mut *tx)
                .await?;
            }

            tx.commit().await?;
            added += 1;
        }

        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_exercises_reference_known_groups() {
        let groups: HashSet<&str> = MUSCLE_GROUPS.iter().copied().collect();
        for exercise in BUILTIN_EXERCISES {
            assert!(!exercise.muscle_groups.is_empty(), "{} has no muscle groups", exercise.name);
            for group in exercise.muscle_groups {
                assert!(groups.contains(group), "{} references unknown group {}", exercise.name, group);
            }
        }
    }

    #[test]
    fn test_builtin_names_are_unique_and_short() {
        let mut names = HashSet::new();
        for exercise in BUILTIN_EXERCISES {
            assert!(names.insert(exercise.name), "duplicate exercise {}", exercise.name);
            assert!(exercise.name.len() <= 50);
        }
    }
}
