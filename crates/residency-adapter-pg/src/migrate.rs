//! Embedded schema migrations.
//!
//! Each version is a list of statements applied in one transaction and
//! recorded in `schema_migrations`.

use sqlx::PgPool;
use tracing::info;

const V1_SCHEMA: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        firebase_uid TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL UNIQUE,
        display_name TEXT NOT NULL,
        role TEXT NOT NULL CHECK (role IN ('user', 'mentor', 'admin', 'superAdmin')),
        credits BIGINT NOT NULL DEFAULT 0 CHECK (credits >= 0),
        bio TEXT,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS courses (
        id UUID PRIMARY KEY,
        title TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        description TEXT NOT NULL DEFAULT '',
        status TEXT NOT NULL CHECK (status IN ('draft', 'published', 'archived')),
        position INTEGER NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS topics (
        id UUID PRIMARY KEY,
        course_id UUID NOT NULL REFERENCES courses (id),
        title TEXT NOT NULL,
        slug TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        position INTEGER NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL,
        UNIQUE (course_id, slug)
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS lessons (
        id UUID PRIMARY KEY,
        course_id UUID NOT NULL REFERENCES courses (id),
        topic_id UUID NOT NULL REFERENCES topics (id),
        title TEXT NOT NULL,
        slug TEXT NOT NULL,
        content TEXT NOT NULL DEFAULT '',
        video_url TEXT,
        duration_minutes INTEGER NOT NULL DEFAULT 0 CHECK (duration_minutes >= 0),
        position INTEGER NOT NULL DEFAULT 0,
        quiz JSONB NOT NULL DEFAULT '[]'::jsonb,
        passing_score INTEGER NOT NULL DEFAULT 70 CHECK (passing_score BETWEEN 0 AND 100),
        credit_reward BIGINT NOT NULL DEFAULT 0 CHECK (credit_reward >= 0),
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL,
        UNIQUE (topic_id, slug)
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS progresses (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL REFERENCES users (id),
        course_id UUID NOT NULL REFERENCES courses (id),
        topic_id UUID NOT NULL REFERENCES topics (id),
        lesson_id UUID NOT NULL REFERENCES lessons (id),
        status TEXT NOT NULL CHECK (status IN ('not-started', 'in-progress', 'completed')),
        time_spent_seconds BIGINT NOT NULL DEFAULT 0 CHECK (time_spent_seconds >= 0),
        quiz_score DOUBLE PRECISION CHECK (quiz_score BETWEEN 0 AND 100),
        quiz_passed BOOLEAN NOT NULL DEFAULT FALSE,
        quiz_attempts INTEGER NOT NULL DEFAULT 0,
        answers JSONB NOT NULL DEFAULT '[]'::jsonb,
        last_attempt_at TIMESTAMPTZ,
        started_at TIMESTAMPTZ,
        completed_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL,
        UNIQUE (user_id, lesson_id)
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS credit_transactions (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL,
        amount BIGINT NOT NULL,
        kind TEXT NOT NULL CHECK (kind IN ('admin_adjustment', 'lesson_completion', 'mentor_reward', 'other')),
        note TEXT NOT NULL,
        created_by UUID,
        created_at TIMESTAMPTZ NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS mentor_applications (
        id UUID PRIMARY KEY,
        user_id UUID REFERENCES users (id) ON DELETE SET NULL,
        full_name TEXT NOT NULL,
        email TEXT NOT NULL,
        linkedin_url TEXT,
        expertise TEXT[] NOT NULL DEFAULT '{}',
        motivation TEXT NOT NULL,
        years_experience INTEGER NOT NULL DEFAULT 0,
        status TEXT NOT NULL CHECK (status IN ('pending', 'approved', 'rejected')),
        reviewed_by UUID,
        reviewed_at TIMESTAMPTZ,
        review_note TEXT,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    ",
    "CREATE INDEX IF NOT EXISTS idx_topics_course ON topics (course_id, position)",
    "CREATE INDEX IF NOT EXISTS idx_lessons_topic ON lessons (topic_id, position)",
    "CREATE INDEX IF NOT EXISTS idx_lessons_course ON lessons (course_id)",
    "CREATE INDEX IF NOT EXISTS idx_progresses_user ON progresses (user_id, updated_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_progresses_lesson ON progresses (lesson_id)",
    "CREATE INDEX IF NOT EXISTS idx_credit_transactions_user ON credit_transactions (user_id, created_at DESC)",
    r"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_mentor_applications_one_pending
        ON mentor_applications (user_id) WHERE status = 'pending'
    ",
];

const MIGRATIONS: &[(i64, &[&str])] = &[(1, V1_SCHEMA)];

/// Apply every migration not yet recorded.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version BIGINT PRIMARY KEY,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        ",
    )
    .execute(pool)
    .await?;

    for (version, statements) in MIGRATIONS {
        let applied = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = $1")
            .bind(version)
            .fetch_optional(pool)
            .await?
            .is_some();
        if applied {
            continue;
        }

        let mut tx = pool.begin().await?;
        for statement in *statements {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        sqlx::query("INSERT INTO schema_migrations (version) VALUES ($1)")
            .bind(version)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        info!(version, "applied schema migration");
    }

    Ok(())
}

/// Highest applied version, or 0 on a fresh database.
pub async fn current_version(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let exists: bool =
        sqlx::query_scalar("SELECT to_regclass('schema_migrations') IS NOT NULL")
            .fetch_one(pool)
            .await?;
    if !exists {
        return Ok(0);
    }
    let version: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_migrations")
        .fetch_one(pool)
        .await?;
    Ok(version.unwrap_or(0))
}
