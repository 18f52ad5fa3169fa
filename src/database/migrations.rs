//! Embedded schema migrations, applied in version order

pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub statements: &'static [&'static str],
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "001_create_jobs",
        statements: &[
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id TEXT PRIMARY KEY NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                duration_ms BIGINT NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        ],
    },
    Migration {
        version: 2,
        description: "002_create_job_results",
        statements: &[
            r#"
            CREATE TABLE IF NOT EXISTS job_results (
                id TEXT PRIMARY KEY NOT NULL,
                job_id TEXT NOT NULL REFERENCES jobs(id) ON UPDATE CASCADE ON DELETE CASCADE,
                url TEXT NOT NULL,
                status TEXT NOT NULL,
                latency_ms BIGINT NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_job_results_job_id ON job_results(job_id)",
        ],
    },
];
