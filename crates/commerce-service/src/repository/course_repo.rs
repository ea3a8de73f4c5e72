//! 课程仓储

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::CourseRepositoryTrait;
use crate::error::Result;
use crate::models::Course;

/// 课程仓储（只读）
pub struct CourseRepository {
    pool: PgPool,
}

impl CourseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_course(&self, id: i64) -> Result<Option<Course>> {
        let course = sqlx::query_as::<_, Course>(
            r#"
            SELECT id, title, slug, price_inr, price_usd, status, created_at, updated_at
            FROM courses
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(course)
    }
}

#[async_trait]
impl CourseRepositoryTrait for CourseRepository {
    async fn get_course(&self, id: i64) -> Result<Option<Course>> {
        self.get_course(id).await
    }
}
