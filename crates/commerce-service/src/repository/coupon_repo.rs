//! 优惠券仓储
//!
//! 提供优惠券、课程限制、用户指定和优惠券模板的数据访问

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};

use super::traits::CouponRepositoryTrait;
use crate::error::{CommerceError, Result};
use crate::models::{
    Coupon, CouponAssignment, CouponFilter, CouponType, NewCoupon, NewCouponType,
};

const COUPON_COLUMNS: &str = r#"
    id, code, coupon_type_id, discount_type, discount_value, valid_from, valid_until,
    usage_limit, current_usage_count, is_active, created_by, description,
    created_at, updated_at
"#;

const COUPON_TYPE_COLUMNS: &str = r#"
    id, name, code_prefix, discount_type, min_value, max_value, default_usage_limit,
    is_active, created_at, updated_at
"#;

/// 优惠券仓储
pub struct CouponRepository {
    pool: PgPool,
}

impl CouponRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==================== 优惠券 ====================

    /// 按券码查询，忽略大小写和首尾空白
    pub async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>> {
        let sql = format!(
            "SELECT {} FROM coupons WHERE code = UPPER(TRIM($1))",
            COUPON_COLUMNS
        );
        let coupon = sqlx::query_as::<_, Coupon>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(coupon)
    }

    pub async fn get_coupon(&self, id: i64) -> Result<Option<Coupon>> {
        let sql = format!("SELECT {} FROM coupons WHERE id = $1", COUPON_COLUMNS);
        let coupon = sqlx::query_as::<_, Coupon>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(coupon)
    }

    /// 分页查询，返回当前页数据和总数
    pub async fn list_coupons(&self, filter: &CouponFilter) -> Result<(Vec<Coupon>, i64)> {
        let sql = format!(
            r#"
            SELECT {}
            FROM coupons
            WHERE ($1::BIGINT IS NULL OR created_by = $1)
              AND ($2 = FALSE OR is_active = TRUE)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
            COUPON_COLUMNS
        );
        let coupons = sqlx::query_as::<_, Coupon>(&sql)
            .bind(filter.created_by)
            .bind(filter.active_only)
            .bind(filter.limit())
            .bind(filter.offset())
            .fetch_all(&self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM coupons
            WHERE ($1::BIGINT IS NULL OR created_by = $1)
              AND ($2 = FALSE OR is_active = TRUE)
            "#,
        )
        .bind(filter.created_by)
        .bind(filter.active_only)
        .fetch_one(&self.pool)
        .await?;

        Ok((coupons, total))
    }

    /// 创建优惠券，券码冲突时返回 CouponCodeExists
    pub async fn create_coupon(&self, coupon: &NewCoupon) -> Result<Coupon> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_coupon_in_tx(&mut conn, coupon).await
    }

    /// 在同一事务中写入优惠券、课程限制和用户指定
    ///
    /// 任一步失败整体回滚，不会留下缺少限制的可用优惠券
    pub async fn create_coupon_with_scope(
        &self,
        coupon: &NewCoupon,
        course_ids: &[i64],
        user_ids: &[i64],
    ) -> Result<Coupon> {
        let mut tx = self.pool.begin().await?;

        let created = Self::insert_coupon_in_tx(&mut tx, coupon).await?;
        if !course_ids.is_empty() {
            Self::replace_course_ids_in_tx(&mut tx, created.id, course_ids).await?;
        }
        if !user_ids.is_empty() {
            Self::assign_users_in_tx(&mut tx, created.id, user_ids).await?;
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn insert_coupon_in_tx(conn: &mut PgConnection, coupon: &NewCoupon) -> Result<Coupon> {
        let sql = format!(
            r#"
            INSERT INTO coupons (code, coupon_type_id, discount_type, discount_value,
                                 valid_from, valid_until, usage_limit, created_by, description)
            VALUES (UPPER(TRIM($1)), $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            COUPON_COLUMNS
        );
        sqlx::query_as::<_, Coupon>(&sql)
            .bind(&coupon.code)
            .bind(coupon.coupon_type_id)
            .bind(coupon.discount_type)
            .bind(coupon.discount_value)
            .bind(coupon.valid_from)
            .bind(coupon.valid_until)
            .bind(coupon.usage_limit)
            .bind(coupon.created_by)
            .bind(&coupon.description)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| map_unique_violation(e, &coupon.code))
    }

    pub async fn deactivate(&self, id: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE coupons
            SET is_active = FALSE, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 原子占用一次使用次数
    ///
    /// 条件更新保证 current_usage_count 不会超过 usage_limit，返回是否占用成功
    pub async fn try_redeem(&self, id: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE coupons
            SET current_usage_count = current_usage_count + 1, updated_at = NOW()
            WHERE id = $1
              AND (usage_limit IS NULL OR current_usage_count < usage_limit)
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // ==================== 课程限制 ====================

    pub async fn list_course_ids(&self, coupon_id: i64) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT course_id FROM coupon_courses WHERE coupon_id = $1 ORDER BY course_id",
        )
        .bind(coupon_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// 整体替换课程限制，空列表表示取消限制
    pub async fn replace_course_ids(&self, coupon_id: i64, course_ids: &[i64]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::replace_course_ids_in_tx(&mut tx, coupon_id, course_ids).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn replace_course_ids_in_tx(
        tx: &mut PgConnection,
        coupon_id: i64,
        course_ids: &[i64],
    ) -> Result<()> {
        sqlx::query("DELETE FROM coupon_courses WHERE coupon_id = $1")
            .bind(coupon_id)
            .execute(&mut *tx)
            .await?;

        if !course_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO coupon_courses (coupon_id, course_id)
                SELECT $1, course_id FROM UNNEST($2::BIGINT[]) AS t(course_id)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(coupon_id)
            .bind(course_ids)
            .execute(&mut *tx)
            .await?;
        }

        Ok(())
    }

    // ==================== 用户指定 ====================

    pub async fn count_assignments(&self, coupon_id: i64) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM coupon_users WHERE coupon_id = $1")
                .bind(coupon_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    pub async fn get_assignment(
        &self,
        coupon_id: i64,
        user_id: i64,
    ) -> Result<Option<CouponAssignment>> {
        let assignment = sqlx::query_as::<_, CouponAssignment>(
            r#"
            SELECT coupon_id, user_id, is_used, used_at
            FROM coupon_users
            WHERE coupon_id = $1 AND user_id = $2
            "#,
        )
        .bind(coupon_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(assignment)
    }

    /// 追加用户指定，已存在的指定保持不变，返回新增数量
    pub async fn assign_users(&self, coupon_id: i64, user_ids: &[i64]) -> Result<u64> {
        let mut conn = self.pool.acquire().await?;
        Self::assign_users_in_tx(&mut conn, coupon_id, user_ids).await
    }

    async fn assign_users_in_tx(
        conn: &mut PgConnection,
        coupon_id: i64,
        user_ids: &[i64],
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO coupon_users (coupon_id, user_id)
            SELECT $1, user_id FROM UNNEST($2::BIGINT[]) AS t(user_id)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(coupon_id)
        .bind(user_ids)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// 标记用户指定已使用，仅未使用的记录会被更新
    pub async fn consume_assignment(&self, coupon_id: i64, user_id: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE coupon_users
            SET is_used = TRUE, used_at = NOW()
            WHERE coupon_id = $1 AND user_id = $2 AND is_used = FALSE
            "#,
        )
        .bind(coupon_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // ==================== 模板 ====================

    pub async fn get_coupon_type(&self, id: i64) -> Result<Option<CouponType>> {
        let sql = format!(
            "SELECT {} FROM coupon_types WHERE id = $1",
            COUPON_TYPE_COLUMNS
        );
        let coupon_type = sqlx::query_as::<_, CouponType>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(coupon_type)
    }

    pub async fn list_coupon_types(&self) -> Result<Vec<CouponType>> {
        let sql = format!(
            "SELECT {} FROM coupon_types ORDER BY id ASC",
            COUPON_TYPE_COLUMNS
        );
        let types = sqlx::query_as::<_, CouponType>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(types)
    }

    pub async fn create_coupon_type(&self, coupon_type: &NewCouponType) -> Result<CouponType> {
        let sql = format!(
            r#"
            INSERT INTO coupon_types (name, code_prefix, discount_type, min_value, max_value,
                                      default_usage_limit)
            VALUES ($1, UPPER(TRIM($2)), $3, $4, $5, $6)
            RETURNING {}
            "#,
            COUPON_TYPE_COLUMNS
        );
        let created = sqlx::query_as::<_, CouponType>(&sql)
            .bind(&coupon_type.name)
            .bind(&coupon_type.code_prefix)
            .bind(coupon_type.discount_type)
            .bind(coupon_type.min_value)
            .bind(coupon_type.max_value)
            .bind(coupon_type.default_usage_limit)
            .fetch_one(&self.pool)
            .await?;

        Ok(created)
    }
}

fn map_unique_violation(err: sqlx::Error, code: &str) -> CommerceError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            CommerceError::CouponCodeExists(code.trim().to_uppercase())
        }
        _ => CommerceError::Database(err),
    }
}

#[async_trait]
impl CouponRepositoryTrait for CouponRepository {
    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>> {
        self.find_by_code(code).await
    }

    async fn get_coupon(&self, id: i64) -> Result<Option<Coupon>> {
        self.get_coupon(id).await
    }

    async fn list_coupons(&self, filter: &CouponFilter) -> Result<(Vec<Coupon>, i64)> {
        self.list_coupons(filter).await
    }

    async fn create_coupon(&self, coupon: &NewCoupon) -> Result<Coupon> {
        self.create_coupon(coupon).await
    }

    async fn create_coupon_with_scope(
        &self,
        coupon: &NewCoupon,
        course_ids: &[i64],
        user_ids: &[i64],
    ) -> Result<Coupon> {
        self.create_coupon_with_scope(coupon, course_ids, user_ids)
            .await
    }

    async fn deactivate(&self, id: i64) -> Result<bool> {
        self.deactivate(id).await
    }

    async fn try_redeem(&self, id: i64) -> Result<bool> {
        self.try_redeem(id).await
    }

    async fn list_course_ids(&self, coupon_id: i64) -> Result<Vec<i64>> {
        self.list_course_ids(coupon_id).await
    }

    async fn replace_course_ids(&self, coupon_id: i64, course_ids: &[i64]) -> Result<()> {
        self.replace_course_ids(coupon_id, course_ids).await
    }

    async fn count_assignments(&self, coupon_id: i64) -> Result<i64> {
        self.count_assignments(coupon_id).await
    }

    async fn get_assignment(
        &self,
        coupon_id: i64,
        user_id: i64,
    ) -> Result<Option<CouponAssignment>> {
        self.get_assignment(coupon_id, user_id).await
    }

    async fn assign_users(&self, coupon_id: i64, user_ids: &[i64]) -> Result<u64> {
        self.assign_users(coupon_id, user_ids).await
    }

    async fn consume_assignment(&self, coupon_id: i64, user_id: i64) -> Result<bool> {
        self.consume_assignment(coupon_id, user_id).await
    }

    async fn get_coupon_type(&self, id: i64) -> Result<Option<CouponType>> {
        self.get_coupon_type(id).await
    }

    async fn list_coupon_types(&self) -> Result<Vec<CouponType>> {
        self.list_coupon_types().await
    }

    async fn create_coupon_type(&self, coupon_type: &NewCouponType) -> Result<CouponType> {
        self.create_coupon_type(coupon_type).await
    }
}
