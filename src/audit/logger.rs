/// Audit logger implementation
///
/// Writes are attempt-once and never propagate failures: a broken audit
/// pipeline must not abort the user-facing operation it records. Reads use
/// indexed queries filtered server-side.
use crate::{
    audit::{
        ActivityStats, ActorInfo, AuditAction, AuditEntry, AuditFilters, InactiveUser,
        RequestContext,
    },
    config::AuditConfig,
    error::AppResult,
};
use chrono::{DateTime, Duration, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::collections::BTreeMap;
use uuid::Uuid;

const ENTRY_COLUMNS: &str = "id, user_id, user_email, user_name, user_role, action, \
     action_label, details, page, url, user_agent, language, platform, screen_resolution, \
     success, error_message, timestamp";

#[derive(Clone)]
pub struct AuditLogger {
    db: SqlitePool,
    config: AuditConfig,
}

impl AuditLogger {
    pub fn new(db: SqlitePool, config: AuditConfig) -> Self {
        Self { db, config }
    }

    /// Record a successful action
    pub async fn record(
        &self,
        action: AuditAction,
        actor: &ActorInfo,
        details: serde_json::Value,
        ctx: &RequestContext,
    ) {
        self.record_outcome(action, actor, details, ctx, true, None)
            .await;
    }

    /// Record an action with its outcome. Persistence failures are swallowed
    /// after a diagnostic log line; there are no retries.
    pub async fn record_outcome(
        &self,
        action: AuditAction,
        actor: &ActorInfo,
        details: serde_json::Value,
        ctx: &RequestContext,
        success: bool,
        error_message: Option<String>,
    ) {
        let result = sqlx::query(
            "INSERT INTO audit_log (id, user_id, user_email, user_name, user_role, action, \
             action_label, details, page, url, user_agent, language, platform, \
             screen_resolution, success, error_message, timestamp) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&actor.user_id)
        .bind(&actor.user_email)
        .bind(&actor.user_name)
        .bind(&actor.user_role)
        .bind(action.as_str())
        .bind(action.label())
        .bind(details.to_string())
        .bind(&ctx.page)
        .bind(&ctx.url)
        .bind(&ctx.user_agent)
        .bind(&ctx.language)
        .bind(&ctx.platform)
        .bind(&ctx.screen_resolution)
        .bind(success)
        .bind(&error_message)
        .bind(Utc::now())
        .execute(&self.db)
        .await;

        if let Err(e) = result {
            tracing::warn!("Failed to persist audit entry {}: {}", action.as_str(), e);
        }
    }

    /// Query entries with composable server-side filters, newest first
    pub async fn query(&self, filters: &AuditFilters) -> AppResult<Vec<AuditEntry>> {
        let mut sql = format!("SELECT {} FROM audit_log WHERE 1=1", ENTRY_COLUMNS);
        if filters.user_email.is_some() {
            sql.push_str(" AND user_email = ?");
        }
        if filters.user_id.is_some() {
            sql.push_str(" AND user_id = ?");
        }
        if filters.role.is_some() {
            sql.push_str(" AND user_role = ?");
        }
        if filters.action.is_some() {
            sql.push_str(" AND action = ?");
        }
        if filters.start_date.is_some() {
            sql.push_str(" AND timestamp >= ?");
        }
        if filters.end_date.is_some() {
            sql.push_str(" AND timestamp <= ?");
        }
        sql.push_str(" ORDER BY timestamp DESC LIMIT ?");

        let mut query = sqlx::query(&sql);
        if let Some(ref email) = filters.user_email {
            query = query.bind(email.clone());
        }
        if let Some(ref user_id) = filters.user_id {
            query = query.bind(user_id.clone());
        }
        if let Some(ref role) = filters.role {
            query = query.bind(role.clone());
        }
        if let Some(ref action) = filters.action {
            query = query.bind(action.clone());
        }
        if let Some(start) = filters.start_date {
            query = query.bind(start);
        }
        if let Some(end) = filters.end_date {
            // Inclusive end: cover the whole final day
            let end_of_day = end
                .date_naive()
                .and_hms_milli_opt(23, 59, 59, 999)
                .map(|dt| dt.and_utc())
                .unwrap_or(end);
            query = query.bind(end_of_day);
        }
        query = query.bind(filters.limit.unwrap_or(self.config.recent_cap));

        let rows = query.fetch_all(&self.db).await?;
        Ok(rows.iter().map(row_to_entry).collect())
    }

    /// Most recent entries, newest first
    pub async fn recent(&self, limit: i64) -> AppResult<Vec<AuditEntry>> {
        self.query(&AuditFilters {
            limit: Some(limit),
            ..Default::default()
        })
        .await
    }

    /// Full system log, newest first, capped. Privileged read.
    pub async fn all(&self) -> AppResult<Vec<AuditEntry>> {
        self.query(&AuditFilters::default()).await
    }

    /// Activity statistics for one user over the trailing `days` window
    pub async fn activity_stats(&self, user_email: &str, days: i64) -> AppResult<ActivityStats> {
        let entries = self
            .query(&AuditFilters {
                user_email: Some(user_email.to_string()),
                start_date: Some(Utc::now() - Duration::days(days)),
                ..Default::default()
            })
            .await?;

        Ok(compute_stats(
            &entries,
            Duration::minutes(self.config.session_gap_minutes),
        ))
    }

    /// Users whose newest entry in the recent window is older than the
    /// threshold (minutes); falls back to the configured default
    pub async fn inactive_users(&self, threshold_minutes: Option<i64>) -> AppResult<Vec<InactiveUser>> {
        let threshold = threshold_minutes.unwrap_or(self.config.inactivity_minutes);
        let entries = self.recent(self.config.recent_cap).await?;

        let now = Utc::now();
        let mut latest: BTreeMap<String, (Option<String>, Option<String>, DateTime<Utc>)> =
            BTreeMap::new();
        for entry in &entries {
            let key = match (&entry.user_email, &entry.user_id) {
                (Some(email), _) => email.clone(),
                (None, Some(id)) => id.clone(),
                (None, None) => continue,
            };
            let slot = latest.entry(key).or_insert((
                entry.user_id.clone(),
                entry.user_email.clone(),
                entry.timestamp,
            ));
            if entry.timestamp > slot.2 {
                *slot = (entry.user_id.clone(), entry.user_email.clone(), entry.timestamp);
            }
        }

        let mut inactive: Vec<InactiveUser> = latest
            .into_values()
            .filter_map(|(user_id, user_email, last_activity)| {
                let minutes = (now - last_activity).num_minutes();
                if minutes > threshold {
                    Some(InactiveUser {
                        user_id,
                        user_email,
                        last_activity,
                        minutes_since_last_activity: minutes,
                    })
                } else {
                    None
                }
            })
            .collect();

        inactive.sort_by(|a, b| a.last_activity.cmp(&b.last_activity));
        Ok(inactive)
    }
}

/// Derive session statistics from one user's entries.
///
/// Entries are scanned in timestamp order. A session opens on a
/// login/navigation event when no session is open or when the gap since the
/// current session's start exceeds `session_gap` (the previous session then
/// closes at its last observed activity). A LOGOUT closes the open session.
/// A session never explicitly closed is closed at its last observed activity.
pub fn compute_stats(entries: &[AuditEntry], session_gap: Duration) -> ActivityStats {
    let mut ordered: Vec<&AuditEntry> = entries.iter().collect();
    ordered.sort_by_key(|e| e.timestamp);

    let mut stats = ActivityStats {
        total_actions: ordered.len(),
        sessions: 0,
        total_session_seconds: 0,
        last_activity: ordered.last().map(|e| e.timestamp),
        actions_by_type: BTreeMap::new(),
    };

    let mut session_start: Option<DateTime<Utc>> = None;
    let mut session_last: Option<DateTime<Utc>> = None;

    for entry in ordered {
        *stats.actions_by_type.entry(entry.action.clone()).or_default() += 1;

        let opens = AuditAction::parse(&entry.action)
            .map(|a| a.opens_session())
            .unwrap_or(false);

        if entry.action == AuditAction::Logout.as_str() {
            if let Some(start) = session_start.take() {
                stats.total_session_seconds += (entry.timestamp - start).num_seconds();
                session_last = None;
            }
            continue;
        }

        match session_start {
            None if opens => {
                session_start = Some(entry.timestamp);
                session_last = Some(entry.timestamp);
                stats.sessions += 1;
            }
            Some(start) if opens && entry.timestamp - start > session_gap => {
                // Implicit close of the stale session at its last activity
                if let Some(last) = session_last {
                    stats.total_session_seconds += (last - start).num_seconds();
                }
                session_start = Some(entry.timestamp);
                session_last = Some(entry.timestamp);
                stats.sessions += 1;
            }
            Some(_) => {
                session_last = Some(entry.timestamp);
            }
            None => {}
        }
    }

    if let (Some(start), Some(last)) = (session_start, session_last) {
        stats.total_session_seconds += (last - start).num_seconds();
    }

    stats
}

fn row_to_entry(row: &SqliteRow) -> AuditEntry {
    let details_raw: String = row.get("details");
    let details = serde_json::from_str(&details_raw).unwrap_or(serde_json::Value::Null);

    AuditEntry {
        id: row.get("id"),
        user_id: row.get("user_id"),
        user_email: row.get("user_email"),
        user_name: row.get("user_name"),
        user_role: row.get("user_role"),
        action: row.get("action"),
        action_label: row.get("action_label"),
        details,
        page: row.get("page"),
        url: row.get("url"),
        user_agent: row.get("user_agent"),
        language: row.get("language"),
        platform: row.get("platform"),
        screen_resolution: row.get("screen_resolution"),
        success: row.get("success"),
        error_message: row.get("error_message"),
        timestamp: row.get("timestamp"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn test_config() -> AuditConfig {
        AuditConfig {
            inactivity_minutes: 30,
            session_gap_minutes: 30,
            recent_cap: 1000,
        }
    }

    async fn memory_logger() -> AuditLogger {
        let db = SqlitePool::connect(":memory:").await.unwrap();

        sqlx::query(
            r#"
            CREATE TABLE audit_log (
                id TEXT PRIMARY KEY,
                user_id TEXT,
                user_email TEXT,
                user_name TEXT,
                user_role TEXT NOT NULL,
                action TEXT NOT NULL,
                action_label TEXT NOT NULL,
                details TEXT NOT NULL DEFAULT '{}',
                page TEXT NOT NULL,
                url TEXT NOT NULL,
                user_agent TEXT,
                language TEXT,
                platform TEXT,
                screen_resolution TEXT,
                success INTEGER NOT NULL DEFAULT 1,
                error_message TEXT,
                timestamp TEXT NOT NULL
            )
            "#,
        )
        .execute(&db)
        .await
        .unwrap();

        AuditLogger::new(db, test_config())
    }

    fn actor(email: &str) -> ActorInfo {
        ActorInfo {
            user_id: Some(format!("id-{}", email)),
            user_email: Some(email.to_string()),
            user_name: Some("Ana Prueba".to_string()),
            user_role: "admin".to_string(),
        }
    }

    fn entry_at(action: AuditAction, ts: DateTime<Utc>) -> AuditEntry {
        AuditEntry {
            id: Uuid::new_v4().to_string(),
            user_id: None,
            user_email: Some("ana@opm.org".to_string()),
            user_name: None,
            user_role: "admin".to_string(),
            action: action.as_str().to_string(),
            action_label: action.label().to_string(),
            details: serde_json::Value::Null,
            page: "/socios".to_string(),
            url: "http://localhost/socios".to_string(),
            user_agent: None,
            language: None,
            platform: None,
            screen_resolution: None,
            success: true,
            error_message: None,
            timestamp: ts,
        }
    }

    #[tokio::test]
    async fn test_record_and_query_filters() {
        let logger = memory_logger().await;
        let ctx = RequestContext {
            page: "/socios".to_string(),
            url: "http://localhost/socios".to_string(),
            ..Default::default()
        };

        logger
            .record(
                AuditAction::CreateSocio,
                &actor("ana@opm.org"),
                json!({"socioId": "s1"}),
                &ctx,
            )
            .await;
        logger
            .record(AuditAction::ViewSocio, &actor("beto@opm.org"), json!({}), &ctx)
            .await;

        let todas = logger.all().await.unwrap();
        assert_eq!(todas.len(), 2);

        let de_ana = logger
            .query(&AuditFilters {
                user_email: Some("ana@opm.org".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(de_ana.len(), 1);
        assert_eq!(de_ana[0].action, "CREATE_SOCIO");
        assert_eq!(de_ana[0].details["socioId"], "s1");

        let creaciones = logger
            .query(&AuditFilters {
                action: Some("CREATE_SOCIO".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(creaciones.len(), 1);

        let admins = logger
            .query(&AuditFilters {
                role: Some("admin".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(admins.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_outcome_recorded() {
        let logger = memory_logger().await;
        logger
            .record_outcome(
                AuditAction::LoginFailed,
                &ActorInfo::unknown(Some("ana@opm.org".to_string())),
                json!({}),
                &RequestContext::default(),
                false,
                Some("Invalid credentials".to_string()),
            )
            .await;

        let entries = logger.all().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].success);
        assert_eq!(entries[0].user_role, "unknown");
        assert_eq!(
            entries[0].error_message.as_deref(),
            Some("Invalid credentials")
        );
    }

    #[tokio::test]
    async fn test_recent_is_newest_first_and_capped() {
        let logger = memory_logger().await;
        let ctx = RequestContext::default();
        for i in 0..5 {
            logger
                .record(
                    AuditAction::NavigateToPage,
                    &actor("ana@opm.org"),
                    json!({"n": i}),
                    &ctx,
                )
                .await;
        }

        let recientes = logger.recent(3).await.unwrap();
        assert_eq!(recientes.len(), 3);
        assert!(recientes[0].timestamp >= recientes[1].timestamp);
        assert!(recientes[1].timestamp >= recientes[2].timestamp);
    }

    #[tokio::test]
    async fn test_entries_are_immutable_across_writes() {
        let logger = memory_logger().await;
        let ctx = RequestContext::default();

        logger
            .record(AuditAction::CreateSocio, &actor("ana@opm.org"), json!({}), &ctx)
            .await;
        let first = logger.all().await.unwrap().pop().unwrap();

        // Further writes never touch an existing entry
        logger
            .record(AuditAction::DeleteSocio, &actor("ana@opm.org"), json!({}), &ctx)
            .await;
        let again = logger
            .all()
            .await
            .unwrap()
            .into_iter()
            .find(|e| e.id == first.id)
            .unwrap();

        assert_eq!(again.action, first.action);
        assert_eq!(again.timestamp, first.timestamp);
        assert_eq!(again.details, first.details);
    }

    #[test]
    fn test_stats_login_navigate_logout() {
        let t0 = Utc.with_ymd_and_hms(2026, 8, 6, 10, 0, 0).unwrap();
        let entries = vec![
            entry_at(AuditAction::LoginSuccess, t0),
            entry_at(AuditAction::NavigateToPage, t0 + Duration::minutes(5)),
            entry_at(AuditAction::Logout, t0 + Duration::minutes(20)),
        ];

        let stats = compute_stats(&entries, Duration::minutes(30));
        assert_eq!(stats.sessions, 1);
        assert_eq!(stats.total_session_seconds, 20 * 60);
        assert_eq!(stats.total_actions, 3);
        assert_eq!(stats.actions_by_type.get("LOGIN_SUCCESS"), Some(&1));
        assert_eq!(stats.last_activity, Some(t0 + Duration::minutes(20)));
    }

    #[test]
    fn test_stats_two_logins_beyond_gap() {
        let t0 = Utc.with_ymd_and_hms(2026, 8, 6, 10, 0, 0).unwrap();
        let entries = vec![
            entry_at(AuditAction::LoginSuccess, t0),
            entry_at(AuditAction::LoginSuccess, t0 + Duration::minutes(40)),
        ];

        let stats = compute_stats(&entries, Duration::minutes(30));
        assert_eq!(stats.sessions, 2);
    }

    #[test]
    fn test_stats_login_within_gap_stays_one_session() {
        let t0 = Utc.with_ymd_and_hms(2026, 8, 6, 10, 0, 0).unwrap();
        let entries = vec![
            entry_at(AuditAction::LoginSuccess, t0),
            entry_at(AuditAction::LoginSuccess, t0 + Duration::minutes(10)),
        ];

        let stats = compute_stats(&entries, Duration::minutes(30));
        assert_eq!(stats.sessions, 1);
    }

    #[test]
    fn test_stats_unclosed_session_uses_last_activity() {
        let t0 = Utc.with_ymd_and_hms(2026, 8, 6, 10, 0, 0).unwrap();
        let entries = vec![
            entry_at(AuditAction::LoginSuccess, t0),
            entry_at(AuditAction::EditSocio, t0 + Duration::minutes(12)),
        ];

        let stats = compute_stats(&entries, Duration::minutes(30));
        assert_eq!(stats.sessions, 1);
        assert_eq!(stats.total_session_seconds, 12 * 60);
    }

    #[tokio::test]
    async fn test_inactive_users() {
        let logger = memory_logger().await;
        let now = Utc::now();

        // Manual inserts with controlled timestamps
        for (email, ts) in [
            ("vieja@opm.org", now - Duration::minutes(45)),
            ("activa@opm.org", now - Duration::minutes(5)),
        ] {
            sqlx::query(
                "INSERT INTO audit_log (id, user_email, user_role, action, action_label, \
                 details, page, url, success, timestamp) \
                 VALUES (?1, ?2, 'admin', 'NAVIGATE_TO_PAGE', 'Navegar a página', '{}', '/', \
                 'http://localhost/', 1, ?3)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(email)
            .bind(ts)
            .execute(&logger.db)
            .await
            .unwrap();
        }

        let inactivos = logger.inactive_users(None).await.unwrap();
        assert_eq!(inactivos.len(), 1);
        assert_eq!(inactivos[0].user_email.as_deref(), Some("vieja@opm.org"));
        assert!(inactivos[0].minutes_since_last_activity >= 45);

        // Stricter threshold catches both
        let inactivos = logger.inactive_users(Some(1)).await.unwrap();
        assert_eq!(inactivos.len(), 2);
    }
}
