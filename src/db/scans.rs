use chrono::Utc;
use serde::Serialize;
use crate::errors::ZeronError;
use crate::models::{Scan, ScanStatus};
use super::Database;

/// One row of the scan listing.
#[derive(Debug, Clone, Serialize)]
pub struct ScanListing {
    pub id: String,
    pub domain: String,
    pub plan: String,
    pub status: String,
    pub progress: u8,
    pub current_phase: Option<String>,
    pub findings: usize,
    pub error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Database {
    /// Insert or replace the full scan document and its vulnerability rows.
    pub fn upsert_scan(&self, scan: &Scan) -> Result<(), ZeronError> {
        let document = serde_json::to_string(scan)?;
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()
            .map_err(|e| ZeronError::Database(format!("Failed to begin transaction: {}", e)))?;

        tx.execute(
            "INSERT INTO scans (id, domain, plan, status, progress, current_phase, finding_count, error_message, document, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                progress = excluded.progress,
                current_phase = excluded.current_phase,
                finding_count = excluded.finding_count,
                error_message = excluded.error_message,
                document = excluded.document,
                updated_at = excluded.updated_at",
            rusqlite::params![
                scan.id,
                scan.domain,
                scan.plan.as_str(),
                scan.status.as_str(),
                scan.progress as i64,
                scan.current_phase,
                scan.vulnerabilities.len() as i64,
                scan.error,
                document,
                scan.created_at.to_rfc3339(),
                Utc::now().to_rfc3339(),
            ],
        ).map_err(|e| ZeronError::Database(format!("Failed to write scan: {}", e)))?;

        tx.execute("DELETE FROM vulnerabilities WHERE scan_id = ?1", rusqlite::params![scan.id])
            .map_err(|e| ZeronError::Database(format!("Failed to clear vulnerabilities: {}", e)))?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO vulnerabilities (id, scan_id, category, severity, score, endpoint, parameter, confidence, document, discovered_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
            ).map_err(|e| ZeronError::Database(format!("Prepare failed: {}", e)))?;
            for vuln in &scan.vulnerabilities {
                stmt.execute(rusqlite::params![
                    vuln.id,
                    scan.id,
                    vuln.category.as_str(),
                    vuln.severity.as_str(),
                    vuln.score as i64,
                    vuln.endpoint,
                    vuln.parameter,
                    vuln.confidence as i64,
                    serde_json::to_string(vuln)?,
                    vuln.discovered_at.to_rfc3339(),
                ]).map_err(|e| ZeronError::Database(format!("Failed to write vulnerability: {}", e)))?;
            }
        }

        tx.commit().map_err(|e| ZeronError::Database(format!("Commit failed: {}", e)))?;
        Ok(())
    }

    pub fn get_scan(&self, id: &str) -> Result<Option<Scan>, ZeronError> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            "SELECT document FROM scans WHERE id = ?1",
            rusqlite::params![id],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(doc) => Ok(Some(serde_json::from_str(&doc)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(ZeronError::Database(format!("Query error: {}", e))),
        }
    }

    pub fn list_scans(&self, limit: usize, offset: usize) -> Result<Vec<ScanListing>, ZeronError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, domain, plan, status, progress, current_phase, finding_count, error_message, created_at, updated_at
             FROM scans ORDER BY created_at DESC, rowid DESC LIMIT ?1 OFFSET ?2"
        ).map_err(|e| ZeronError::Database(format!("Query failed: {}", e)))?;

        let rows = stmt.query_map(rusqlite::params![limit as i64, offset as i64], |row: &rusqlite::Row| {
            Ok(ScanListing {
                id: row.get(0)?,
                domain: row.get(1)?,
                plan: row.get(2)?,
                status: row.get(3)?,
                progress: row.get::<_, i64>(4)?.clamp(0, 100) as u8,
                current_phase: row.get(5)?,
                findings: row.get::<_, i64>(6)?.max(0) as usize,
                error: row.get(7)?,
                created_at: row.get(8)?,
                updated_at: row.get(9)?,
            })
        }).map_err(|e| ZeronError::Database(format!("Query error: {}", e)))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| ZeronError::Database(format!("Row error: {}", e)))?);
        }
        Ok(results)
    }

    pub fn delete_scan(&self, id: &str) -> Result<bool, ZeronError> {
        let conn = self.conn.lock().unwrap();
        let count = conn.execute("DELETE FROM scans WHERE id = ?1", rusqlite::params![id])
            .map_err(|e| ZeronError::Database(format!("Delete failed: {}", e)))?;
        Ok(count > 0)
    }

    /// Mark scans left `pending`/`running` by a previous process as failed.
    pub fn mark_interrupted(&self) -> Result<usize, ZeronError> {
        let stale: Vec<String> = {
            let conn = self.conn.lock().unwrap();
            let mut stmt = conn.prepare("SELECT document FROM scans WHERE status IN ('pending', 'running')")
                .map_err(|e| ZeronError::Database(format!("Query failed: {}", e)))?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))
                .map_err(|e| ZeronError::Database(format!("Query error: {}", e)))?;
            rows.collect::<Result<Vec<_>, _>>()
                .map_err(|e| ZeronError::Database(format!("Row error: {}", e)))?
        };

        let mut count = 0;
        for doc in stale {
            let mut scan: Scan = serde_json::from_str(&doc)?;
            scan.status = ScanStatus::Failed;
            scan.error = Some("interrupted".into());
            scan.completed_at = Some(Utc::now());
            self.upsert_scan(&scan)?;
            count += 1;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Plan, Severity, VulnCategory, Vulnerability};

    fn scan(domain: &str) -> Scan {
        Scan::new(domain, Plan::Basic, Plan::Basic.default_limits(), vec![])
    }

    fn vuln(id: &str) -> Vulnerability {
        Vulnerability {
            id: id.into(),
            category: VulnCategory::Sqli,
            severity: Severity::Critical,
            score: 100,
            endpoint: "https://shop.test/list.php?id=1".into(),
            method: "GET".into(),
            parameter: "id".into(),
            description: "SQL error".into(),
            payload: "'".into(),
            confidence: 95,
            evidence: vec!["MySQL error".into()],
            response_status: Some(500),
            response_snippet: None,
            poc: None,
            discovered_at: Utc::now(),
            occurrences: 1,
            endpoints: vec![],
        }
    }

    #[test]
    fn test_db_upsert_and_get_scan() {
        let db = Database::in_memory().unwrap();
        let mut s = scan("shop.test");
        db.upsert_scan(&s).unwrap();

        s.status = ScanStatus::Running;
        s.progress = 40;
        s.vulnerabilities.push(vuln("VULN-1"));
        db.upsert_scan(&s).unwrap();

        let loaded = db.get_scan(&s.id).unwrap().unwrap();
        assert_eq!(loaded.status, ScanStatus::Running);
        assert_eq!(loaded.progress, 40);
        assert_eq!(loaded.vulnerabilities.len(), 1);
        assert_eq!(db.list_vulnerabilities(&s.id, None).unwrap().len(), 1);
    }

    #[test]
    fn test_db_get_nonexistent_scan() {
        let db = Database::in_memory().unwrap();
        assert!(db.get_scan("nonexistent").unwrap().is_none());
    }

    #[test]
    fn test_db_list_scans_pagination() {
        let db = Database::in_memory().unwrap();
        for i in 0..5 {
            db.upsert_scan(&scan(&format!("site{}.test", i))).unwrap();
        }

        assert_eq!(db.list_scans(10, 0).unwrap().len(), 5);
        assert_eq!(db.list_scans(2, 0).unwrap().len(), 2);
        assert_eq!(db.list_scans(2, 2).unwrap().len(), 2);
        assert_eq!(db.list_scans(10, 4).unwrap().len(), 1);
    }

    #[test]
    fn test_db_delete_scan_cascades() {
        let db = Database::in_memory().unwrap();
        let mut s = scan("shop.test");
        s.vulnerabilities.push(vuln("VULN-1"));
        db.upsert_scan(&s).unwrap();

        assert!(db.delete_scan(&s.id).unwrap());
        assert!(db.get_scan(&s.id).unwrap().is_none());
        assert!(db.list_vulnerabilities(&s.id, None).unwrap().is_empty());
        assert!(!db.delete_scan(&s.id).unwrap());
    }

    #[test]
    fn test_db_mark_interrupted_keeps_findings() {
        let db = Database::in_memory().unwrap();
        let mut running = scan("a.test");
        running.status = ScanStatus::Running;
        running.vulnerabilities.push(vuln("VULN-1"));
        let mut done = scan("b.test");
        done.status = ScanStatus::Completed;
        db.upsert_scan(&running).unwrap();
        db.upsert_scan(&done).unwrap();

        assert_eq!(db.mark_interrupted().unwrap(), 1);
        let loaded = db.get_scan(&running.id).unwrap().unwrap();
        assert_eq!(loaded.status, ScanStatus::Failed);
        assert_eq!(loaded.error.as_deref(), Some("interrupted"));
        assert_eq!(loaded.vulnerabilities.len(), 1);
        assert_eq!(db.get_scan(&done.id).unwrap().unwrap().status, ScanStatus::Completed);
    }
}
