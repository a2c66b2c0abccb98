use crate::errors::ZeronError;
use crate::models::{Severity, Vulnerability};
use super::Database;

impl Database {
    /// Vulnerabilities of a scan, most severe first, optionally at or above `min_severity`.
    pub fn list_vulnerabilities(
        &self,
        scan_id: &str,
        min_severity: Option<Severity>,
    ) -> Result<Vec<Vulnerability>, ZeronError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT document FROM vulnerabilities WHERE scan_id = ?1 ORDER BY CASE severity WHEN 'CRITICAL' THEN 0 WHEN 'HIGH' THEN 1 WHEN 'MEDIUM' THEN 2 WHEN 'LOW' THEN 3 ELSE 4 END, confidence DESC"
        ).map_err(|e| ZeronError::Database(format!("Query failed: {}", e)))?;

        let rows = stmt.query_map(rusqlite::params![scan_id], |row| row.get::<_, String>(0))
            .map_err(|e| ZeronError::Database(format!("Query error: {}", e)))?;

        let mut results = Vec::new();
        for row in rows {
            let doc = row.map_err(|e| ZeronError::Database(format!("Row error: {}", e)))?;
            let vuln: Vulnerability = serde_json::from_str(&doc)?;
            if min_severity.map_or(true, |min| vuln.severity.rank() <= min.rank()) {
                results.push(vuln);
            }
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Plan, Scan, VulnCategory};
    use chrono::Utc;

    fn vuln(id: &str, category: VulnCategory, severity: Severity, confidence: u8) -> Vulnerability {
        Vulnerability {
            id: id.into(),
            category,
            severity,
            score: 50,
            endpoint: "https://shop.test/".into(),
            method: "GET".into(),
            parameter: id.into(),
            description: String::new(),
            payload: String::new(),
            confidence,
            evidence: vec![],
            response_status: None,
            response_snippet: None,
            poc: None,
            discovered_at: Utc::now(),
            occurrences: 1,
            endpoints: vec![],
        }
    }

    #[test]
    fn test_list_vulnerabilities_orders_and_filters() {
        let db = Database::in_memory().unwrap();
        let mut scan = Scan::new("shop.test", Plan::Pro, Plan::Pro.default_limits(), vec![]);
        scan.vulnerabilities = vec![
            vuln("a", VulnCategory::InfoDisclosure, Severity::Medium, 60),
            vuln("b", VulnCategory::Sqli, Severity::Critical, 95),
            vuln("c", VulnCategory::Xss, Severity::High, 90),
            vuln("d", VulnCategory::Cors, Severity::Low, 65),
        ];
        db.upsert_scan(&scan).unwrap();

        let all = db.list_vulnerabilities(&scan.id, None).unwrap();
        let ids: Vec<&str> = all.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a", "d"]);

        let high = db.list_vulnerabilities(&scan.id, Some(Severity::High)).unwrap();
        assert_eq!(high.len(), 2);
    }
}
