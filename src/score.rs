//! Deterministic weighted risk scoring

use crate::config::ScoringWeights;
use crate::models::{HeaderCheck, Severity, SourceLeakFinding, VulnerabilityFinding};

/// Computes the final risk score. Side-effect free: two evaluations over the
/// same artifacts always produce the same integer in [0, 100].
pub fn compute_score(
    weights: &ScoringWeights,
    findings: &[VulnerabilityFinding],
    leaks: &[SourceLeakFinding],
    header_checks: &[HeaderCheck],
    tls_grade: Option<&str>,
) -> u8 {
    let mut score: i64 = 100;

    let severities = findings
        .iter()
        .map(|f| &f.severity)
        .chain(leaks.iter().map(|l| &l.severity));

    for severity in severities {
        score -= match severity {
            Severity::Critical => i64::from(weights.critical_penalty),
            Severity::High => i64::from(weights.high_penalty),
            Severity::Medium => i64::from(weights.medium_penalty),
            Severity::Low => i64::from(weights.low_penalty),
            Severity::Info => 0,
        };
    }

    let missing_headers = header_checks.iter().filter(|h| !h.present).count() as u32;
    let header_penalty =
        (missing_headers * weights.header_penalty).min(weights.header_penalty_cap);
    score -= i64::from(header_penalty);

    if matches!(tls_grade, Some("A+") | Some("A")) {
        score += i64::from(weights.tls_bonus);
    }

    score.clamp(0, 100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;

    fn finding(severity: Severity) -> VulnerabilityFinding {
        VulnerabilityFinding::new("test-id", "test", severity, "Test", "d", "a")
    }

    fn missing_header(name: &str) -> HeaderCheck {
        HeaderCheck {
            name: name.to_string(),
            present: false,
            value: None,
            recommendation: Some("add it".to_string()),
        }
    }

    #[test]
    fn clean_run_scores_100() {
        let score = compute_score(&ScoringWeights::default(), &[], &[], &[], None);
        assert_eq!(score, 100);
    }

    #[test]
    fn penalties_accumulate_per_severity() {
        let findings = vec![
            finding(Severity::Critical),
            finding(Severity::High),
            finding(Severity::Medium),
            finding(Severity::Low),
            finding(Severity::Info),
        ];
        let score = compute_score(&ScoringWeights::default(), &findings, &[], &[], None);
        assert_eq!(score, 100 - 15 - 10 - 5 - 2);
    }

    #[test]
    fn header_penalty_is_capped() {
        let headers: Vec<HeaderCheck> = (0..20)
            .map(|i| missing_header(&format!("X-Header-{i}")))
            .collect();
        let score = compute_score(&ScoringWeights::default(), &[], &[], &headers, None);
        assert_eq!(score, 90);
    }

    #[test]
    fn tls_bonus_applies_but_clamps_at_100() {
        let score = compute_score(&ScoringWeights::default(), &[], &[], &[], Some("A+"));
        assert_eq!(score, 100);

        let findings = vec![finding(Severity::Medium)];
        let score = compute_score(&ScoringWeights::default(), &findings, &[], &[], Some("A"));
        assert_eq!(score, 98);
    }

    #[test]
    fn floor_is_zero() {
        let findings: Vec<_> = (0..10).map(|_| finding(Severity::Critical)).collect();
        let score = compute_score(&ScoringWeights::default(), &findings, &[], &[], None);
        assert_eq!(score, 0);
    }

    #[test]
    fn scoring_is_deterministic() {
        let findings = vec![finding(Severity::High), finding(Severity::Low)];
        let headers = vec![missing_header("Content-Security-Policy")];
        let first = compute_score(&ScoringWeights::default(), &findings, &[], &headers, Some("B"));
        let second =
            compute_score(&ScoringWeights::default(), &findings, &[], &headers, Some("B"));
        assert_eq!(first, second);
    }
}
